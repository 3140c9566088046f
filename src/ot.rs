//! Delivery of the evaluator's input labels.
//!
//! The evaluator must obtain the label of each of its input bits without the garbler learning
//! the bit, which is the job of an oblivious transfer. The protocol only depends on the
//! [`LabelDelivery`] trait; [`IdealLabelDelivery`] stands in for an OT functionality and is fed
//! directly with the garbler's [`LabelOffer`], like a trusted dealer.

use crate::data_types::WireSecrets;

pub use crate::data_types::ActiveLabel;

/// Errors raised while obtaining input labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelDeliveryError {
    /// The requested input does not exist.
    #[error("evaluator input {input} does not exist, there are {len} inputs")]
    UnknownInput {
        /// The requested input index.
        input: usize,
        /// The number of evaluator inputs.
        len: usize,
    },
    /// The label of the input has already been delivered.
    #[error("the label of evaluator input {0} has already been delivered")]
    AlreadyDelivered(usize),
    /// The underlying transfer failed.
    #[error("label transfer failed: {0}")]
    Transfer(String),
}

/// Provides the evaluator with the label of one of its input bits.
pub trait LabelDelivery {
    /// Returns the label encoding `bit` for the evaluator input with the given index (counted
    /// among the evaluator's inputs only).
    fn request_label(&mut self, input: usize, bit: bool) -> Result<ActiveLabel, LabelDeliveryError>;
}

impl<D: LabelDelivery + ?Sized> LabelDelivery for &mut D {
    fn request_label(
        &mut self,
        input: usize,
        bit: bool,
    ) -> Result<ActiveLabel, LabelDeliveryError> {
        (**self).request_label(input, bit)
    }
}

/// The sender's input to the label delivery: both labels of every evaluator input wire.
///
/// This is secret to the garbler and deliberately not serializable.
#[derive(Debug, Clone)]
pub struct LabelOffer {
    pairs: Vec<[ActiveLabel; 2]>,
}

impl LabelOffer {
    pub(crate) fn new<'a>(wires: impl IntoIterator<Item = &'a WireSecrets>) -> Self {
        Self {
            pairs: wires
                .into_iter()
                .map(|w| [w.active(false), w.active(true)])
                .collect(),
        }
    }

    /// The number of evaluator inputs covered by the offer.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the evaluator has no inputs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// An ideal label delivery that hands out exactly one label per input.
#[derive(Debug)]
pub struct IdealLabelDelivery {
    offer: LabelOffer,
    delivered: Vec<bool>,
}

impl IdealLabelDelivery {
    /// Creates the delivery from the garbler's offer.
    pub fn new(offer: LabelOffer) -> Self {
        let delivered = vec![false; offer.len()];
        Self { offer, delivered }
    }
}

impl LabelDelivery for IdealLabelDelivery {
    fn request_label(
        &mut self,
        input: usize,
        bit: bool,
    ) -> Result<ActiveLabel, LabelDeliveryError> {
        let len = self.offer.len();
        let Some(pair) = self.offer.pairs.get(input) else {
            return Err(LabelDeliveryError::UnknownInput { input, len });
        };
        if self.delivered[input] {
            return Err(LabelDeliveryError::AlreadyDelivered(input));
        }
        self.delivered[input] = true;
        Ok(pair[bit as usize])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn delivers_each_label_once() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let wires: Vec<_> = (0..3).map(|_| WireSecrets::random(&mut rng)).collect();
        let mut delivery = IdealLabelDelivery::new(LabelOffer::new(&wires));

        assert_eq!(delivery.request_label(1, true), Ok(wires[1].active(true)));
        assert_eq!(delivery.request_label(0, false), Ok(wires[0].active(false)));
        assert_eq!(
            delivery.request_label(1, false),
            Err(LabelDeliveryError::AlreadyDelivered(1))
        );
        assert_eq!(
            delivery.request_label(3, false),
            Err(LabelDeliveryError::UnknownInput { input: 3, len: 3 })
        );
    }
}
