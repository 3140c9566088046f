//! Data types used across the garbler and evaluator roles.
//!
//! Labels, permute bits and tags are session-scoped. The secret halves ([`WireSecrets`]) do not
//! implement `Serialize` and never leave the garbler's session.

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Random 128-bit value standing for one of the two logical values of a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Label(pub(crate) u128);

/// A label together with its public color bit (`value ^ permute bit`), which selects garbled rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLabel {
    pub(crate) label: Label,
    pub(crate) color: bool,
}

/// Commitment to a label, published for both labels of every wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Tag(pub(crate) [u8; 16]);

impl Tag {
    /// Compares two tags in constant time.
    pub(crate) fn matches(&self, other: &Tag) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

/// Identifies a garbling session; tags are bound to it so they never carry over to another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SessionId(pub(crate) [u8; 16]);

impl SessionId {
    pub(crate) fn random(rng: &mut (impl Rng + CryptoRng)) -> Self {
        Self(rng.random())
    }
}

/// Both labels and the permute bit of a wire, known only to the garbler.
#[derive(Debug, Clone)]
pub(crate) struct WireSecrets {
    labels: [Label; 2],
    permute: bool,
}

impl WireSecrets {
    /// Samples two independent labels and a random permute bit.
    pub(crate) fn random(rng: &mut (impl Rng + CryptoRng)) -> Self {
        let zero = Label(rng.random());
        let mut one = Label(rng.random());
        while one == zero {
            one = Label(rng.random());
        }
        Self {
            labels: [zero, one],
            permute: rng.random(),
        }
    }

    /// Samples labels for a constant wire, whose color always equals its value.
    pub(crate) fn random_const(rng: &mut (impl Rng + CryptoRng)) -> Self {
        Self {
            permute: false,
            ..Self::random(rng)
        }
    }

    pub(crate) fn permute(&self) -> bool {
        self.permute
    }

    /// The label encoding `value`, with its color.
    pub(crate) fn active(&self, value: bool) -> ActiveLabel {
        ActiveLabel {
            label: self.labels[value as usize],
            color: value ^ self.permute,
        }
    }

    /// Decodes an active label back into the value it encodes, if it is one of the two labels.
    pub(crate) fn decode(&self, active: &ActiveLabel) -> Option<bool> {
        [false, true]
            .into_iter()
            .find(|value| self.active(*value) == *active)
    }
}

/// The opening of the commitment to the permute bit of an output wire, sent in the reveal round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RevealShare {
    pub(crate) permute: bool,
    pub(crate) nonce: [u8; 16],
}

impl RevealShare {
    pub(crate) fn new(permute: bool, rng: &mut (impl Rng + CryptoRng)) -> Self {
        Self {
            permute,
            nonce: rng.random(),
        }
    }
}

/// A garbled gate: 4 encrypted rows for binary gates, 2 for NOT gates, ordered by input colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GarbledGate(pub(crate) Vec<Vec<u8>>);

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn active_labels_decode() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let secrets = WireSecrets::random(&mut rng);
        for value in [false, true] {
            let active = secrets.active(value);
            assert_eq!(active.color, value ^ secrets.permute());
            assert_eq!(secrets.decode(&active), Some(value));
        }
        let forged = ActiveLabel {
            label: Label(secrets.active(true).label.0 ^ 1),
            color: secrets.active(true).color,
        };
        assert_eq!(secrets.decode(&forged), None);
    }

    #[test]
    fn const_wires_are_not_permuted() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..16 {
            let secrets = WireSecrets::random_const(&mut rng);
            assert!(secrets.active(true).color);
            assert!(!secrets.active(false).color);
        }
    }

    #[test]
    fn tags_compare() {
        let a = Tag([3; 16]);
        let mut b = a;
        assert!(a.matches(&b));
        b.0[15] ^= 1;
        assert!(!a.matches(&b));
    }
}
