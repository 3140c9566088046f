//! Self-describing protocol messages exchanged between the garbler and the evaluator.
//!
//! A message is framed as `[round: u32 BE][length: u32 BE][payload]`, the payload being the
//! bincode encoding of the round's content.

use serde::{Deserialize, Serialize};

use crate::{
    data_types::{ActiveLabel, GarbledGate, RevealShare, SessionId, Tag},
    garble,
    protocol::ProtocolError,
};

/// Garbled tables and labels, sent by the garbler.
pub(crate) const ROUND_GARBLED: u32 = 0;
/// Output labels (or an empty acknowledgement), sent by the evaluator.
pub(crate) const ROUND_EVALUATED: u32 = 1;
/// Openings of the committed permute bits of the output wires, sent by the garbler.
pub(crate) const ROUND_REVEAL: u32 = 2;

const HEADER_LEN: usize = 8;

/// A single round message, as sent over a [`crate::channel::Channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    round: u32,
    payload: Vec<u8>,
}

impl ProtocolMessage {
    /// The round this message belongs to.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The length of the payload in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Frames the message as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len());
        bytes.extend(self.round.to_be_bytes());
        bytes.extend((self.payload.len() as u32).to_be_bytes());
        bytes.extend(&self.payload);
        bytes
    }

    /// Parses a framed message, failing if the length prefix does not match the frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::MalformedMessage(format!(
                "frame of {} bytes is shorter than its header",
                bytes.len()
            )));
        }
        let round = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != len {
            return Err(ProtocolError::MalformedMessage(format!(
                "length prefix {len} does not match a payload of {} bytes",
                payload.len()
            )));
        }
        Ok(Self {
            round,
            payload: payload.to_vec(),
        })
    }

    pub(crate) fn encode(round: u32, payload: &Payload) -> Result<Self, ProtocolError> {
        let payload = bincode::serialize(payload)
            .map_err(|e| ProtocolError::MalformedMessage(format!("{e:?}")))?;
        Ok(Self { round, payload })
    }

    pub(crate) fn decode(&self) -> Result<Payload, ProtocolError> {
        bincode::deserialize(&self.payload)
            .map_err(|e| ProtocolError::MalformedMessage(format!("{e:?}")))
    }

    /// An abort message for the given round, telling the peer to stop.
    pub fn abort(round: u32, reason: impl Into<String>) -> Self {
        let payload = Payload::Abort(reason.into());
        // an enum holding a string always serializes
        let payload = bincode::serialize(&payload).unwrap_or_default();
        Self { round, payload }
    }

    /// Whether this is an abort message, returning the reason if so.
    pub fn abort_reason(&self) -> Option<String> {
        match self.decode() {
            Ok(Payload::Abort(reason)) => Some(reason),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }
}

/// The content of a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Payload {
    Garbled(GarbledMaterial),
    OutputLabels(Vec<ActiveLabel>),
    RevealShares(Vec<RevealShare>),
    Abort(String),
}

/// The serialized [`MaterialBody`] together with its digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GarbledMaterial {
    pub(crate) body: Vec<u8>,
    pub(crate) digest: [u8; 32],
}

impl GarbledMaterial {
    pub(crate) fn seal(body: &MaterialBody) -> Result<Self, ProtocolError> {
        let body = bincode::serialize(body)
            .map_err(|e| ProtocolError::MalformedMessage(format!("{e:?}")))?;
        let digest = garble::digest(&body);
        Ok(Self { body, digest })
    }
}

/// Everything the evaluator needs to evaluate the circuit, except its own input labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MaterialBody {
    pub(crate) session: SessionId,
    /// One table per gate, in topological order.
    pub(crate) tables: Vec<GarbledGate>,
    /// Tags of both labels of every wire, indexed by color.
    pub(crate) tags: Vec<[Tag; 2]>,
    /// Active labels of the garbler's inputs, in input order.
    pub(crate) garbler_inputs: Vec<ActiveLabel>,
    /// Active labels of the constant wires, in topological order.
    pub(crate) consts: Vec<ActiveLabel>,
    /// Commitments to the reveal shares, in output order.
    pub(crate) reveal_commitments: Vec<Tag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing() {
        let share = RevealShare {
            permute: true,
            nonce: [9; 16],
        };
        let msg = ProtocolMessage::encode(ROUND_REVEAL, &Payload::RevealShares(vec![share]))
            .unwrap();
        let bytes = msg.to_bytes();
        assert_eq!(&bytes[..4], &ROUND_REVEAL.to_be_bytes());
        assert_eq!(&bytes[4..8], &(msg.len() as u32).to_be_bytes());
        assert_eq!(ProtocolMessage::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn rejects_bad_frames() {
        let msg = ProtocolMessage::encode(ROUND_EVALUATED, &Payload::OutputLabels(vec![])).unwrap();
        let bytes = msg.to_bytes();
        assert!(matches!(
            ProtocolMessage::from_bytes(&bytes[..5]),
            Err(ProtocolError::MalformedMessage(_))
        ));
        assert!(matches!(
            ProtocolMessage::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ProtocolError::MalformedMessage(_))
        ));
        let mut longer = bytes.clone();
        longer.push(0);
        assert!(matches!(
            ProtocolMessage::from_bytes(&longer),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }

    #[test]
    fn abort_messages() {
        let msg = ProtocolMessage::abort(1, "bye");
        assert_eq!(msg.round(), 1);
        assert_eq!(msg.abort_reason().as_deref(), Some("bye"));
        let other = ProtocolMessage::encode(1, &Payload::RevealShares(vec![])).unwrap();
        assert_eq!(other.abort_reason(), None);
    }
}
