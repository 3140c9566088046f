//! Secure 2-party computation of a [`Circuit`] with communication via channels.
//!
//! The garbler and the evaluator are explicit state machines ([`GarblerSession`] and
//! [`EvaluatorSession`]) that consume one inbound [`ProtocolMessage`] per call to
//! [`Session::advance`] and produce at most one outbound message. They can be driven in
//! lock-step within one process or over any [`Channel`] using [`run_garbler`] and
//! [`run_evaluator`].
//!
//! The protocol consists of three rounds:
//!
//! 1. The garbler sends the garbled tables, the tags of all labels and the labels of its own
//!    inputs. The evaluator obtains the labels of its inputs via [`LabelDelivery`].
//! 2. The evaluator checks and evaluates the garbled circuit and acknowledges it, returning its
//!    output labels if the garbler is allowed to learn the output.
//! 3. The garbler opens its commitments to the permute bits of the output wires, which decode
//!    the evaluator's output labels.
//!
//! Any failed check moves a session to [`Phase::Failed`]. A failed session cannot be resumed,
//! a new session with fresh randomness must be started.

use std::fmt;

use futures::future::try_join;
use tracing::{debug, warn};

use crate::{
    channel::{self, Channel, MsgChannel, SimpleChannel},
    circuit::{Circuit, CircuitError, Party, WireId},
    message::Payload,
    ot::{IdealLabelDelivery, LabelDelivery, LabelDeliveryError},
};

pub use crate::{
    evaluator::EvaluatorSession, garble::Error as GarblingError, garbler::GarblerSession,
    message::ProtocolMessage,
};

/// Errors caused by messages that do not fit the protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The message could not be parsed or does not have the expected structure.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// The message belongs to a different round than the one the session expects.
    #[error("expected a message of round {expected}, but received round {actual}")]
    OutOfOrderRound {
        /// The round expected by the session.
        expected: u32,
        /// The round of the received message.
        actual: u32,
    },
    /// The peer aborted the session.
    #[error("the session was aborted by the peer: {0}")]
    Aborted(String),
    /// The session is already complete or has failed.
    #[error("the session has already terminated")]
    SessionTerminated,
}

/// Failed verification of labels, tags or garbled tables, caused by a malicious peer or a
/// corrupted channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    /// The digest over the garbled material does not match its content.
    #[error("the digest of the garbled material does not match")]
    MaterialDigest,
    /// An input label does not match the tags of its wire.
    #[error("the label of input wire {0} does not match its tag")]
    InvalidInputLabel(WireId),
    /// The label of a constant wire is invalid or encodes the wrong value.
    #[error("the label of constant wire {0} is invalid")]
    InvalidConstant(WireId),
    /// The table row selected by the input labels could not be decrypted.
    #[error("the garbled row of gate {0} could not be decrypted")]
    GateDecryption(WireId),
    /// The output label recovered from a gate does not match the tags of its wire.
    #[error("the output label of gate {0} does not match its tag")]
    InvalidLabelTag(WireId),
    /// An output label returned by the evaluator is neither of the two labels of the wire.
    #[error("the evaluator returned an invalid label for output wire {0}")]
    InvalidOutputLabel(WireId),
    /// A reveal share does not open the commitment published with the garbled material.
    #[error("the reveal share of output wire {0} does not match its commitment")]
    InvalidRevealShare(WireId),
}

/// A custom error type for all protocol-time failures.
#[derive(Debug)]
pub enum Error {
    /// A message could not be sent or received.
    ChannelError(channel::Error),
    /// The specified circuit is invalid or the inputs do not match it.
    CircuitError(CircuitError),
    /// A table row could not be encrypted.
    GarblingError(GarblingError),
    /// A message violated the protocol.
    ProtocolError(ProtocolError),
    /// A label, tag or garbled table failed verification.
    AuthenticationError(AuthenticationError),
    /// The label of an evaluator input could not be obtained.
    LabelDeliveryError(LabelDeliveryError),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChannelError(e) => write!(f, "Channel error: {e}"),
            Error::CircuitError(e) => write!(f, "Circuit error: {e}"),
            Error::GarblingError(e) => write!(f, "Garbling error: {e}"),
            Error::ProtocolError(e) => write!(f, "Protocol error: {e}"),
            Error::AuthenticationError(e) => write!(f, "Authentication error: {e}"),
            Error::LabelDeliveryError(e) => write!(f, "Label delivery error: {e}"),
        }
    }
}

impl From<channel::Error> for Error {
    fn from(e: channel::Error) -> Self {
        Self::ChannelError(e)
    }
}

impl From<CircuitError> for Error {
    fn from(e: CircuitError) -> Self {
        Self::CircuitError(e)
    }
}

impl From<GarblingError> for Error {
    fn from(e: GarblingError) -> Self {
        Self::GarblingError(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::ProtocolError(e)
    }
}

impl From<AuthenticationError> for Error {
    fn from(e: AuthenticationError) -> Self {
        Self::AuthenticationError(e)
    }
}

impl From<LabelDeliveryError> for Error {
    fn from(e: LabelDeliveryError) -> Self {
        Self::LabelDeliveryError(e)
    }
}

/// The observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first message of the peer.
    Init,
    /// Waiting for the message of the given round.
    Exchanging {
        /// The round expected next.
        round: u32,
    },
    /// Waiting for the reveal shares of the output wires.
    Revealing,
    /// The session has finished successfully.
    Complete,
    /// The session has failed and cannot be resumed.
    Failed,
}

impl Phase {
    /// Whether the session has completed or failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

/// A role of the protocol, advanced one inbound message at a time.
pub trait Session {
    /// The role played by this session.
    fn role(&self) -> Party;

    /// The current phase.
    fn phase(&self) -> Phase;

    /// The round of the next inbound message, `None` if the session has terminated.
    fn round(&self) -> Option<u32>;

    /// Consumes the next message of the peer and returns the reply, if any.
    ///
    /// Any error moves the session to [`Phase::Failed`]. Advancing a terminated session fails
    /// with [`ProtocolError::SessionTerminated`] and leaves it unchanged.
    fn advance(&mut self, msg: &ProtocolMessage) -> Result<Option<ProtocolMessage>, Error>;

    /// Fails the session, returning an abort message for the peer (unless already terminated).
    fn abort(&mut self, reason: &str) -> Option<ProtocolMessage>;
}

/// Checks the round of an inbound message and decodes it, giving precedence to aborts.
pub(crate) fn expect_round(msg: &ProtocolMessage, expected: u32) -> Result<Payload, Error> {
    let payload = msg.decode();
    if let Ok(Payload::Abort(reason)) = &payload {
        return Err(ProtocolError::Aborted(reason.clone()).into());
    }
    if msg.round() != expected {
        return Err(ProtocolError::OutOfOrderRound {
            expected,
            actual: msg.round(),
        }
        .into());
    }
    Ok(payload?)
}

/// Logs the failure of a session.
pub(crate) fn log_failure(role: Party, e: &Error) {
    warn!(%role, error = %e, "session failed");
}

/// Starts a garbling session, returning it together with the first message for the evaluator.
pub fn start_garbler(
    circuit: Circuit,
    inputs: &[bool],
) -> Result<(GarblerSession, ProtocolMessage), Error> {
    GarblerSession::start(circuit, inputs, &mut rand::rng())
}

/// Like [`start_garbler`], but draws all labels, permute bits and the session id from `rng`.
pub fn start_garbler_with_rng(
    circuit: Circuit,
    inputs: &[bool],
    rng: &mut (impl rand::Rng + rand::CryptoRng),
) -> Result<(GarblerSession, ProtocolMessage), Error> {
    GarblerSession::start(circuit, inputs, rng)
}

/// Starts an evaluation session that obtains its input labels from `delivery`.
pub fn start_evaluator<D: LabelDelivery>(
    circuit: Circuit,
    inputs: &[bool],
    delivery: D,
) -> Result<EvaluatorSession<D>, Error> {
    EvaluatorSession::start(circuit, inputs, delivery)
}

/// Drives a garbling session over the channel until it terminates.
///
/// Returns the output if the circuit reveals it to the garbler.
pub async fn run_garbler(
    channel: &mut impl Channel,
    session: &mut GarblerSession,
    first: ProtocolMessage,
) -> Result<Option<Vec<bool>>, Error> {
    drive(channel, session, Some(first)).await?;
    Ok(session.output().map(|output| output.to_vec()))
}

/// Drives an evaluation session over the channel until it terminates, returning the output.
pub async fn run_evaluator<D: LabelDelivery>(
    channel: &mut impl Channel,
    session: &mut EvaluatorSession<D>,
) -> Result<Vec<bool>, Error> {
    drive(channel, session, None).await?;
    session
        .output()
        .map(|output| output.to_vec())
        .ok_or_else(|| ProtocolError::SessionTerminated.into())
}

async fn drive<C: Channel>(
    channel: &mut C,
    session: &mut impl Session,
    first: Option<ProtocolMessage>,
) -> Result<(), Error> {
    let role = session.role();
    let mut channel = MsgChannel(channel);
    if let Some(msg) = first {
        channel.send(role, &msg).await?;
    }
    while !session.phase().is_terminal() {
        let round = session.round().ok_or(ProtocolError::SessionTerminated)?;
        let msg = match channel.recv(role, round).await {
            Ok(msg) => msg,
            Err(e) => {
                if let Some(abort) = session.abort(&e.to_string()) {
                    let _ = channel.send(role, &abort).await;
                }
                return Err(e);
            }
        };
        match session.advance(&msg) {
            Ok(Some(reply)) => channel.send(role, &reply).await?,
            Ok(None) => {}
            Err(e) => {
                if !matches!(e, Error::ProtocolError(ProtocolError::Aborted(_))) {
                    // best effort, the peer might already be gone
                    let abort = ProtocolMessage::abort(round, e.to_string());
                    let _ = channel.send(role, &abort).await;
                }
                return Err(e);
            }
        }
    }
    debug!(%role, "session terminated");
    Ok(())
}

/// Simulates both roles in-process, connected by a [`SimpleChannel`] and an
/// [`IdealLabelDelivery`].
///
/// Returns the output of the garbler (if revealed to it) and the output of the evaluator.
pub async fn simulate(
    circuit: &Circuit,
    garbler_inputs: &[bool],
    evaluator_inputs: &[bool],
) -> Result<(Option<Vec<bool>>, Vec<bool>), Error> {
    let (mut garbler, first) = start_garbler(circuit.clone(), garbler_inputs)?;
    let offer = garbler
        .label_offer()
        .ok_or(ProtocolError::SessionTerminated)?;
    let mut evaluator = start_evaluator(
        circuit.clone(),
        evaluator_inputs,
        IdealLabelDelivery::new(offer),
    )?;
    let (mut garbler_channel, mut evaluator_channel) = SimpleChannel::pair();
    try_join(
        run_garbler(&mut garbler_channel, &mut garbler, first),
        run_evaluator(&mut evaluator_channel, &mut evaluator),
    )
    .await
}
