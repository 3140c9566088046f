//! A communication channel used to send/receive messages to/from the other party.

use std::{fmt, future::Future, time::Duration};

use tokio::{
    sync::mpsc::{Receiver, Sender, channel, error::SendError},
    time::timeout,
};
use tracing::debug;

use crate::{circuit::Party, message::ProtocolMessage, protocol};

/// Errors related to sending / receiving messages.
#[derive(Debug)]
pub struct Error {
    /// The protocol phase during which the error occurred.
    pub phase: String,
    /// The specific error that was raised.
    pub reason: ErrorKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} while {}", self.reason, self.phase)
    }
}

impl std::error::Error for Error {}

/// The specific error that occurred when trying to send / receive a message.
#[derive(Debug)]
pub enum ErrorKind {
    /// The (serialized) message could not be received over the channel.
    RecvError(String),
    /// The (serialized) message could not be sent over the channel.
    SendError(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RecvError(e) => write!(f, "could not receive message ({e})"),
            ErrorKind::SendError(e) => write!(f, "could not send message ({e})"),
        }
    }
}

/// A communication channel used to send/receive messages to/from the other party.
///
/// The channel is expected to be reliable, ordered and authenticated; timeouts and retries are
/// the responsibility of the implementation.
pub trait Channel {
    /// The error that can occur sending messages over the channel.
    type SendError: fmt::Debug;
    /// The error that can occur receiving messages over the channel.
    type RecvError: fmt::Debug;

    /// Sends a message to the other party.
    fn send_bytes(
        &mut self,
        msg: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::SendError>> + Send;

    /// Awaits the next message of the other party.
    fn recv_bytes(&mut self) -> impl Future<Output = Result<Vec<u8>, Self::RecvError>> + Send;
}

/// A wrapper around [`Channel`] that takes care of framing protocol messages.
#[derive(Debug)]
pub(crate) struct MsgChannel<'a, C: Channel>(pub &'a mut C);

impl<C: Channel> MsgChannel<'_, C> {
    /// Frames and sends a protocol message to the other party.
    pub(crate) async fn send(&mut self, role: Party, msg: &ProtocolMessage) -> Result<(), Error> {
        let round = msg.round();
        debug!(%role, round, bytes = msg.len(), "sending message");
        self.0.send_bytes(msg.to_bytes()).await.map_err(|e| Error {
            phase: format!("sending round {round} as {role}"),
            reason: ErrorKind::SendError(format!("{e:?}")),
        })
    }

    /// Receives and parses the next protocol message of the other party.
    pub(crate) async fn recv(
        &mut self,
        role: Party,
        round: u32,
    ) -> Result<ProtocolMessage, protocol::Error> {
        let bytes = self.0.recv_bytes().await.map_err(|e| Error {
            phase: format!("receiving round {round} as {role}"),
            reason: ErrorKind::RecvError(format!("{e:?}")),
        })?;
        debug!(%role, round, bytes = bytes.len(), "received message");
        Ok(ProtocolMessage::from_bytes(&bytes)?)
    }
}

/// A simple asynchronous channel using [`Sender`] and [`Receiver`].
#[derive(Debug)]
pub struct SimpleChannel {
    s: Sender<Vec<u8>>,
    r: Receiver<Vec<u8>>,
    timeout: Duration,
}

impl SimpleChannel {
    /// The receive timeout used by [`SimpleChannel::pair`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

    /// Creates two connected channels, one for each party.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Creates two connected channels, failing a `recv` after `timeout` without a message.
    pub fn pair_with_timeout(timeout: Duration) -> (Self, Self) {
        let buffer_capacity = 16;
        let (send_a_to_b, recv_a_to_b) = channel(buffer_capacity);
        let (send_b_to_a, recv_b_to_a) = channel(buffer_capacity);
        let a = SimpleChannel {
            s: send_a_to_b,
            r: recv_b_to_a,
            timeout,
        };
        let b = SimpleChannel {
            s: send_b_to_a,
            r: recv_a_to_b,
            timeout,
        };
        (a, b)
    }
}

#[derive(Debug)]
/// The error raised by `recv` calls of a [`SimpleChannel`].
pub enum AsyncRecvError {
    /// The channel has been closed.
    Closed,
    /// No message was received before the timeout.
    TimeoutElapsed,
}

impl Channel for SimpleChannel {
    type SendError = SendError<Vec<u8>>;
    type RecvError = AsyncRecvError;

    async fn send_bytes(&mut self, msg: Vec<u8>) -> Result<(), SendError<Vec<u8>>> {
        self.s.send(msg).await
    }

    async fn recv_bytes(&mut self) -> Result<Vec<u8>, AsyncRecvError> {
        match timeout(self.timeout, self.r.recv()).await {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(AsyncRecvError::Closed),
            Err(_) => Err(AsyncRecvError::TimeoutElapsed),
        }
    }
}
