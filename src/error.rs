use crate::codes::disconnect;

/// Result type for our [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Error that occured during the key exchange.
///
/// Every error is fatal to the exchange: the [`KexEngine`][crate::kex::KexEngine] moves to the
/// aborted state and never retries internally. Errors fall into a few categories that the caller
/// should distinguish (see [`Error::disconnect_reason()`]): protocol and decoding errors, an
/// invalid Diffie-Hellman value from the peer, a host key that was not trusted, a signature that
/// did not verify, and failures of the underlying channel.
///
/// This enum is `#[non_exhaustive]`, so we reserve the right to add more variants and don't
/// consider this to break backwards compatibility.
#[derive(thiserror::Error, Debug)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Error {
    #[error("cryptography error: {0}")]
    Crypto(&'static str),
    #[error("randomness error: {0}")]
    Random(&'static str),
    #[error("protocol error: {0}")]
    Protocol(&'static str),
    #[error("expected {expected}, received message {received}")]
    UnexpectedMessage { expected: &'static str, received: u8 },
    #[error("unexpected end of buffer (needed {needed} bytes, {remaining} remaining)")]
    BufferUnderrun { needed: usize, remaining: usize },
    #[error("could not decode bytes: {0}")]
    Decode(&'static str),
    #[error("malformed host key: {0}")]
    HostKey(&'static str),
    #[error("unknown public key format {0:?}")]
    UnknownPubkeyFormat(String),
    #[error("{kind} algorithm {name:?} is not supported")]
    UnknownAlgo { kind: &'static str, name: String },
    #[error("server sent invalid Diffie-Hellman public value")]
    PeerValue,
    #[error("server host key was not accepted")]
    PubkeyRejected,
    #[error("signature verification failed")]
    Signature,
    #[error("channel is closed")]
    ChannelClosed,
    #[error("timed out while waiting for a message")]
    Timeout,
}

impl Error {
    /// Reason code that the caller should use when disconnecting after this error.
    ///
    /// The codes are described in RFC 4253, section 11.1 (see
    /// [`codes::disconnect`][crate::codes::disconnect]). Returns `None` for errors of the
    /// channel itself, when there is nobody left to send the disconnect message to.
    pub fn disconnect_reason(&self) -> Option<u32> {
        match self {
            Error::Protocol(_) | Error::UnexpectedMessage { .. } |
            Error::BufferUnderrun { .. } | Error::Decode(_) =>
                Some(disconnect::PROTOCOL_ERROR),
            Error::HostKey(_) | Error::UnknownPubkeyFormat(_) |
            Error::PubkeyRejected | Error::Signature =>
                Some(disconnect::HOST_KEY_NOT_VERIFIABLE),
            Error::Crypto(_) | Error::Random(_) | Error::UnknownAlgo { .. } | Error::PeerValue =>
                Some(disconnect::KEY_EXCHANGE_FAILED),
            Error::ChannelClosed | Error::Timeout => None,
        }
    }
}
