//! Key exchange algorithms.
//!
//! The key exchange (kex) establishes a shared secret between the client and the server and
//! computes the exchange hash, which the server signs with its host key. The exchange hash of the
//! first key exchange is used as the session identifier, and together with the shared secret it
//! is used to derive the one-time keys for message encryption and authentication (which is not
//! done by this crate).
//!
//! All Diffie-Hellman algorithms share a single [`KexEngine`], they differ only in the
//! [`DhGroup`] and the [`HashAlgo`] that make up the [`KexAlgo`].
//!
//! # Supported algorithms
//!
//! - "diffie-hellman-group1-sha1" ([`DIFFIE_HELLMAN_GROUP1_SHA1`])
//! - "diffie-hellman-group14-sha1" ([`DIFFIE_HELLMAN_GROUP14_SHA1`])
//! - "diffie-hellman-group14-sha256" ([`DIFFIE_HELLMAN_GROUP14_SHA256`])
//! - "diffie-hellman-group16-sha512" ([`DIFFIE_HELLMAN_GROUP16_SHA512`])
//! - "diffie-hellman-group18-sha512" ([`DIFFIE_HELLMAN_GROUP18_SHA512`])
use bytes::Bytes;
use derivative::Derivative;
use zeroize::Zeroizing;
use crate::pubkey::Pubkey;
pub use self::dh::{DhGroup, DhKeypair};
pub use self::dh::{
    DIFFIE_HELLMAN_GROUP1_SHA1, DIFFIE_HELLMAN_GROUP14_SHA1, DIFFIE_HELLMAN_GROUP14_SHA256,
    DIFFIE_HELLMAN_GROUP16_SHA512, DIFFIE_HELLMAN_GROUP18_SHA512,
};
pub use self::engine::{KexEngine, KexState};
pub use self::hash::HashAlgo;

mod dh;
mod engine;
mod hash;

/// Algorithm for key exchange.
///
/// See the [module documentation][self] for details.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct KexAlgo {
    /// Name of the algorithm.
    pub name: &'static str,
    /// Creates the Diffie-Hellman group used by the algorithm.
    #[derivative(Debug = "ignore")]
    pub make_group: fn() -> DhGroup,
    /// Hash function used to compute the exchange hash.
    pub hash_algo: HashAlgo,
}

/// Inputs of a single key exchange, supplied by the caller.
///
/// The identification strings and the `SSH_MSG_KEXINIT` payloads come from the algorithm
/// negotiation that precedes the key exchange; they are hashed into the exchange hash.
#[derive(Debug, Clone, Default)]
pub struct ExchangeContext {
    /// Our identification string (`V_C`), without the trailing CR LF.
    pub client_ident: Bytes,
    /// Server identification string (`V_S`), without the trailing CR LF.
    pub server_ident: Bytes,
    /// Payload of our `SSH_MSG_KEXINIT` (`I_C`).
    pub client_kex_init: Bytes,
    /// Payload of the server's `SSH_MSG_KEXINIT` (`I_S`).
    pub server_kex_init: Bytes,
    /// Name of the negotiated key exchange algorithm.
    pub kex_algo: String,
    /// Name of the negotiated server host key algorithm.
    pub server_pubkey_algo: String,
    /// Size of the private exponent in bytes.
    ///
    /// This is usually derived from the key sizes of the negotiated ciphers and MACs.
    pub need_bytes: usize,
    /// Session identifier from the first key exchange on this connection, if this is a
    /// re-exchange.
    pub session_id: Option<Bytes>,
}

/// Result of a successful key exchange.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ExchangeResult {
    /// Session identifier: [`ExchangeContext::session_id`] if it was given, otherwise the
    /// exchange hash of this key exchange.
    pub session_id: Bytes,
    /// Exchange hash `H` of this key exchange.
    pub exchange_hash: Bytes,
    /// Server host key, verified by the signature of the exchange hash.
    pub server_pubkey: Pubkey,
    /// Server host key as received from the server (`K_S`).
    pub server_pubkey_blob: Bytes,
    /// Shared secret `K` as unsigned big endian number.
    #[derivative(Debug = "ignore")]
    pub shared_secret_be: Zeroizing<Vec<u8>>,
    /// Hash function of the key exchange algorithm.
    pub hash_algo: HashAlgo,
}
