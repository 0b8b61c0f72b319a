//! Client side of the SSH Diffie-Hellman key exchange in pure Rust.
//!
//! This crate implements the key exchange from RFC 4253, section 8: the client sends its
//! ephemeral Diffie-Hellman value in `SSH_MSG_KEXDH_INIT`, the server answers with its host key,
//! its own ephemeral value and a signature of the exchange hash in `SSH_MSG_KEXDH_REPLY`, and
//! after both sides exchange `SSH_MSG_NEWKEYS`, the caller receives the shared secret, the
//! exchange hash and the session identifier.
//!
//! - The state machine is the [`KexEngine`][kex::KexEngine]. It performs no I/O.
//! - The engine is driven over a blocking [`Transport`] by [`run_kex()`] (or
//! [`exchange_keys()`]), and over an [`AsyncTransport`] by [`run_kex_async()`] (or
//! [`exchange_keys_async()`]).
//! - The caller decides whether the server host key is trusted using a
//! [`HostKeyVerifier`][verifier::HostKeyVerifier].
//! - Supported algorithms are listed in the [`kex`] and [`pubkey`] modules and selected by
//! [`KexConfig`].
//!
//! Algorithm negotiation (`SSH_MSG_KEXINIT`), the binary packet protocol and the derivation of
//! encryption keys from the result are not part of this crate.
#![allow(clippy::collapsible_if)]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]

pub use crate::codec::{PacketEncode, PacketDecode};
pub use crate::config::KexConfig;
pub use crate::error::{Result, Error};
pub use crate::exchange::{exchange_keys, exchange_keys_async, run_kex, run_kex_async};
pub use crate::transport::{Transport, AsyncTransport, ChannelTransport};
pub use crate::util::CryptoRngCore;

pub use self::kex::{KexAlgo, ExchangeContext, ExchangeResult};
pub use self::pubkey::{PubkeyAlgo, Pubkey};

pub use bytes;
pub use ed25519_dalek;
pub use num_bigint_dig;
pub use p256;
pub use p384;
pub use rsa;

mod codec;
pub mod codes;
mod config;
mod error;
mod exchange;
pub mod kex;
pub mod pubkey;
mod transport;
mod util;
pub mod verifier;
