//! Public key algorithms.
//!
//! The server authenticates itself by signing the exchange hash with its host key. The
//! negotiated public key algorithm determines both the format of the host key and the signature
//! scheme. New algorithms are added by defining a new [`PubkeyAlgo`]; the
//! [`KexEngine`][crate::kex::KexEngine] only ever calls [`PubkeyAlgo::decode_pubkey()`] and
//! [`PubkeyAlgo::verify()`].
//!
//! # Supported algorithms
//!
//! - "ssh-ed25519" ([`SSH_ED25519`], uses [`Ed25519Pubkey`])
//! - "ecdsa-sha2-nistp256" ([`ECDSA_SHA2_NISTP256`], uses [`EcdsaPubkey`])
//! - "ecdsa-sha2-nistp384" ([`ECDSA_SHA2_NISTP384`], uses [`EcdsaPubkey`])
//! - "ssh-rsa" ([`SSH_RSA_SHA1`], uses [`RsaPubkey`])
//! - "rsa-sha2-256" ([`RSA_SHA2_256`], uses [`RsaPubkey`])
//! - "rsa-sha2-512" ([`RSA_SHA2_512`], uses [`RsaPubkey`])
use base64::Engine as _;
use bytes::Bytes;
use derivative::Derivative;
use std::fmt;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
pub use self::ecdsa::{ECDSA_SHA2_NISTP256, ECDSA_SHA2_NISTP384, EcdsaCurve, EcdsaPubkey};
pub use self::ed25519::{SSH_ED25519, Ed25519Pubkey};
pub use self::rsa::{SSH_RSA_SHA1, RSA_SHA2_256, RSA_SHA2_512, RsaPubkey};

mod ecdsa;
mod ed25519;
mod rsa;

/// Algorithm for public key cryptography.
///
/// See the [module documentation][self] for details.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PubkeyAlgo {
    /// Name of the algorithm.
    pub name: &'static str,
    /// Format of the keys used by this algorithm (the first `string` in the key blob).
    ///
    /// This is usually equal to [`name`][Self::name], but "rsa-sha2-256" and "rsa-sha2-512"
    /// use keys in the "ssh-rsa" format.
    pub key_format: &'static str,
    #[derivative(Debug = "ignore")]
    pub(crate) decode: fn(blob: &mut PacketDecode) -> Result<Pubkey>,
    #[derivative(Debug = "ignore")]
    pub(crate) verify: fn(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<bool>,
}

impl PubkeyAlgo {
    /// Decodes a host key blob that should be used with this algorithm.
    ///
    /// Fails with [`Error::HostKey`] if the blob is malformed or if its format does not match
    /// [`key_format`][Self::key_format].
    pub fn decode_pubkey(&self, blob: Bytes) -> Result<Pubkey> {
        let mut blob = PacketDecode::new(blob);
        let format = blob.get_string().map_err(host_key_error)?;
        if format != self.key_format {
            log::debug!("host key format {:?} does not match algorithm {:?}", format, self.name);
            return Err(Error::HostKey("host key format does not match the negotiated algorithm"))
        }
        (self.decode)(&mut blob).map_err(host_key_error)
    }

    /// Verifies the `signature` of `message` using `pubkey`.
    ///
    /// Returns `Ok(false)` if the signature does not match. Fails if the signature blob is
    /// malformed or uses a different algorithm, or if `pubkey` cannot be used with this
    /// algorithm.
    pub fn verify(&self, pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<bool> {
        (self.verify)(pubkey, message, signature)
    }
}

fn host_key_error(err: Error) -> Error {
    match err {
        Error::BufferUnderrun { .. } => Error::HostKey("host key blob is truncated"),
        Error::Decode(msg) => Error::HostKey(msg),
        err => err,
    }
}

/// Public key in one of supported formats.
///
/// This enum is marked as `#[non_exhaustive]`, so we might add new variants without breaking
/// backwards compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Pubkey {
    /// Ed25519 public key.
    Ed25519(Ed25519Pubkey),
    /// RSA public key.
    Rsa(RsaPubkey),
    /// ECDSA public key on a NIST curve.
    Ecdsa(EcdsaPubkey),
}

impl Pubkey {
    /// Decode a public key from SSH wire encoding.
    ///
    /// This is the encoding initially defined by RFC 4253. For keys other than RSA, the encoding
    /// is defined in the RFC that introduces the key type.
    pub fn decode(blob: Bytes) -> Result<Self> {
        let mut blob = PacketDecode::new(blob);
        let format = blob.get_string().map_err(host_key_error)?;
        let pubkey = match format.as_str() {
            "ssh-ed25519" => ed25519::decode_pubkey(&mut blob).map(Pubkey::Ed25519),
            "ssh-rsa" => rsa::decode_pubkey(&mut blob).map(Pubkey::Rsa),
            "ecdsa-sha2-nistp256" =>
                ecdsa::decode_pubkey(&mut blob, EcdsaCurve::NistP256).map(Pubkey::Ecdsa),
            "ecdsa-sha2-nistp384" =>
                ecdsa::decode_pubkey(&mut blob, EcdsaCurve::NistP384).map(Pubkey::Ecdsa),
            _ => {
                log::debug!("unknown pubkey format {:?}", format);
                return Err(Error::UnknownPubkeyFormat(format))
            },
        };
        pubkey.map_err(host_key_error)
    }

    /// Encode a public key into SSH encoding.
    ///
    /// This is the encoding initially defined by RFC 4253. For keys other than RSA, the encoding
    /// is defined in the RFC that introduces the key type.
    pub fn encode(&self) -> Bytes {
        let mut blob = PacketEncode::new();
        match self {
            Pubkey::Ed25519(pubkey) => ed25519::encode_pubkey(&mut blob, pubkey),
            Pubkey::Rsa(pubkey) => rsa::encode_pubkey(&mut blob, pubkey),
            Pubkey::Ecdsa(pubkey) => ecdsa::encode_pubkey(&mut blob, pubkey),
        }
        blob.finish()
    }

    /// Compute a fingerprint of the public key.
    ///
    /// The fingerprint is in the SHA-256 digest of the public key encoded with base64 (not padded
    /// with `=` characters) and prefixed with `SHA256:` (e.g.
    /// `"SHA256:eaBPG/rqx+IPa0Lc9KHypkG3UxjmUwerwq9CZ/xpPWM"`).
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.encode())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Pubkey::Ed25519(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::Rsa(pubkey) => fmt::Display::fmt(pubkey, f),
            Pubkey::Ecdsa(pubkey) => fmt::Display::fmt(pubkey, f),
        }
    }
}

/// Compute the fingerprint of a public key blob (see [`Pubkey::fingerprint()`]).
pub fn fingerprint(blob: &[u8]) -> String {
    use sha2::Digest as _;
    let digest = sha2::Sha256::digest(blob);
    format!("SHA256:{}", base64::engine::general_purpose::STANDARD_NO_PAD.encode(digest))
}
