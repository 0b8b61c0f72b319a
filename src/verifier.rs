//! Trust decisions about the server host key.
//!
//! The signature over the exchange hash proves that the server owns its host key, but only the
//! caller can decide whether this key belongs to the server that we wanted to connect to. This
//! decision is delegated to a [`HostKeyVerifier`]; storage of known keys and interactive prompts
//! are outside of this crate.
pub use crate::pubkey::fingerprint;

/// Decides whether the server host key is trusted.
///
/// The verifier is consulted after `SSH_MSG_KEXDH_REPLY` is received and before the signature
/// of the exchange hash is verified. If it returns `false`, the exchange aborts with
/// [`Error::PubkeyRejected`][crate::Error::PubkeyRejected] and `SSH_MSG_NEWKEYS` is never sent.
///
/// Closures `FnMut(&[u8]) -> bool` implement this trait.
pub trait HostKeyVerifier {
    /// Returns true if the host key `host_key_blob` (`K_S`, in SSH wire encoding) is trusted.
    fn approve(&mut self, host_key_blob: &[u8]) -> bool;
}

impl<F: FnMut(&[u8]) -> bool> HostKeyVerifier for F {
    fn approve(&mut self, host_key_blob: &[u8]) -> bool {
        self(host_key_blob)
    }
}

/// Verifier that trusts host keys with one of the given fingerprints.
///
/// The fingerprints are in the OpenSSH format `SHA256:<base64>` as computed by
/// [`fingerprint()`].
#[derive(Debug, Clone, Default)]
pub struct FingerprintVerifier {
    fingerprints: Vec<String>,
}

impl FingerprintVerifier {
    /// Creates a verifier that trusts the given fingerprints.
    pub fn new<I, S>(fingerprints: I) -> FingerprintVerifier
        where I: IntoIterator<Item = S>, S: Into<String>
    {
        FingerprintVerifier { fingerprints: fingerprints.into_iter().map(Into::into).collect() }
    }

    /// Adds a trusted fingerprint.
    pub fn add(&mut self, fingerprint: impl Into<String>) {
        self.fingerprints.push(fingerprint.into());
    }
}

impl HostKeyVerifier for FingerprintVerifier {
    fn approve(&mut self, host_key_blob: &[u8]) -> bool {
        let fingerprint = fingerprint(host_key_blob);
        let trusted = self.fingerprints.iter().any(|trusted| *trusted == fingerprint);
        if !trusted {
            log::debug!("host key with fingerprint {} is not trusted", fingerprint);
        }
        trusted
    }
}
