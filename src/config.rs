use crate::error::{Error, Result};
use crate::kex::{self, KexAlgo};
use crate::pubkey::{self, PubkeyAlgo};

/// Configuration of the key exchange.
///
/// Lists the algorithms that the [`KexEngine`][crate::kex::KexEngine] is willing to use, in the
/// order of preference. The algorithm negotiation itself (comparing our lists with the lists from
/// the server `SSH_MSG_KEXINIT`) happens outside of this crate; the negotiated names are passed in
/// the [`ExchangeContext`][crate::kex::ExchangeContext] and resolved using
/// [`find_kex_algo()`][Self::find_kex_algo()] and
/// [`find_pubkey_algo()`][Self::find_pubkey_algo()].
///
/// You should start from the [default][Default] instance and modify it according to your needs.
/// You may also find the method [`KexConfig::with()`] syntactically convenient.
///
/// If you need compatibility with old SSH servers that use outdated crypto, you may use
/// [`KexConfig::default_compatible_less_secure()`]. However, this configuration is less secure.
///
/// This struct is `#[non_exhaustive]`, so we may add more fields without breaking backward
/// compatibility.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct KexConfig {
    /// Supported [key exchange algorithms][crate::kex].
    pub kex_algos: Vec<&'static KexAlgo>,

    /// Supported [server public key algorithms][crate::pubkey].
    pub server_pubkey_algos: Vec<&'static PubkeyAlgo>,
}

impl Default for KexConfig {
    fn default() -> Self {
        KexConfig {
            kex_algos: vec![
                &kex::DIFFIE_HELLMAN_GROUP14_SHA256,
                &kex::DIFFIE_HELLMAN_GROUP16_SHA512,
                &kex::DIFFIE_HELLMAN_GROUP18_SHA512,
            ],
            server_pubkey_algos: vec![
                &pubkey::SSH_ED25519,
                &pubkey::ECDSA_SHA2_NISTP256, &pubkey::ECDSA_SHA2_NISTP384,
                &pubkey::RSA_SHA2_256, &pubkey::RSA_SHA2_512,
            ],
        }
    }
}

impl KexConfig {
    /// Default configuration with higher compatibility and lower security.
    ///
    /// Returns a configuration that includes support for outdated and potentially insecure crypto,
    /// notably SHA-1 and the 1024-bit Oakley group 2. **Use at your own risk!**.
    pub fn default_compatible_less_secure() -> KexConfig {
        Self::default().with(|c| {
            c.kex_algos.extend_from_slice(&[
                &kex::DIFFIE_HELLMAN_GROUP14_SHA1,
                &kex::DIFFIE_HELLMAN_GROUP1_SHA1,
            ]);
            c.server_pubkey_algos.push(&pubkey::SSH_RSA_SHA1);
        })
    }

    /// Mutate `self` in a closure.
    ///
    /// This method applies your closure to `self` and returns the mutated configuration.
    pub fn with<F: FnOnce(&mut Self)>(mut self, f: F) -> Self {
        f(&mut self);
        self
    }

    /// Finds the key exchange algorithm with the given name.
    pub fn find_kex_algo(&self, name: &str) -> Result<&'static KexAlgo> {
        self.kex_algos.iter().copied()
            .find(|algo| algo.name == name)
            .ok_or_else(|| Error::UnknownAlgo { kind: "key exchange", name: name.into() })
    }

    /// Finds the server public key algorithm with the given name.
    pub fn find_pubkey_algo(&self, name: &str) -> Result<&'static PubkeyAlgo> {
        self.server_pubkey_algos.iter().copied()
            .find(|algo| algo.name == name)
            .ok_or_else(|| Error::UnknownAlgo { kind: "server public key", name: name.into() })
    }
}
