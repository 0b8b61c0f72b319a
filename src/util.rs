use rand::{CryptoRng, RngCore};

// adapted from an unpublished version of `rng_core`
/// Cryptographically secure random generator that can be used as a trait object.
pub trait CryptoRngCore: CryptoRng + RngCore {}

impl<T: CryptoRng + RngCore> CryptoRngCore for T {}
