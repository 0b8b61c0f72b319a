use std::fmt;

/// Hash function used by a key exchange algorithm.
///
/// The hash is used to compute the exchange hash `H` (and, outside of this crate, to derive the
/// symmetric keys from `H` and the shared secret).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HashAlgo {
    /// SHA-1 (20 bytes of output).
    Sha1,
    /// SHA-256 (32 bytes of output).
    Sha256,
    /// SHA-512 (64 bytes of output).
    Sha512,
}

impl HashAlgo {
    /// Name of the hash function.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgo::Sha1 => "sha1",
            HashAlgo::Sha256 => "sha256",
            HashAlgo::Sha512 => "sha512",
        }
    }

    /// Length of the digest in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha256 => 32,
            HashAlgo::Sha512 => 64,
        }
    }

    /// Computes the digest of `data`.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgo::Sha1 => {
                use sha1::digest::Digest as _;
                sha1::Sha1::digest(data).to_vec()
            },
            HashAlgo::Sha256 => {
                use sha2::digest::Digest as _;
                sha2::Sha256::digest(data).to_vec()
            },
            HashAlgo::Sha512 => {
                use sha2::digest::Digest as _;
                sha2::Sha512::digest(data).to_vec()
            },
        }
    }
}

impl fmt::Display for HashAlgo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
