use bytes::Bytes;
use rsa::traits::PublicKeyParts as _;
use std::fmt;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{PubkeyAlgo, Pubkey};

/// "ssh-rsa" public key algorithm using SHA-1 from RFC 4253.
///
/// This algorithm is compatible with [`RsaPubkey`].
pub static SSH_RSA_SHA1: PubkeyAlgo = PubkeyAlgo {
    name: "ssh-rsa",
    key_format: "ssh-rsa",
    decode: |blob| decode_pubkey(blob).map(Pubkey::Rsa),
    verify: verify_sha1,
};

/// "rsa-sha2-256" public key algorithm using SHA-256 from RFC 8332.
///
/// This algorithm is compatible with [`RsaPubkey`].
pub static RSA_SHA2_256: PubkeyAlgo = PubkeyAlgo {
    name: "rsa-sha2-256",
    key_format: "ssh-rsa",
    decode: |blob| decode_pubkey(blob).map(Pubkey::Rsa),
    verify: verify_sha2_256,
};

/// "rsa-sha2-512" public key algorithm using SHA-512 from RFC 8332.
///
/// This algorithm is compatible with [`RsaPubkey`].
pub static RSA_SHA2_512: PubkeyAlgo = PubkeyAlgo {
    name: "rsa-sha2-512",
    key_format: "ssh-rsa",
    decode: |blob| decode_pubkey(blob).map(Pubkey::Rsa),
    verify: verify_sha2_512,
};

/// RSA public key.
///
/// This key is compatible with [`SSH_RSA_SHA1`], [`RSA_SHA2_256`] and [`RSA_SHA2_512`]. You can
/// convert it to and from [`rsa::RsaPublicKey`] using `from()`/`into()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPubkey {
    pub(crate) pubkey: rsa::RsaPublicKey,
}

fn verify_sha1(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<bool> {
    use sha1::Digest as _;
    let hashed = sha1::Sha1::digest(message);
    let scheme = rsa::Pkcs1v15Sign::new::<sha1::Sha1>();
    verify(pubkey, "ssh-rsa", scheme, &hashed, signature)
}

fn verify_sha2_256(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<bool> {
    use sha2::Digest as _;
    let hashed = sha2::Sha256::digest(message);
    let scheme = rsa::Pkcs1v15Sign::new::<sha2::Sha256>();
    verify(pubkey, "rsa-sha2-256", scheme, &hashed, signature)
}

fn verify_sha2_512(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<bool> {
    use sha2::Digest as _;
    let hashed = sha2::Sha512::digest(message);
    let scheme = rsa::Pkcs1v15Sign::new::<sha2::Sha512>();
    verify(pubkey, "rsa-sha2-512", scheme, &hashed, signature)
}

fn verify(
    pubkey: &Pubkey,
    algo_name: &str,
    scheme: rsa::Pkcs1v15Sign,
    hashed: &[u8],
    signature: Bytes,
) -> Result<bool> {
    let Pubkey::Rsa(pubkey) = pubkey else {
        return Err(Error::HostKey("expected an RSA host key"))
    };

    let mut signature = PacketDecode::new(signature);
    if signature.get_string()? != algo_name {
        return Err(Error::Decode("unexpected signature format"))
    }
    let signature_data = signature.get_bytes()?;

    // some servers strip leading zero bytes from the signature
    let size = pubkey.pubkey.size();
    if signature_data.len() > size {
        return Err(Error::Decode("RSA signature is longer than the modulus"))
    }
    let mut padded = vec![0; size];
    padded[size - signature_data.len()..].copy_from_slice(&signature_data);

    Ok(pubkey.pubkey.verify(scheme, hashed, &padded).is_ok())
}

pub(super) fn encode_pubkey(blob: &mut PacketEncode, pubkey: &RsaPubkey) {
    blob.put_str("ssh-rsa");
    blob.put_biguint(pubkey.pubkey.e());
    blob.put_biguint(pubkey.pubkey.n());
}

pub(super) fn decode_pubkey(blob: &mut PacketDecode) -> Result<RsaPubkey> {
    let e = blob.get_biguint()?;
    let n = blob.get_biguint()?;
    let pubkey = rsa::RsaPublicKey::new(n, e)
        .map_err(|_| Error::HostKey("decoded ssh-rsa pubkey is invalid"))?;
    Ok(RsaPubkey { pubkey })
}

impl From<rsa::RsaPublicKey> for RsaPubkey {
    fn from(pubkey: rsa::RsaPublicKey) -> Self { Self { pubkey } }
}

impl From<RsaPubkey> for rsa::RsaPublicKey {
    fn from(pubkey: RsaPubkey) -> Self { pubkey.pubkey }
}

impl fmt::Display for RsaPubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rsa n {:x}, e {}", self.pubkey.n(), self.pubkey.e())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha8Rng;
    use super::*;

    fn keypair() -> rsa::RsaPrivateKey {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap()
    }

    fn sign(privkey: &rsa::RsaPrivateKey, algo_name: &str, message: &[u8]) -> Bytes {
        use sha2::Digest as _;
        let signature_data = match algo_name {
            "ssh-rsa" => privkey.sign(rsa::Pkcs1v15Sign::new::<sha1::Sha1>(),
                &sha1::Sha1::digest(message)),
            "rsa-sha2-256" => privkey.sign(rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
                &sha2::Sha256::digest(message)),
            "rsa-sha2-512" => privkey.sign(rsa::Pkcs1v15Sign::new::<sha2::Sha512>(),
                &sha2::Sha512::digest(message)),
            _ => unreachable!(),
        }.unwrap();

        let mut signature = PacketEncode::new();
        signature.put_str(algo_name);
        signature.put_bytes(&signature_data);
        signature.finish()
    }

    #[test]
    fn test_verify_all_algos() {
        let privkey = keypair();
        let pubkey = Pubkey::Rsa(RsaPubkey::from(privkey.to_public_key()));

        for algo in [&SSH_RSA_SHA1, &RSA_SHA2_256, &RSA_SHA2_512] {
            let signature = sign(&privkey, algo.name, b"exchange hash");
            assert!(algo.verify(&pubkey, b"exchange hash", signature.clone()).unwrap());
            assert!(!algo.verify(&pubkey, b"other hash", signature).unwrap());
        }
    }

    #[test]
    fn test_verify_wrong_signature_algo() {
        let privkey = keypair();
        let pubkey = Pubkey::Rsa(RsaPubkey::from(privkey.to_public_key()));
        let signature = sign(&privkey, "ssh-rsa", b"exchange hash");
        assert!(matches!(RSA_SHA2_256.verify(&pubkey, b"exchange hash", signature),
            Err(Error::Decode(_))));
    }

    #[test]
    fn test_verify_signature_without_leading_zero() {
        let privkey = keypair();
        let pubkey = Pubkey::Rsa(RsaPubkey::from(privkey.to_public_key()));

        let (message, signature) = (0u32..4096)
            .map(|i| format!("exchange hash {}", i).into_bytes())
            .map(|message| {
                let signature = sign(&privkey, "ssh-rsa", &message);
                (message, signature)
            })
            .find(|(_, signature)| signature[15] == 0)
            .expect("no signature with a leading zero byte");

        let mut decode = PacketDecode::new(signature);
        let algo_name = decode.get_string().unwrap();
        let signature_data = decode.get_bytes().unwrap();
        assert_eq!(signature_data.len(), 128);

        let mut stripped = PacketEncode::new();
        stripped.put_str(&algo_name);
        stripped.put_bytes(&signature_data[1..]);
        assert!(SSH_RSA_SHA1.verify(&pubkey, &message, stripped.finish()).unwrap());

        let mut too_long = PacketEncode::new();
        too_long.put_str(&algo_name);
        too_long.put_bytes(&[&[0][..], &signature_data[..]].concat());
        assert!(matches!(SSH_RSA_SHA1.verify(&pubkey, &message, too_long.finish()),
            Err(Error::Decode(_))));
    }

    #[test]
    fn test_encode_decode_blob() {
        let privkey = keypair();
        let pubkey = Pubkey::Rsa(RsaPubkey::from(privkey.to_public_key()));
        let blob = pubkey.encode();
        assert_eq!(SSH_RSA_SHA1.decode_pubkey(blob.clone()).unwrap(), pubkey);
        assert_eq!(RSA_SHA2_512.decode_pubkey(blob).unwrap(), pubkey);
    }
}
