use bytes::Bytes;
use ecdsa::signature::Verifier as _;
use std::fmt;
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{PubkeyAlgo, Pubkey};

/// "ecdsa-sha2-nistp256" public key algorithm from RFC 5656.
///
/// This algorithm is compatible with [`EcdsaPubkey`] on [`EcdsaCurve::NistP256`].
pub static ECDSA_SHA2_NISTP256: PubkeyAlgo = PubkeyAlgo {
    name: "ecdsa-sha2-nistp256",
    key_format: "ecdsa-sha2-nistp256",
    decode: |blob| decode_pubkey(blob, EcdsaCurve::NistP256).map(Pubkey::Ecdsa),
    verify: |pubkey, message, signature| verify(EcdsaCurve::NistP256, pubkey, message, signature),
};

/// "ecdsa-sha2-nistp384" public key algorithm from RFC 5656.
///
/// This algorithm is compatible with [`EcdsaPubkey`] on [`EcdsaCurve::NistP384`].
pub static ECDSA_SHA2_NISTP384: PubkeyAlgo = PubkeyAlgo {
    name: "ecdsa-sha2-nistp384",
    key_format: "ecdsa-sha2-nistp384",
    decode: |blob| decode_pubkey(blob, EcdsaCurve::NistP384).map(Pubkey::Ecdsa),
    verify: |pubkey, message, signature| verify(EcdsaCurve::NistP384, pubkey, message, signature),
};

/// NIST curve used by an ECDSA key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EcdsaCurve {
    /// NIST P-256 (secp256r1), hashed with SHA-256.
    NistP256,
    /// NIST P-384 (secp384r1), hashed with SHA-384.
    NistP384,
}

impl EcdsaCurve {
    /// Curve identifier used in the key blob ("nistp256" or "nistp384").
    pub fn curve_name(self) -> &'static str {
        match self {
            EcdsaCurve::NistP256 => "nistp256",
            EcdsaCurve::NistP384 => "nistp384",
        }
    }

    /// Name of the public key algorithm (and key format) that uses this curve.
    pub fn algo_name(self) -> &'static str {
        match self {
            EcdsaCurve::NistP256 => "ecdsa-sha2-nistp256",
            EcdsaCurve::NistP384 => "ecdsa-sha2-nistp384",
        }
    }

    fn scalar_len(self) -> usize {
        match self {
            EcdsaCurve::NistP256 => 32,
            EcdsaCurve::NistP384 => 48,
        }
    }
}

/// ECDSA public key on a NIST curve.
///
/// The point is stored in the SEC1 encoding received from the server; it is validated when the
/// key is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaPubkey {
    curve: EcdsaCurve,
    point: Bytes,
}

impl EcdsaPubkey {
    /// Creates a key from a SEC1-encoded point on `curve`.
    pub fn from_sec1_bytes(curve: EcdsaCurve, point: &[u8]) -> Result<Self> {
        let valid = match curve {
            EcdsaCurve::NistP256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(point).is_ok(),
            EcdsaCurve::NistP384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(point).is_ok(),
        };
        if !valid {
            return Err(Error::HostKey("ecdsa public key is not a valid point"))
        }
        Ok(EcdsaPubkey { curve, point: Bytes::copy_from_slice(point) })
    }

    /// The curve of this key.
    pub fn curve(&self) -> EcdsaCurve {
        self.curve
    }

    /// The SEC1 encoding of the public point.
    pub fn sec1_bytes(&self) -> &[u8] {
        &self.point
    }
}

fn verify(curve: EcdsaCurve, pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<bool> {
    let pubkey = match pubkey {
        Pubkey::Ecdsa(pubkey) if pubkey.curve == curve => pubkey,
        _ => return Err(Error::HostKey("expected an ecdsa host key on the negotiated curve")),
    };

    let mut signature = PacketDecode::new(signature);
    if signature.get_string()? != curve.algo_name() {
        return Err(Error::Decode("unexpected signature format"))
    }

    // RFC 5656, section 3.1.2
    let mut signature_blob = PacketDecode::new(signature.get_bytes()?);
    let r = signature_blob.get_scalar(curve.scalar_len())?;
    let s = signature_blob.get_scalar(curve.scalar_len())?;

    let verified = match curve {
        EcdsaCurve::NistP256 => {
            let verifying = p256::ecdsa::VerifyingKey::from_sec1_bytes(&pubkey.point)
                .map_err(|_| Error::HostKey("ecdsa public key is not a valid point"))?;
            let Ok(ecdsa_signature) = p256::ecdsa::Signature::from_scalars(
                p256::FieldBytes::clone_from_slice(&r),
                p256::FieldBytes::clone_from_slice(&s),
            ) else { return Ok(false) };
            verifying.verify(message, &ecdsa_signature).is_ok()
        },
        EcdsaCurve::NistP384 => {
            let verifying = p384::ecdsa::VerifyingKey::from_sec1_bytes(&pubkey.point)
                .map_err(|_| Error::HostKey("ecdsa public key is not a valid point"))?;
            let Ok(ecdsa_signature) = p384::ecdsa::Signature::from_scalars(
                p384::FieldBytes::clone_from_slice(&r),
                p384::FieldBytes::clone_from_slice(&s),
            ) else { return Ok(false) };
            verifying.verify(message, &ecdsa_signature).is_ok()
        },
    };
    Ok(verified)
}

pub(super) fn encode_pubkey(blob: &mut PacketEncode, pubkey: &EcdsaPubkey) {
    // RFC 5656, section 3.1
    blob.put_str(pubkey.curve.algo_name());
    blob.put_str(pubkey.curve.curve_name());
    blob.put_bytes(&pubkey.point);
}

pub(super) fn decode_pubkey(blob: &mut PacketDecode, curve: EcdsaCurve) -> Result<EcdsaPubkey> {
    if blob.get_string()? != curve.curve_name() {
        return Err(Error::HostKey("ecdsa curve identifier does not match the key format"))
    }
    let point = blob.get_bytes()?;
    EcdsaPubkey::from_sec1_bytes(curve, &point)
}

impl fmt::Display for EcdsaPubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ecdsa {} {:x}", self.curve.curve_name(), self.point)
    }
}
