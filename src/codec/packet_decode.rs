use bytes::{Buf as _, Bytes};
use num_bigint_dig::{BigInt, BigUint, Sign};
use std::str;
use crate::{Error, Result};

/// Decoding of SSH packets and other payloads (low level API).
///
/// The format of SSH payloads is described in RFC 4251, section 5. This struct just wraps a
/// [`Bytes`] instance. Every method checks that enough bytes remain and fails with
/// [`Error::BufferUnderrun`] otherwise.
#[derive(Debug)]
pub struct PacketDecode {
    buf: Bytes,
}

impl PacketDecode {
    /// Wraps the bytes into [`PacketDecode`].
    pub fn new(buf: Bytes) -> PacketDecode {
        PacketDecode { buf }
    }

    /// Decode a `byte`.
    pub fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    /// Decode a `boolean`.
    pub fn get_bool(&mut self) -> Result<bool> {
        self.get_u8().map(|x| x != 0)
    }

    /// Decode a `uint32`.
    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    /// Decode a `string`.
    pub fn get_bytes(&mut self) -> Result<Bytes> {
        let len = self.get_u32()? as usize;
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Decode a `string` with fixed length.
    pub fn get_byte_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.get_bytes()?;
        if bytes.len() != N {
            return Err(Error::Decode("wrong size of `string`"))
        }

        let mut array = [0; N];
        array.copy_from_slice(&bytes);
        Ok(array)
    }

    /// Decode a `string` in UTF-8.
    pub fn get_string(&mut self) -> Result<String> {
        self.get_bytes().and_then(|x| decode_string(&x))
    }

    /// Decode a `name-list`.
    pub fn get_name_list(&mut self) -> Result<Vec<String>> {
        let list = self.get_string()?;
        if list.is_empty() {
            return Ok(Vec::new())
        }
        Ok(list.split(|x| x == ',').map(|x| x.into()).collect())
    }

    /// Decode a non-negative `mpint` as [`BigUint`].
    ///
    /// Negative numbers (with the most significant bit set) are rejected.
    pub fn get_biguint(&mut self) -> Result<BigUint> {
        let bytes = self.get_bytes()?;
        if is_negative(&bytes) {
            return Err(Error::Decode("expected non-negative `mpint`"))
        }
        Ok(BigUint::from_bytes_be(&bytes))
    }

    /// Decode a signed `mpint` in two's complement as [`BigInt`].
    pub fn get_mpint(&mut self) -> Result<BigInt> {
        let bytes = self.get_bytes()?;
        if is_negative(&bytes) {
            let complement = BigUint::from_bytes_be(&bytes);
            let magnitude = (BigUint::from(1u32) << (8 * bytes.len())) - complement;
            Ok(BigInt::from_biguint(Sign::Minus, magnitude))
        } else {
            Ok(BigInt::from_biguint(Sign::Plus, BigUint::from_bytes_be(&bytes)))
        }
    }

    /// Decode a `mpint` as a scalar in unsigned big endian with given length.
    pub fn get_scalar(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = self.get_bytes()?;
        if is_negative(&bytes) {
            return Err(Error::Decode("expected non-negative `mpint`"))
        }

        while bytes.first() == Some(&0) {
            bytes.advance(1);
        }

        if bytes.len() > len {
            return Err(Error::Decode("decoded number is too long"));
        }

        let mut digits_be = vec![0; len];
        digits_be[len - bytes.len()..].copy_from_slice(&bytes);
        Ok(digits_be)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.buf.remaining();
        if needed <= remaining {
            Ok(())
        } else {
            Err(Error::BufferUnderrun { needed, remaining })
        }
    }

    /// Return the remaining undecoded bytes.
    pub fn remaining(&self) -> Bytes {
        self.buf.clone()
    }

    /// Return the number of remaining undecoded bytes.
    pub fn remaining_len(&self) -> usize {
        self.buf.len()
    }
}

fn is_negative(mpint_be: &[u8]) -> bool {
    mpint_be.first().map_or(false, |&b| b & 0x80 != 0)
}

fn decode_string(bytes: &[u8]) -> Result<String> {
    match str::from_utf8(bytes) {
        Ok(string) => Ok(string.into()),
        Err(_) => Err(Error::Decode("string is not valid utf-8")),
    }
}
