use bytes::{BufMut as _, Bytes, BytesMut};
use num_bigint_dig::{BigInt, BigUint, Sign};

/// Encoding of SSH packets and other payloads (low level API).
///
/// The format is described in RFC 4251, section 5. This struct just wraps a [`BytesMut`] instance.
#[derive(Debug, Clone)]
pub struct PacketEncode {
    buf: BytesMut,
}

impl PacketEncode {
    /// Creates an empty [`PacketEncode`].
    pub fn new() -> PacketEncode {
        PacketEncode { buf: BytesMut::new() }
    }

    /// Encode a `byte`.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Encode a `boolean`.
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    /// Encode a `uint32`.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Encode a `string`.
    pub fn put_bytes(&mut self, value: &[u8]) {
        self.buf.reserve(4 + value.len());
        self.buf.put_u32(value.len().try_into().expect("string too long"));
        self.buf.put_slice(value);
    }

    /// Encode a `string` in UTF-8.
    pub fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes())
    }

    /// Encode a `name-list`.
    pub fn put_name_list(&mut self, names: &[&str]) {
        if names.is_empty() {
            self.buf.put_u32(0);
            return;
        }

        let names_len = names.iter().map(|name| name.len()).sum::<usize>() + names.len() - 1;
        self.buf.reserve(4 + names_len);
        self.buf.put_u32(names_len.try_into().expect("name list too long"));

        for (i, name) in names.iter().enumerate() {
            if i != 0 {
                self.buf.put_u8(b',');
            }
            self.buf.put_slice(name.as_bytes());
        }
    }

    /// Encode a non-negative `mpint` from a [`BigUint`].
    ///
    /// A zero byte is prepended when the most significant bit is set, so that the number is not
    /// interpreted as negative.
    pub fn put_biguint(&mut self, value: &BigUint) {
        self.put_mpint_uint_be(&value.to_bytes_be());
    }

    /// Encode a non-negative `mpint` from its unsigned big endian digits.
    pub fn put_mpint_uint_be(&mut self, digits_be: &[u8]) {
        let mut bytes = digits_be;
        while !bytes.is_empty() && bytes[0] == 0 {
            bytes = &bytes[1..];
        }

        if !bytes.is_empty() && bytes[0] >= 0x80 {
            self.buf.reserve(5 + bytes.len());
            self.buf.put_u32(bytes.len() as u32 + 1);
            self.buf.put_u8(0);
            self.buf.put_slice(bytes);
        } else {
            self.buf.reserve(4 + bytes.len());
            self.buf.put_u32(bytes.len() as u32);
            self.buf.put_slice(bytes);
        }
    }

    /// Encode a signed `mpint` from a [`BigInt`], using the shortest two's complement form.
    pub fn put_mpint(&mut self, value: &BigInt) {
        let (sign, magnitude_be) = value.to_bytes_be();
        if sign != Sign::Minus {
            return self.put_mpint_uint_be(&magnitude_be)
        }

        // the shortest `n` such that -2^(8n-1) <= value
        let magnitude = BigUint::from_bytes_be(&magnitude_be);
        let len = ((&magnitude - BigUint::from(1u32)).bits() + 8) / 8;
        let complement = (BigUint::from(1u32) << (8 * len)) - magnitude;
        let bytes = complement.to_bytes_be();
        debug_assert_eq!(bytes.len(), len);

        self.buf.reserve(4 + len);
        self.buf.put_u32(len.try_into().expect("mpint too long"));
        self.buf.put_slice(&bytes);
    }

    /// Append raw bytes to the buffer.
    pub fn put_raw(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Unwraps the internal bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }

    /// Unwraps and freezes the internal bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for PacketEncode {
    fn default() -> Self { Self::new() }
}
