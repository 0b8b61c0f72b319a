use derivative::Derivative;
use hex_literal::hex;
use num_bigint_dig::BigUint;
use zeroize::Zeroizing;
use crate::error::{Error, Result};
use crate::util::CryptoRngCore;
use super::{HashAlgo, KexAlgo};

/// "diffie-hellman-group1-sha1" key exchange from RFC 4253.
///
/// This algorithm SHOULD NOT be used according to RFC 9142, it is included only for compatibility
/// with old servers. Note that the name refers to "group1", but in fact the key exchange uses the
/// Second Oakley Group (1024 bits).
pub static DIFFIE_HELLMAN_GROUP1_SHA1: KexAlgo = KexAlgo {
    name: "diffie-hellman-group1-sha1",
    make_group: DhGroup::group_1,
    hash_algo: HashAlgo::Sha1,
};

/// "diffie-hellman-group14-sha1" key exchange from RFC 4253.
pub static DIFFIE_HELLMAN_GROUP14_SHA1: KexAlgo = KexAlgo {
    name: "diffie-hellman-group14-sha1",
    make_group: DhGroup::group_14,
    hash_algo: HashAlgo::Sha1,
};

/// "diffie-hellman-group14-sha256" key exchange from RFC 8268.
pub static DIFFIE_HELLMAN_GROUP14_SHA256: KexAlgo = KexAlgo {
    name: "diffie-hellman-group14-sha256",
    make_group: DhGroup::group_14,
    hash_algo: HashAlgo::Sha256,
};

/// "diffie-hellman-group16-sha512" key exchange from RFC 8268.
pub static DIFFIE_HELLMAN_GROUP16_SHA512: KexAlgo = KexAlgo {
    name: "diffie-hellman-group16-sha512",
    make_group: DhGroup::group_16,
    hash_algo: HashAlgo::Sha512,
};

/// "diffie-hellman-group18-sha512" key exchange from RFC 8268.
pub static DIFFIE_HELLMAN_GROUP18_SHA512: KexAlgo = KexAlgo {
    name: "diffie-hellman-group18-sha512",
    make_group: DhGroup::group_18,
    hash_algo: HashAlgo::Sha512,
};

// the keypair is regenerated when the public value is degenerate, which practically never happens
const MAX_KEYGEN_ATTEMPTS: usize = 16;

/// Diffie-Hellman group: a prime modulus `p` and a generator `g`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhGroup {
    p: BigUint,
    g: BigUint,
    p_minus_1: BigUint,
}

/// Ephemeral Diffie-Hellman keypair, used for a single key exchange.
///
/// The private exponent `x` is wiped from memory when the keypair is dropped. It is never exposed;
/// the only way to use it is [`DhKeypair::compute_shared_secret()`], which consumes the keypair.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DhKeypair {
    group: DhGroup,
    #[derivative(Debug = "ignore")]
    privkey: Zeroizing<BigUint>,
    pubkey: BigUint,
}

impl DhGroup {
    /// Creates a group from a prime `p` and generator `g`.
    ///
    /// We don't check that `p` is a safe prime (this would be expensive), we only reject values
    /// that are obviously wrong.
    pub fn new(p: BigUint, g: BigUint) -> Result<DhGroup> {
        let one = BigUint::from(1u32);
        let is_odd = p.to_bytes_be().last().map_or(false, |digit| digit & 1 == 1);
        if p <= BigUint::from(3u32) || !is_odd {
            return Err(Error::Crypto("Diffie-Hellman modulus must be an odd prime"))
        }

        let p_minus_1 = &p - &one;
        if g <= one || g >= p_minus_1 {
            return Err(Error::Crypto("Diffie-Hellman generator is out of range"))
        }
        Ok(DhGroup { p, g, p_minus_1 })
    }

    /// The Second Oakley Group (used by "diffie-hellman-group1-sha1").
    pub fn group_1() -> DhGroup {
        Self::from_prime_be(&MODP_1024_PRIME)
    }

    /// The 2048-bit MODP group 14.
    pub fn group_14() -> DhGroup {
        Self::from_prime_be(&MODP_2048_PRIME)
    }

    /// The 4096-bit MODP group 16.
    pub fn group_16() -> DhGroup {
        Self::from_prime_be(&MODP_4096_PRIME)
    }

    /// The 8192-bit MODP group 18.
    pub fn group_18() -> DhGroup {
        Self::from_prime_be(&MODP_8192_PRIME)
    }

    fn from_prime_be(p_be: &[u8]) -> DhGroup {
        let p = BigUint::from_bytes_be(p_be);
        let p_minus_1 = &p - BigUint::from(1u32);
        DhGroup { p, g: BigUint::from(2u32), p_minus_1 }
    }

    /// The prime modulus `p`.
    pub fn p(&self) -> &BigUint { &self.p }

    /// The generator `g`.
    pub fn g(&self) -> &BigUint { &self.g }

    /// Size of the modulus in bits.
    pub fn bits(&self) -> usize { self.p.bits() }

    /// Checks that a public value is in the range `1 < value < p-1`.
    ///
    /// Values outside of this range would force the shared secret into a tiny subgroup (RFC 8268,
    /// section 4).
    pub fn is_valid_public(&self, value: &BigUint) -> bool {
        *value > BigUint::from(1u32) && *value < self.p_minus_1
    }

    /// Generates an ephemeral keypair with a private exponent of exactly `need_bytes` bytes.
    ///
    /// The private exponent `x` satisfies `2^(8*need_bytes-1) <= x < 2^(8*need_bytes)`, so
    /// `need_bytes` must be smaller than the size of the modulus. Fails only if the random
    /// generator fails (or if `need_bytes` does not fit the group).
    pub fn generate_keypair(
        &self,
        need_bytes: usize,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<DhKeypair> {
        if need_bytes == 0 || 8 * need_bytes >= self.bits() {
            return Err(Error::Crypto("private exponent size does not fit the Diffie-Hellman group"))
        }

        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            let mut privkey_be = Zeroizing::new(vec![0; need_bytes]);
            rng.try_fill_bytes(&mut privkey_be[..])
                .map_err(|_| Error::Random("could not generate Diffie-Hellman private exponent"))?;
            privkey_be[0] |= 0x80;

            let privkey = Zeroizing::new(BigUint::from_bytes_be(&privkey_be));
            let pubkey = self.g.modpow(&privkey, &self.p);
            if self.is_valid_public(&pubkey) {
                return Ok(DhKeypair { group: self.clone(), privkey, pubkey })
            }
            log::debug!("generated degenerate Diffie-Hellman public value, retrying");
        }

        Err(Error::Crypto("could not generate Diffie-Hellman keypair"))
    }
}

impl DhKeypair {
    /// The group of this keypair.
    pub fn group(&self) -> &DhGroup { &self.group }

    /// Our public value `e = g^x mod p`.
    pub fn pubkey(&self) -> &BigUint { &self.pubkey }

    /// Computes the shared secret `K = f^x mod p` from the peer's public value `f`.
    ///
    /// Fails with [`Error::PeerValue`] if `f` is not in the range `1 < f < p-1`. The keypair is
    /// consumed (and the private exponent wiped) in both cases.
    pub fn compute_shared_secret(self, peer_pubkey: &BigUint) -> Result<Zeroizing<BigUint>> {
        if !self.group.is_valid_public(peer_pubkey) {
            return Err(Error::PeerValue)
        }
        Ok(Zeroizing::new(peer_pubkey.modpow(&self.privkey, &self.group.p)))
    }

    #[cfg(test)]
    pub(crate) fn from_privkey(group: DhGroup, privkey: BigUint) -> DhKeypair {
        let pubkey = group.g.modpow(&privkey, &group.p);
        DhKeypair { group, privkey: Zeroizing::new(privkey), pubkey }
    }
}

// RFC 2409, section 6.2 (Second Oakley Group)
static MODP_1024_PRIME: [u8; 128] = hex!(
    "FFFFFFFF" "FFFFFFFF" "C90FDAA2" "2168C234" "C4C6628B" "80DC1CD1"
    "29024E08" "8A67CC74" "020BBEA6" "3B139B22" "514A0879" "8E3404DD"
    "EF9519B3" "CD3A431B" "302B0A6D" "F25F1437" "4FE1356D" "6D51C245"
    "E485B576" "625E7EC6" "F44C42E9" "A637ED6B" "0BFF5CB6" "F406B7ED"
    "EE386BFB" "5A899FA5" "AE9F2411" "7C4B1FE6" "49286651" "ECE65381"
    "FFFFFFFF" "FFFFFFFF"
);

// RFC 3526, section 3
static MODP_2048_PRIME: [u8; 256] = hex!(
    "FFFFFFFF" "FFFFFFFF" "C90FDAA2" "2168C234" "C4C6628B" "80DC1CD1"
    "29024E08" "8A67CC74" "020BBEA6" "3B139B22" "514A0879" "8E3404DD"
    "EF9519B3" "CD3A431B" "302B0A6D" "F25F1437" "4FE1356D" "6D51C245"
    "E485B576" "625E7EC6" "F44C42E9" "A637ED6B" "0BFF5CB6" "F406B7ED"
    "EE386BFB" "5A899FA5" "AE9F2411" "7C4B1FE6" "49286651" "ECE45B3D"
    "C2007CB8" "A163BF05" "98DA4836" "1C55D39A" "69163FA8" "FD24CF5F"
    "83655D23" "DCA3AD96" "1C62F356" "208552BB" "9ED52907" "7096966D"
    "670C354E" "4ABC9804" "F1746C08" "CA18217C" "32905E46" "2E36CE3B"
    "E39E772C" "180E8603" "9B2783A2" "EC07A28F" "B5C55DF0" "6F4C52C9"
    "DE2BCBF6" "95581718" "3995497C" "EA956AE5" "15D22618" "98FA0510"
    "15728E5A" "8AACAA68" "FFFFFFFF" "FFFFFFFF"
);

// RFC 3526, section 5
static MODP_4096_PRIME: [u8; 512] = hex!(
    "FFFFFFFF" "FFFFFFFF" "C90FDAA2" "2168C234" "C4C6628B" "80DC1CD1"
    "29024E08" "8A67CC74" "020BBEA6" "3B139B22" "514A0879" "8E3404DD"
    "EF9519B3" "CD3A431B" "302B0A6D" "F25F1437" "4FE1356D" "6D51C245"
    "E485B576" "625E7EC6" "F44C42E9" "A637ED6B" "0BFF5CB6" "F406B7ED"
    "EE386BFB" "5A899FA5" "AE9F2411" "7C4B1FE6" "49286651" "ECE45B3D"
    "C2007CB8" "A163BF05" "98DA4836" "1C55D39A" "69163FA8" "FD24CF5F"
    "83655D23" "DCA3AD96" "1C62F356" "208552BB" "9ED52907" "7096966D"
    "670C354E" "4ABC9804" "F1746C08" "CA18217C" "32905E46" "2E36CE3B"
    "E39E772C" "180E8603" "9B2783A2" "EC07A28F" "B5C55DF0" "6F4C52C9"
    "DE2BCBF6" "95581718" "3995497C" "EA956AE5" "15D22618" "98FA0510"
    "15728E5A" "8AAAC42D" "AD33170D" "04507A33" "A85521AB" "DF1CBA64"
    "ECFB8504" "58DBEF0A" "8AEA7157" "5D060C7D" "B3970F85" "A6E1E4C7"
    "ABF5AE8C" "DB0933D7" "1E8C94E0" "4A25619D" "CEE3D226" "1AD2EE6B"
    "F12FFA06" "D98A0864" "D8760273" "3EC86A64" "521F2B18" "177B200C"
    "BBE11757" "7A615D6C" "770988C0" "BAD946E2" "08E24FA0" "74E5AB31"
    "43DB5BFC" "E0FD108E" "4B82D120" "A9210801" "1A723C12" "A787E6D7"
    "88719A10" "BDBA5B26" "99C32718" "6AF4E23C" "1A946834" "B6150BDA"
    "2583E9CA" "2AD44CE8" "DBBBC2DB" "04DE8EF9" "2E8EFC14" "1FBECAA6"
    "287C5947" "4E6BC05D" "99B2964F" "A090C3A2" "233BA186" "515BE7ED"
    "1F612970" "CEE2D7AF" "B81BDD76" "2170481C" "D0069127" "D5B05AA9"
    "93B4EA98" "8D8FDDC1" "86FFB7DC" "90A6C08F" "4DF435C9" "34063199"
    "FFFFFFFF" "FFFFFFFF"
);

// RFC 3526, section 7
static MODP_8192_PRIME: [u8; 1024] = hex!(
    "FFFFFFFF" "FFFFFFFF" "C90FDAA2" "2168C234" "C4C6628B" "80DC1CD1"
    "29024E08" "8A67CC74" "020BBEA6" "3B139B22" "514A0879" "8E3404DD"
    "EF9519B3" "CD3A431B" "302B0A6D" "F25F1437" "4FE1356D" "6D51C245"
    "E485B576" "625E7EC6" "F44C42E9" "A637ED6B" "0BFF5CB6" "F406B7ED"
    "EE386BFB" "5A899FA5" "AE9F2411" "7C4B1FE6" "49286651" "ECE45B3D"
    "C2007CB8" "A163BF05" "98DA4836" "1C55D39A" "69163FA8" "FD24CF5F"
    "83655D23" "DCA3AD96" "1C62F356" "208552BB" "9ED52907" "7096966D"
    "670C354E" "4ABC9804" "F1746C08" "CA18217C" "32905E46" "2E36CE3B"
    "E39E772C" "180E8603" "9B2783A2" "EC07A28F" "B5C55DF0" "6F4C52C9"
    "DE2BCBF6" "95581718" "3995497C" "EA956AE5" "15D22618" "98FA0510"
    "15728E5A" "8AAAC42D" "AD33170D" "04507A33" "A85521AB" "DF1CBA64"
    "ECFB8504" "58DBEF0A" "8AEA7157" "5D060C7D" "B3970F85" "A6E1E4C7"
    "ABF5AE8C" "DB0933D7" "1E8C94E0" "4A25619D" "CEE3D226" "1AD2EE6B"
    "F12FFA06" "D98A0864" "D8760273" "3EC86A64" "521F2B18" "177B200C"
    "BBE11757" "7A615D6C" "770988C0" "BAD946E2" "08E24FA0" "74E5AB31"
    "43DB5BFC" "E0FD108E" "4B82D120" "A9210801" "1A723C12" "A787E6D7"
    "88719A10" "BDBA5B26" "99C32718" "6AF4E23C" "1A946834" "B6150BDA"
    "2583E9CA" "2AD44CE8" "DBBBC2DB" "04DE8EF9" "2E8EFC14" "1FBECAA6"
    "287C5947" "4E6BC05D" "99B2964F" "A090C3A2" "233BA186" "515BE7ED"
    "1F612970" "CEE2D7AF" "B81BDD76" "2170481C" "D0069127" "D5B05AA9"
    "93B4EA98" "8D8FDDC1" "86FFB7DC" "90A6C08F" "4DF435C9" "34028492"
    "36C3FAB4" "D27C7026" "C1D4DCB2" "602646DE" "C9751E76" "3DBA37BD"
    "F8FF9406" "AD9E530E" "E5DB382F" "413001AE" "B06A53ED" "9027D831"
    "179727B0" "865A8918" "DA3EDBEB" "CF9B14ED" "44CE6CBA" "CED4BB1B"
    "DB7F1447" "E6CC254B" "33205151" "2BD7AF42" "6FB8F401" "378CD2BF"
    "5983CA01" "C64B92EC" "F032EA15" "D1721D03" "F482D7CE" "6E74FEF6"
    "D55E702F" "46980C82" "B5A84031" "900B1C9E" "59E7C97F" "BEC7E8F3"
    "23A97A7E" "36CC88BE" "0F1D45B7" "FF585AC5" "4BD407B2" "2B4154AA"
    "CC8F6D7E" "BF48E1D8" "14CC5ED2" "0F8037E0" "A79715EE" "F29BE328"
    "06A1D58B" "B7C5DA76" "F550AA3D" "8A1FBFF0" "EB19CCB1" "A313D55C"
    "DA56C9EC" "2EF29632" "387FE8D7" "6E3C0468" "043E8F66" "3F4860EE"
    "12BF2D5B" "0B7474D6" "E694F91E" "6DBE1159" "74A3926F" "12FEE5E4"
    "38777CB6" "A932DF8C" "D8BEC4D0" "73B931BA" "3BC832B6" "8D9DD300"
    "741FA7BF" "8AFC47ED" "2576F693" "6BA42466" "3AAB639C" "5AE4F568"
    "3423B474" "2BF1C978" "238F16CB" "E39D652D" "E3FDB8BE" "FC848AD9"
    "22222E04" "A4037C07" "13EB57A8" "1A23F0C7" "3473FC64" "6CEA306B"
    "4BCBC886" "2F8385DD" "FA9D4B7F" "A2C087E8" "79683303" "ED5BDD3A"
    "062B3CF5" "B3A278A6" "6D2A13F8" "3F44F82D" "DF310EE0" "74AB6A36"
    "4597E899" "A0255DC1" "64F31CC5" "0846851D" "F9AB4819" "5DED7EA1"
    "B1D510BD" "7EE74D73" "FAF36BC3" "1ECFA268" "359046F4" "EB879F92"
    "4009438B" "481C6CD7" "889A002E" "D5EE382B" "C9190DA6" "FC026E47"
    "9558E447" "5677E9AA" "9E3050E2" "765694DF" "C81F56E8" "80B96E71"
    "60C980DD" "98EDD3DF" "FFFFFFFF" "FFFFFFFF"
);
