use bytes::Bytes;
use derivative::Derivative;
use num_bigint_dig::{BigUint, Sign};
use zeroize::{Zeroize as _, Zeroizing};
use crate::codec::{PacketDecode, PacketEncode};
use crate::codes::msg;
use crate::config::KexConfig;
use crate::error::{Error, Result};
use crate::pubkey::{Pubkey, PubkeyAlgo};
use crate::util::CryptoRngCore;
use super::{DhKeypair, ExchangeContext, ExchangeResult, KexAlgo};

/// State of the [`KexEngine`].
///
/// The states are visited strictly in order, from [`Start`][KexState::Start] to
/// [`KeysConfirmed`][KexState::KeysConfirmed]. Any error moves the engine to
/// [`Aborted`][KexState::Aborted].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KexState {
    /// The keypair is generated, but `SSH_MSG_KEXDH_INIT` was not sent yet.
    Start,
    /// We sent `SSH_MSG_KEXDH_INIT` and wait for `SSH_MSG_KEXDH_REPLY`.
    InitSent,
    /// We received `SSH_MSG_KEXDH_REPLY` and computed the exchange hash, the host key must be
    /// approved by the caller.
    ReplyReceived,
    /// The host key was approved.
    HostKeyVerified,
    /// The signature of the exchange hash was verified, we exchange `SSH_MSG_NEWKEYS`.
    SignatureVerified,
    /// Both sides sent `SSH_MSG_NEWKEYS`, the result is ready.
    KeysConfirmed,
    /// The key exchange failed.
    Aborted,
}

/// Diffie-Hellman key exchange from RFC 4253, section 8 (client side).
///
/// The engine does not perform any I/O, it is driven by the caller:
///
/// - [`send_packet()`][Self::send_packet()] returns the next message that should be sent to the
/// server,
/// - [`recv_packet()`][Self::recv_packet()] consumes a message received from the server,
/// - [`host_key_to_verify()`][Self::host_key_to_verify()] returns the server host key that must be
/// approved by the caller and [`host_key_verified()`][Self::host_key_verified()] tells the engine
/// the decision,
/// - [`finish()`][Self::finish()] returns the result after both sides exchanged `SSH_MSG_NEWKEYS`.
///
/// The same engine can thus be driven by blocking code ([`run_kex()`][crate::run_kex()]) or by
/// async code ([`run_kex_async()`][crate::run_kex_async()]). A new engine must be created for
/// every key exchange, including re-exchanges; an aborted engine cannot be restarted.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct KexEngine {
    algo: &'static KexAlgo,
    server_pubkey_algo: &'static PubkeyAlgo,
    ctx: ExchangeContext,
    state: KexState,
    keypair: Option<DhKeypair>,
    our_eph_pubkey: BigUint,
    kexdh_reply: Option<KexdhReply>,
    exchange_hash: Option<Bytes>,
    #[derivative(Debug = "ignore")]
    shared_secret_be: Option<Zeroizing<Vec<u8>>>,
    server_pubkey: Option<Pubkey>,
    new_keys_sent: bool,
}

#[derive(Debug)]
struct KexdhReply {
    server_pubkey: Bytes,
    server_exchange_hash_sign: Bytes,
}

impl KexEngine {
    /// Prepares a key exchange using the algorithms named in `ctx`.
    ///
    /// The algorithms are looked up in `config`. The ephemeral keypair is generated immediately.
    pub fn new(
        config: &KexConfig,
        ctx: ExchangeContext,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<KexEngine> {
        let algo = config.find_kex_algo(&ctx.kex_algo)?;
        let server_pubkey_algo = config.find_pubkey_algo(&ctx.server_pubkey_algo)?;
        Self::with_algos(algo, server_pubkey_algo, ctx, rng)
    }

    /// Prepares a key exchange using the given algorithms.
    ///
    /// The algorithm names in `ctx` are ignored.
    pub fn with_algos(
        algo: &'static KexAlgo,
        server_pubkey_algo: &'static PubkeyAlgo,
        ctx: ExchangeContext,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<KexEngine> {
        let group = (algo.make_group)();
        let keypair = group.generate_keypair(ctx.need_bytes, rng)?;
        let our_eph_pubkey = keypair.pubkey().clone();
        log::debug!("starting key exchange {:?} with host key algorithm {:?}",
            algo.name, server_pubkey_algo.name);

        Ok(KexEngine {
            algo,
            server_pubkey_algo,
            ctx,
            state: KexState::Start,
            keypair: Some(keypair),
            our_eph_pubkey,
            kexdh_reply: None,
            exchange_hash: None,
            shared_secret_be: None,
            server_pubkey: None,
            new_keys_sent: false,
        })
    }

    /// Current state of the key exchange.
    pub fn state(&self) -> KexState {
        self.state
    }

    /// The key exchange algorithm.
    pub fn algo(&self) -> &'static KexAlgo {
        self.algo
    }

    /// Our ephemeral public value `e`.
    pub fn our_eph_pubkey(&self) -> &BigUint {
        &self.our_eph_pubkey
    }

    /// Returns the next message that should be sent to the server, if any.
    ///
    /// This returns `SSH_MSG_KEXDH_INIT` at the start and `SSH_MSG_NEWKEYS` after the signature
    /// was verified, each exactly once.
    pub fn send_packet(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            KexState::Start => {
                let payload = self.send_kexdh_init();
                self.state = KexState::InitSent;
                Ok(Some(payload))
            },
            KexState::SignatureVerified if !self.new_keys_sent => {
                let payload = send_new_keys();
                self.new_keys_sent = true;
                Ok(Some(payload))
            },
            KexState::Aborted => Err(Error::Protocol("key exchange was aborted")),
            _ => Ok(None),
        }
    }

    /// Consumes a message received from the server.
    ///
    /// We expect exactly `SSH_MSG_KEXDH_REPLY` after we sent `SSH_MSG_KEXDH_INIT`, and exactly
    /// `SSH_MSG_NEWKEYS` after we sent our `SSH_MSG_NEWKEYS`. Any other message aborts the
    /// exchange.
    pub fn recv_packet(&mut self, payload: Bytes) -> Result<()> {
        if self.state == KexState::Aborted {
            return Err(Error::Protocol("key exchange was aborted"))
        }

        let res = self.dispatch_packet(payload);
        self.check(res)
    }

    fn dispatch_packet(&mut self, payload: Bytes) -> Result<()> {
        let mut payload = PacketDecode::new(payload);
        let msg_id = payload.get_u8()?;
        log::trace!("received {}", msg::to_str(msg_id).unwrap_or("unknown message"));

        match self.state {
            KexState::InitSent => {
                if msg_id != msg::KEXDH_REPLY {
                    let expected = "SSH_MSG_KEXDH_REPLY";
                    return Err(Error::UnexpectedMessage { expected, received: msg_id })
                }
                self.recv_kexdh_reply(&mut payload)?;
                self.state = KexState::ReplyReceived;
                Ok(())
            },
            KexState::SignatureVerified if self.new_keys_sent => {
                if msg_id != msg::NEWKEYS {
                    let expected = "SSH_MSG_NEWKEYS";
                    return Err(Error::UnexpectedMessage { expected, received: msg_id })
                }
                log::debug!("received SSH_MSG_NEWKEYS");
                self.state = KexState::KeysConfirmed;
                Ok(())
            },
            _ => Err(Error::UnexpectedMessage { expected: "no message", received: msg_id }),
        }
    }

    /// Returns the server host key blob (`K_S`) that should be approved by the caller.
    ///
    /// This returns `Some` only after we received `SSH_MSG_KEXDH_REPLY` and before the caller
    /// called [`host_key_verified()`][Self::host_key_verified()].
    pub fn host_key_to_verify(&self) -> Option<&Bytes> {
        match self.state {
            KexState::ReplyReceived => self.kexdh_reply.as_ref().map(|reply| &reply.server_pubkey),
            _ => None,
        }
    }

    /// Tells the engine whether the caller trusts the server host key.
    ///
    /// If the key is rejected, the exchange aborts with [`Error::PubkeyRejected`]. Otherwise the
    /// host key is decoded and the server signature of the exchange hash is verified; if the
    /// verification fails, the exchange aborts with [`Error::Signature`].
    pub fn host_key_verified(&mut self, accepted: bool) -> Result<()> {
        if self.state != KexState::ReplyReceived {
            return self.check(Err(Error::Protocol("host key is not waiting for verification")))
        }

        if !accepted {
            return self.check(Err(Error::PubkeyRejected))
        }
        log::debug!("server host key was accepted");
        self.state = KexState::HostKeyVerified;

        let res = self.verify_signature();
        self.check(res)
    }

    fn verify_signature(&mut self) -> Result<()> {
        let KexdhReply { server_pubkey, server_exchange_hash_sign } = self.kexdh_reply.as_ref()
            .ok_or(Error::Protocol("missing SSH_MSG_KEXDH_REPLY"))?;
        let exchange_hash = self.exchange_hash.as_ref()
            .ok_or(Error::Protocol("missing exchange hash"))?;

        let pubkey = self.server_pubkey_algo.decode_pubkey(server_pubkey.clone())?;
        log::debug!("server pubkey {}", pubkey);

        let verified = self.server_pubkey_algo.verify(
            &pubkey, exchange_hash, server_exchange_hash_sign.clone())?;
        if !verified {
            return Err(Error::Signature)
        }

        log::debug!("verified signature of the exchange hash");
        self.server_pubkey = Some(pubkey);
        self.state = KexState::SignatureVerified;
        Ok(())
    }

    /// Returns true when the key exchange is finished and [`finish()`][Self::finish()] can be
    /// called.
    pub fn is_done(&self) -> bool {
        self.state == KexState::KeysConfirmed
    }

    /// Returns the result of a finished key exchange.
    pub fn finish(mut self) -> Result<ExchangeResult> {
        if self.state != KexState::KeysConfirmed {
            return Err(Error::Protocol("key exchange is not finished"))
        }

        let missing = Error::Protocol("key exchange result is incomplete");
        let (Some(exchange_hash), Some(shared_secret_be), Some(server_pubkey), Some(kexdh_reply)) = (
            self.exchange_hash.take(),
            self.shared_secret_be.take(),
            self.server_pubkey.take(),
            self.kexdh_reply.take(),
        ) else {
            return Err(missing)
        };

        let session_id = self.ctx.session_id.clone().unwrap_or_else(|| exchange_hash.clone());
        log::debug!("finished key exchange {:?}", self.algo.name);
        Ok(ExchangeResult {
            session_id,
            exchange_hash,
            server_pubkey,
            server_pubkey_blob: kexdh_reply.server_pubkey,
            shared_secret_be,
            hash_algo: self.algo.hash_algo,
        })
    }

    /// Aborts the key exchange because of `err` and returns the error back.
    ///
    /// All secret material held by the engine is wiped.
    pub fn abort(&mut self, err: Error) -> Error {
        if self.state != KexState::Aborted {
            log::debug!("key exchange aborted in state {:?}: {}", self.state, err);
            self.state = KexState::Aborted;
            self.keypair = None;
            self.shared_secret_be = None;
        }
        err
    }

    fn check<T>(&mut self, res: Result<T>) -> Result<T> {
        res.map_err(|err| self.abort(err))
    }

    fn send_kexdh_init(&self) -> Bytes {
        // RFC 4253, section 8
        let mut payload = PacketEncode::new();
        payload.put_u8(msg::KEXDH_INIT);
        payload.put_biguint(&self.our_eph_pubkey);
        log::debug!("sending SSH_MSG_KEXDH_INIT");
        payload.finish()
    }

    fn recv_kexdh_reply(&mut self, payload: &mut PacketDecode) -> Result<()> {
        // RFC 4253, section 8
        let server_pubkey = payload.get_bytes()?;
        let server_eph_pubkey = payload.get_mpint()?;
        let server_exchange_hash_sign = payload.get_bytes()?;
        log::debug!("received SSH_MSG_KEXDH_REPLY");

        let (sign, server_eph_pubkey_be) = server_eph_pubkey.to_bytes_be();
        if sign == Sign::Minus {
            return Err(Error::PeerValue)
        }
        let server_eph_pubkey = BigUint::from_bytes_be(&server_eph_pubkey_be);

        let keypair = self.keypair.take()
            .ok_or(Error::Protocol("Diffie-Hellman keypair was already used"))?;
        let shared_secret = keypair.compute_shared_secret(&server_eph_pubkey)?;

        let exchange_hash = self.compute_exchange_hash(
            &server_pubkey, &server_eph_pubkey, &shared_secret);
        self.exchange_hash = Some(Bytes::from(exchange_hash));
        self.shared_secret_be = Some(Zeroizing::new(shared_secret.to_bytes_be()));
        self.kexdh_reply = Some(KexdhReply { server_pubkey, server_exchange_hash_sign });
        Ok(())
    }

    fn compute_exchange_hash(
        &self,
        server_pubkey: &[u8],
        server_eph_pubkey: &BigUint,
        shared_secret: &BigUint,
    ) -> Vec<u8> {
        let mut exchange_data = PacketEncode::new();
        exchange_data.put_bytes(&self.ctx.client_ident);
        exchange_data.put_bytes(&self.ctx.server_ident);
        exchange_data.put_bytes(&self.ctx.client_kex_init);
        exchange_data.put_bytes(&self.ctx.server_kex_init);
        exchange_data.put_bytes(server_pubkey);
        exchange_data.put_biguint(&self.our_eph_pubkey);
        exchange_data.put_biguint(server_eph_pubkey);
        exchange_data.put_biguint(shared_secret);

        let mut exchange_data = exchange_data.into_bytes();
        let exchange_hash = self.algo.hash_algo.digest(&exchange_data);
        exchange_data[..].zeroize();
        exchange_hash
    }
}

fn send_new_keys() -> Bytes {
    let mut payload = PacketEncode::new();
    payload.put_u8(msg::NEWKEYS);
    log::debug!("sending SSH_MSG_NEWKEYS");
    payload.finish()
}
