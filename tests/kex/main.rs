use bytes::Bytes;
use kexdh::{AsyncTransport as _, ChannelTransport, Error, ExchangeContext, KexConfig};
use kexdh::{PacketDecode, PacketEncode, Pubkey};
use kexdh::codes::msg;
use kexdh::kex::{DhGroup, HashAlgo, KexEngine, KexState};
use kexdh::num_bigint_dig::BigUint;
use kexdh::pubkey::{Ed25519Pubkey, RsaPubkey};
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;
use rsa::traits::PublicKeyParts as _;
use std::sync::OnceLock;
use std::time::Duration;
use crate::mock::MockTransport;

#[allow(dead_code)]
mod mock;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// 368 bits is the smallest key that fits a SHA-1 PKCS#1 v1.5 signature
fn rsa_server_key() -> &'static rsa::RsaPrivateKey {
    static KEY: OnceLock<rsa::RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = ChaCha8Rng::seed_from_u64(368);
        rsa::RsaPrivateKey::new(&mut rng, 368).unwrap()
    })
}

#[derive(Clone)]
enum ServerKey {
    Rsa(&'static rsa::RsaPrivateKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl ServerKey {
    fn blob(&self) -> Bytes {
        match self {
            ServerKey::Rsa(privkey) =>
                Pubkey::Rsa(RsaPubkey::from(privkey.to_public_key())).encode(),
            ServerKey::Ed25519(signing) =>
                Pubkey::Ed25519(Ed25519Pubkey::from(signing.verifying_key())).encode(),
        }
    }

    fn sign(&self, message: &[u8]) -> Bytes {
        let mut signature = PacketEncode::new();
        match self {
            ServerKey::Rsa(privkey) => {
                use sha1::Digest as _;
                let hashed = sha1::Sha1::digest(message);
                let scheme = rsa::Pkcs1v15Sign::new::<sha1::Sha1>();
                signature.put_str("ssh-rsa");
                signature.put_bytes(&privkey.sign(scheme, &hashed).unwrap());
            },
            ServerKey::Ed25519(signing) => {
                use ed25519_dalek::Signer as _;
                signature.put_str("ssh-ed25519");
                signature.put_bytes(&signing.sign(message).to_bytes());
            },
        }
        signature.finish()
    }
}

/// One side of a scripted key exchange: the client inputs and a server that knows how to
/// answer them.
#[derive(Clone)]
struct Fixture {
    ctx: ExchangeContext,
    rng: ChaCha8Rng,
    group: DhGroup,
    hash: fn(&[u8]) -> Vec<u8>,
    server_key: ServerKey,
    server_dh_pubkey: BigUint,
}

impl Fixture {
    fn group1_ssh_rsa() -> Fixture {
        Fixture {
            ctx: ExchangeContext {
                client_ident: Bytes::from_static(b"client version string"),
                server_ident: Bytes::from_static(b"server version string"),
                client_kex_init: Bytes::from_static(b"client algorithm packet"),
                server_kex_init: Bytes::from_static(b"server algorithm packet"),
                kex_algo: "diffie-hellman-group1-sha1".into(),
                server_pubkey_algo: "ssh-rsa".into(),
                need_bytes: 20,
                session_id: None,
            },
            rng: ChaCha8Rng::seed_from_u64(42),
            group: DhGroup::group_1(),
            hash: |data| {
                use sha1::Digest as _;
                sha1::Sha1::digest(data).to_vec()
            },
            server_key: ServerKey::Rsa(rsa_server_key()),
            server_dh_pubkey: BigUint::from(1234567890u32),
        }
    }

    fn group14_ssh_ed25519() -> Fixture {
        Fixture {
            ctx: ExchangeContext {
                kex_algo: "diffie-hellman-group14-sha256".into(),
                server_pubkey_algo: "ssh-ed25519".into(),
                need_bytes: 32,
                ..Fixture::group1_ssh_rsa().ctx
            },
            rng: ChaCha8Rng::seed_from_u64(14),
            group: DhGroup::group_14(),
            hash: |data| {
                use sha2::Digest as _;
                sha2::Sha256::digest(data).to_vec()
            },
            server_key: ServerKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&[14; 32])),
            server_dh_pubkey: BigUint::from(987654321u32),
        }
    }

    fn with_seed(mut self, seed: u64) -> Fixture {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Client ephemeral value `e` and shared secret `K`, computed from a copy of the client rng.
    fn replica(&self) -> (BigUint, BigUint) {
        let keypair = self.group.generate_keypair(self.ctx.need_bytes, &mut self.rng.clone())
            .unwrap();
        let client_dh_pubkey = keypair.pubkey().clone();
        let shared_secret = keypair.compute_shared_secret(&self.server_dh_pubkey).unwrap();
        (client_dh_pubkey, (*shared_secret).clone())
    }

    fn exchange_hash(&self) -> Bytes {
        let (client_dh_pubkey, shared_secret) = self.replica();
        let mut data = PacketEncode::new();
        data.put_bytes(&self.ctx.client_ident);
        data.put_bytes(&self.ctx.server_ident);
        data.put_bytes(&self.ctx.client_kex_init);
        data.put_bytes(&self.ctx.server_kex_init);
        data.put_bytes(&self.server_key.blob());
        data.put_biguint(&client_dh_pubkey);
        data.put_biguint(&self.server_dh_pubkey);
        data.put_biguint(&shared_secret);
        Bytes::from((self.hash)(&data.finish()))
    }

    fn kexdh_reply(&self, init: Bytes) -> Bytes {
        let mut init = PacketDecode::new(init);
        assert_eq!(init.get_u8().unwrap(), msg::KEXDH_INIT);
        assert_eq!(init.get_biguint().unwrap(), self.replica().0);
        assert_eq!(init.remaining_len(), 0);

        let signature = self.server_key.sign(&self.exchange_hash());
        kexdh_reply(&self.server_key.blob(), &self.server_dh_pubkey, &signature)
    }

    fn script_server(&self, transport: &mut MockTransport) {
        let fixture = self.clone();
        transport.expect(move |init| vec![fixture.kexdh_reply(init)]);
        transport.expect(|payload| {
            assert_eq!(&payload[..], &[msg::NEWKEYS]);
            vec![newkeys()]
        });
    }

    fn run(&self, transport: &mut MockTransport) -> kexdh::Result<kexdh::ExchangeResult> {
        self.run_with_verifier(transport, |_: &[u8]| true)
    }

    fn run_with_verifier(
        &self,
        transport: &mut MockTransport,
        mut verifier: impl FnMut(&[u8]) -> bool,
    ) -> kexdh::Result<kexdh::ExchangeResult> {
        init_logging();
        let config = KexConfig::default_compatible_less_secure();
        kexdh::exchange_keys(&config, self.ctx.clone(), &mut self.rng.clone(), transport, &mut verifier)
    }
}

fn kexdh_reply(host_key: &[u8], server_dh_pubkey: &BigUint, signature: &[u8]) -> Bytes {
    let mut payload = PacketEncode::new();
    payload.put_u8(msg::KEXDH_REPLY);
    payload.put_bytes(host_key);
    payload.put_biguint(server_dh_pubkey);
    payload.put_bytes(signature);
    payload.finish()
}

fn newkeys() -> Bytes {
    Bytes::from_static(&[msg::NEWKEYS])
}

#[test]
fn test_exchange_keys_returns_expected_results() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    fixture.script_server(&mut transport);

    let result = fixture.run(&mut transport).unwrap();
    let (_, shared_secret) = fixture.replica();
    assert_eq!(result.session_id, fixture.exchange_hash());
    assert_eq!(result.exchange_hash, fixture.exchange_hash());
    assert_eq!(result.server_pubkey_blob, fixture.server_key.blob());
    assert_eq!(result.server_pubkey.encode(), fixture.server_key.blob());
    assert_eq!(*result.shared_secret_be, shared_secret.to_bytes_be());
    assert_eq!(result.hash_algo, HashAlgo::Sha1);
    assert_eq!(rsa_server_key().size(), 368 / 8);

    assert_eq!(transport.sent_msg_ids(), vec![msg::KEXDH_INIT, msg::NEWKEYS]);
    assert!(transport.is_exhausted());
}

#[test]
fn test_exchange_keys_group14_sha256_ed25519() {
    let fixture = Fixture::group14_ssh_ed25519();
    let mut transport = MockTransport::new();
    fixture.script_server(&mut transport);

    let result = fixture.run(&mut transport).unwrap();
    assert_eq!(result.exchange_hash.len(), 32);
    assert_eq!(result.session_id, fixture.exchange_hash());
    assert!(matches!(result.server_pubkey, Pubkey::Ed25519(_)));
    assert_eq!(result.hash_algo, HashAlgo::Sha256);
}

#[test]
fn test_exchange_is_deterministic_for_fixed_rng() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut results = Vec::new();
    for _ in 0..2 {
        let mut transport = MockTransport::new();
        fixture.script_server(&mut transport);
        results.push(fixture.run(&mut transport).unwrap());
    }
    assert_eq!(results[0].exchange_hash, results[1].exchange_hash);
    assert_eq!(results[0].shared_secret_be, results[1].shared_secret_be);

    let other = fixture.clone().with_seed(43);
    let mut transport = MockTransport::new();
    other.script_server(&mut transport);
    assert_ne!(other.run(&mut transport).unwrap().exchange_hash, results[0].exchange_hash);
}

#[test]
fn test_verifier_sees_host_key_blob() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    fixture.script_server(&mut transport);

    let mut seen = Vec::new();
    fixture.run_with_verifier(&mut transport, |blob| { seen.push(Bytes::copy_from_slice(blob)); true })
        .unwrap();
    assert_eq!(seen, vec![fixture.server_key.blob()]);
}

#[test]
fn test_rejected_host_key_does_not_send_newkeys() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    let server = fixture.clone();
    transport.expect(move |init| vec![server.kexdh_reply(init)]);

    let err = fixture.run_with_verifier(&mut transport, |_| false).unwrap_err();
    assert!(matches!(err, Error::PubkeyRejected));
    assert_eq!(err.disconnect_reason(), Some(kexdh::codes::disconnect::HOST_KEY_NOT_VERIFIABLE));
    assert_eq!(transport.sent_msg_ids(), vec![msg::KEXDH_INIT]);
}

#[test]
fn test_bad_signature() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    let server = fixture.clone();
    transport.expect(move |_init| {
        let signature = server.server_key.sign(b"not the exchange hash");
        vec![kexdh_reply(&server.server_key.blob(), &server.server_dh_pubkey, &signature)]
    });

    assert!(matches!(fixture.run(&mut transport), Err(Error::Signature)));
    assert_eq!(transport.sent_msg_ids(), vec![msg::KEXDH_INIT]);
}

#[test]
fn test_signature_by_other_key() {
    let fixture = Fixture::group14_ssh_ed25519();
    let mut transport = MockTransport::new();
    let server = fixture.clone();
    transport.expect(move |_init| {
        let impostor = ServerKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&[66; 32]));
        let signature = impostor.sign(&server.exchange_hash());
        vec![kexdh_reply(&server.server_key.blob(), &server.server_dh_pubkey, &signature)]
    });

    assert!(matches!(fixture.run(&mut transport), Err(Error::Signature)));
}

#[test]
fn test_host_key_does_not_match_negotiated_algo() {
    let mut fixture = Fixture::group1_ssh_rsa();
    fixture.ctx.server_pubkey_algo = "ssh-ed25519".into();
    let mut transport = MockTransport::new();
    fixture.script_server(&mut transport);

    assert!(matches!(fixture.run(&mut transport), Err(Error::HostKey(_))));
    assert_eq!(transport.sent_msg_ids(), vec![msg::KEXDH_INIT]);
}

#[test]
fn test_unexpected_message_after_init() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    transport.expect(|_init| vec![newkeys()]);

    match fixture.run(&mut transport) {
        Err(Error::UnexpectedMessage { received, .. }) => assert_eq!(received, msg::NEWKEYS),
        res => panic!("unexpected result {:?}", res),
    }
}

#[test]
fn test_unexpected_message_after_newkeys() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    let server = fixture.clone();
    transport.expect(move |init| vec![server.kexdh_reply(init)]);
    transport.expect(|_newkeys| vec![Bytes::from_static(&[msg::IGNORE, 0, 0, 0, 0])]);

    match fixture.run(&mut transport) {
        Err(Error::UnexpectedMessage { expected, received }) => {
            assert_eq!(expected, "SSH_MSG_NEWKEYS");
            assert_eq!(received, msg::IGNORE);
        },
        res => panic!("unexpected result {:?}", res),
    }
    assert_eq!(transport.sent_msg_ids(), vec![msg::KEXDH_INIT, msg::NEWKEYS]);
}

#[test]
fn test_invalid_server_dh_pubkey() {
    let p = DhGroup::group_1().p().clone();
    let invalid = [
        BigUint::from(0u32),
        BigUint::from(1u32),
        &p - BigUint::from(1u32),
        p.clone(),
        &p + BigUint::from(1u32),
    ];

    for server_dh_pubkey in invalid {
        let fixture = Fixture::group1_ssh_rsa();
        let mut transport = MockTransport::new();
        let host_key = fixture.server_key.blob();
        transport.expect(move |_init| vec![kexdh_reply(&host_key, &server_dh_pubkey, b"sign")]);

        let err = fixture.run(&mut transport).unwrap_err();
        assert!(matches!(err, Error::PeerValue), "{:?}", err);
        assert_eq!(err.disconnect_reason(), Some(kexdh::codes::disconnect::KEY_EXCHANGE_FAILED));
    }
}

#[test]
fn test_server_closes_connection() {
    let fixture = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    transport.expect(|_init| Vec::new());

    let err = fixture.run(&mut transport).unwrap_err();
    assert!(matches!(err, Error::ChannelClosed));
    assert_eq!(err.disconnect_reason(), None);
}

#[test]
fn test_unknown_algo() {
    let mut fixture = Fixture::group1_ssh_rsa();
    fixture.ctx.kex_algo = "diffie-hellman-group-exchange-sha256".into();
    let mut transport = MockTransport::new();

    match fixture.run(&mut transport) {
        Err(Error::UnknownAlgo { name, .. }) => assert_eq!(name, "diffie-hellman-group-exchange-sha256"),
        res => panic!("unexpected result {:?}", res),
    }
    assert!(transport.sent().is_empty());
}

#[test]
fn test_session_id_is_pinned_on_reexchange() {
    let first = Fixture::group1_ssh_rsa();
    let mut transport = MockTransport::new();
    first.script_server(&mut transport);
    let first_result = first.run(&mut transport).unwrap();

    let mut second = Fixture::group1_ssh_rsa().with_seed(7);
    second.ctx.session_id = Some(first_result.session_id.clone());
    let mut transport = MockTransport::new();
    second.script_server(&mut transport);
    let second_result = second.run(&mut transport).unwrap();

    assert_eq!(second_result.session_id, first_result.session_id);
    assert_eq!(second_result.exchange_hash, second.exchange_hash());
    assert_ne!(second_result.exchange_hash, first_result.exchange_hash);
}

#[test]
fn test_engine_states() {
    init_logging();
    let fixture = Fixture::group1_ssh_rsa();
    let config = KexConfig::default_compatible_less_secure();
    let mut engine = KexEngine::new(&config, fixture.ctx.clone(), &mut fixture.rng.clone()).unwrap();
    assert_eq!(engine.state(), KexState::Start);

    let init = engine.send_packet().unwrap().unwrap();
    assert_eq!(engine.state(), KexState::InitSent);

    engine.recv_packet(fixture.kexdh_reply(init)).unwrap();
    assert_eq!(engine.state(), KexState::ReplyReceived);
    assert_eq!(engine.host_key_to_verify(), Some(&fixture.server_key.blob()));

    engine.host_key_verified(true).unwrap();
    assert_eq!(engine.state(), KexState::SignatureVerified);
    assert_eq!(engine.send_packet().unwrap(), Some(newkeys()));
    assert_eq!(engine.send_packet().unwrap(), None);
    assert!(!engine.is_done());

    engine.recv_packet(newkeys()).unwrap();
    assert_eq!(engine.state(), KexState::KeysConfirmed);
    assert!(engine.is_done());
    assert_eq!(engine.finish().unwrap().exchange_hash, fixture.exchange_hash());
}

#[tokio::test]
async fn test_exchange_keys_async_over_channel() {
    init_logging();
    let fixture = Fixture::group1_ssh_rsa();
    let (mut client, mut server) = ChannelTransport::pair(4);

    let server_fixture = fixture.clone();
    let server_task = tokio::spawn(async move {
        let init = server.recv().await?;
        server.send(server_fixture.kexdh_reply(init)).await?;
        let payload = server.recv().await?;
        assert_eq!(&payload[..], &[msg::NEWKEYS]);
        server.send(newkeys()).await?;
        kexdh::Result::Ok(())
    });

    let config = KexConfig::default_compatible_less_secure();
    let mut rng = fixture.rng.clone();
    let result = kexdh::exchange_keys_async(
        &config, fixture.ctx.clone(), &mut rng, &mut client, &mut |_: &[u8]| true).await.unwrap();
    server_task.await.unwrap().unwrap();

    assert_eq!(result.session_id, fixture.exchange_hash());
    assert_eq!(result.server_pubkey_blob, fixture.server_key.blob());
}

#[tokio::test]
async fn test_exchange_keys_async_timeout() {
    init_logging();
    let fixture = Fixture::group1_ssh_rsa();
    let (client, _server) = ChannelTransport::pair(4);
    let mut client = client.with_recv_timeout(Duration::from_millis(50));

    let config = KexConfig::default_compatible_less_secure();
    let res = kexdh::exchange_keys_async(
        &config, fixture.ctx.clone(), &mut fixture.rng.clone(), &mut client, &mut |_: &[u8]| true).await;
    assert!(matches!(res, Err(Error::Timeout)));
}
