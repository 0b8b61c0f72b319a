//! Drivers that run the [`KexEngine`] over a transport.
//!
//! The blocking and the async driver perform exactly the same steps, they differ only in how
//! they wait for the next message from the server.
use crate::config::KexConfig;
use crate::error::Result;
use crate::kex::{ExchangeContext, ExchangeResult, KexEngine};
use crate::transport::{AsyncTransport, Transport};
use crate::util::CryptoRngCore;
use crate::verifier::HostKeyVerifier;

/// Performs a complete key exchange over a blocking transport.
///
/// The algorithms named in `ctx` are looked up in `config`. See [`run_kex()`] for details.
pub fn exchange_keys(
    config: &KexConfig,
    ctx: ExchangeContext,
    rng: &mut dyn CryptoRngCore,
    transport: &mut impl Transport,
    verifier: &mut impl HostKeyVerifier,
) -> Result<ExchangeResult> {
    let engine = KexEngine::new(config, ctx, rng)?;
    run_kex(engine, transport, verifier)
}

/// Performs a complete key exchange over an async transport.
///
/// The algorithms named in `ctx` are looked up in `config`. See [`run_kex_async()`] for details.
pub async fn exchange_keys_async(
    config: &KexConfig,
    ctx: ExchangeContext,
    rng: &mut dyn CryptoRngCore,
    transport: &mut impl AsyncTransport,
    verifier: &mut impl HostKeyVerifier,
) -> Result<ExchangeResult> {
    let engine = KexEngine::new(config, ctx, rng)?;
    run_kex_async(engine, transport, verifier).await
}

/// Drives `engine` to completion over a blocking transport.
///
/// Messages produced by the engine are sent to `transport`, the host key is presented to
/// `verifier`, and we block on the transport whenever the engine waits for a message from the
/// server. Any error (including errors of the transport) aborts the engine.
pub fn run_kex(
    mut engine: KexEngine,
    transport: &mut impl Transport,
    verifier: &mut impl HostKeyVerifier,
) -> Result<ExchangeResult> {
    loop {
        match step(&mut engine, verifier)? {
            Step::Send(payload) =>
                transport.send(payload).map_err(|err| engine.abort(err))?,
            Step::Recv => {
                let payload = transport.recv().map_err(|err| engine.abort(err))?;
                engine.recv_packet(payload)?;
            },
            Step::Done => return engine.finish(),
        }
    }
}

/// Drives `engine` to completion over an async transport.
///
/// This is the same as [`run_kex()`], but it suspends instead of blocking while waiting for
/// the server.
pub async fn run_kex_async(
    mut engine: KexEngine,
    transport: &mut impl AsyncTransport,
    verifier: &mut impl HostKeyVerifier,
) -> Result<ExchangeResult> {
    loop {
        match step(&mut engine, verifier)? {
            Step::Send(payload) =>
                transport.send(payload).await.map_err(|err| engine.abort(err))?,
            Step::Recv => {
                let payload = transport.recv().await.map_err(|err| engine.abort(err))?;
                engine.recv_packet(payload)?;
            },
            Step::Done => return engine.finish(),
        }
    }
}

enum Step {
    Send(bytes::Bytes),
    Recv,
    Done,
}

fn step(engine: &mut KexEngine, verifier: &mut impl HostKeyVerifier) -> Result<Step> {
    if let Some(payload) = engine.send_packet()? {
        return Ok(Step::Send(payload))
    }

    if let Some(host_key) = engine.host_key_to_verify() {
        let accepted = verifier.approve(host_key);
        engine.host_key_verified(accepted)?;
        return step(engine, verifier)
    }

    if engine.is_done() {
        return Ok(Step::Done)
    }
    Ok(Step::Recv)
}
