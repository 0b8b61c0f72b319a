use bytes::Bytes;
use kexdh::{Error, Result, Transport};
use std::collections::VecDeque;

type Expectation = Box<dyn FnOnce(Bytes) -> Vec<Bytes>>;

/// Scripted server for the blocking [`Transport`].
///
/// Every message sent by the client is handed to the next expectation, which checks it and
/// returns the messages that the server sends back. Receiving when the server has nothing to send
/// fails as if the server closed the connection.
#[derive(Default)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    queue: VecDeque<Bytes>,
    sent: Vec<Bytes>,
}

impl MockTransport {
    pub fn new() -> MockTransport {
        MockTransport::default()
    }

    pub fn expect<F>(&mut self, f: F)
        where F: FnOnce(Bytes) -> Vec<Bytes> + 'static
    {
        self.expectations.push_back(Box::new(f));
    }

    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }

    pub fn sent_msg_ids(&self) -> Vec<u8> {
        self.sent.iter().map(|payload| payload[0]).collect()
    }

    pub fn is_exhausted(&self) -> bool {
        self.expectations.is_empty() && self.queue.is_empty()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, payload: Bytes) -> Result<()> {
        self.sent.push(payload.clone());
        let Some(expectation) = self.expectations.pop_front() else {
            panic!("got {:?} but was not expecting anything", payload)
        };
        let replies = expectation(payload);
        self.queue.extend(replies);
        Ok(())
    }

    fn recv(&mut self) -> Result<Bytes> {
        self.queue.pop_front().ok_or(Error::ChannelClosed)
    }
}
