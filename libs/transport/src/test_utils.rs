//! Test doubles for exercising the transport without a real wire

use crate::endpoint::{Endpoint, MessageListener};
use crate::error::{TransportError, TransportResult};
use crate::wire::WireTransport;
use async_trait::async_trait;
use mal_codec::MalMessage;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A wire that records every frame and can be told to fail specific sends
#[derive(Debug)]
pub struct RecordingWire {
    protocol: String,
    base_uri: String,
    frames: Mutex<Vec<(String, Vec<u8>)>>,
    /// Destinations whose next sends fail; each entry consumed once
    fail_queue: Mutex<VecDeque<String>>,
    flushes: AtomicUsize,
}

impl RecordingWire {
    pub fn new() -> Self {
        Self::with_base("malref", "malref://local")
    }

    pub fn with_base(protocol: impl Into<String>, base_uri: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            base_uri: base_uri.into(),
            frames: Mutex::new(Vec::new()),
            fail_queue: Mutex::new(VecDeque::new()),
            flushes: AtomicUsize::new(0),
        }
    }

    /// Make the next send to `destination` fail
    pub fn fail_next_send_to(&self, destination: impl Into<String>) {
        self.fail_queue.lock().push_back(destination.into());
    }

    pub fn sent_frames(&self) -> Vec<(String, Vec<u8>)> {
        self.frames.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl Default for RecordingWire {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WireTransport for RecordingWire {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn local_base_uri(&self) -> String {
        self.base_uri.clone()
    }

    async fn send_frame(&self, destination: &str, frame: &[u8]) -> TransportResult<()> {
        let should_fail = {
            let mut fail_queue = self.fail_queue.lock();
            match fail_queue.iter().position(|d| d == destination) {
                Some(index) => {
                    fail_queue.remove(index);
                    true
                }
                None => false,
            }
        };
        if should_fail {
            return Err(TransportError::delivery_failed(
                destination,
                "injected wire failure",
            ));
        }
        self.frames
            .lock()
            .push((destination.to_string(), frame.to_vec()));
        Ok(())
    }

    async fn flush(&self) -> TransportResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A wire that rejects every frame
#[derive(Debug)]
pub struct FailingWire {
    base_uri: String,
    attempts: AtomicUsize,
}

impl FailingWire {
    pub fn new() -> Self {
        Self {
            base_uri: "malref://local".to_string(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// How many sends actually reached the wire (quarantine refusals do not)
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for FailingWire {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WireTransport for FailingWire {
    fn protocol(&self) -> &str {
        "malref"
    }

    fn local_base_uri(&self) -> String {
        self.base_uri.clone()
    }

    async fn send_frame(&self, destination: &str, _frame: &[u8]) -> TransportResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::delivery_failed(destination, "wire is down"))
    }
}

/// A listener that collects everything it is given
#[derive(Debug, Default)]
pub struct CollectingListener {
    messages: Mutex<Vec<MalMessage>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Take everything received so far
    pub fn drain(&self) -> Vec<MalMessage> {
        self.messages.lock().drain(..).collect()
    }

    /// Run `f` over the message at `index`
    pub fn with_message<R>(&self, index: usize, f: impl FnOnce(&MalMessage) -> R) -> Option<R> {
        self.messages.lock().get(index).map(f)
    }
}

impl MessageListener for CollectingListener {
    fn on_message(&self, _endpoint: &Endpoint, message: MalMessage) {
        self.messages.lock().push(message);
    }
}
