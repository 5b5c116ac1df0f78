//! Outbound message delivery with duplicate suppression

use super::protocol::OutboundMessage;
use serde_json::Value;
use std::sync::mpsc::Sender;

/// Destination of outbound messages (the parent frame)
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink {
    fn post(&mut self, message: &Value);
}

/// Sink that buffers messages for the host to drain
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Value>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    /// Take every buffered message
    pub fn drain(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.messages)
    }

    /// `msg` kinds of the buffered messages
    pub fn kinds(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| m.get("msg").and_then(Value::as_str))
            .collect()
    }
}

impl MessageSink for Outbox {
    fn post(&mut self, message: &Value) {
        self.messages.push(message.clone());
    }
}

/// Sink forwarding to another thread over a channel
pub struct ChannelSink {
    sender: Sender<Value>,
}

impl ChannelSink {
    pub fn new(sender: Sender<Value>) -> Self {
        Self { sender }
    }
}

impl MessageSink for ChannelSink {
    fn post(&mut self, message: &Value) {
        if let Err(e) = self.sender.send(message.clone()) {
            log::warn!("Parent channel closed, dropping message: {}", e);
        }
    }
}

/// Posts messages, dropping any identical to the one sent just before
pub struct Messenger<P: MessageSink> {
    sink: P,
    last_key: Option<String>,
    sent: u64,
    suppressed: u64,
}

impl<P: MessageSink> Messenger<P> {
    pub fn new(sink: P) -> Self {
        Self {
            sink,
            last_key: None,
            sent: 0,
            suppressed: 0,
        }
    }

    /// Send `message` unless it repeats the previous one; returns whether
    /// it was sent
    pub fn post(&mut self, message: &OutboundMessage) -> bool {
        let envelope = match message.to_envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("Could not encode {} message: {}", message.kind(), e);
                return false;
            }
        };
        self.post_value(&envelope)
    }

    /// Send a raw envelope with the same duplicate check
    ///
    /// When the comparison key cannot be computed the message is sent anyway.
    pub fn post_value(&mut self, envelope: &Value) -> bool {
        match serde_json::to_string(envelope) {
            Ok(key) => {
                if self.last_key.as_deref() == Some(key.as_str()) {
                    self.suppressed += 1;
                    log::trace!("Suppressed duplicate message: {}", key);
                    return false;
                }
                self.last_key = Some(key);
            }
            Err(e) => log::debug!("Dedup key unavailable, sending anyway: {}", e),
        }
        self.sink.post(envelope);
        self.sent += 1;
        true
    }

    /// Forget the previous message so the next one always goes out
    pub fn reset(&mut self) {
        self.last_key = None;
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn into_sink(self) -> P {
        self.sink
    }
}
