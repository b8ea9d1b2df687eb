//! Destinations for reconstructed payloads.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

use crate::utils::{PopsubError, Result};

/// Receives every payload a consumer finishes reassembling.
pub trait Sink {
    fn write(&mut self, topic_id: &str, sequence: u32, payload: Vec<u8>) -> Result<()>;
}

/// A reconstructed payload as handed to a `ChannelSink` reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic_id: String,
    pub sequence: u32,
    pub payload: Vec<u8>,
}

/// Forwards payloads to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<Delivery>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<Delivery>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Sink for ChannelSink {
    fn write(&mut self, topic_id: &str, sequence: u32, payload: Vec<u8>) -> Result<()> {
        self.tx
            .send(Delivery {
                topic_id: topic_id.to_string(),
                sequence,
                payload,
            })
            .map_err(|_| PopsubError::Sink("delivery channel closed".to_string()))
    }
}

/// Logs each payload's size and preview, then drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn write(&mut self, topic_id: &str, sequence: u32, payload: Vec<u8>) -> Result<()> {
        let preview: String = String::from_utf8_lossy(&payload).chars().take(64).collect();
        info!(
            "Received {} bytes on {topic_id}#{sequence}: {preview:?}",
            payload.len()
        );
        Ok(())
    }
}
