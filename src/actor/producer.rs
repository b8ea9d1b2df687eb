//! Producer actor
//!
//! A `Producer` registers with the producer role, announces topics under
//! its own client id and publishes payloads to them. Publishing is
//! fire-and-forget: every fragment is sent once, and acknowledgements
//! surface later through `next_event`.

use std::collections::VecDeque;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::session::{Session, rejected};
use crate::config::ActorSettings;
use crate::protocol::{Announcement, Fragment, Frame, PublishAck, Role, normalize_topic_id};
use crate::segment::{chunk, compress};
use crate::utils::{PopsubError, Result};

/// Something the broker told the producer outside of a request.
#[derive(Debug)]
pub enum ProducerEvent {
    /// A fragment was accepted and relayed.
    Published(PublishAck),
    /// A consumer messaged one of our topics.
    Message { topic_id: String, message: String },
    /// The broker rejected something we sent.
    Error(PopsubError),
}

#[derive(Debug)]
pub struct Producer {
    session: Session,
    announced: Vec<String>,
    pending: VecDeque<ProducerEvent>,
}

impl Producer {
    /// Opens a session and registers. Blocks until the broker answers.
    pub async fn connect(settings: &ActorSettings) -> Result<Self> {
        let mut session = Session::open(settings).await?;
        session.register(Role::Producer).await?;
        Ok(Self {
            session,
            announced: Vec::new(),
            pending: VecDeque::new(),
        })
    }

    pub fn client_id(&self) -> &str {
        self.session.client_id().unwrap_or_default()
    }

    /// Topic ids the broker confirmed for this producer.
    pub fn announced(&self) -> &[String] {
        &self.announced
    }

    /// Announces a topic named by `suffix`. The broker prefixes it with our
    /// client id and returns the full topic id.
    pub async fn announce(
        &mut self,
        suffix: &str,
        allow_messaging: bool,
        description: &str,
    ) -> Result<String> {
        let request = Frame::Announce(Announcement {
            topic_id: suffix.to_string(),
            description: description.to_string(),
            allow_messaging,
        });
        self.session.send(&request).await?;

        let timeout_ms = self.session.settings().request_timeout_ms;
        let deadline = Instant::now() + self.session.settings().request_timeout();
        while let Some(frame) = self.session.recv_until(deadline).await? {
            match frame {
                Frame::AnnounceResponse(topic) => {
                    info!("Announced topic: {}", topic.topic_id);
                    self.announced.push(topic.topic_id.clone());
                    return Ok(topic.topic_id);
                }
                frame @ Frame::AnnounceError(_) => return Err(rejected(&frame)),
                other => {
                    if let Some(event) = self.observe(other) {
                        self.pending.push_back(event);
                    }
                }
            }
        }
        Err(PopsubError::Timeout { timeout_ms })
    }

    /// Splits `payload` into fragments and sends each once. With `compress`
    /// the whole payload is gzipped first. Returns the number of fragments
    /// sent; an empty uncompressed payload sends none.
    pub async fn publish(
        &mut self,
        topic_id: &str,
        sequence: u32,
        payload: &[u8],
        compress_payload: bool,
    ) -> Result<usize> {
        let data = if compress_payload {
            compress(payload)?
        } else {
            payload.to_vec()
        };

        let fragments = chunk(&data);
        let count = u32::try_from(fragments.len()).map_err(|_| {
            PopsubError::protocol(format!(
                "payload of {} bytes needs too many fragments",
                data.len()
            ))
        })?;
        if fragments.is_empty() {
            warn!("Nothing to publish on {topic_id}#{sequence}: empty payload");
            return Ok(0);
        }

        for data in fragments {
            let fragment = Fragment {
                topic_id: topic_id.to_string(),
                sequence,
                count,
                data,
            };
            let frame = if compress_payload {
                Frame::PublishCompressed(fragment)
            } else {
                Frame::Publish(fragment)
            };
            self.session.send(&frame).await?;
        }

        info!(
            "Published {} bytes to {topic_id}#{sequence} in {count} fragments{}",
            payload.len(),
            if compress_payload { " (compressed)" } else { "" }
        );
        Ok(count as usize)
    }

    /// Waits for the next acknowledgement, message or error from the broker.
    pub async fn next_event(&mut self) -> Result<ProducerEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }
        loop {
            let frame = self.session.recv().await?;
            if let Some(event) = self.observe(frame) {
                return Ok(event);
            }
        }
    }

    fn observe(&mut self, frame: Frame) -> Option<ProducerEvent> {
        match frame {
            Frame::PublishResponse(ack) | Frame::PublishCompressedResponse(ack) => {
                debug!("Fragment of {}#{} acknowledged", ack.topic_id, ack.sequence);
                Some(ProducerEvent::Published(ack))
            }
            Frame::Message { topic_id, message } => {
                let topic_id = normalize_topic_id(&topic_id);
                info!("Message on {topic_id}: {message}");
                Some(ProducerEvent::Message { topic_id, message })
            }
            Frame::RegisterResponse(body) => {
                self.session.observe_registration(&body.client_id);
                None
            }
            other => match other.rejection() {
                Some(e) => {
                    warn!("Broker rejected a request: {e}");
                    Some(ProducerEvent::Error(e))
                }
                None => {
                    debug!("Ignoring frame {:#04x}", other.discriminant());
                    None
                }
            },
        }
    }
}
