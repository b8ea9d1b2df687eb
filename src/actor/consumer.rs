//! Consumer actor
//!
//! A `Consumer` registers with the consumer role, lists and subscribes to
//! topics, and rebuilds published payloads from the fragments the broker
//! relays. Every finished payload goes to the consumer's `Sink`.
//!
//! Fragments keep arriving while a request waits for its reply, so request
//! loops feed them to the assembler too. Events produced in the meantime
//! are queued and returned by `next_event` first.

use std::collections::{HashSet, VecDeque};

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::session::{Session, rejected};
use super::sink::Sink;
use crate::config::ActorSettings;
use crate::protocol::{Fragment, Frame, Role, TopicListing, TopicRef, normalize_topic_id};
use crate::segment::Assembler;
use crate::utils::{PopsubError, Result};

#[derive(Debug)]
pub enum ConsumerEvent {
    /// A payload was rebuilt and written to the sink.
    Delivered {
        topic_id: String,
        sequence: u32,
        len: usize,
    },
    /// A payload was rebuilt but the sink refused it, or the broker
    /// rejected something we sent.
    Error(PopsubError),
}

#[derive(Debug)]
pub struct Consumer<S: Sink> {
    session: Session,
    assembler: Assembler,
    subscriptions: HashSet<String>,
    pending: VecDeque<ConsumerEvent>,
    sink: S,
}

impl<S: Sink> Consumer<S> {
    /// Opens a session and registers. Blocks until the broker answers.
    pub async fn connect(settings: &ActorSettings, sink: S) -> Result<Self> {
        let mut session = Session::open(settings).await?;
        session.register(Role::Consumer).await?;
        Ok(Self {
            session,
            assembler: Assembler::new(),
            subscriptions: HashSet::new(),
            pending: VecDeque::new(),
            sink,
        })
    }

    pub fn client_id(&self) -> &str {
        self.session.client_id().unwrap_or_default()
    }

    pub fn subscriptions(&self) -> &HashSet<String> {
        &self.subscriptions
    }

    pub fn is_subscribed(&self, topic_id: &str) -> bool {
        self.subscriptions.contains(&normalize_topic_id(topic_id))
    }

    /// Payloads still waiting for fragments.
    pub fn pending_assemblies(&self) -> usize {
        self.assembler.pending()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn list(&mut self) -> Result<Vec<TopicListing>> {
        let topics = self
            .request(Frame::List, |frame| match frame {
                Frame::ListResponse(topics) => Some(Ok(topics.clone())),
                Frame::ListError(_) => Some(Err(rejected(frame))),
                _ => None,
            })
            .await?;
        debug!("Broker lists {} topics", topics.len());
        Ok(topics)
    }

    pub async fn subscribe(&mut self, topic_id: &str) -> Result<String> {
        let topic_id = self
            .request(Frame::Subscribe(TopicRef::new(topic_id)), |frame| match frame {
                Frame::SubscribeResponse(topic) => Some(Ok(topic.topic_id.clone())),
                Frame::SubscribeError(_) => Some(Err(rejected(frame))),
                _ => None,
            })
            .await?;
        info!("Subscribed to {topic_id}");
        self.subscriptions.insert(normalize_topic_id(&topic_id));
        Ok(topic_id)
    }

    pub async fn unsubscribe(&mut self, topic_id: &str) -> Result<String> {
        let topic_id = self
            .request(Frame::Unsubscribe(TopicRef::new(topic_id)), |frame| match frame {
                Frame::UnsubscribeResponse(topic) => Some(Ok(topic.topic_id.clone())),
                Frame::UnsubscribeError(_) => Some(Err(rejected(frame))),
                _ => None,
            })
            .await?;
        info!("Unsubscribed from {topic_id}");
        self.subscriptions.remove(&normalize_topic_id(&topic_id));
        Ok(topic_id)
    }

    /// Sends a direct message to the producer of `topic_id`. Fails when the
    /// topic does not allow messaging.
    pub async fn send_message(&mut self, topic_id: &str, message: &str) -> Result<()> {
        let frame = Frame::Message {
            topic_id: topic_id.to_string(),
            message: message.to_string(),
        };
        self.request(frame, |frame| match frame {
            Frame::MessageResponse(_) => Some(Ok(())),
            Frame::MessageError(_) => Some(Err(rejected(frame))),
            _ => None,
        })
        .await
    }

    /// Waits until a payload is delivered or the broker reports an error.
    pub async fn next_event(&mut self) -> Result<ConsumerEvent> {
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

    /// Receives and delivers payloads until the socket fails.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.next_event().await? {
                ConsumerEvent::Delivered {
                    topic_id,
                    sequence,
                    len,
                } => debug!("Delivered {len} bytes from {topic_id}#{sequence}"),
                ConsumerEvent::Error(e) => warn!("{e}"),
            }
        }
    }

    async fn request<T>(
        &mut self,
        frame: Frame,
        mut reply: impl FnMut(&Frame) -> Option<Result<T>>,
    ) -> Result<T> {
        self.session.send(&frame).await?;

        let timeout_ms = self.session.settings().request_timeout_ms;
        let deadline = Instant::now() + self.session.settings().request_timeout();
        while let Some(frame) = self.session.recv_until(deadline).await? {
            if let Some(outcome) = reply(&frame) {
                return outcome;
            }
            if let Some(event) = self.observe(frame) {
                self.pending.push_back(event);
            }
        }
        Err(PopsubError::Timeout { timeout_ms })
    }

    fn observe(&mut self, frame: Frame) -> Option<ConsumerEvent> {
        match frame {
            Frame::Publish(fragment) => self.accept(fragment, false),
            Frame::PublishCompressed(fragment) => self.accept(fragment, true),
            Frame::SubscribeResponse(topic) => {
                self.subscriptions.insert(normalize_topic_id(&topic.topic_id));
                None
            }
            Frame::UnsubscribeResponse(topic) => {
                self.subscriptions.remove(&normalize_topic_id(&topic.topic_id));
                None
            }
            Frame::RegisterResponse(body) => {
                self.session.observe_registration(&body.client_id);
                None
            }
            other => match other.rejection() {
                Some(e) => {
                    warn!("Broker rejected a request: {e}");
                    Some(ConsumerEvent::Error(e))
                }
                None => {
                    debug!("Ignoring frame {:#04x}", other.discriminant());
                    None
                }
            },
        }
    }

    fn accept(&mut self, fragment: Fragment, compressed: bool) -> Option<ConsumerEvent> {
        let topic_id = normalize_topic_id(&fragment.topic_id);
        let sequence = fragment.sequence;

        let payload = match self.assembler.accept(
            &topic_id,
            sequence,
            fragment.count,
            compressed,
            fragment.data,
        ) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!("Dropping fragment of {topic_id}#{sequence}: {e}");
                return None;
            }
        };

        let len = payload.len();
        info!("Reconstructed data for topic={topic_id}, i={sequence}");
        match self.sink.write(&topic_id, sequence, payload) {
            Ok(()) => Some(ConsumerEvent::Delivered {
                topic_id,
                sequence,
                len,
            }),
            Err(e) => {
                error!("Failed to write {topic_id}#{sequence}: {e}");
                Some(ConsumerEvent::Error(e))
            }
        }
    }
}
