//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - registering clients by transport address
//! - creating topics on Announce and tracking their subscribers
//! - validating Publish fragments and relaying them verbatim to subscribers
//! - relaying direct messages to a topic's producer when the topic allows it
//!
//! Concurrency and usage notes:
//! - The broker is owned by a single task and handles one datagram at a
//!   time, so the registries need no locking.
//! - Handlers never block on peers. Replies and relays are queued on the
//!   outbox and sent by the transport.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::broker::message::Outbound;
use crate::broker::topic::Topic;
use crate::client::{ClientRecord, generate_client_id};
use crate::protocol::{
    Announcement, ErrorBody, Fragment, Frame, PublishAck, Registered, Role, TOPIC_ID_LEN,
    TopicRef, normalize_topic_id,
};
use crate::utils::{PopsubError, Result};

#[derive(Debug)]
pub struct Broker {
    pub topics: HashMap<String, Topic>,
    pub clients: HashMap<SocketAddr, ClientRecord>,
    outbox: UnboundedSender<Outbound>,
}

impl Broker {
    /// How often registration redraws an id already held by another client.
    const ID_REDRAWS: usize = 32;

    pub fn new(outbox: UnboundedSender<Outbound>) -> Self {
        Self {
            topics: HashMap::new(),
            clients: HashMap::new(),
            outbox,
        }
    }

    /// Decodes one datagram and runs the matching handler.
    ///
    /// Undecodable datagrams are dropped. A rejected request is answered
    /// with the error frame of its own type.
    pub fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr) {
        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping datagram from {from}: {e}");
                return;
            }
        };

        let (outcome, reject): (Result<Frame>, fn(ErrorBody) -> Frame) = match &frame {
            Frame::Register { role } => (Ok(self.register(from, *role)), Frame::RegisterError),
            Frame::List => (Ok(self.list()), Frame::ListError),
            Frame::Announce(body) => (self.announce(from, body), Frame::AnnounceError),
            Frame::Subscribe(body) => (self.subscribe(from, &body.topic_id), Frame::SubscribeError),
            Frame::Unsubscribe(body) => (
                self.unsubscribe(from, &body.topic_id),
                Frame::UnsubscribeError,
            ),
            // both publish variants share one reply pair
            Frame::Publish(fragment) | Frame::PublishCompressed(fragment) => {
                (self.publish(from, fragment, bytes), Frame::PublishError)
            }
            Frame::Message { topic_id, .. } => {
                (self.relay_message(from, topic_id, bytes), Frame::MessageError)
            }
            Frame::RegisterResponse(_)
            | Frame::ListResponse(_)
            | Frame::AnnounceResponse(_)
            | Frame::SubscribeResponse(_)
            | Frame::UnsubscribeResponse(_)
            | Frame::PublishResponse(_)
            | Frame::PublishCompressedResponse(_)
            | Frame::MessageResponse(_)
            | Frame::RegisterError(_)
            | Frame::ListError(_)
            | Frame::AnnounceError(_)
            | Frame::SubscribeError(_)
            | Frame::UnsubscribeError(_)
            | Frame::PublishError(_)
            | Frame::PublishCompressedError(_)
            | Frame::MessageError(_)
            | Frame::Unknown(_) => {
                debug!(
                    "Ignoring frame {:#04x} from {from}: not a request",
                    frame.discriminant()
                );
                return;
            }
        };

        let reply = outcome.unwrap_or_else(|e| {
            warn!("Rejected {:#04x} from {from}: {e}", frame.discriminant());
            reject(ErrorBody::new(e.to_string()))
        });
        self.send(from, &reply);
    }

    /// Stores a new record for `from`, replacing any earlier registration
    /// from the same address.
    pub fn register(&mut self, from: SocketAddr, role: Role) -> Frame {
        let client = ClientRecord::new(self.fresh_client_id(from), from, role);
        let client_id = client.id.clone();
        info!(
            "Registered a new {role}: {client_id} ({from}) at {}",
            client.registered_at.to_rfc3339()
        );
        if let Some(previous) = self.clients.insert(from, client) {
            debug!(
                "{from} re-registered; replaced {} registered at {}",
                previous.id,
                previous.registered_at.to_rfc3339()
            );
        }
        Frame::RegisterResponse(Registered { client_id })
    }

    pub fn list(&self) -> Frame {
        let mut listings: Vec<_> = self.topics.values().map(Topic::listing).collect();
        listings.sort_by(|a, b| a.topic_id.cmp(&b.topic_id));
        debug!("Sending list of {} topics", listings.len());
        Frame::ListResponse(listings)
    }

    pub fn announce(&mut self, from: SocketAddr, body: &Announcement) -> Result<Frame> {
        let producer_id = match self.clients.get(&from) {
            Some(client) if client.is_producer() => client.id.clone(),
            _ => {
                return Err(PopsubError::permission(
                    "Only producers can announce topics.",
                ));
            }
        };

        let topic_id = normalize_topic_id(&format!("{producer_id}{}", body.topic_id));
        if topic_id.len() > TOPIC_ID_LEN {
            return Err(PopsubError::protocol(format!(
                "Topic id {topic_id} exceeds {TOPIC_ID_LEN} bytes."
            )));
        }
        if self.topics.contains_key(&topic_id) {
            return Err(PopsubError::conflict("Topic already exists."));
        }

        self.topics.insert(
            topic_id.clone(),
            Topic::new(
                &topic_id,
                &producer_id,
                &body.description,
                body.allow_messaging,
            ),
        );
        info!("New topic announced: {topic_id}");
        Ok(Frame::AnnounceResponse(TopicRef::new(topic_id)))
    }

    pub fn subscribe(&mut self, from: SocketAddr, topic_id: &str) -> Result<Frame> {
        let subscriber = self.consumer_id(from, "Only consumers can subscribe to topics.")?;
        let topic = self.topic_mut(topic_id)?;
        topic.subscribe(subscriber.clone());
        info!("{subscriber} subscribed to {}", topic.id);
        Ok(Frame::SubscribeResponse(TopicRef::new(topic.id.clone())))
    }

    pub fn unsubscribe(&mut self, from: SocketAddr, topic_id: &str) -> Result<Frame> {
        let subscriber =
            self.consumer_id(from, "Only consumers can unsubscribe from topics.")?;
        let topic = self.topic_mut(topic_id)?;
        topic.unsubscribe(&subscriber);
        info!("{subscriber} unsubscribed from {}", topic.id);
        Ok(Frame::UnsubscribeResponse(TopicRef::new(topic.id.clone())))
    }

    /// Validates a fragment and relays `raw`, the datagram exactly as
    /// received, to every subscriber of the topic. Compressed and plain
    /// fragments are acknowledged alike with a PublishResponse.
    pub fn publish(&mut self, from: SocketAddr, fragment: &Fragment, raw: &[u8]) -> Result<Frame> {
        let publisher = self
            .clients
            .get(&from)
            .map(|client| client.id.clone())
            .ok_or_else(|| PopsubError::not_found("Client not found."))?;

        let topic = self.topic_mut(&fragment.topic_id)?;
        if topic.producer_id != publisher {
            return Err(PopsubError::permission(format!(
                "You are not the owner of this topic. It belongs to {}",
                topic.producer_id
            )));
        }

        if topic.observe_sequence(fragment.sequence) {
            info!(
                "Published to topic {} iteration {}",
                topic.id, fragment.sequence
            );
        }

        let topic_id = topic.id.clone();
        let subscribers: Vec<_> = topic.subscribers.iter().cloned().collect();
        for subscriber in &subscribers {
            match self.address_of(subscriber) {
                Some(addr) => self.forward(addr, raw),
                None => warn!("No client registered with id: {subscriber}"),
            }
        }
        debug!(
            "Relayed fragment of {topic_id}#{} to {} subscribers",
            fragment.sequence,
            subscribers.len()
        );

        Ok(Frame::PublishResponse(PublishAck {
            topic_id,
            sequence: fragment.sequence,
        }))
    }

    /// Relays a direct message to the topic's producer.
    pub fn relay_message(&mut self, from: SocketAddr, topic_id: &str, raw: &[u8]) -> Result<Frame> {
        if !self.clients.contains_key(&from) {
            return Err(PopsubError::not_found("Client not found."));
        }

        let topic = self.topic_mut(topic_id)?;
        if !topic.allow_messaging {
            return Err(PopsubError::permission(
                "Messaging is not allowed on this topic.",
            ));
        }
        let topic_id = topic.id.clone();
        let producer_id = topic.producer_id.clone();

        match self.address_of(&producer_id) {
            Some(addr) => self.forward(addr, raw),
            None => warn!("Producer {producer_id} of {topic_id} is no longer registered"),
        }
        Ok(Frame::MessageResponse(TopicRef::new(topic_id)))
    }

    pub fn client(&self, addr: &SocketAddr) -> Option<&ClientRecord> {
        self.clients.get(addr)
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.get(&normalize_topic_id(topic_id))
    }

    /// Draws a display id, redrawing a few times while another address holds
    /// the same one. The id space is small, so this is best effort.
    fn fresh_client_id(&self, from: SocketAddr) -> String {
        let taken = |id: &str| {
            self.clients
                .iter()
                .any(|(addr, client)| *addr != from && client.id == id)
        };
        let mut id = generate_client_id();
        for _ in 0..Self::ID_REDRAWS {
            if !taken(&id) {
                break;
            }
            id = generate_client_id();
        }
        id
    }

    fn consumer_id(&self, from: SocketAddr, denial: &str) -> Result<String> {
        match self.clients.get(&from) {
            Some(client) if client.is_consumer() => Ok(client.id.clone()),
            _ => Err(PopsubError::permission(denial)),
        }
    }

    fn topic_mut(&mut self, topic_id: &str) -> Result<&mut Topic> {
        self.topics
            .get_mut(&normalize_topic_id(topic_id))
            .ok_or_else(|| PopsubError::not_found("Topic does not exist."))
    }

    fn address_of(&self, client_id: &str) -> Option<SocketAddr> {
        self.clients
            .values()
            .find(|client| client.id == client_id)
            .map(|client| client.addr)
    }

    fn send(&self, addr: SocketAddr, frame: &Frame) {
        match frame.encode() {
            Ok(bytes) => self.forward(addr, &bytes),
            Err(e) => warn!("Failed to encode reply for {addr}: {e}"),
        }
    }

    fn forward(&self, addr: SocketAddr, bytes: &[u8]) {
        if let Err(e) = self.outbox.send(Outbound::new(addr, bytes.to_vec())) {
            warn!("Failed to queue datagram for {addr}: {e}");
        }
    }
}
