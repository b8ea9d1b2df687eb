use std::collections::HashSet;

use crate::protocol::TopicListing;

pub type SubscriberId = String;

/// A topic announced by a producer.
///
/// `id` is the producer's id followed by the announced suffix, in NFC.
/// `producer_id` never changes once the topic exists. `highest_sequence`
/// only feeds logging; it never blocks a publish.
#[derive(Debug)]
pub struct Topic {
    pub id: String,
    pub producer_id: String,
    pub description: String,
    pub allow_messaging: bool,
    pub subscribers: HashSet<SubscriberId>,
    pub highest_sequence: u32,
}

impl Topic {
    pub fn new(id: &str, producer_id: &str, description: &str, allow_messaging: bool) -> Self {
        Self {
            id: id.to_string(),
            producer_id: producer_id.to_string(),
            description: description.to_string(),
            allow_messaging,
            subscribers: HashSet::new(),
            highest_sequence: 0,
        }
    }

    /// Adds a subscriber. Subscribing twice has no effect.
    pub fn subscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.insert(id)
    }

    /// Removes a subscriber. Unknown subscribers are ignored.
    pub fn unsubscribe(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id)
    }

    /// Records `sequence` if it is newer than anything seen so far.
    pub fn observe_sequence(&mut self, sequence: u32) -> bool {
        if sequence > self.highest_sequence {
            self.highest_sequence = sequence;
            true
        } else {
            false
        }
    }

    pub fn listing(&self) -> TopicListing {
        TopicListing {
            topic_id: self.id.clone(),
            description: self.description.clone(),
            allow_messaging: self.allow_messaging,
        }
    }
}
