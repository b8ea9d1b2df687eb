//! The `protocol` module is the wire format spoken between the broker and
//! its actors: one `Frame` per datagram, discriminated by its first byte.

pub mod codec;
pub mod message;

pub use codec::{decode, encode, fixed_topic_id, normalize_topic_id};
pub use message::{
    Announcement, ErrorBody, Fragment, Frame, MessageType, PUBLISH_HEADER_LEN, PublishAck,
    Registered, Role, TOPIC_ID_LEN, TopicListing, TopicRef,
};

#[cfg(test)]
mod tests;
