//! Frame definitions for the datagram protocol
//!
//! Every datagram carries exactly one `Frame`. Byte 0 is the `MessageType`
//! discriminant: requests live in `0x00..=0x07`, responses in
//! `0x10..=0x17` and errors in `0x20..=0x27`. JSON bodies keep the field
//! names used on the wire (`topicID`, `clientID`, `allowMessaging`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::PopsubError;

/// Width of the fixed topic identifier field in Publish and Message frames.
pub const TOPIC_ID_LEN: usize = 20;

/// discriminant + topic id + sequence + fragment count
pub const PUBLISH_HEADER_LEN: usize = 1 + TOPIC_ID_LEN + 4 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Register = 0x00,
    List = 0x01,
    Announce = 0x02,
    Subscribe = 0x03,
    Unsubscribe = 0x04,
    Publish = 0x05,
    PublishCompressed = 0x06,
    Message = 0x07,

    RegisterResponse = 0x10,
    ListResponse = 0x11,
    AnnounceResponse = 0x12,
    SubscribeResponse = 0x13,
    UnsubscribeResponse = 0x14,
    PublishResponse = 0x15,
    PublishCompressedResponse = 0x16,
    MessageResponse = 0x17,

    RegisterError = 0x20,
    ListError = 0x21,
    AnnounceError = 0x22,
    SubscribeError = 0x23,
    UnsubscribeError = 0x24,
    PublishError = 0x25,
    PublishCompressedError = 0x26,
    MessageError = 0x27,
}

impl TryFrom<u8> for MessageType {
    /// The unrecognized discriminant.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use MessageType::*;
        Ok(match value {
            0x00 => Register,
            0x01 => List,
            0x02 => Announce,
            0x03 => Subscribe,
            0x04 => Unsubscribe,
            0x05 => Publish,
            0x06 => PublishCompressed,
            0x07 => Message,
            0x10 => RegisterResponse,
            0x11 => ListResponse,
            0x12 => AnnounceResponse,
            0x13 => SubscribeResponse,
            0x14 => UnsubscribeResponse,
            0x15 => PublishResponse,
            0x16 => PublishCompressedResponse,
            0x17 => MessageResponse,
            0x20 => RegisterError,
            0x21 => ListError,
            0x22 => AnnounceError,
            0x23 => SubscribeError,
            0x24 => UnsubscribeError,
            0x25 => PublishError,
            0x26 => PublishCompressedError,
            0x27 => MessageError,
            other => return Err(other),
        })
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind as u8
    }
}

/// Role a client declares when it registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    Consumer = 0x00,
    Producer = 0x01,
}

impl TryFrom<u8> for Role {
    type Error = PopsubError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Role::Consumer),
            0x01 => Ok(Role::Producer),
            other => Err(PopsubError::protocol(format!("unknown role byte {other:#04x}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Consumer => f.write_str("consumer"),
            Role::Producer => f.write_str("producer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registered {
    #[serde(rename = "clientID")]
    pub client_id: String,
}

/// Body of an Announce request. `topic_id` is the suffix the broker appends
/// to the producer's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(rename = "topicID")]
    pub topic_id: String,
    pub description: String,
    #[serde(rename = "allowMessaging")]
    pub allow_messaging: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    #[serde(rename = "topicID")]
    pub topic_id: String,
}

impl TopicRef {
    pub fn new<S: Into<String>>(topic_id: S) -> Self {
        Self {
            topic_id: topic_id.into(),
        }
    }
}

/// One row of the topic directory returned by List.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicListing {
    #[serde(rename = "topicID")]
    pub topic_id: String,
    pub description: String,
    #[serde(rename = "allowMessaging")]
    pub allow_messaging: bool,
}

/// Acknowledges a single Publish fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishAck {
    #[serde(rename = "topicID")]
    pub topic_id: String,
    #[serde(rename = "i")]
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// One fragment of a published payload.
///
/// `topic_id` is carried in a fixed 20-byte field and keeps its null
/// padding after decoding. `data` is opaque to the protocol; segmentation
/// stores the fragment index in its first four bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub topic_id: String,
    pub sequence: u32,
    pub count: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Register { role: Role },
    List,
    Announce(Announcement),
    Subscribe(TopicRef),
    Unsubscribe(TopicRef),
    Publish(Fragment),
    PublishCompressed(Fragment),
    Message { topic_id: String, message: String },

    RegisterResponse(Registered),
    ListResponse(Vec<TopicListing>),
    AnnounceResponse(TopicRef),
    SubscribeResponse(TopicRef),
    UnsubscribeResponse(TopicRef),
    PublishResponse(PublishAck),
    PublishCompressedResponse(PublishAck),
    MessageResponse(TopicRef),

    RegisterError(ErrorBody),
    ListError(ErrorBody),
    AnnounceError(ErrorBody),
    SubscribeError(ErrorBody),
    UnsubscribeError(ErrorBody),
    PublishError(ErrorBody),
    PublishCompressedError(ErrorBody),
    MessageError(ErrorBody),

    /// Header-only frame with a discriminant this build does not know.
    Unknown(u8),
}

impl Frame {
    /// The discriminant written to byte 0.
    pub fn discriminant(&self) -> u8 {
        self.message_type().map_or_else(|byte| byte, u8::from)
    }

    /// The frame's type, or the raw discriminant of an `Unknown` frame.
    pub fn message_type(&self) -> Result<MessageType, u8> {
        use MessageType as T;
        Ok(match self {
            Frame::Register { .. } => T::Register,
            Frame::List => T::List,
            Frame::Announce(_) => T::Announce,
            Frame::Subscribe(_) => T::Subscribe,
            Frame::Unsubscribe(_) => T::Unsubscribe,
            Frame::Publish(_) => T::Publish,
            Frame::PublishCompressed(_) => T::PublishCompressed,
            Frame::Message { .. } => T::Message,
            Frame::RegisterResponse(_) => T::RegisterResponse,
            Frame::ListResponse(_) => T::ListResponse,
            Frame::AnnounceResponse(_) => T::AnnounceResponse,
            Frame::SubscribeResponse(_) => T::SubscribeResponse,
            Frame::UnsubscribeResponse(_) => T::UnsubscribeResponse,
            Frame::PublishResponse(_) => T::PublishResponse,
            Frame::PublishCompressedResponse(_) => T::PublishCompressedResponse,
            Frame::MessageResponse(_) => T::MessageResponse,
            Frame::RegisterError(_) => T::RegisterError,
            Frame::ListError(_) => T::ListError,
            Frame::AnnounceError(_) => T::AnnounceError,
            Frame::SubscribeError(_) => T::SubscribeError,
            Frame::UnsubscribeError(_) => T::UnsubscribeError,
            Frame::PublishError(_) => T::PublishError,
            Frame::PublishCompressedError(_) => T::PublishCompressedError,
            Frame::MessageError(_) => T::MessageError,
            Frame::Unknown(byte) => return Err(*byte),
        })
    }

    /// Converts an error frame into the matching `PopsubError::Rejected`.
    pub fn rejection(&self) -> Option<PopsubError> {
        let body = match self {
            Frame::RegisterError(body)
            | Frame::ListError(body)
            | Frame::AnnounceError(body)
            | Frame::SubscribeError(body)
            | Frame::UnsubscribeError(body)
            | Frame::PublishError(body)
            | Frame::PublishCompressedError(body)
            | Frame::MessageError(body) => body,
            _ => return None,
        };
        Some(PopsubError::Rejected {
            kind: self.message_type().ok()?,
            message: body.error.clone(),
        })
    }
}
