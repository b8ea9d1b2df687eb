//! Binary encoding of `Frame`s
//!
//! Layouts (all integers big-endian):
//!
//! ```text
//! Register            | type | role |
//! List, Unknown       | type |
//! Publish(Compressed) | type | topic id (20) | sequence (4) | count (4) | fragment bytes ... |
//! Message             | type | topic id (20) | JSON ... |
//! everything else     | type | JSON ... |
//! ```

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::message::{
    Announcement, ErrorBody, Fragment, Frame, MessageType, PUBLISH_HEADER_LEN, PublishAck,
    Registered, Role, TOPIC_ID_LEN, TopicListing, TopicRef,
};
use crate::utils::{PopsubError, Result};

/// The ListResponse body nests the directory as a JSON string.
#[derive(Serialize, Deserialize)]
struct Directory {
    topics: String,
}

#[derive(Serialize, Deserialize)]
struct Chat {
    message: String,
}

pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
    let mut buf = vec![frame.discriminant()];

    match frame {
        Frame::Register { role } => buf.push(*role as u8),
        Frame::List | Frame::Unknown(_) => {}
        Frame::Publish(fragment) | Frame::PublishCompressed(fragment) => {
            buf.reserve(PUBLISH_HEADER_LEN - 1 + fragment.data.len());
            write_topic_id(&mut buf, &fragment.topic_id);
            buf.extend_from_slice(&fragment.sequence.to_be_bytes());
            buf.extend_from_slice(&fragment.count.to_be_bytes());
            buf.extend_from_slice(&fragment.data);
        }
        Frame::Message { topic_id, message } => {
            write_topic_id(&mut buf, topic_id);
            serde_json::to_writer(
                &mut buf,
                &Chat {
                    message: message.clone(),
                },
            )?;
        }
        Frame::Announce(body) => serde_json::to_writer(&mut buf, body)?,
        Frame::RegisterResponse(body) => serde_json::to_writer(&mut buf, body)?,
        Frame::ListResponse(listings) => {
            let topics = serde_json::to_string(listings)?;
            serde_json::to_writer(&mut buf, &Directory { topics })?;
        }
        Frame::Subscribe(body)
        | Frame::Unsubscribe(body)
        | Frame::AnnounceResponse(body)
        | Frame::SubscribeResponse(body)
        | Frame::UnsubscribeResponse(body)
        | Frame::MessageResponse(body) => serde_json::to_writer(&mut buf, body)?,
        Frame::PublishResponse(ack) | Frame::PublishCompressedResponse(ack) => {
            serde_json::to_writer(&mut buf, ack)?
        }
        Frame::RegisterError(body)
        | Frame::ListError(body)
        | Frame::AnnounceError(body)
        | Frame::SubscribeError(body)
        | Frame::UnsubscribeError(body)
        | Frame::PublishError(body)
        | Frame::PublishCompressedError(body)
        | Frame::MessageError(body) => serde_json::to_writer(&mut buf, body)?,
    }

    Ok(buf)
}

pub fn decode(buf: &[u8]) -> Result<Frame> {
    let Some((&first, rest)) = buf.split_first() else {
        return Err(PopsubError::protocol("empty frame"));
    };

    let kind = match MessageType::try_from(first) {
        Ok(kind) => kind,
        Err(unknown) => return Ok(Frame::Unknown(unknown)),
    };

    use MessageType as T;
    let frame = match kind {
        T::Register => {
            let role = rest
                .first()
                .ok_or_else(|| PopsubError::protocol("register frame without role"))?;
            Frame::Register {
                role: Role::try_from(*role)?,
            }
        }
        T::List => Frame::List,
        T::Publish | T::PublishCompressed => {
            let fragment = read_fragment(buf)?;
            if kind == T::Publish {
                Frame::Publish(fragment)
            } else {
                Frame::PublishCompressed(fragment)
            }
        }
        T::Message => {
            if rest.len() < TOPIC_ID_LEN {
                return Err(PopsubError::protocol("message frame shorter than its header"));
            }
            let (topic, json) = rest.split_at(TOPIC_ID_LEN);
            let chat: Chat = serde_json::from_slice(json)?;
            Frame::Message {
                topic_id: read_topic_id(topic),
                message: chat.message,
            }
        }
        T::Announce => Frame::Announce(serde_json::from_slice::<Announcement>(rest)?),
        T::Subscribe => Frame::Subscribe(serde_json::from_slice::<TopicRef>(rest)?),
        T::Unsubscribe => Frame::Unsubscribe(serde_json::from_slice::<TopicRef>(rest)?),
        T::RegisterResponse => {
            Frame::RegisterResponse(serde_json::from_slice::<Registered>(rest)?)
        }
        T::ListResponse => {
            let directory: Directory = serde_json::from_slice(rest)?;
            Frame::ListResponse(serde_json::from_str::<Vec<TopicListing>>(
                &directory.topics,
            )?)
        }
        T::AnnounceResponse => Frame::AnnounceResponse(serde_json::from_slice(rest)?),
        T::SubscribeResponse => Frame::SubscribeResponse(serde_json::from_slice(rest)?),
        T::UnsubscribeResponse => Frame::UnsubscribeResponse(serde_json::from_slice(rest)?),
        T::MessageResponse => Frame::MessageResponse(serde_json::from_slice(rest)?),
        T::PublishResponse => {
            Frame::PublishResponse(serde_json::from_slice::<PublishAck>(rest)?)
        }
        T::PublishCompressedResponse => {
            Frame::PublishCompressedResponse(serde_json::from_slice::<PublishAck>(rest)?)
        }
        T::RegisterError => Frame::RegisterError(read_error(rest)?),
        T::ListError => Frame::ListError(read_error(rest)?),
        T::AnnounceError => Frame::AnnounceError(read_error(rest)?),
        T::SubscribeError => Frame::SubscribeError(read_error(rest)?),
        T::UnsubscribeError => Frame::UnsubscribeError(read_error(rest)?),
        T::PublishError => Frame::PublishError(read_error(rest)?),
        T::PublishCompressedError => Frame::PublishCompressedError(read_error(rest)?),
        T::MessageError => Frame::MessageError(read_error(rest)?),
    };

    Ok(frame)
}

/// Pads or truncates `topic_id` to the 20-byte wire field, the way it reads
/// back after decoding. Truncation never splits a UTF-8 sequence.
pub fn fixed_topic_id(topic_id: &str) -> String {
    let mut buf = Vec::with_capacity(TOPIC_ID_LEN);
    write_topic_id(&mut buf, topic_id);
    read_topic_id(&buf)
}

/// Canonical form used for topic identity: null padding removed, NFC.
pub fn normalize_topic_id(topic_id: &str) -> String {
    topic_id.chars().filter(|c| *c != '\0').nfc().collect()
}

fn write_topic_id(buf: &mut Vec<u8>, topic_id: &str) {
    let mut end = topic_id.len().min(TOPIC_ID_LEN);
    while !topic_id.is_char_boundary(end) {
        end -= 1;
    }
    buf.extend_from_slice(&topic_id.as_bytes()[..end]);
    buf.resize(buf.len() + TOPIC_ID_LEN - end, 0);
}

fn read_topic_id(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

fn read_fragment(buf: &[u8]) -> Result<Fragment> {
    if buf.len() < PUBLISH_HEADER_LEN {
        return Err(PopsubError::protocol(format!(
            "publish frame of {} bytes is shorter than its {PUBLISH_HEADER_LEN}-byte header",
            buf.len()
        )));
    }

    let topic_end = 1 + TOPIC_ID_LEN;
    let sequence = read_u32(&buf[topic_end..topic_end + 4]);
    let count = read_u32(&buf[topic_end + 4..PUBLISH_HEADER_LEN]);

    Ok(Fragment {
        topic_id: read_topic_id(&buf[1..topic_end]),
        sequence,
        count,
        data: buf[PUBLISH_HEADER_LEN..].to_vec(),
    })
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_be_bytes(word)
}

fn read_error(json: &[u8]) -> Result<ErrorBody> {
    Ok(serde_json::from_slice(json)?)
}

impl Frame {
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        decode(buf)
    }
}
