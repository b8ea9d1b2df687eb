use super::*;
use crate::utils::PopsubError;

fn listing(topic_id: &str, description: &str, allow_messaging: bool) -> TopicListing {
    TopicListing {
        topic_id: topic_id.to_string(),
        description: description.to_string(),
        allow_messaging,
    }
}

#[test]
fn test_register_layout() {
    let bytes = encode(&Frame::Register {
        role: Role::Producer,
    })
    .unwrap();
    assert_eq!(bytes, vec![0x00, 0x01]);

    let frame = decode(&[0x00, 0x00]).unwrap();
    assert_eq!(
        frame,
        Frame::Register {
            role: Role::Consumer
        }
    );
}

#[test]
fn test_publish_layout() {
    let fragment = Fragment {
        topic_id: fixed_topic_id("abchi"),
        sequence: 7,
        count: 3,
        data: vec![0, 0, 0, 1, 0xAA, 0xBB],
    };
    let bytes = encode(&Frame::PublishCompressed(fragment.clone())).unwrap();

    assert_eq!(bytes.len(), PUBLISH_HEADER_LEN + 6);
    assert_eq!(bytes[0], 0x06);
    assert_eq!(&bytes[1..6], b"abchi");
    assert!(bytes[6..21].iter().all(|b| *b == 0));
    assert_eq!(&bytes[21..25], &[0, 0, 0, 7]);
    assert_eq!(&bytes[25..29], &[0, 0, 0, 3]);
    assert_eq!(&bytes[29..], &[0, 0, 0, 1, 0xAA, 0xBB]);

    assert_eq!(decode(&bytes).unwrap(), Frame::PublishCompressed(fragment));
}

#[test]
fn test_publish_topic_keeps_padding_on_decode() {
    let frame = Frame::Publish(Fragment {
        topic_id: "short".to_string(),
        sequence: 1,
        count: 1,
        data: vec![],
    });
    let decoded = decode(&encode(&frame).unwrap()).unwrap();

    let Frame::Publish(fragment) = decoded else {
        panic!("Expected a publish frame, got {decoded:?}");
    };
    assert_eq!(fragment.topic_id.len(), TOPIC_ID_LEN);
    assert!(fragment.topic_id.starts_with("short\0"));
    assert_eq!(normalize_topic_id(&fragment.topic_id), "short");
}

#[test]
fn test_fixed_topic_id_truncates_on_char_boundary() {
    // 19 ASCII bytes followed by a 4-byte emoji: the emoji cannot fit.
    let topic = format!("{}🚀", "a".repeat(19));
    let fixed = fixed_topic_id(&topic);
    assert_eq!(fixed.len(), TOPIC_ID_LEN);
    assert_eq!(normalize_topic_id(&fixed), "a".repeat(19));

    let long = "x".repeat(32);
    assert_eq!(fixed_topic_id(&long), "x".repeat(20));
}

#[test]
fn test_json_bodies_use_wire_field_names() {
    let bytes = encode(&Frame::Announce(Announcement {
        topic_id: "hi".to_string(),
        description: "hello".to_string(),
        allow_messaging: true,
    }))
    .unwrap();
    assert_eq!(bytes[0], 0x02);
    let json: serde_json::Value = serde_json::from_slice(&bytes[1..]).unwrap();
    assert_eq!(json["topicID"], "hi");
    assert_eq!(json["description"], "hello");
    assert_eq!(json["allowMessaging"], true);

    let bytes = encode(&Frame::RegisterResponse(Registered {
        client_id: "🐱🍕🔥".to_string(),
    }))
    .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes[1..]).unwrap();
    assert_eq!(json["clientID"], "🐱🍕🔥");
}

#[test]
fn test_list_response_nests_directory_as_string() {
    let frame = Frame::ListResponse(vec![listing("🐱hi", "cats", false)]);
    let bytes = encode(&frame).unwrap();
    assert_eq!(bytes[0], 0x11);

    let json: serde_json::Value = serde_json::from_slice(&bytes[1..]).unwrap();
    let inner = json["topics"].as_str().expect("topics should be a string");
    let rows: serde_json::Value = serde_json::from_str(inner).unwrap();
    assert_eq!(rows[0]["topicID"], "🐱hi");

    assert_eq!(decode(&bytes).unwrap(), frame);
}

#[test]
fn test_round_trip_every_defined_type() {
    let ack = PublishAck {
        topic_id: "🚀🌙📚hi".to_string(),
        sequence: 42,
    };
    let fragment = Fragment {
        topic_id: fixed_topic_id("🚀🌙📚hi"),
        sequence: 42,
        count: 9,
        data: (0..=255).collect(),
    };
    let frames = vec![
        Frame::Register {
            role: Role::Consumer,
        },
        Frame::List,
        Frame::Announce(Announcement {
            topic_id: "hi".to_string(),
            description: String::new(),
            allow_messaging: false,
        }),
        Frame::Subscribe(TopicRef::new("🚀🌙📚hi")),
        Frame::Unsubscribe(TopicRef::new("🚀🌙📚hi")),
        Frame::Publish(fragment.clone()),
        Frame::PublishCompressed(fragment),
        Frame::Message {
            topic_id: fixed_topic_id("🚀🌙📚hi"),
            message: "ping".to_string(),
        },
        Frame::RegisterResponse(Registered {
            client_id: "🚀🌙📚".to_string(),
        }),
        Frame::ListResponse(vec![]),
        Frame::ListResponse(vec![listing("a", "b", true), listing("c", "d", false)]),
        Frame::AnnounceResponse(TopicRef::new("🚀🌙📚hi")),
        Frame::SubscribeResponse(TopicRef::new("🚀🌙📚hi")),
        Frame::UnsubscribeResponse(TopicRef::new("🚀🌙📚hi")),
        Frame::PublishResponse(ack.clone()),
        Frame::PublishCompressedResponse(ack),
        Frame::MessageResponse(TopicRef::new("🚀🌙📚hi")),
        Frame::RegisterError(ErrorBody::new("e0")),
        Frame::ListError(ErrorBody::new("e1")),
        Frame::AnnounceError(ErrorBody::new("e2")),
        Frame::SubscribeError(ErrorBody::new("e3")),
        Frame::UnsubscribeError(ErrorBody::new("e4")),
        Frame::PublishError(ErrorBody::new("e5")),
        Frame::PublishCompressedError(ErrorBody::new("e6")),
        Frame::MessageError(ErrorBody::new("e7")),
        Frame::Unknown(0x30),
    ];

    for frame in frames {
        let bytes = encode(&frame).unwrap();
        assert_eq!(bytes[0], frame.discriminant());
        assert_eq!(decode(&bytes).unwrap(), frame, "round trip of {frame:?}");
    }
}

#[test]
fn test_unknown_discriminant_decodes_header_only() {
    let frame = decode(&[0x99, 1, 2, 3]).unwrap();
    assert_eq!(frame, Frame::Unknown(0x99));
    assert!(frame.message_type().is_err());
    assert_eq!(encode(&frame).unwrap(), vec![0x99]);
}

#[test]
fn test_malformed_frames_are_protocol_errors() {
    let cases: Vec<&[u8]> = vec![
        &[],
        &[0x00],
        &[0x00, 0x07],
        &[0x05, b'a', b'b'],
        &[0x02, b'{'],
        &[0x07, b'x'],
        &[0x11, b'{', b'}'],
    ];
    for bytes in cases {
        match decode(bytes) {
            Err(PopsubError::Protocol(_)) => {}
            other => panic!("Expected protocol error for {bytes:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_message_type_ranges() {
    for byte in 0u8..=0xFF {
        let known = MessageType::try_from(byte).is_ok();
        let expected = matches!(byte, 0x00..=0x07 | 0x10..=0x17 | 0x20..=0x27);
        assert_eq!(known, expected, "discriminant {byte:#04x}");
    }
}

#[test]
fn test_rejection_maps_error_frames() {
    let err = Frame::SubscribeError(ErrorBody::new("Topic does not exist."))
        .rejection()
        .expect("error frames convert");
    match err {
        PopsubError::Rejected { kind, message } => {
            assert_eq!(kind, MessageType::SubscribeError);
            assert_eq!(message, "Topic does not exist.");
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }

    assert!(Frame::List.rejection().is_none());
}

#[test]
fn test_normalize_topic_id_composes_and_strips_padding() {
    let decomposed = "cafe\u{0301}\0\0";
    let composed = "caf\u{00e9}";
    assert_eq!(normalize_topic_id(decomposed), composed);
    assert_eq!(normalize_topic_id(composed), composed);
}
