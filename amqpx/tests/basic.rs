use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use amqpx::amqp::{AmqpValue, Begin, Header, Message, Open, Properties, Transfer};
use amqpx::proto::{AmqpFrame, ProtocolVersion, AMQP_PROTO_HEADER};
use amqpx::{Binary, Codec, Frame, Performative, Value};

#[test]
fn version_handshake() {
    let header = Frame::Header(ProtocolVersion::default());
    assert_eq!(&*header.to_vec().unwrap(), b"AMQP\x00\x01\x00\x00");

    let mut codec = Codec::default();
    let mut server = BytesMut::new();
    server.extend_from_slice(AMQP_PROTO_HEADER);
    let frame = codec.decode(&mut server).unwrap().unwrap();
    match frame {
        Frame::Header(version) => {
            assert_eq!(version.protocol_id, 0);
            assert_eq!(version.major, 1);
            assert_eq!(version.minor, 0);
            assert_eq!(version.revision, 0);
        }
        other => panic!("expected protocol header, got {:?}", other),
    }
    assert!(server.is_empty());
}

#[test]
fn open_frame_round_trip() {
    let open = Open {
        container_id: "c1".to_string(),
        hostname: "h1".to_string(),
        max_frame_size: 0,
        channel_max: 1,
        idle_timeout: 1111,
    };
    let frame = Frame::amqp(0, Performative::Open(open));

    let mut codec = Codec::default();
    let mut buf = BytesMut::new();
    codec.encode(&frame, &mut buf).unwrap();
    let decoded = codec.decode(&mut buf).unwrap().unwrap();
    assert_eq!(decoded, frame);
    assert!(buf.is_empty());
}

#[test]
fn open_max_frame_size_travels_as_null() {
    // the encoder leaves max-frame-size unset on the wire, so any local
    // value comes back as zero on the decode side
    let open = Open {
        container_id: "c1".to_string(),
        max_frame_size: 65_536,
        ..Open::default()
    };
    let frame = Frame::amqp(0, Performative::Open(open.clone()));

    let mut codec = Codec::default();
    let mut buf = BytesMut::new();
    codec.encode(&frame, &mut buf).unwrap();
    match codec.decode(&mut buf).unwrap().unwrap() {
        Frame::Amqp(AmqpFrame {
            performative: Performative::Open(decoded),
            ..
        }) => {
            assert_eq!(decoded.max_frame_size, 0);
            assert_eq!(decoded.container_id, open.container_id);
        }
        other => panic!("expected OPEN, got {:?}", other),
    }
}

#[test]
fn begin_frame_bytes() {
    let begin = Begin {
        remote_channel: 0,
        next_outgoing_id: 1,
        incoming_window: 0x1234_5678,
        outgoing_window: 0x8765_4321,
    };
    let bytes = Frame::amqp(0, Performative::Begin(begin)).to_vec().unwrap();
    assert_eq!(
        &bytes[..],
        &b"\x00\x00\x00\x21\x02\x00\x00\x00\x00\x53\x11\
           \xd0\x00\x00\x00\x11\x00\x00\x00\x04\
           \x40\x52\x01\x70\x12\x34\x56\x78\x70\x87\x65\x43\x21"[..],
    );
}

#[test]
fn transfer_frame_with_message_sections() {
    let transfer = Transfer {
        handle: 0,
        delivery_id: 1,
        delivery_tag: Binary(vec![0x01]),
        message_format: 0,
        ..Transfer::default()
    };
    let message = Message {
        header: Header {
            durable: false,
            priority: 4,
            ttl: 10_000,
            first_acquirer: false,
            delivery_count: 0,
        },
        properties: Properties {
            to: "queue-1".to_string(),
            subject: "hello".to_string(),
            ..Properties::default()
        },
        body: AmqpValue {
            body: Value::Binary(Binary(b"Hello Glorious Messaging World".to_vec())),
        },
    };

    let frame = Frame::Amqp(AmqpFrame {
        channel: 0,
        performative: Performative::Transfer(transfer.clone()),
        payload: Bytes::from(message.encode()),
    });

    let mut codec = Codec::default();
    let mut buf = BytesMut::new();
    codec.encode(&frame, &mut buf).unwrap();
    match codec.decode(&mut buf).unwrap().unwrap() {
        Frame::Amqp(decoded) => {
            assert_eq!(decoded.performative, Performative::Transfer(transfer));
            let (decoded_message, used) = Message::decode(&decoded.payload, true).unwrap();
            assert_eq!(decoded_message, message);
            assert_eq!(used, decoded.payload.len());
        }
        other => panic!("expected TRANSFER, got {:?}", other),
    }
}

#[test]
fn partial_frames_buffer_until_complete() {
    let open = Open {
        container_id: "c1".to_string(),
        ..Open::default()
    };
    let bytes = Frame::amqp(0, Performative::Open(open)).to_vec().unwrap();

    let mut codec = Codec::default();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&bytes[..6]);
    assert!(codec.decode(&mut buf).unwrap().is_none());
    buf.extend_from_slice(&bytes[6..]);
    assert!(codec.decode(&mut buf).unwrap().is_some());
}

#[test]
fn unknown_performative_is_surfaced() {
    // a DETACH body this endpoint does not decode
    let mut bytes = vec![0u8; 8];
    bytes[4] = 2;
    bytes.extend_from_slice(&[0x00, 0x53, 0x16, 0x45]);
    let len = bytes.len() as u32;
    bytes[..4].copy_from_slice(&len.to_be_bytes());

    let mut codec = Codec::default();
    let mut buf = BytesMut::from(&bytes[..]);
    match codec.decode(&mut buf).unwrap().unwrap() {
        Frame::Amqp(frame) => {
            assert_eq!(frame.performative, Performative::Unknown(0x16));
            assert_eq!(&frame.payload[..], &[0x45]);
        }
        other => panic!("expected AMQP frame, got {:?}", other),
    }
}
