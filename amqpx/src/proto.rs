//! Frame layer: the 8-octet frame header, the protocol-version handshake
//! and a [`tokio_util::codec`] codec that turns the transport byte stream
//! into [`Frame`]s.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::amqp::Performative;
use crate::de::{self, Cursor};
use crate::Error;

pub const AMQP_PROTO_HEADER: &[u8] = b"AMQP\x00\x01\x00\x00";
pub const PROTO_HEADER_LENGTH: usize = 8;

const FRAME_TYPE_AMQP: u8 = 0x00;

/// The four version octets following the "AMQP" literal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProtocolVersion {
    pub protocol_id: u8,
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

/// Compares the inbound eight octets byte-for-byte against the AMQP 1.0.0
/// literal.
pub fn parse_protocol_header(buf: &[u8]) -> Result<(ProtocolVersion, usize), Error> {
    if buf.len() < PROTO_HEADER_LENGTH {
        return Err(Error::TruncatedBuffer);
    }
    if &buf[..PROTO_HEADER_LENGTH] != AMQP_PROTO_HEADER {
        return Err(Error::ProtocolVersionMismatch);
    }
    let version = ProtocolVersion {
        protocol_id: buf[4],
        major: buf[5],
        minor: buf[6],
        revision: buf[7],
    };
    Ok((version, PROTO_HEADER_LENGTH))
}

/// The fixed eight octets opening every frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    pub size: u32,
    pub doff: u8,
    pub frame_type: u8,
    pub channel: u16,
}

/// Reads the frame header, skips the extended header and consumes the
/// descriptor triple. Returns the composite code and the offset of the
/// composite's list constructor.
pub fn decode_frame_header(buf: &[u8]) -> Result<(FrameHeader, u8, usize), Error> {
    if buf.len() < 8 {
        return Err(Error::TruncatedFrame);
    }
    let mut cur = Cursor::new(buf);
    let header = FrameHeader {
        size: cur.read_u32_be()?,
        doff: cur.next()?,
        frame_type: cur.next()?,
        channel: cur.read_u16_be()?,
    };
    if header.size < 8 {
        return Err(Error::MalformedFrame);
    }
    if header.doff < 2 {
        return Err(Error::BadDataOffset(header.doff));
    }
    if header.frame_type != FRAME_TYPE_AMQP {
        return Err(Error::NonAmqpFrameType(header.frame_type));
    }

    // extended header is not parsed here
    cur.take(4 * header.doff as usize - 8)
        .map_err(|_| Error::TruncatedFrame)?;

    let (code, used) = de::decode_descriptor(&buf[cur.position()..])?;
    Ok((header, code, cur.position() + used))
}

/// One unit of the transport stream: either the eight-octet protocol
/// header or an AMQP frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Header(ProtocolVersion),
    Amqp(AmqpFrame),
}

/// A decoded AMQP frame. For TRANSFER frames `payload` holds the message
/// sections following the performative; it is empty otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct AmqpFrame {
    pub channel: u16,
    pub performative: Performative,
    pub payload: Bytes,
}

impl Frame {
    pub fn amqp(channel: u16, performative: Performative) -> Self {
        Frame::Amqp(AmqpFrame {
            channel,
            performative,
            payload: Bytes::new(),
        })
    }

    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        Self::decode_with(buf, false)
    }

    pub fn decode_with(buf: &[u8], strict: bool) -> Result<Self, Error> {
        if buf.len() >= 4 && &buf[..4] == b"AMQP" {
            let (version, _) = parse_protocol_header(buf)?;
            return Ok(Frame::Header(version));
        }

        let (header, code, used) = decode_frame_header(buf)?;
        if buf.len() < header.size as usize {
            return Err(Error::TruncatedFrame);
        }
        let body = &buf[used..header.size as usize];
        let (performative, consumed) = Performative::decode(code, body, strict)?;
        Ok(Frame::Amqp(AmqpFrame {
            channel: header.channel,
            performative,
            payload: Bytes::copy_from_slice(&body[consumed..]),
        }))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        match self {
            Frame::Header(_) => Ok(AMQP_PROTO_HEADER.to_vec()),
            Frame::Amqp(frame) => {
                let mut buf = vec![0u8; 8];
                buf[4] = 2; // doff
                buf[5] = FRAME_TYPE_AMQP;
                buf[6..8].copy_from_slice(&frame.channel.to_be_bytes());
                buf.push(0x00);
                buf.push(0x53);
                buf.push(frame.performative.code());
                buf.extend(frame.performative.encode_body()?);
                buf.extend_from_slice(&frame.payload);

                let len = buf.len() as u32;
                buf[..4].copy_from_slice(&len.to_be_bytes());
                Ok(buf)
            }
        }
    }
}

/// Frame codec for `Framed` transports. The first four octets decide
/// whether a unit is the protocol header or a length-prefixed frame.
#[derive(Default)]
pub struct Codec {
    pub strict: bool,
}

impl Decoder for Codec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        let bytes = if &src[..4] == b"AMQP" {
            if src.len() < PROTO_HEADER_LENGTH {
                return Ok(None);
            }
            src.split_to(PROTO_HEADER_LENGTH).freeze()
        } else {
            let len = u32::from_be_bytes((&src[..4]).try_into().unwrap()) as usize;
            if len < 8 {
                return Err(Error::MalformedFrame);
            }
            if src.len() < len {
                src.reserve(len - src.len());
                return Ok(None);
            }
            src.split_to(len).freeze()
        };

        Frame::decode_with(&bytes, self.strict).map(Some)
    }
}

impl Encoder<&Frame> for Codec {
    type Error = Error;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let buf = item.to_vec()?;
        dst.put(&*buf);
        Ok(())
    }
}
