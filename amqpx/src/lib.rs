//! AMQP 1.0 wire codec: self-describing primitives, composite sections and
//! the frame layer that carries them.
//!
//! The crate is layered the way the octets arrive: [`de`]/[`ser`] handle the
//! constructor-prefixed primitive encodings, [`amqp`] handles the positional
//! composite lists (performatives and message sections), and [`proto`] turns
//! byte buffers into [`proto::Frame`]s and back.

use std::io;

use err_derive::Error;

pub mod amqp;
pub mod de;
pub mod proto;
pub mod ser;

pub use crate::amqp::Performative;
pub use crate::de::{Binary, Symbol, Timestamp, Value};
pub use crate::proto::{AmqpFrame, Codec, Frame, ProtocolVersion};

#[derive(Debug, Error)]
pub enum Error {
    #[error(display = "buffer shorter than the constructor demands")]
    TruncatedBuffer,
    #[error(display = "unexpected constructor 0x{:02x}", _0)]
    UnexpectedConstructor(u8),
    #[error(display = "boolean payload 0x{:02x} is neither 0x00 nor 0x01", _0)]
    InvalidBooleanPayload(u8),
    #[error(display = "string payload is not valid UTF-8")]
    InvalidUtf8,
    #[error(display = "frame size below the fixed header")]
    MalformedFrame,
    #[error(display = "frame shorter than its declared size")]
    TruncatedFrame,
    #[error(display = "data offset {} inside the fixed header", _0)]
    BadDataOffset(u8),
    #[error(display = "frame type 0x{:02x} is not an AMQP frame", _0)]
    NonAmqpFrameType(u8),
    #[error(display = "descriptor prefix is not 0x00 0x53")]
    MalformedDescriptor,
    #[error(display = "protocol header is not AMQP 1.0.0")]
    ProtocolVersionMismatch,
    #[error(display = "unexpected performative 0x{:02x}", _0)]
    UnexpectedPerformative(u8),
    #[error(display = "performative 0x{:02x} has no outbound encoding", _0)]
    UnencodablePerformative(u8),
    #[error(display = "transport deadline expired")]
    TransportDeadlineExpired,
    #[error(display = "connection closed by peer")]
    ConnectionClosed,
    #[error(display = "I/O error: {}", _0)]
    Io(#[error(source)] io::Error),
}
