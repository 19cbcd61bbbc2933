//! Performatives and message sections: fixed-arity positional records
//! carried as descriptor-prefixed lists.
//!
//! Decoders consume the list constructor and the declared items, honoring
//! the null sentinel for optional slots and never reading past the item
//! count the sender declared. Structural violations (wrong nested
//! descriptor, non-null trailing items) are tolerated with a warning unless
//! `strict` is set.

use tracing::warn;

use crate::de::{self, Binary, Symbol, Timestamp, Value};
use crate::ser;
use crate::Error;

type Result<T> = std::result::Result<T, Error>;

pub const OPEN_CODE: u8 = 0x10;
pub const BEGIN_CODE: u8 = 0x11;
pub const ATTACH_CODE: u8 = 0x12;
pub const FLOW_CODE: u8 = 0x13;
pub const TRANSFER_CODE: u8 = 0x14;
pub const DISPOSITION_CODE: u8 = 0x15;
pub const SOURCE_CODE: u8 = 0x28;
pub const TARGET_CODE: u8 = 0x29;
pub const HEADER_CODE: u8 = 0x70;
pub const PROPERTIES_CODE: u8 = 0x73;
pub const AMQP_VALUE_CODE: u8 = 0x77;

/// Positional field reader for one composite list.
///
/// Tracks the item count declared on the wire; once it is exhausted the
/// remaining schema fields take their zero values and no further octets are
/// read.
struct Fields<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u32,
}

impl<'a> Fields<'a> {
    fn new(buf: &'a [u8]) -> Result<Self> {
        let (header, first_item) = de::decode_list(buf)?;
        Ok(Fields {
            buf,
            pos: first_item,
            remaining: header.count,
        })
    }

    fn peek(&self) -> Result<u8> {
        self.buf.get(self.pos).copied().ok_or(Error::TruncatedBuffer)
    }

    fn required<T, F>(&mut self, decode: F) -> Result<T>
    where
        T: Default,
        F: Fn(&[u8]) -> Result<(T, usize)>,
    {
        if self.remaining == 0 {
            return Ok(T::default());
        }
        let (value, used) = decode(&self.buf[self.pos..])?;
        self.pos += used;
        self.remaining -= 1;
        Ok(value)
    }

    fn optional<T, F>(&mut self, decode: F) -> Result<T>
    where
        T: Default,
        F: Fn(&[u8]) -> Result<(T, usize)>,
    {
        if self.remaining == 0 {
            return Ok(T::default());
        }
        if self.peek()? == 0x40 {
            self.pos += 1;
            self.remaining -= 1;
            return Ok(T::default());
        }
        self.required(decode)
    }

    /// Reads the `0x00 0x53 <code>` triple framing an embedded composite.
    /// Mismatches are warned about and parsing continues, unless `strict`.
    fn descriptor(&mut self, expected: u8, strict: bool) -> Result<()> {
        let lead = self.peek()?;
        self.pos += 1;
        if lead != 0x00 {
            if strict {
                return Err(Error::MalformedDescriptor);
            }
            warn!("descriptor does not start with 0x00, got 0x{:02x}", lead);
        }
        let (code, used) = de::decode_ulong(&self.buf[self.pos..])?;
        self.pos += used;
        if code != expected as u64 {
            if strict {
                return Err(Error::MalformedDescriptor);
            }
            warn!(
                "unexpected nested descriptor code 0x{:02x}, expected 0x{:02x}",
                code, expected
            );
        }
        Ok(())
    }

    /// Consumes the items the sender declared beyond the schema. Each is
    /// expected to be a single null octet; anything else is a protocol
    /// violation tolerated with a warning.
    fn drain(&mut self, composite: &'static str, strict: bool) -> Result<()> {
        while self.remaining > 0 {
            let b = self.peek()?;
            if b != 0x40 {
                if strict {
                    return Err(Error::UnexpectedConstructor(b));
                }
                warn!(
                    "non-null trailing item 0x{:02x} in {}, skipping one octet",
                    b, composite
                );
            }
            self.pos += 1;
            self.remaining -= 1;
        }
        Ok(())
    }

    fn consumed(&self) -> usize {
        self.pos
    }
}

/// Which end of the link the peer is.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Role {
    #[default]
    Sender,
    Receiver,
}

impl Role {
    fn from_bool(receiver: bool) -> Self {
        if receiver {
            Role::Receiver
        } else {
            Role::Sender
        }
    }

    fn as_bool(self) -> bool {
        matches!(self, Role::Receiver)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SenderSettleMode {
    #[default]
    Unsettled,
    Settled,
    Mixed,
}

impl SenderSettleMode {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SenderSettleMode::Unsettled,
            1 => SenderSettleMode::Settled,
            _ => SenderSettleMode::Mixed,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReceiverSettleMode {
    #[default]
    First,
    Second,
}

impl ReceiverSettleMode {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReceiverSettleMode::First,
            _ => ReceiverSettleMode::Second,
        }
    }
}

/// Connection parameters exchanged in the OPEN performative.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Open {
    pub container_id: String,
    pub hostname: String,
    pub max_frame_size: u32,
    pub channel_max: u16,
    pub idle_timeout: u32,
}

impl Open {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let open = Open {
            container_id: fields.required(de::decode_string)?,
            hostname: fields.optional(de::decode_string)?,
            max_frame_size: fields.optional(de::decode_uint)?,
            channel_max: fields.optional(de::decode_ushort)?,
            idle_timeout: fields.optional(de::decode_uint)?,
        };
        // locales, capabilities and properties arrive as nulls
        fields.drain("open", strict)?;
        Ok((open, fields.consumed()))
    }

    /// max-frame-size is always emitted as null; the peer decodes it back
    /// as zero.
    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_string(&self.container_id),
            ser::encode_string(&self.hostname),
            ser::encode_null(),
            ser::encode_ushort(self.channel_max),
            ser::encode_uint(self.idle_timeout),
            ser::encode_null(),
            ser::encode_null(),
            ser::encode_null(),
            ser::encode_null(),
            ser::encode_null(),
        ])
    }
}

/// Session parameters exchanged in the BEGIN performative.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Begin {
    pub remote_channel: u16,
    pub next_outgoing_id: u32,
    pub incoming_window: u32,
    pub outgoing_window: u32,
}

impl Begin {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let begin = Begin {
            remote_channel: fields.optional(de::decode_ushort)?,
            next_outgoing_id: fields.required(de::decode_uint)?,
            incoming_window: fields.required(de::decode_uint)?,
            outgoing_window: fields.required(de::decode_uint)?,
        };
        fields.drain("begin", strict)?;
        Ok((begin, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_null(),
            ser::encode_uint(self.next_outgoing_id),
            ser::encode_uint(self.incoming_window),
            ser::encode_uint(self.outgoing_window),
        ])
    }
}

/// Source terminus embedded in ATTACH.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Source {
    pub address: String,
    pub durable: u32,
    pub expiry_policy: i8,
    pub timeout: u32,
    pub dynamic: bool,
}

impl Source {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let source = Source {
            address: fields.optional(de::decode_string)?,
            durable: fields.required(de::decode_uint)?,
            expiry_policy: fields.optional(de::decode_byte)?,
            timeout: fields.required(de::decode_uint)?,
            dynamic: fields.required(de::decode_boolean)?,
        };
        fields.drain("source", strict)?;
        Ok((source, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_string(&self.address),
            ser::encode_uint(self.durable),
            ser::encode_byte(self.expiry_policy),
            ser::encode_uint(self.timeout),
            ser::encode_boolean(self.dynamic),
        ])
    }
}

/// Target terminus embedded in ATTACH.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Target {
    pub address: String,
    pub durable: u32,
    pub expiry_policy: i8,
    pub timeout: u32,
    pub dynamic: bool,
}

impl Target {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let target = Target {
            address: fields.optional(de::decode_string)?,
            durable: fields.required(de::decode_uint)?,
            expiry_policy: fields.optional(de::decode_byte)?,
            timeout: fields.required(de::decode_uint)?,
            dynamic: fields.required(de::decode_boolean)?,
        };
        fields.drain("target", strict)?;
        Ok((target, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_string(&self.address),
            ser::encode_uint(self.durable),
            ser::encode_byte(self.expiry_policy),
            ser::encode_uint(self.timeout),
            ser::encode_boolean(self.dynamic),
        ])
    }
}

/// Link parameters exchanged in the ATTACH performative. The embedded
/// source and target arrive with their own descriptor triples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attach {
    pub name: String,
    pub handle: u32,
    pub role: Role,
    pub snd_settle_mode: SenderSettleMode,
    pub rcv_settle_mode: ReceiverSettleMode,
    pub source: Source,
    pub target: Target,
    /// Placeholder octet for the unsettled map; map payloads are not
    /// decoded and must be null on the wire.
    pub unsettled: i8,
    pub incomplete_unsettled: bool,
    pub initial_delivery_count: u32,
    pub max_message_size: u64,
}

impl Attach {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let name = fields.required(de::decode_string)?;
        let handle = fields.required(de::decode_uint)?;
        let role = Role::from_bool(fields.required(de::decode_boolean)?);
        let snd_settle_mode = SenderSettleMode::from_u8(fields.required(de::decode_ubyte)?);
        let rcv_settle_mode = ReceiverSettleMode::from_u8(fields.required(de::decode_ubyte)?);

        fields.descriptor(SOURCE_CODE, strict)?;
        let source = fields.required(|b| Source::decode(b, strict))?;
        fields.descriptor(TARGET_CODE, strict)?;
        let target = fields.required(|b| Target::decode(b, strict))?;

        let attach = Attach {
            name,
            handle,
            role,
            snd_settle_mode,
            rcv_settle_mode,
            source,
            target,
            unsettled: fields.optional(de::decode_byte)?,
            incomplete_unsettled: fields.optional(de::decode_boolean)?,
            initial_delivery_count: fields.optional(de::decode_uint)?,
            max_message_size: fields.optional(de::decode_ulong)?,
        };
        // capability lists and properties are not implemented
        fields.drain("attach", strict)?;
        Ok((attach, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut source = vec![0x00, 0x53, SOURCE_CODE];
        source.extend(self.source.encode());
        let mut target = vec![0x00, 0x53, TARGET_CODE];
        target.extend(self.target.encode());
        let unsettled = if self.unsettled != 0 {
            ser::encode_byte(self.unsettled)
        } else {
            ser::encode_null()
        };
        ser::encode_list32(&[
            ser::encode_string(&self.name),
            ser::encode_uint(self.handle),
            ser::encode_boolean(self.role.as_bool()),
            ser::encode_ubyte(self.snd_settle_mode as u8),
            ser::encode_ubyte(self.rcv_settle_mode as u8),
            source,
            target,
            unsettled,
            ser::encode_boolean(self.incomplete_unsettled),
            ser::encode_uint(self.initial_delivery_count),
            ser::encode_ulong(self.max_message_size),
        ])
    }
}

/// Link flow state exchanged in the FLOW performative.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flow {
    pub next_incoming_id: u32,
    pub incoming_window: u32,
    pub next_outgoing_id: u32,
    pub outgoing_window: u32,
    pub handle: u32,
    pub delivery_count: u32,
    pub link_credit: u32,
    pub available: u32,
    pub drain: bool,
}

impl Flow {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let flow = Flow {
            next_incoming_id: fields.required(de::decode_uint)?,
            incoming_window: fields.required(de::decode_uint)?,
            next_outgoing_id: fields.required(de::decode_uint)?,
            outgoing_window: fields.required(de::decode_uint)?,
            handle: fields.required(de::decode_uint)?,
            delivery_count: fields.required(de::decode_uint)?,
            link_credit: fields.required(de::decode_uint)?,
            available: fields.required(de::decode_uint)?,
            drain: fields.required(de::decode_boolean)?,
        };
        // echo and properties remain unread
        fields.drain("flow", strict)?;
        Ok((flow, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_uint(self.next_incoming_id),
            ser::encode_uint(self.incoming_window),
            ser::encode_uint(self.next_outgoing_id),
            ser::encode_uint(self.outgoing_window),
            ser::encode_uint(self.handle),
            ser::encode_uint(self.delivery_count),
            ser::encode_uint(self.link_credit),
            ser::encode_uint(self.available),
            ser::encode_boolean(self.drain),
        ])
    }
}

/// Delivery parameters exchanged in the TRANSFER performative.
///
/// Decoding stops after `state`; resume, aborted and batchable are never
/// read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transfer {
    pub handle: u32,
    pub delivery_id: u32,
    pub delivery_tag: Binary,
    pub message_format: u32,
    pub settled: bool,
    pub more: bool,
    pub rcv_settle_mode: ReceiverSettleMode,
    pub state: u32,
}

impl Transfer {
    pub fn decode(buf: &[u8], _strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let transfer = Transfer {
            handle: fields.required(de::decode_uint)?,
            delivery_id: fields.required(de::decode_uint)?,
            delivery_tag: fields.required(de::decode_binary)?,
            message_format: fields.required(de::decode_uint)?,
            settled: fields.required(de::decode_boolean)?,
            more: fields.required(de::decode_boolean)?,
            rcv_settle_mode: ReceiverSettleMode::from_u8(
                fields.required(de::decode_uint)? as u8
            ),
            state: fields.required(de::decode_uint)?,
        };
        Ok((transfer, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_uint(self.handle),
            ser::encode_uint(self.delivery_id),
            ser::encode_binary(&self.delivery_tag.0),
            ser::encode_uint(self.message_format),
            ser::encode_boolean(self.settled),
            ser::encode_boolean(self.more),
            ser::encode_uint(self.rcv_settle_mode as u32),
            ser::encode_uint(self.state),
        ])
    }
}

/// Settlement parameters exchanged in the DISPOSITION performative.
///
/// Decoding stops after `state`; batchable is never read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Disposition {
    pub role: Role,
    pub first: u32,
    pub last: u32,
    pub settled: bool,
    pub state: u32,
}

impl Disposition {
    pub fn decode(buf: &[u8], _strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let disposition = Disposition {
            role: Role::from_bool(fields.required(de::decode_boolean)?),
            first: fields.required(de::decode_uint)?,
            last: fields.required(de::decode_uint)?,
            settled: fields.required(de::decode_boolean)?,
            state: fields.required(de::decode_uint)?,
        };
        Ok((disposition, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_boolean(self.role.as_bool()),
            ser::encode_uint(self.first),
            ser::encode_uint(self.last),
            ser::encode_boolean(self.settled),
            ser::encode_uint(self.state),
        ])
    }
}

/// Message header section (descriptor 0x70).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    pub durable: bool,
    pub priority: u8,
    pub ttl: u32,
    pub first_acquirer: bool,
    pub delivery_count: u32,
}

impl Header {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let header = Header {
            durable: fields.required(de::decode_boolean)?,
            priority: fields.required(de::decode_ubyte)?,
            ttl: fields.required(de::decode_uint)?,
            first_acquirer: fields.required(de::decode_boolean)?,
            delivery_count: fields.required(de::decode_uint)?,
        };
        fields.drain("header", strict)?;
        Ok((header, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_boolean(self.durable),
            ser::encode_ubyte(self.priority),
            ser::encode_uint(self.ttl),
            ser::encode_boolean(self.first_acquirer),
            ser::encode_uint(self.delivery_count),
        ])
    }
}

/// Message properties section (descriptor 0x73). Every field is optional.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
    pub message_id: Binary,
    pub user_id: u32,
    pub to: String,
    pub subject: String,
    pub reply_to: String,
    pub correlation_id: Binary,
    pub content_type: Symbol,
    pub content_encoding: Symbol,
    pub absolute_expiry_time: Timestamp,
    pub creation_time: Timestamp,
    pub group_id: String,
    pub group_sequence: u32,
    pub reply_to_group_id: String,
}

impl Properties {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut fields = Fields::new(buf)?;
        let properties = Properties {
            message_id: fields.optional(de::decode_binary)?,
            user_id: fields.optional(de::decode_uint)?,
            to: fields.optional(de::decode_string)?,
            subject: fields.optional(de::decode_string)?,
            reply_to: fields.optional(de::decode_string)?,
            correlation_id: fields.optional(de::decode_binary)?,
            content_type: fields.optional(de::decode_symbol)?,
            content_encoding: fields.optional(de::decode_symbol)?,
            absolute_expiry_time: fields.optional(de::decode_timestamp)?,
            creation_time: fields.optional(de::decode_timestamp)?,
            group_id: fields.optional(de::decode_string)?,
            group_sequence: fields.optional(de::decode_uint)?,
            reply_to_group_id: fields.optional(de::decode_string)?,
        };
        fields.drain("properties", strict)?;
        Ok((properties, fields.consumed()))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_list32(&[
            ser::encode_binary(&self.message_id.0),
            ser::encode_uint(self.user_id),
            ser::encode_string(&self.to),
            ser::encode_string(&self.subject),
            ser::encode_string(&self.reply_to),
            ser::encode_binary(&self.correlation_id.0),
            ser::encode_symbol(&self.content_type),
            ser::encode_symbol(&self.content_encoding),
            ser::encode_timestamp(self.absolute_expiry_time),
            ser::encode_timestamp(self.creation_time),
            ser::encode_string(&self.group_id),
            ser::encode_uint(self.group_sequence),
            ser::encode_string(&self.reply_to_group_id),
        ])
    }
}

/// Message body section (descriptor 0x77): one bare primitive, no list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AmqpValue {
    pub body: Value,
}

impl AmqpValue {
    pub fn decode(buf: &[u8], _strict: bool) -> Result<(Self, usize)> {
        let mut cur = de::Cursor::new(buf);
        if cur.peek()? == 0x40 {
            return Ok((AmqpValue { body: Value::Null }, 1));
        }
        let (body, used) = de::decode_value(buf)?;
        Ok((AmqpValue { body }, used))
    }

    pub fn encode(&self) -> Vec<u8> {
        ser::encode_value(&self.body)
    }
}

/// The three sections carried in a TRANSFER frame after the performative,
/// each introduced by its own descriptor triple.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub header: Header,
    pub properties: Properties,
    pub body: AmqpValue,
}

impl Message {
    pub fn decode(buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        let mut pos = 0;

        pos += expect_section(&buf[pos..], HEADER_CODE, strict)?;
        let (header, used) = Header::decode(&buf[pos..], strict)?;
        pos += used;

        pos += expect_section(&buf[pos..], PROPERTIES_CODE, strict)?;
        let (properties, used) = Properties::decode(&buf[pos..], strict)?;
        pos += used;

        pos += expect_section(&buf[pos..], AMQP_VALUE_CODE, strict)?;
        let (body, used) = AmqpValue::decode(&buf[pos..], strict)?;
        pos += used;

        Ok((Message { header, properties, body }, pos))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0x00, 0x53, HEADER_CODE];
        buf.extend(self.header.encode());
        buf.extend_from_slice(&[0x00, 0x53, PROPERTIES_CODE]);
        buf.extend(self.properties.encode());
        buf.extend_from_slice(&[0x00, 0x53, AMQP_VALUE_CODE]);
        buf.extend(self.body.encode());
        buf
    }
}

fn expect_section(buf: &[u8], expected: u8, strict: bool) -> Result<usize> {
    let (code, used) = de::decode_descriptor(buf)?;
    if code != expected {
        if strict {
            return Err(Error::MalformedDescriptor);
        }
        warn!(
            "unexpected message section code 0x{:02x}, expected 0x{:02x}",
            code, expected
        );
    }
    Ok(used)
}

/// One decoded frame body, tagged by its descriptor code.
#[derive(Clone, Debug, PartialEq)]
pub enum Performative {
    Open(Open),
    Begin(Begin),
    Attach(Attach),
    Flow(Flow),
    Transfer(Transfer),
    Disposition(Disposition),
    /// A descriptor code this endpoint does not decode; the body is left
    /// for the caller to skip.
    Unknown(u8),
}

impl Performative {
    pub fn decode(code: u8, buf: &[u8], strict: bool) -> Result<(Self, usize)> {
        match code {
            OPEN_CODE => Open::decode(buf, strict).map(|(p, n)| (Performative::Open(p), n)),
            BEGIN_CODE => Begin::decode(buf, strict).map(|(p, n)| (Performative::Begin(p), n)),
            ATTACH_CODE => Attach::decode(buf, strict).map(|(p, n)| (Performative::Attach(p), n)),
            FLOW_CODE => Flow::decode(buf, strict).map(|(p, n)| (Performative::Flow(p), n)),
            TRANSFER_CODE => {
                Transfer::decode(buf, strict).map(|(p, n)| (Performative::Transfer(p), n))
            }
            DISPOSITION_CODE => {
                Disposition::decode(buf, strict).map(|(p, n)| (Performative::Disposition(p), n))
            }
            other => Ok((Performative::Unknown(other), 0)),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Performative::Open(_) => OPEN_CODE,
            Performative::Begin(_) => BEGIN_CODE,
            Performative::Attach(_) => ATTACH_CODE,
            Performative::Flow(_) => FLOW_CODE,
            Performative::Transfer(_) => TRANSFER_CODE,
            Performative::Disposition(_) => DISPOSITION_CODE,
            Performative::Unknown(code) => *code,
        }
    }

    pub fn encode_body(&self) -> Result<Vec<u8>> {
        match self {
            Performative::Open(p) => Ok(p.encode()),
            Performative::Begin(p) => Ok(p.encode()),
            Performative::Attach(p) => Ok(p.encode()),
            Performative::Flow(p) => Ok(p.encode()),
            Performative::Transfer(p) => Ok(p.encode()),
            Performative::Disposition(p) => Ok(p.encode()),
            Performative::Unknown(code) => Err(Error::UnencodablePerformative(*code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::{encode_list, encode_list32, encode_null, encode_string, encode_uint};

    #[test]
    fn open_round_trip() {
        let open = Open {
            container_id: "c1".to_string(),
            hostname: "h1".to_string(),
            max_frame_size: 0,
            channel_max: 1,
            idle_timeout: 1111,
        };
        let buf = open.encode();
        let (decoded, used) = Open::decode(&buf, true).unwrap();
        assert_eq!(decoded, open);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn open_all_optionals_null() {
        let items = vec![
            encode_string("c1"),
            encode_null(),
            encode_null(),
            encode_null(),
            encode_null(),
            encode_null(),
            encode_null(),
            encode_null(),
            encode_null(),
            encode_null(),
        ];
        let buf = encode_list32(&items);
        let (open, used) = Open::decode(&buf, true).unwrap();
        assert_eq!(open.container_id, "c1");
        assert_eq!(open.hostname, "");
        assert_eq!(open.max_frame_size, 0);
        assert_eq!(open.channel_max, 0);
        assert_eq!(open.idle_timeout, 0);
        // list header, container-id, then one octet per null item
        assert_eq!(used, 9 + 4 + 9);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn begin_round_trip_and_truncation() {
        let begin = Begin {
            remote_channel: 0,
            next_outgoing_id: 1,
            incoming_window: 0x1234_5678,
            outgoing_window: 0x8765_4321,
        };
        let buf = begin.encode();
        let (decoded, used) = Begin::decode(&buf, true).unwrap();
        assert_eq!(decoded, begin);
        assert_eq!(used, buf.len());

        // a sender may compact away trailing items entirely
        let truncated = encode_list(&[encode_null(), encode_uint(7)]);
        let (decoded, used) = Begin::decode(&truncated, true).unwrap();
        assert_eq!(decoded.next_outgoing_id, 7);
        assert_eq!(decoded.incoming_window, 0);
        assert_eq!(decoded.outgoing_window, 0);
        assert_eq!(used, truncated.len());
    }

    fn sample_attach() -> Attach {
        Attach {
            name: "link-0".to_string(),
            handle: 0,
            role: Role::Sender,
            snd_settle_mode: SenderSettleMode::Settled,
            rcv_settle_mode: ReceiverSettleMode::First,
            source: Source {
                address: "vx-web".to_string(),
                durable: 0,
                expiry_policy: 0,
                timeout: 0,
                dynamic: false,
            },
            target: Target {
                address: "RPC".to_string(),
                durable: 0,
                expiry_policy: 0,
                timeout: 0,
                dynamic: false,
            },
            unsettled: 0,
            incomplete_unsettled: false,
            initial_delivery_count: 3,
            max_message_size: 1024,
        }
    }

    #[test]
    fn attach_round_trip() {
        let attach = sample_attach();
        let buf = attach.encode();
        let (decoded, used) = Attach::decode(&buf, true).unwrap();
        assert_eq!(decoded, attach);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn attach_wrong_nested_descriptor() {
        let mut buf = sample_attach().encode();
        // corrupt the source descriptor code
        let pos = buf
            .windows(3)
            .position(|w| w == [0x00, 0x53, SOURCE_CODE])
            .unwrap();
        buf[pos + 2] = 0x27;
        assert!(matches!(
            Attach::decode(&buf, true),
            Err(Error::MalformedDescriptor)
        ));
        // lenient mode logs and keeps going
        let (decoded, _) = Attach::decode(&buf, false).unwrap();
        assert_eq!(decoded.source.address, "vx-web");
    }

    #[test]
    fn source_trailing_non_null() {
        let items = vec![
            encode_string("queue-1"),
            encode_uint(1),
            encode_null(),
            encode_uint(0),
            crate::ser::encode_boolean(false),
            encode_uint(0), // non-null remainder, one octet is skipped
        ];
        let buf = encode_list32(&items);
        assert!(Source::decode(&buf, true).is_err());
        let (source, _) = Source::decode(&buf, false).unwrap();
        assert_eq!(source.address, "queue-1");
        assert_eq!(source.durable, 1);
    }

    #[test]
    fn flow_round_trip() {
        let flow = Flow {
            next_incoming_id: 0,
            incoming_window: 100,
            next_outgoing_id: 1,
            outgoing_window: 100,
            handle: 0,
            delivery_count: 2,
            link_credit: 50,
            available: 0,
            drain: false,
        };
        let buf = flow.encode();
        let (decoded, used) = Flow::decode(&buf, true).unwrap();
        assert_eq!(decoded, flow);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn transfer_round_trip() {
        let transfer = Transfer {
            handle: 0,
            delivery_id: 4,
            delivery_tag: Binary(vec![0xde, 0xad]),
            message_format: 0,
            settled: false,
            more: false,
            rcv_settle_mode: ReceiverSettleMode::First,
            state: 0,
        };
        let buf = transfer.encode();
        let (decoded, used) = Transfer::decode(&buf, true).unwrap();
        assert_eq!(decoded, transfer);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn disposition_round_trip() {
        let disposition = Disposition {
            role: Role::Receiver,
            first: 1,
            last: 4,
            settled: true,
            state: 0x24,
        };
        let buf = disposition.encode();
        let (decoded, used) = Disposition::decode(&buf, true).unwrap();
        assert_eq!(decoded, disposition);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn message_sections_round_trip() {
        let message = Message {
            header: Header {
                durable: true,
                priority: 4,
                ttl: 30_000,
                first_acquirer: false,
                delivery_count: 0,
            },
            properties: Properties {
                message_id: Binary(vec![0x01]),
                to: "queue-1".to_string(),
                subject: "greeting".to_string(),
                content_type: Symbol::from("text/plain"),
                creation_time: Timestamp(1_600_000_000_000),
                ..Properties::default()
            },
            body: AmqpValue {
                body: Value::Binary(Binary(b"hello".to_vec())),
            },
        };
        let buf = message.encode();
        let (decoded, used) = Message::decode(&buf, true).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn amqp_value_null_body() {
        let (value, used) = AmqpValue::decode(&[0x40], true).unwrap();
        assert_eq!(value.body, Value::Null);
        assert_eq!(used, 1);
    }

    #[test]
    fn performative_dispatch() {
        let open = Open {
            container_id: "c1".to_string(),
            ..Open::default()
        };
        let buf = open.encode();
        let (performative, used) = Performative::decode(OPEN_CODE, &buf, true).unwrap();
        assert_eq!(performative, Performative::Open(open));
        assert_eq!(used, buf.len());

        let (performative, used) = Performative::decode(0x16, &buf, true).unwrap();
        assert_eq!(performative, Performative::Unknown(0x16));
        assert_eq!(used, 0);
        assert!(matches!(
            performative.encode_body(),
            Err(Error::UnencodablePerformative(0x16))
        ));
    }
}
