//! Per-connection session driver: protocol-header exchange, OPEN handshake,
//! BEGIN/ATTACH/FLOW handshake, then the steady-state frame loop.

use std::collections::HashMap;

use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use amqpx::amqp::{Attach, Begin, Disposition, Flow, Message, Open, Transfer};
use amqpx::{Codec, Error, Frame, Performative, ProtocolVersion};

use crate::config::Config;

/// The parameters most recently seen in one direction of the conversation,
/// plus the unsettled deliveries and a message counter.
#[derive(Debug, Default)]
struct Direction {
    open: Open,
    begin: Begin,
    attach: Attach,
    flow: Flow,
    transfer: Transfer,
    disposition: Disposition,
    unsettled: HashMap<u32, u32>,
    message_count: u64,
}

/// One accepted connection. Inbound decode mutates `rx`, outbound encode
/// mutates `tx`; nothing else touches either.
pub struct Connection<T> {
    transport: Framed<T, Codec>,
    config: Config,
    container_id: String,
    rx: Direction,
    tx: Direction,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    pub fn new(io: T, config: Config) -> Self {
        let container_id = format!("amqpxServer-{}", rand_string(12));
        Connection {
            transport: Framed::new(io, Codec::default()),
            config,
            container_id,
            rx: Direction::default(),
            tx: Direction::default(),
        }
    }

    /// Drives the four phases in order. Any error is terminal for the
    /// connection; the caller drops the transport on return.
    pub async fn run(&mut self) -> Result<(), Error> {
        let result = self.drive().await;
        debug!(rx = ?self.rx, tx = ?self.tx, "closing client connection");
        result
    }

    async fn drive(&mut self) -> Result<(), Error> {
        self.await_version().await?;
        self.await_open().await?;
        self.await_begin_attach_flow().await?;
        self.lifecycle().await
    }

    async fn next_frame(&mut self) -> Result<Frame, Error> {
        match timeout(self.config.read_timeout, self.transport.next()).await {
            Err(_) => Err(Error::TransportDeadlineExpired),
            Ok(None) => Err(Error::ConnectionClosed),
            Ok(Some(result)) => result,
        }
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), Error> {
        match timeout(self.config.read_timeout, self.transport.send(frame)).await {
            Err(_) => Err(Error::TransportDeadlineExpired),
            Ok(result) => result,
        }
    }

    async fn next_amqp_frame(&mut self) -> Result<(Performative, bytes::Bytes), Error> {
        match self.next_frame().await? {
            Frame::Amqp(frame) => Ok((frame.performative, frame.payload)),
            Frame::Header(_) => Err(Error::ProtocolVersionMismatch),
        }
    }

    async fn await_version(&mut self) -> Result<(), Error> {
        match self.next_frame().await? {
            Frame::Header(version) => {
                debug!(?version, "protocol header received, mirroring");
                self.send(&Frame::Header(version)).await
            }
            Frame::Amqp(frame) => Err(Error::UnexpectedPerformative(frame.performative.code())),
        }
    }

    async fn await_open(&mut self) -> Result<(), Error> {
        let (performative, _) = self.next_amqp_frame().await?;
        match performative {
            Performative::Open(open) => {
                debug!(
                    container_id = %open.container_id,
                    hostname = %open.hostname,
                    max_frame_size = open.max_frame_size,
                    channel_max = open.channel_max,
                    idle_timeout = open.idle_timeout,
                    "connection parameters"
                );
                self.rx.open = open;
                self.send_version_and_open().await
            }
            other => Err(Error::UnexpectedPerformative(other.code())),
        }
    }

    async fn send_version_and_open(&mut self) -> Result<(), Error> {
        self.send(&Frame::Header(ProtocolVersion::default())).await?;
        let open = Open {
            container_id: self.container_id.clone(),
            hostname: self.config.hostname.clone(),
            max_frame_size: 0,
            channel_max: self.config.channel_max,
            idle_timeout: self.config.idle_timeout_ms,
        };
        self.send(&Frame::amqp(0, Performative::Open(open.clone())))
            .await?;
        self.tx.open = open;
        Ok(())
    }

    /// The peer sets up its session with up to four frames; reading stops
    /// early once BEGIN, ATTACH and FLOW have all been seen.
    async fn await_begin_attach_flow(&mut self) -> Result<(), Error> {
        let (mut begun, mut attached, mut flowed) = (false, false, false);
        for _ in 0..4 {
            let (performative, _) = self.next_amqp_frame().await?;
            match performative {
                Performative::Begin(begin) => {
                    debug!(
                        remote_channel = begin.remote_channel,
                        next_outgoing_id = begin.next_outgoing_id,
                        incoming_window = begin.incoming_window,
                        outgoing_window = begin.outgoing_window,
                        "session parameters"
                    );
                    self.rx.begin = begin;
                    begun = true;
                }
                Performative::Attach(attach) => {
                    debug!(
                        name = %attach.name,
                        handle = attach.handle,
                        role = ?attach.role,
                        snd_settle_mode = ?attach.snd_settle_mode,
                        "link parameters"
                    );
                    self.rx.attach = attach;
                    attached = true;
                }
                Performative::Flow(flow) => {
                    debug!(
                        next_incoming_id = flow.next_incoming_id,
                        incoming_window = flow.incoming_window,
                        link_credit = flow.link_credit,
                        "flow parameters"
                    );
                    self.rx.flow = flow;
                    flowed = true;
                }
                other => {
                    warn!(
                        "performative 0x{:02x} out of place during session setup",
                        other.code()
                    );
                }
            }
            if begun && attached && flowed {
                break;
            }
        }
        self.send_begin().await
    }

    async fn send_begin(&mut self) -> Result<(), Error> {
        let begin = Begin {
            remote_channel: 0,
            next_outgoing_id: 1,
            incoming_window: 0x1234_5678,
            outgoing_window: 0x8765_4321,
        };
        self.send(&Frame::amqp(0, Performative::Begin(begin.clone())))
            .await?;
        self.tx.begin = begin;
        Ok(())
    }

    /// Steady state: keep folding inbound frames into the rx bundle until
    /// the transport fails or the peer goes away.
    async fn lifecycle(&mut self) -> Result<(), Error> {
        loop {
            let (performative, payload) = self.next_amqp_frame().await?;
            match performative {
                Performative::Open(open) => {
                    debug!(container_id = %open.container_id, "connection parameters updated");
                    self.rx.open = open;
                }
                Performative::Begin(begin) => {
                    debug!(incoming_window = begin.incoming_window, "session parameters updated");
                    self.rx.begin = begin;
                }
                Performative::Attach(attach) => {
                    debug!(name = %attach.name, "link parameters updated");
                    self.rx.attach = attach;
                }
                Performative::Flow(flow) => {
                    debug!(incoming_window = flow.incoming_window, "flow parameters updated");
                    self.rx.flow = flow;
                }
                Performative::Transfer(transfer) => self.handle_transfer(transfer, &payload)?,
                Performative::Disposition(disposition) => self.handle_disposition(disposition),
                Performative::Unknown(code) => {
                    warn!("not ready for performative 0x{:02x} yet", code);
                }
            }
        }
    }

    fn handle_transfer(&mut self, transfer: Transfer, payload: &[u8]) -> Result<(), Error> {
        let (message, _) = Message::decode(payload, false)?;
        debug!(
            delivery_id = transfer.delivery_id,
            subject = %message.properties.subject,
            body = ?message.body.body,
            "transfer received"
        );
        if !transfer.settled {
            self.rx.unsettled.insert(transfer.delivery_id, transfer.state);
        }
        self.rx.message_count += 1;
        self.rx.transfer = transfer;
        Ok(())
    }

    fn handle_disposition(&mut self, disposition: Disposition) {
        let last = disposition.last.max(disposition.first);
        if disposition.settled {
            for id in disposition.first..=last {
                self.rx.unsettled.remove(&id);
                self.tx.unsettled.remove(&id);
            }
        }
        debug!(
            first = disposition.first,
            last,
            settled = disposition.settled,
            "disposition received"
        );
        self.rx.disposition = disposition;
    }
}

fn rand_string(n: usize) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}
