use std::net::SocketAddr;
use std::sync::Arc;

use oscwire_frame::OscPacket;
use oscwire_transport::{configure, Status, TransportHandler};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cmd::{feedback_port, ListenArgs};
use crate::exit::{io_error, transport_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_message, OutputFormat};

pub enum Event {
    Status(Status),
    Packet(OscPacket, Option<SocketAddr>),
}

/// Forwards transport callbacks to the command loop.
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelHandler {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl TransportHandler for ChannelHandler {
    fn on_status(&self, status: Status) {
        let _ = self.tx.send(Event::Status(status));
    }

    fn on_packet(&self, packet: OscPacket, from: Option<SocketAddr>) {
        let _ = self.tx.send(Event::Packet(packet, from));
    }
}

pub async fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let feedback_port = feedback_port(&args.connection, args.feedback_port);
    let config = args.connection.transport_config(true, feedback_port)?;

    let (handler, mut events) = ChannelHandler::channel();
    let transport = configure(&config, handler)
        .await
        .map_err(|err| transport_error("listen failed", err))?;
    info!(protocol = %config.protocol, "listening");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut printed = 0usize;
    let outcome = loop {
        let event = tokio::select! {
            event = events.recv() => event,
            signal = &mut shutdown => {
                break signal.map(|()| SUCCESS).map_err(|err| io_error("signal handler failed", err));
            }
        };

        match event {
            Some(Event::Packet(packet, from)) => {
                for message in packet.messages() {
                    if let Some(prefix) = &args.prefix {
                        if !message.address.starts_with(prefix.as_str()) {
                            continue;
                        }
                    }
                    print_message(message, from, format);
                    printed = printed.saturating_add(1);
                }
                if args.count.is_some_and(|count| printed >= count) {
                    break Ok(SUCCESS);
                }
            }
            Some(Event::Status(Status::ConnectionFailure)) => {
                break Err(CliError::new(TRANSPORT_ERROR, "connection failed"));
            }
            Some(Event::Status(Status::Disconnected)) => {
                warn!("remote device closed the connection");
                break Ok(SUCCESS);
            }
            Some(Event::Status(_)) => {}
            None => break Ok(SUCCESS),
        }
    };

    if let Err(err) = transport.close().await {
        warn!(%err, "close failed");
    }
    outcome
}
