use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use oscwire_frame::{FrameError, OscMessage, OscStreamCodec};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::endpoint::{Endpoint, Protocol};
use crate::error::{Result, TransportError};
use crate::state::{ConnectionState, SharedState, Status};
use crate::traits::{OscTransport, TransportHandler};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// OSC over a byte stream: TCP, raw TCP or a serial device.
///
/// Inbound bytes are reassembled by [`OscStreamCodec`] on a reader task.
/// `Protocol::TcpRaw` always writes bare packets; `Tcp` and `Serial`
/// honour the endpoint's framing.
pub struct StreamClient {
    endpoint: Endpoint,
    handler: Arc<dyn TransportHandler>,
    state: SharedState,
    inner: Mutex<Option<Connection>>,
}

struct Connection {
    writer: FramedWrite<BoxedWriter, OscStreamCodec>,
    reader: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl StreamClient {
    pub fn new(endpoint: Endpoint, handler: Arc<dyn TransportHandler>) -> Self {
        Self {
            endpoint,
            handler,
            state: SharedState::default(),
            inner: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn fail(&self) {
        self.state.set(ConnectionState::Failed);
        self.handler.on_status(Status::ConnectionFailure);
    }

    async fn connect_tcp(&self) -> Result<(BoxedReader, BoxedWriter, Option<SocketAddr>)> {
        let addr = self.endpoint.target_addr()?;
        let target = addr.to_string();

        let connected = match self.endpoint.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| TransportError::ConnectTimeout {
                    target: target.clone(),
                    timeout,
                })?,
            None => TcpStream::connect(addr).await,
        };
        let stream = connected.map_err(|source| TransportError::Connect { target, source })?;

        if let Err(err) = stream.set_nodelay(true) {
            debug!(%err, "could not disable Nagle");
        }
        let peer = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        Ok((Box::new(read_half), Box::new(write_half), peer))
    }

    async fn open_serial(&self) -> Result<(BoxedReader, BoxedWriter, Option<SocketAddr>)> {
        let path = self.endpoint.host.clone();

        // A tokio File serves one operation at a time, so reads and writes
        // get their own handles on the device.
        let open = async {
            let reader = OpenOptions::new().read(true).open(&path).await?;
            let writer = OpenOptions::new().write(true).open(&path).await?;
            Ok::<_, std::io::Error>((reader, writer))
        };

        let opened = match self.endpoint.connect_timeout {
            Some(timeout) => bounded(timeout, &path, open).await?,
            None => open.await,
        };
        let (reader, writer) = opened.map_err(|source| TransportError::Connect {
            target: path,
            source,
        })?;
        Ok((Box::new(reader), Box::new(writer), None))
    }
}

async fn bounded<T>(
    timeout: Duration,
    target: &str,
    fut: impl std::future::Future<Output = T>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            target: target.to_string(),
            timeout,
        })
}

#[async_trait]
impl OscTransport for StreamClient {
    async fn open(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() && self.state.get() == ConnectionState::Connected {
            debug!("stream already open");
            return Ok(());
        }
        guard.take();

        self.state.set(ConnectionState::Connecting);
        self.handler.on_status(Status::Connecting);

        let opened = match self.endpoint.protocol {
            Protocol::Serial => self.open_serial().await,
            _ => self.connect_tcp().await,
        };
        let (read_half, write_half, peer) = match opened {
            Ok(halves) => halves,
            Err(err) => {
                warn!(target = %self.endpoint.describe(), %err, "stream open failed");
                self.fail();
                return Err(err);
            }
        };

        let config = self.endpoint.framer_config();
        let frames = FramedRead::new(read_half, OscStreamCodec::new(config.clone()));
        let reader = tokio::spawn(read_loop(
            frames,
            peer,
            Arc::clone(&self.handler),
            self.state.clone(),
        ));
        let writer = FramedWrite::new(write_half, OscStreamCodec::new(config));

        *guard = Some(Connection { writer, reader });
        self.state.set(ConnectionState::Connected);
        info!(
            protocol = %self.endpoint.protocol,
            target = %self.endpoint.describe(),
            "connected to OSC device"
        );
        self.handler.on_status(Status::Ok);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut conn) = self.inner.lock().await.take() else {
            debug!("no stream to close");
            return Ok(());
        };

        conn.reader.abort();
        if let Err(err) = SinkExt::<OscMessage>::close(&mut conn.writer).await {
            debug!(%err, "error while shutting down stream");
        }

        self.state.set(ConnectionState::Disconnected);
        info!(target = %self.endpoint.describe(), "stream closed");
        if self.endpoint.listen {
            self.handler.on_status(Status::Disconnected);
        }
        Ok(())
    }

    async fn send(&self, message: &OscMessage) -> Result<()> {
        if !self.is_connected() {
            debug!("stream not open, opening before send");
            self.open().await?;
        }

        let mut guard = self.inner.lock().await;
        let conn = guard.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(err) = conn.writer.send(message.clone()).await {
            warn!(address = %message.address, %err, "failed to write OSC message");
            guard.take();
            drop(guard);
            self.fail();
            return Err(write_error(err));
        }
        drop(guard);

        debug!(address = %message.address, args = message.args.len(), "sent OSC message");
        self.handler.on_sent(message);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn protocol(&self) -> Protocol {
        self.endpoint.protocol
    }
}

async fn read_loop(
    mut frames: FramedRead<BoxedReader, OscStreamCodec>,
    peer: Option<SocketAddr>,
    handler: Arc<dyn TransportHandler>,
    state: SharedState,
) {
    while let Some(item) = frames.next().await {
        match item {
            Ok(packet) => handler.on_packet(packet, peer),
            Err(err) => {
                warn!(%err, "stream read failed");
                state.set(ConnectionState::Failed);
                handler.on_status(Status::ConnectionFailure);
                return;
            }
        }
    }

    info!("remote closed the stream");
    state.set(ConnectionState::Disconnected);
    handler.on_status(Status::Disconnected);
}

fn write_error(err: FrameError) -> TransportError {
    match err {
        FrameError::Io(source) => TransportError::Io(source),
        other => TransportError::Frame(other),
    }
}
