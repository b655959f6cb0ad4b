use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use oscwire_frame::{decode_packet, encode_message, OscMessage};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::endpoint::{Endpoint, Protocol};
use crate::error::{Result, TransportError};
use crate::state::{ConnectionState, SharedState, Status};
use crate::traits::{DatagramSink, OscTransport, TransportHandler};

/// Largest datagram the receive loop accepts.
const MAX_DATAGRAM: usize = 65_536;

/// Connectionless OSC over UDP.
///
/// Without `listen` the socket binds an ephemeral port and is only used for
/// sending. With `listen` it binds the configured feedback port so devices
/// that reply to the sender's port reach us, and every inbound datagram is
/// decoded as one whole packet.
pub struct UdpClient {
    endpoint: Endpoint,
    handler: Arc<dyn TransportHandler>,
    sink: Option<Arc<dyn DatagramSink>>,
    state: SharedState,
    inner: Mutex<Option<UdpInner>>,
}

struct UdpInner {
    socket: Arc<UdpSocket>,
    receiver: Option<JoinHandle<()>>,
}

impl Drop for UdpInner {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
        }
    }
}

impl UdpClient {
    pub fn new(endpoint: Endpoint, handler: Arc<dyn TransportHandler>) -> Self {
        Self {
            endpoint,
            handler,
            sink: None,
            state: SharedState::default(),
            inner: Mutex::new(None),
        }
    }

    /// Route outgoing datagrams through `sink` instead of the client socket.
    ///
    /// The socket is still bound on open so feedback can be received.
    pub fn with_sink(mut self, sink: Arc<dyn DatagramSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Address the socket is bound to, once open.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let guard = self.inner.lock().await;
        guard.as_ref().and_then(|inner| inner.socket.local_addr().ok())
    }

    fn bind_addr(&self) -> SocketAddr {
        let port = if self.endpoint.listen {
            self.endpoint.local_port.unwrap_or(self.endpoint.target_port)
        } else {
            0
        };
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
    }

    fn fail(&self) {
        self.state.set(ConnectionState::Failed);
        self.handler.on_status(Status::ConnectionFailure);
    }

    async fn socket(&self) -> Result<Arc<UdpSocket>> {
        let guard = self.inner.lock().await;
        guard
            .as_ref()
            .map(|inner| Arc::clone(&inner.socket))
            .ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl OscTransport for UdpClient {
    async fn open(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() && self.state.get() == ConnectionState::Connected {
            debug!("UDP socket already open");
            return Ok(());
        }
        // Drop a socket left behind by a failed receive loop.
        guard.take();

        self.state.set(ConnectionState::Connecting);
        self.handler.on_status(Status::Connecting);

        let addr = self.bind_addr();
        let socket = match UdpSocket::bind(addr).await {
            Ok(socket) => Arc::new(socket),
            Err(source) => {
                warn!(%addr, error = %source, "UDP bind failed");
                self.fail();
                return Err(TransportError::Bind { addr, source });
            }
        };

        let receiver = self.endpoint.listen.then(|| {
            tokio::spawn(receive_loop(
                Arc::clone(&socket),
                Arc::clone(&self.handler),
                self.state.clone(),
            ))
        });

        if self.endpoint.listen {
            info!(%addr, "listening for OSC datagrams");
        } else {
            debug!(%addr, "UDP socket bound for sending");
        }

        *guard = Some(UdpInner { socket, receiver });
        self.state.set(ConnectionState::Connected);
        self.handler.on_status(Status::Ok);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(inner) = self.inner.lock().await.take() else {
            debug!("no UDP socket to close");
            return Ok(());
        };
        drop(inner);

        self.state.set(ConnectionState::Disconnected);
        info!("UDP socket closed");
        if self.endpoint.listen {
            self.handler.on_status(Status::Disconnected);
        }
        Ok(())
    }

    async fn send(&self, message: &OscMessage) -> Result<()> {
        if !self.is_connected() {
            debug!("UDP socket not open, opening before send");
            self.open().await?;
        }

        let target = self.endpoint.target_addr()?;
        let datagram = encode_message(message);

        let sent = match &self.sink {
            Some(sink) => sink.send_to(datagram, target).await,
            None => {
                let socket = self.socket().await?;
                socket
                    .send_to(&datagram, target)
                    .await
                    .map(|_| ())
                    .map_err(TransportError::from)
            }
        };

        if let Err(err) = sent {
            warn!(%target, address = %message.address, %err, "failed to send OSC message");
            self.fail();
            return Err(err);
        }

        debug!(%target, address = %message.address, args = message.args.len(), "sent OSC message");
        self.handler.on_sent(message);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    handler: Arc<dyn TransportHandler>,
    state: SharedState,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!(%err, "UDP receive failed");
                state.set(ConnectionState::Failed);
                handler.on_status(Status::ConnectionFailure);
                return;
            }
        };

        trace!(%from, len, "datagram received");
        match decode_packet(&buf[..len]) {
            Ok(packet) => handler.on_packet(packet, Some(from)),
            Err(err) => warn!(%from, len, %err, "dropping undecodable datagram"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use bytes::Bytes;
    use oscwire_frame::{OscArg, OscPacket, StreamFraming, DEFAULT_MAX_BUFFER};
    use tokio::sync::mpsc;

    use super::*;

    struct Recorder {
        statuses: StdMutex<Vec<Status>>,
        packets: mpsc::UnboundedSender<(OscPacket, Option<SocketAddr>)>,
        sent: StdMutex<Vec<String>>,
    }

    impl Recorder {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(OscPacket, Option<SocketAddr>)>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let recorder = Arc::new(Self {
                statuses: StdMutex::new(Vec::new()),
                packets: tx,
                sent: StdMutex::new(Vec::new()),
            });
            (recorder, rx)
        }

        fn statuses(&self) -> Vec<Status> {
            self.statuses.lock().unwrap().clone()
        }
    }

    impl TransportHandler for Recorder {
        fn on_status(&self, status: Status) {
            self.statuses.lock().unwrap().push(status);
        }

        fn on_packet(&self, packet: OscPacket, from: Option<SocketAddr>) {
            let _ = self.packets.send((packet, from));
        }

        fn on_sent(&self, message: &OscMessage) {
            self.sent.lock().unwrap().push(message.address.clone());
        }
    }

    fn endpoint(target_port: u16, listen: bool, local_port: Option<u16>) -> Endpoint {
        Endpoint {
            host: "127.0.0.1".into(),
            address: Some(Ipv4Addr::LOCALHOST.into()),
            target_port,
            local_port,
            protocol: Protocol::Udp,
            listen,
            framing: StreamFraming::Unframed,
            connect_timeout: None,
            max_buffer_size: DEFAULT_MAX_BUFFER,
        }
    }

    #[tokio::test]
    async fn lazy_open_sends_to_target_port() {
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let device_port = device.local_addr().unwrap().port();

        let (recorder, _rx) = Recorder::new();
        let client = UdpClient::new(endpoint(device_port, false, None), recorder.clone());
        assert_eq!(client.state(), ConnectionState::Disconnected);

        let message = OscMessage::with_args("/mixer/fader", vec![OscArg::Float(0.5)]);
        client.send(&message).await.unwrap();
        assert!(client.is_connected());

        let mut buf = [0u8; 512];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), device.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decode_packet(&buf[..len]).unwrap(), OscPacket::Message(message));
        assert_eq!(recorder.statuses(), vec![Status::Connecting, Status::Ok]);
        assert_eq!(*recorder.sent.lock().unwrap(), vec!["/mixer/fader".to_string()]);
    }

    #[tokio::test]
    async fn listen_mode_delivers_replies_with_sender() {
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let device_addr = device.local_addr().unwrap();

        // Reserve a free port for the feedback socket.
        let placeholder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let feedback_port = placeholder.local_addr().unwrap().port();
        drop(placeholder);

        let (recorder, mut rx) = Recorder::new();
        let client = UdpClient::new(
            endpoint(device_addr.port(), true, Some(feedback_port)),
            recorder.clone(),
        );
        client.open().await.unwrap();
        assert_eq!(client.local_addr().await.unwrap().port(), feedback_port);

        let reply = OscMessage::with_args("/status", vec![OscArg::Int(1)]);
        device
            .send_to(&encode_message(&reply), ("127.0.0.1", feedback_port))
            .await
            .unwrap();

        let (packet, from) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet, OscPacket::Message(reply));
        assert_eq!(from, Some(device_addr));

        client.close().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(
            recorder.statuses(),
            vec![Status::Connecting, Status::Ok, Status::Disconnected]
        );
    }

    #[tokio::test]
    async fn close_without_open_is_ok() {
        let client = UdpClient::new(endpoint(9000, false, None), Arc::new(crate::NoopHandler));
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn bind_conflict_reports_failure() {
        let taken = UdpSocket::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let (recorder, _rx) = Recorder::new();
        let client = UdpClient::new(endpoint(9000, true, Some(port)), recorder.clone());
        let err = client.open().await.unwrap_err();

        assert!(matches!(err, TransportError::Bind { .. }));
        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(
            recorder.statuses(),
            vec![Status::Connecting, Status::ConnectionFailure]
        );
    }

    struct CapturingSink(StdMutex<Vec<(Bytes, SocketAddr)>>);

    #[async_trait]
    impl DatagramSink for CapturingSink {
        async fn send_to(&self, datagram: Bytes, target: SocketAddr) -> Result<()> {
            self.0.lock().unwrap().push((datagram, target));
            Ok(())
        }
    }

    #[tokio::test]
    async fn injected_sink_carries_outgoing_datagrams() {
        let sink = Arc::new(CapturingSink(StdMutex::new(Vec::new())));
        let client = UdpClient::new(endpoint(9100, false, None), Arc::new(crate::NoopHandler))
            .with_sink(sink.clone());

        let message = OscMessage::new("/go");
        client.send(&message).await.unwrap();

        let captured = sink.0.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].1, SocketAddr::from((Ipv4Addr::LOCALHOST, 9100)));
        assert_eq!(captured[0].0, encode_message(&message));
    }
}
