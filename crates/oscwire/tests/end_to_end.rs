use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use oscwire::args::SendAction;
use oscwire::feedback::{
    Comparison, FeedbackMatcher, Host, InboundDispatcher, ReceivedStateStore, Variables,
};
use oscwire::frame::slip::slip_encode;
use oscwire::frame::{
    decode_packet, encode_message, encode_packet, OscArg, OscBundle, OscMessage, TimeTag,
};
use oscwire::transport::{configure, Protocol, Status, TransportConfig};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

#[derive(Default)]
struct RecordingHost {
    statuses: Mutex<Vec<Status>>,
    variables: Mutex<Variables>,
    checks: Mutex<usize>,
}

impl Host for RecordingHost {
    fn update_status(&self, status: Status) {
        self.statuses.lock().unwrap().push(status);
    }

    fn set_variable_values(&self, values: Variables) {
        self.variables.lock().unwrap().extend(values);
    }

    fn check_feedbacks(&self) {
        *self.checks.lock().unwrap() += 1;
    }
}

struct Harness {
    host: Arc<RecordingHost>,
    store: Arc<ReceivedStateStore>,
    matcher: FeedbackMatcher,
}

impl Harness {
    fn new() -> (Self, Arc<InboundDispatcher>) {
        let host = Arc::new(RecordingHost::default());
        let store = Arc::new(ReceivedStateStore::new());
        let dispatcher = Arc::new(InboundDispatcher::new(store.clone(), host.clone()));
        let matcher = FeedbackMatcher::new(store.clone());
        (
            Self {
                host,
                store,
                matcher,
            },
            dispatcher,
        )
    }

    async fn wait_for(&self, address: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.store.get(address).is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("nothing received on {address}"));
    }
}

fn free_udp_port() -> u16 {
    std::net::UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn udp_request_and_bundled_reply_drive_feedbacks() {
    let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let device_port = device.local_addr().unwrap().port();
    let feedback_port = free_udp_port();

    let (harness, dispatcher) = Harness::new();
    let config = TransportConfig {
        host: "127.0.0.1".into(),
        target_port: Some(device_port),
        feedback_port: Some(feedback_port),
        protocol: Protocol::Udp,
        listen: true,
        ..TransportConfig::default()
    };
    let transport = configure(&config, dispatcher).await.unwrap();

    let request = SendAction::Multiple {
        arguments: "\"mix 1\" 2 0.5".into(),
        strategy: Default::default(),
    }
    .build("/status")
    .unwrap();
    transport.send(&request).await.unwrap();

    let mut buf = vec![0u8; 1536];
    let (len, client) = device.recv_from(&mut buf).await.unwrap();
    assert_eq!(client.port(), feedback_port);
    let received = decode_packet(&buf[..len]).unwrap();
    assert_eq!(received.messages(), vec![&request]);

    let reply = OscBundle::new(
        TimeTag::IMMEDIATE,
        vec![
            OscMessage::with_args("/ch/1/fader", vec![OscArg::Float(0.75)]).into(),
            OscMessage::with_args("/ch/1/mute", vec![OscArg::True]).into(),
            OscMessage::with_args("/scene", vec![OscArg::String("intro".into()), OscArg::Int(3)])
                .into(),
        ],
    );
    device
        .send_to(&encode_packet(&reply.into()), client)
        .await
        .unwrap();

    harness.wait_for("/scene").await;
    let matcher = &harness.matcher;
    assert!(matcher.match_indexed("/ch/1/fader", 0, &Comparison::GreaterThan, "0.5"));
    assert!(matcher.match_indexed("/ch/1/mute", 0, &Comparison::Equal, "true"));
    assert!(matcher.match_arguments("/scene", "intro 3", &Comparison::Equal));
    assert!(matcher.check_presence("/scene"));
    assert!(!matcher.check_presence("/scene"));

    assert_eq!(*harness.host.checks.lock().unwrap(), 3);
    let variables = harness.host.variables.lock().unwrap().clone();
    assert_eq!(variables["latest_received_client"], json!("127.0.0.1"));
    assert_eq!(variables["latest_received_port"], json!(device_port));
    assert_eq!(variables["latest_received_path"], json!("/scene"));
    assert_eq!(variables["latest_sent_raw"], json!("/status mix 1 2 0.5"));

    transport.close().await.unwrap();
    let statuses = harness.host.statuses.lock().unwrap().clone();
    assert_eq!(
        statuses,
        vec![Status::Connecting, Status::Ok, Status::Disconnected]
    );
}

#[tokio::test]
async fn tcp_reassembles_fragmented_packets() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (harness, dispatcher) = Harness::new();
    let config = TransportConfig {
        host: "127.0.0.1".into(),
        target_port: Some(port),
        protocol: Protocol::Tcp,
        listen: true,
        connect_timeout_ms: Some(2000),
        ..TransportConfig::default()
    };
    let transport = configure(&config, dispatcher).await.unwrap();
    let (mut device, _) = listener.accept().await.unwrap();

    let first = encode_message(&OscMessage::with_args("/meter/1", vec![OscArg::Float(-12.5)]));
    let second = encode_message(&OscMessage::with_args(
        "/midi",
        vec![OscArg::Midi([0, 0x90, 60, 127])],
    ));
    let mut wire = first.to_vec();
    wire.extend_from_slice(&second);
    let (head, tail) = wire.split_at(first.len() + 5);

    device.write_all(head).await.unwrap();
    device.flush().await.unwrap();
    harness.wait_for("/meter/1").await;
    assert!(harness.store.get("/midi").is_none());

    device.write_all(tail).await.unwrap();
    harness.wait_for("/midi").await;

    assert!(harness
        .matcher
        .match_indexed("/meter/1", 0, &Comparison::LessThan, "-10"));
    assert!(harness.matcher.match_midi(
        "/midi",
        0,
        &oscwire::feedback::MidiFilter {
            kind: Some(oscwire::args::MidiType::NoteOn),
            channel: Some(1),
            data1: Some(60),
            ..Default::default()
        }
    ));

    let outbound = OscMessage::with_args("/ping", vec![OscArg::Int(7)]);
    transport.send(&outbound).await.unwrap();
    let expected = encode_message(&outbound);
    let mut buf = vec![0u8; expected.len()];
    device.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, expected.to_vec());

    transport.close().await.unwrap();
}

#[tokio::test]
async fn slip_framed_tcp_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (harness, dispatcher) = Harness::new();
    let config = TransportConfig {
        host: "localhost".into(),
        target_port: Some(port),
        protocol: Protocol::Tcp,
        listen: true,
        slip: true,
        ..TransportConfig::default()
    };
    let transport = configure(&config, dispatcher).await.unwrap();
    let (mut device, _) = listener.accept().await.unwrap();

    let mut framed = BytesMut::new();
    slip_encode(
        &encode_message(&OscMessage::with_args("/tally", vec![OscArg::Int(1)])),
        &mut framed,
    );
    device.write_all(&framed).await.unwrap();
    harness.wait_for("/tally").await;
    assert!(harness.matcher.match_arguments("/tally", "1", &Comparison::Equal));

    drop(device);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !harness
            .host
            .statuses
            .lock()
            .unwrap()
            .contains(&Status::Disconnected)
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("remote close should be reported");

    transport.close().await.unwrap();
}

#[tokio::test]
async fn bad_config_is_reported_before_any_io() {
    let (harness, dispatcher) = Harness::new();
    let config = TransportConfig {
        host: String::new(),
        target_port: Some(9000),
        ..TransportConfig::default()
    };

    assert!(configure(&config, dispatcher).await.is_err());
    assert_eq!(*harness.host.statuses.lock().unwrap(), vec![Status::BadConfig]);
}
