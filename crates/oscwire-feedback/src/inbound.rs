use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use oscwire_frame::{OscArg, OscMessage, OscPacket};
use oscwire_transport::{Status, TransportHandler};
use serde_json::{json, Value as Json};
use tracing::{debug, trace};

use crate::store::ReceivedStateStore;

/// Variable values exported to the host, keyed by variable name.
pub type Variables = BTreeMap<String, Json>;

/// The automation platform this crate reports to.
pub trait Host: Send + Sync {
    fn update_status(&self, status: Status);

    fn set_variable_values(&self, values: Variables);

    /// Re-evaluate registered feedbacks against the store.
    fn check_feedbacks(&self);
}

/// Routes transport events into the store and the host.
///
/// Each message, and each message element of a received bundle, updates
/// the store, triggers one feedback check and refreshes the
/// `latest_received_*` variables.
pub struct InboundDispatcher {
    store: Arc<ReceivedStateStore>,
    host: Arc<dyn Host>,
}

impl InboundDispatcher {
    pub fn new(store: Arc<ReceivedStateStore>, host: Arc<dyn Host>) -> Self {
        Self { store, host }
    }

    pub fn store(&self) -> &Arc<ReceivedStateStore> {
        &self.store
    }

    fn deliver(&self, message: &OscMessage) {
        self.store.update(&message.address, message.args.clone());
        debug!(address = %message.address, args = ?message.args, "OSC message received");

        self.host.check_feedbacks();
        self.host
            .set_variable_values(message_variables("latest_received", message));
    }
}

impl TransportHandler for InboundDispatcher {
    fn on_status(&self, status: Status) {
        self.host.update_status(status);
    }

    fn on_packet(&self, packet: OscPacket, from: Option<SocketAddr>) {
        if let Some(from) = from {
            trace!(%from, "packet source");
            let mut sender = Variables::new();
            sender.insert("latest_received_client".into(), json!(from.ip().to_string()));
            sender.insert("latest_received_port".into(), json!(from.port()));
            self.host.set_variable_values(sender);
        }

        match packet {
            OscPacket::Message(message) => self.deliver(&message),
            OscPacket::Bundle(bundle) => {
                for element in &bundle.elements {
                    match element {
                        OscPacket::Message(message) => self.deliver(message),
                        OscPacket::Bundle(_) => debug!("skipping nested bundle"),
                    }
                }
            }
        }
    }

    fn on_sent(&self, message: &OscMessage) {
        self.host
            .set_variable_values(message_variables("latest_sent", message));
    }
}

fn message_variables(prefix: &str, message: &OscMessage) -> Variables {
    let raw = std::iter::once(message.address.clone())
        .chain(message.args.iter().map(arg_text))
        .collect::<Vec<_>>()
        .join(" ");
    let args = if message.args.is_empty() {
        Json::Null
    } else {
        Json::Array(message.args.iter().map(arg_json).collect())
    };

    let mut vars = Variables::new();
    vars.insert(format!("{prefix}_raw"), json!(raw));
    vars.insert(format!("{prefix}_path"), json!(message.address));
    vars.insert(format!("{prefix}_args"), args);
    vars.insert(format!("{prefix}_timestamp"), json!(now_millis()));
    vars
}

/// JSON form of one argument for variable export.
pub fn arg_json(arg: &OscArg) -> Json {
    match arg {
        OscArg::Int(v) => json!(v),
        OscArg::Float(v) => json!(v),
        OscArg::Long(v) => json!(v),
        OscArg::Double(v) => json!(v),
        OscArg::TimeTag(t) => json!(t.0),
        OscArg::String(s) | OscArg::Symbol(s) => json!(s),
        OscArg::Char(c) => json!(c.to_string()),
        OscArg::True => json!(true),
        OscArg::False => json!(false),
        OscArg::Blob(b) => json!(b.to_vec()),
        OscArg::Midi(b) | OscArg::Color(b) => json!(b.to_vec()),
        OscArg::Nil | OscArg::Impulse => Json::Null,
    }
}

/// Text form of one argument, as shown in `*_raw` variables.
pub fn arg_text(arg: &OscArg) -> String {
    match arg {
        OscArg::Int(v) => v.to_string(),
        OscArg::Float(v) => v.to_string(),
        OscArg::Long(v) => v.to_string(),
        OscArg::Double(v) => v.to_string(),
        OscArg::TimeTag(t) => t.0.to_string(),
        OscArg::String(s) | OscArg::Symbol(s) => s.clone(),
        OscArg::Char(c) => c.to_string(),
        OscArg::True => "true".into(),
        OscArg::False => "false".into(),
        OscArg::Blob(b) => hex_text(b),
        OscArg::Midi(b) | OscArg::Color(b) => hex_text(b),
        OscArg::Nil => "nil".into(),
        OscArg::Impulse => "impulse".into(),
    }
}

fn hex_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use oscwire_frame::{OscBundle, TimeTag};

    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        statuses: Mutex<Vec<Status>>,
        variables: Mutex<Vec<Variables>>,
        checks: Mutex<usize>,
    }

    impl Host for RecordingHost {
        fn update_status(&self, status: Status) {
            self.statuses.lock().unwrap().push(status);
        }

        fn set_variable_values(&self, values: Variables) {
            self.variables.lock().unwrap().push(values);
        }

        fn check_feedbacks(&self) {
            *self.checks.lock().unwrap() += 1;
        }
    }

    fn dispatcher() -> (InboundDispatcher, Arc<RecordingHost>) {
        let host = Arc::new(RecordingHost::default());
        let dispatcher = InboundDispatcher::new(Arc::new(ReceivedStateStore::new()), host.clone());
        (dispatcher, host)
    }

    #[test]
    fn bundle_elements_are_delivered_individually() {
        let (dispatcher, host) = dispatcher();
        let blob = Bytes::from_static(b"cat!");
        let bundle = OscBundle::new(
            TimeTag::IMMEDIATE,
            vec![
                OscMessage::with_args("/a", vec![OscArg::Int(10)]).into(),
                OscMessage::with_args("/f", vec![OscArg::Float(1.5)]).into(),
                OscMessage::with_args("/b", vec![OscArg::String("hi".into())]).into(),
                OscMessage::with_args("/blob", vec![OscArg::Blob(blob.clone())]).into(),
                OscMessage::with_args("/midiMessage", vec![OscArg::Midi([0, 0x90, 0x45, 0x65])])
                    .into(),
                OscMessage::with_args("/boolTrue", vec![OscArg::True]).into(),
                OscMessage::with_args("/boolFalse", vec![OscArg::False]).into(),
                OscBundle::new(TimeTag::IMMEDIATE, vec![OscMessage::new("/nested").into()]).into(),
            ],
        );

        dispatcher.on_packet(bundle.into(), None);

        let store = dispatcher.store();
        assert_eq!(store.get("/a"), Some(vec![OscArg::Int(10)]));
        assert_eq!(store.get("/blob"), Some(vec![OscArg::Blob(blob)]));
        assert_eq!(store.get("/boolFalse"), Some(vec![OscArg::False]));
        assert_eq!(store.get("/nested"), None);

        assert_eq!(*host.checks.lock().unwrap(), 7);
        let variables = host.variables.lock().unwrap();
        assert_eq!(variables.len(), 7);

        let midi = variables
            .iter()
            .find(|vars| vars["latest_received_path"] == json!("/midiMessage"))
            .unwrap();
        assert_eq!(midi["latest_received_args"], json!([[0, 0x90, 0x45, 0x65]]));
        assert_eq!(midi["latest_received_raw"], json!("/midiMessage 00 90 45 65"));

        let truthy = variables
            .iter()
            .find(|vars| vars["latest_received_path"] == json!("/boolTrue"))
            .unwrap();
        assert_eq!(truthy["latest_received_args"], json!([true]));
    }

    #[test]
    fn sender_address_is_exported() {
        let (dispatcher, host) = dispatcher();
        let from: SocketAddr = "192.168.1.20:9001".parse().unwrap();
        dispatcher.on_packet(OscMessage::new("/ping").into(), Some(from));

        let variables = host.variables.lock().unwrap();
        assert_eq!(variables[0]["latest_received_client"], json!("192.168.1.20"));
        assert_eq!(variables[0]["latest_received_port"], json!(9001));
        assert_eq!(variables[1]["latest_received_args"], Json::Null);
        assert_eq!(variables[1]["latest_received_raw"], json!("/ping"));
    }

    #[test]
    fn sent_messages_and_status_reach_host() {
        let (dispatcher, host) = dispatcher();
        dispatcher.on_status(Status::Ok);
        dispatcher.on_sent(&OscMessage::with_args(
            "/go",
            vec![OscArg::Int(1), OscArg::String("x".into())],
        ));

        assert_eq!(*host.statuses.lock().unwrap(), vec![Status::Ok]);
        let variables = host.variables.lock().unwrap();
        assert_eq!(variables[0]["latest_sent_raw"], json!("/go 1 x"));
        assert_eq!(variables[0]["latest_sent_args"], json!([1, "x"]));
        assert!(variables[0]["latest_sent_timestamp"].as_u64().unwrap() > 0);
        assert_eq!(*host.checks.lock().unwrap(), 0);
    }
}
