use std::time::Duration;

use clap::{Args, Subcommand};
use oscwire_args::MidiMode;
use oscwire_transport::{Protocol, TransportConfig};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;
pub mod wait;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single OSC message.
    Send(SendArgs),
    /// Print received OSC messages.
    Listen(ListenArgs),
    /// Block until a received message satisfies a feedback predicate.
    Wait(WaitArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args).await,
        Command::Listen(args) => listen::run(args, format).await,
        Command::Wait(args) => wait::run(args, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Where the remote device lives and how to talk to it.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Device IP, hostname or serial device path.
    #[arg(long, env = "OSCWIRE_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Remote port.
    #[arg(long, short = 'p', env = "OSCWIRE_PORT")]
    pub port: Option<u16>,
    #[arg(long, env = "OSCWIRE_PROTOCOL", default_value = "udp")]
    pub protocol: Protocol,
    /// SLIP-delimited packets on stream protocols.
    #[arg(long)]
    pub slip: bool,
    /// Connect timeout for stream protocols (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub connect_timeout: Option<String>,
}

impl ConnectionArgs {
    pub fn transport_config(
        &self,
        listen: bool,
        feedback_port: Option<u16>,
    ) -> CliResult<TransportConfig> {
        let connect_timeout_ms = self
            .connect_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?
            .map(|timeout| timeout.as_millis() as u64);

        Ok(TransportConfig {
            host: self.host.clone(),
            target_port: self.port,
            feedback_port,
            protocol: self.protocol,
            listen,
            slip: self.slip,
            connect_timeout_ms,
            max_buffer_size: None,
        })
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// OSC address, e.g. /mixer/ch/1/fader.
    pub address: String,
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Space separated arguments; quote to keep spaces.
    #[arg(long, conflicts_with_all = ["int", "float", "string", "boolean", "blob", "midi", "midi_raw"])]
    pub args: Option<String>,
    /// Keep `true`/`false` in --args as strings.
    #[arg(long, requires = "args")]
    pub verbatim: bool,
    /// Single 32-bit integer argument.
    #[arg(long, conflicts_with_all = ["float", "string", "boolean", "blob", "midi", "midi_raw"])]
    pub int: Option<String>,
    /// Single float argument.
    #[arg(long, conflicts_with_all = ["string", "boolean", "blob", "midi", "midi_raw"])]
    pub float: Option<String>,
    /// Single string argument.
    #[arg(long, conflicts_with_all = ["boolean", "blob", "midi", "midi_raw"])]
    pub string: Option<String>,
    /// Single boolean argument (T or F tag).
    #[arg(long = "bool", conflicts_with_all = ["blob", "midi", "midi_raw"])]
    pub boolean: Option<bool>,
    /// Blob argument as hex bytes, e.g. "de ad be ef".
    #[arg(long, conflicts_with_all = ["midi", "midi_raw"])]
    pub blob: Option<String>,
    /// MIDI argument built from --midi-port/--channel/--data1/--data2.
    #[arg(long, value_name = "MODE", conflicts_with = "midi_raw")]
    pub midi: Option<MidiMode>,
    /// MIDI argument as four hex bytes.
    #[arg(long, value_name = "HEX")]
    pub midi_raw: Option<String>,
    #[arg(long, default_value = "0")]
    pub midi_port: String,
    #[arg(long, default_value = "1")]
    pub channel: String,
    #[arg(long, default_value = "0")]
    pub data1: String,
    /// Second data byte, or signed pitch for pitchbend.
    #[arg(long, default_value = "0")]
    pub data2: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Local UDP port to bind. Defaults to --port.
    #[arg(long)]
    pub feedback_port: Option<u16>,
    /// Only print messages whose address starts with this prefix.
    #[arg(long)]
    pub prefix: Option<String>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// OSC address to watch.
    pub address: String,
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Local UDP port to bind. Defaults to --port.
    #[arg(long)]
    pub feedback_port: Option<u16>,
    /// Expected arguments, compared position by position.
    #[arg(long, conflicts_with_all = ["index", "target"])]
    pub args: Option<String>,
    /// Compare the argument at this index with --target.
    #[arg(long, requires = "target")]
    pub index: Option<usize>,
    #[arg(long, requires = "index")]
    pub target: Option<String>,
    /// equal, notequal, greaterthan, lessthan, greaterthanequal, lessthanequal.
    #[arg(long, default_value = "equal")]
    pub comparison: String,
    /// Give up after this long (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// UDP feedback needs a local port; fall back to the remote one.
pub fn feedback_port(connection: &ConnectionArgs, feedback_port: Option<u16>) -> Option<u16> {
    match connection.protocol {
        Protocol::Udp => feedback_port.or(connection.port),
        _ => feedback_port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration(" ").is_err());
    }

    #[test]
    fn connect_timeout_becomes_millis() {
        let connection = ConnectionArgs {
            host: "10.0.0.5".into(),
            port: Some(9000),
            protocol: Protocol::Tcp,
            slip: true,
            connect_timeout: Some("2s".into()),
        };
        let config = connection.transport_config(false, None).unwrap();
        assert_eq!(config.connect_timeout_ms, Some(2000));
        assert_eq!(config.target_port, Some(9000));
        assert!(config.slip);
        assert!(!config.listen);
    }

    #[test]
    fn udp_feedback_port_defaults_to_remote_port() {
        let mut connection = ConnectionArgs {
            host: "127.0.0.1".into(),
            port: Some(9000),
            protocol: Protocol::Udp,
            slip: false,
            connect_timeout: None,
        };
        assert_eq!(feedback_port(&connection, None), Some(9000));
        assert_eq!(feedback_port(&connection, Some(9001)), Some(9001));

        connection.protocol = Protocol::Tcp;
        assert_eq!(feedback_port(&connection, None), None);
    }
}
