use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use oscwire_frame::{FramerConfig, StreamFraming, DEFAULT_MAX_BUFFER};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Wire protocol selected in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    #[serde(rename = "udp")]
    Udp,
    #[serde(rename = "tcp")]
    Tcp,
    #[serde(rename = "tcp-raw")]
    TcpRaw,
    #[serde(rename = "serial")]
    Serial,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
            Protocol::TcpRaw => "tcp-raw",
            Protocol::Serial => "serial",
        }
    }

    /// Whether inbound bytes need stream reassembly.
    pub fn is_stream(self) -> bool {
        !matches!(self, Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            "tcp-raw" => Ok(Protocol::TcpRaw),
            "serial" => Ok(Protocol::Serial),
            other => Err(TransportError::Config(format!("unknown protocol {other:?}"))),
        }
    }
}

/// Connection settings as supplied by the host.
///
/// Field names follow the host's JSON config (`targetPort`, `feedbackPort`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportConfig {
    /// Literal IP, hostname, or serial device path.
    pub host: String,
    pub target_port: Option<u16>,
    /// Local port to bind when listening for UDP feedback.
    pub feedback_port: Option<u16>,
    pub protocol: Protocol,
    pub listen: bool,
    /// Use SLIP delimiters on stream transports instead of bare packets.
    pub slip: bool,
    /// Upper bound on a connect attempt. Absent means wait indefinitely.
    pub connect_timeout_ms: Option<u64>,
    /// Reassembly buffer ceiling in bytes.
    pub max_buffer_size: Option<usize>,
}

/// A validated, resolved connection target.
///
/// Built once per configuration; hostname resolution happens here and is
/// not repeated for the lifetime of the endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub host: String,
    /// Resolved address; `None` for serial devices.
    pub address: Option<IpAddr>,
    pub target_port: u16,
    /// Fixed local port bound when listening.
    pub local_port: Option<u16>,
    pub protocol: Protocol,
    pub listen: bool,
    pub framing: StreamFraming,
    pub connect_timeout: Option<Duration>,
    pub max_buffer_size: usize,
}

impl Endpoint {
    /// Validate `config` and resolve its host.
    ///
    /// Fails with [`TransportError::Config`] for missing or inconsistent
    /// fields and [`TransportError::Resolve`] when a hostname has no IPv4
    /// address.
    pub async fn resolve(config: &TransportConfig) -> Result<Self> {
        let host = config.host.trim();
        if host.is_empty() {
            return Err(TransportError::Config("target host is missing".into()));
        }

        let target_port = match config.target_port {
            Some(port) if port != 0 => port,
            _ => return Err(TransportError::Config("target port is missing".into())),
        };

        let local_port = if config.listen && config.protocol == Protocol::Udp {
            match config.feedback_port {
                Some(port) if port != 0 => Some(port),
                _ => {
                    return Err(TransportError::Config(
                        "listening over UDP requires a feedback port".into(),
                    ))
                }
            }
        } else {
            None
        };

        let address = match config.protocol {
            Protocol::Serial => None,
            _ => Some(resolve_host(host, target_port).await?),
        };

        Ok(Self {
            host: host.to_string(),
            address,
            target_port,
            local_port,
            protocol: config.protocol,
            listen: config.listen,
            framing: if config.slip {
                StreamFraming::Slip
            } else {
                StreamFraming::Unframed
            },
            connect_timeout: config.connect_timeout_ms.map(Duration::from_millis),
            max_buffer_size: config.max_buffer_size.unwrap_or(DEFAULT_MAX_BUFFER),
        })
    }

    /// Remote socket address for network protocols.
    pub fn target_addr(&self) -> Result<SocketAddr> {
        self.address
            .map(|ip| SocketAddr::new(ip, self.target_port))
            .ok_or_else(|| {
                TransportError::Config(format!("{} endpoint has no network address", self.protocol))
            })
    }

    /// Human-readable target for log lines and errors.
    pub fn describe(&self) -> String {
        match self.address {
            Some(ip) => format!("{}:{}", ip, self.target_port),
            None => self.host.clone(),
        }
    }

    /// Reassembly settings for stream transports. Raw TCP never uses SLIP.
    pub fn framer_config(&self) -> FramerConfig {
        let framing = match self.protocol {
            Protocol::TcpRaw => StreamFraming::Unframed,
            _ => self.framing,
        };
        FramerConfig {
            framing,
            max_buffer_size: self.max_buffer_size,
        }
    }
}

/// True if `host` is a literal IPv4 or IPv6 address.
pub fn is_ip_address(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok()
}

async fn resolve_host(host: &str, port: u16) -> Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    debug!(host, "resolving hostname");
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?;

    let ip = addrs
        .map(|addr| addr.ip())
        .find(IpAddr::is_ipv4)
        .ok_or_else(|| TransportError::Resolve {
            host: host.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no IPv4 address"),
        })?;

    info!("Resolved {host} to {ip}");
    Ok(ip)
}
