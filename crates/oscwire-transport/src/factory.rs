use std::sync::Arc;

use tracing::{error, info};

use crate::endpoint::{Endpoint, Protocol, TransportConfig};
use crate::error::Result;
use crate::state::Status;
use crate::stream::StreamClient;
use crate::traits::{OscTransport, TransportHandler};
use crate::udp::UdpClient;

/// Build the client variant matching `endpoint.protocol`. Nothing is opened.
pub fn create_transport(
    endpoint: Endpoint,
    handler: Arc<dyn TransportHandler>,
) -> Box<dyn OscTransport> {
    match endpoint.protocol {
        Protocol::Udp => Box::new(UdpClient::new(endpoint, handler)),
        Protocol::Tcp | Protocol::TcpRaw | Protocol::Serial => {
            Box::new(StreamClient::new(endpoint, handler))
        }
    }
}

/// Validate `config`, build a transport and open it when listening.
///
/// Configuration and resolution failures are reported to `handler` as
/// [`Status::BadConfig`] before being returned. Send-only transports stay
/// closed and open lazily on their first send, but report [`Status::Ok`]
/// right away so the host sees a usable instance.
pub async fn configure(
    config: &TransportConfig,
    handler: Arc<dyn TransportHandler>,
) -> Result<Box<dyn OscTransport>> {
    let endpoint = match Endpoint::resolve(config).await {
        Ok(endpoint) => endpoint,
        Err(err) => {
            error!(%err, "transport configuration rejected");
            handler.on_status(Status::BadConfig);
            return Err(err);
        }
    };

    info!(
        protocol = %endpoint.protocol,
        target = %endpoint.describe(),
        listen = endpoint.listen,
        "transport configured"
    );
    let listen = endpoint.listen;
    let transport = create_transport(endpoint, Arc::clone(&handler));
    if listen {
        transport.open().await?;
    } else {
        handler.on_status(Status::Ok);
    }
    Ok(transport)
}
