//! UPnP Internet Gateway Device adapter.
//!
//! Discovery runs once per operation with a bounded timeout; a router that
//! does not answer in time is reported as [`GatewayError::NotFound`].

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use igd_next::aio::Gateway;
use igd_next::aio::tokio::Tokio;
use igd_next::{PortMappingProtocol, RemovePortError, SearchError, SearchOptions};
use mchost_common::Protocol;

use crate::application::ports::{GatewayError, RouterGateway, RouterSession};

/// Mappings never expire on their own; they are removed on stop.
const PERMANENT_LEASE: u32 = 0;

/// Discovers the LAN router over SSDP.
pub struct IgdGateway {
    timeout: Duration,
}

impl IgdGateway {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl RouterGateway for IgdGateway {
    async fn connect(&self) -> Result<Box<dyn RouterSession>, GatewayError> {
        let options = SearchOptions {
            timeout: Some(self.timeout),
            ..SearchOptions::default()
        };
        let gateway = igd_next::aio::tokio::search_gateway(options)
            .await
            .map_err(search_error)?;
        let lan_addr = local_addr_towards(gateway.addr)
            .await
            .map_err(|e| GatewayError::Request(format!("cannot determine LAN address: {e}")))?;
        tracing::debug!(gateway = %gateway.addr, %lan_addr, "UPnP gateway found");
        Ok(Box::new(IgdSession { gateway, lan_addr }))
    }
}

fn search_error(err: SearchError) -> GatewayError {
    match err {
        SearchError::NoResponseWithinTimeout => GatewayError::NotFound,
        other => GatewayError::Request(other.to_string()),
    }
}

/// Address of the interface the OS would use to reach `gateway`.
async fn local_addr_towards(gateway: SocketAddr) -> std::io::Result<IpAddr> {
    let bind: SocketAddr = if gateway.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let socket = tokio::net::UdpSocket::bind(bind).await?;
    socket.connect(gateway).await?;
    Ok(socket.local_addr()?.ip())
}

fn mapping_protocol(protocol: Protocol) -> PortMappingProtocol {
    match protocol {
        Protocol::Tcp => PortMappingProtocol::TCP,
        Protocol::Udp => PortMappingProtocol::UDP,
    }
}

struct IgdSession {
    gateway: Gateway<Tokio>,
    lan_addr: IpAddr,
}

#[async_trait]
impl RouterSession for IgdSession {
    fn lan_addr(&self) -> IpAddr {
        self.lan_addr
    }

    async fn remove_mapping(&self, port: u16, protocol: Protocol) -> Result<bool, GatewayError> {
        match self.gateway.remove_port(mapping_protocol(protocol), port).await {
            Ok(()) => Ok(true),
            Err(RemovePortError::NoSuchPortMapping) => Ok(false),
            Err(err) => Err(GatewayError::Request(err.to_string())),
        }
    }

    async fn add_mapping(
        &self,
        port: u16,
        protocol: Protocol,
        lan_addr: IpAddr,
        description: &str,
    ) -> Result<(), GatewayError> {
        self.gateway
            .add_port(
                mapping_protocol(protocol),
                port,
                SocketAddr::new(lan_addr, port),
                PERMANENT_LEASE,
                description,
            )
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))
    }
}
