//! Application service — network exposure of server ports.
//!
//! Local exposure is a host firewall allow rule; external exposure is a UPnP
//! port mapping on the LAN router. Either side may be disabled by
//! configuration, in which case its operations succeed without doing
//! anything.

use std::sync::Arc;

use anyhow::{Context, Result};
use mchost_common::Protocol;

use crate::application::ports::{FirewallBackend, FirewallRule, GatewayError, RouterGateway};

/// Result of requesting a router port mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalExposure {
    /// The router now forwards the port to this host.
    Mapped,
    /// UPnP is turned off for this host.
    Disabled,
    /// No mapping could be made; the port must be forwarded manually.
    Unavailable(String),
}

/// Opens and closes host firewall rules and router port mappings.
#[derive(Clone)]
pub struct NetworkExposureManager {
    firewall: Option<Arc<dyn FirewallBackend>>,
    gateway: Option<Arc<dyn RouterGateway>>,
}

impl NetworkExposureManager {
    #[must_use]
    pub fn new(
        firewall: Option<Arc<dyn FirewallBackend>>,
        gateway: Option<Arc<dyn RouterGateway>>,
    ) -> Self {
        Self { firewall, gateway }
    }

    /// Install an inbound allow rule for `port`. Succeeds without adding a
    /// second rule when one already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the firewall cannot be queried or updated.
    pub async fn open_local(&self, port: u16, protocol: Protocol) -> Result<()> {
        let Some(firewall) = &self.firewall else {
            return Ok(());
        };
        let rule = FirewallRule { port, protocol };
        if firewall
            .rule_exists(&rule)
            .await
            .with_context(|| format!("checking firewall rule for port {port}"))?
        {
            tracing::debug!(port, "firewall rule already present");
            return Ok(());
        }
        firewall
            .add_rule(&rule)
            .await
            .with_context(|| format!("opening port {port}/{protocol} in the firewall"))?;
        tracing::info!(port, %protocol, "opened port in host firewall");
        Ok(())
    }

    /// Remove the allow rule for `port`. Succeeds when no rule exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the firewall cannot be queried or updated.
    pub async fn close_local(&self, port: u16, protocol: Protocol) -> Result<()> {
        let Some(firewall) = &self.firewall else {
            return Ok(());
        };
        let rule = FirewallRule { port, protocol };
        if !firewall.rule_exists(&rule).await? {
            return Ok(());
        }
        firewall
            .delete_rule(&rule)
            .await
            .with_context(|| format!("closing port {port}/{protocol} in the firewall"))?;
        tracing::info!(port, %protocol, "closed port in host firewall");
        Ok(())
    }

    /// Ask the router to forward `port` to this host, replacing any stale
    /// mapping. Never fails: problems come back as
    /// [`ExternalExposure::Unavailable`].
    pub async fn open_external(&self, port: u16, protocol: Protocol) -> ExternalExposure {
        let Some(gateway) = &self.gateway else {
            return ExternalExposure::Disabled;
        };
        match map_port(gateway.as_ref(), port, protocol).await {
            Ok(()) => {
                tracing::info!(port, %protocol, "router port mapping added");
                ExternalExposure::Mapped
            }
            Err(err) => {
                tracing::warn!(port, %protocol, error = %err, "router port mapping unavailable");
                ExternalExposure::Unavailable(err.to_string())
            }
        }
    }

    /// Remove the router mapping for `port`. A missing router or mapping is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the router rejects the removal.
    pub async fn close_external(&self, port: u16, protocol: Protocol) -> Result<(), GatewayError> {
        let Some(gateway) = &self.gateway else {
            return Ok(());
        };
        let session = match gateway.connect().await {
            Ok(session) => session,
            Err(GatewayError::NotFound) => {
                tracing::debug!(port, "no router found; nothing to unmap");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if session.remove_mapping(port, protocol).await? {
            tracing::info!(port, %protocol, "router port mapping removed");
        }
        Ok(())
    }
}

async fn map_port(
    gateway: &dyn RouterGateway,
    port: u16,
    protocol: Protocol,
) -> Result<(), GatewayError> {
    let session = gateway.connect().await?;
    session.remove_mapping(port, protocol).await?;
    let lan_addr = session.lan_addr();
    session
        .add_mapping(port, protocol, lan_addr, &format!("Server Port {port}"))
        .await
}
