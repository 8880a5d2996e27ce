//! Host firewall adapters.
//!
//! `NetshFirewall` drives `netsh advfirewall` on Windows hosts and
//! `UfwFirewall` drives `ufw` on Linux hosts. Both identify rules by the
//! deterministic name from [`FirewallRule::name`].

use std::process::Output;

use anyhow::Result;
use async_trait::async_trait;

use crate::application::ports::{CommandRunner, FirewallBackend, FirewallRule};

fn ensure_success(output: &Output, action: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if stderr.trim().is_empty() { stdout } else { stderr };
    anyhow::bail!("{action} failed: {}", detail.trim())
}

// ── netsh ────────────────────────────────────────────────────────────────────

/// Windows Defender Firewall through `netsh advfirewall firewall`.
pub struct NetshFirewall<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> NetshFirewall<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: CommandRunner> FirewallBackend for NetshFirewall<R> {
    async fn rule_exists(&self, rule: &FirewallRule) -> Result<bool> {
        let name = format!("name={}", rule.name());
        let output = self
            .runner
            .run("netsh", &["advfirewall", "firewall", "show", "rule", &name])
            .await?;
        // netsh exits non-zero and prints "No rules match" when the rule is absent.
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(output.status.success() && !stdout.contains("No rules match"))
    }

    async fn add_rule(&self, rule: &FirewallRule) -> Result<()> {
        let name = format!("name={}", rule.name());
        let protocol = format!("protocol={}", rule.protocol.as_str());
        let localport = format!("localport={}", rule.port);
        let output = self
            .runner
            .run(
                "netsh",
                &[
                    "advfirewall",
                    "firewall",
                    "add",
                    "rule",
                    &name,
                    "dir=in",
                    "action=allow",
                    &protocol,
                    &localport,
                ],
            )
            .await?;
        ensure_success(&output, "netsh add rule")
    }

    async fn delete_rule(&self, rule: &FirewallRule) -> Result<()> {
        let name = format!("name={}", rule.name());
        let protocol = format!("protocol={}", rule.protocol.as_str());
        let localport = format!("localport={}", rule.port);
        let output = self
            .runner
            .run(
                "netsh",
                &["advfirewall", "firewall", "delete", "rule", &name, &protocol, &localport],
            )
            .await?;
        ensure_success(&output, "netsh delete rule")
    }
}

// ── ufw ──────────────────────────────────────────────────────────────────────

/// Uncomplicated Firewall on Linux hosts.
pub struct UfwFirewall<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> UfwFirewall<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

fn ufw_target(rule: &FirewallRule) -> String {
    format!("{}/{}", rule.port, rule.protocol.as_lower())
}

#[async_trait]
impl<R: CommandRunner> FirewallBackend for UfwFirewall<R> {
    async fn rule_exists(&self, rule: &FirewallRule) -> Result<bool> {
        let output = self.runner.run("ufw", &["status"]).await?;
        ensure_success(&output, "ufw status")?;
        let target = ufw_target(rule);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|line| {
            let mut cols = line.split_whitespace();
            cols.next() == Some(target.as_str()) && line.contains("ALLOW")
        }))
    }

    async fn add_rule(&self, rule: &FirewallRule) -> Result<()> {
        let target = ufw_target(rule);
        let name = rule.name();
        let output = self
            .runner
            .run("ufw", &["allow", &target, "comment", &name])
            .await?;
        ensure_success(&output, "ufw allow")
    }

    async fn delete_rule(&self, rule: &FirewallRule) -> Result<()> {
        let target = ufw_target(rule);
        let output = self.runner.run("ufw", &["delete", "allow", &target]).await?;
        ensure_success(&output, "ufw delete")
    }
}
