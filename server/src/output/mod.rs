//! Human-readable CLI output: report glyphs and server tables.

pub mod json;
pub mod styles;

use console::Term;
use mchost_common::{OperationReport, ServerRecord};
use owo_colors::OwoColorize as _;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        Self {
            styles: Styles::new(use_colors),
            is_tty,
            quiet,
        }
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.ok));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warn));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.fail));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.note));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.title));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.label));
        }
    }

    /// Print an operation report: its message, then one warning line each.
    pub fn report(&self, report: &OperationReport) {
        if report.success {
            self.success(&report.message);
        } else {
            self.error(&report.message);
        }
        for warning in &report.warnings {
            self.warn(warning);
        }
    }

    /// Print one server per line. Suppressed when `quiet`.
    pub fn servers(&self, servers: &[ServerRecord]) {
        if servers.is_empty() {
            self.info("No servers.");
            return;
        }
        self.header(&format!(
            "{:>4}  {:>6}  {:>5}  {:<16}  {:<8}  {}",
            "ID", "OWNER", "PORT", "PLAN", "STATE", "RESOURCES"
        ));
        if self.quiet {
            return;
        }
        for server in servers {
            let (activity, style) = self.styles.activity(server.is_active);
            let state = format!("{activity:<8}").style(style).to_string();
            let port = format!("{:>5}", server.port).style(self.styles.port).to_string();
            println!(
                "  {:>4}  {:>6}  {}  {:<16}  {}  {} vCPU / {}",
                server.id,
                server.owner,
                port,
                server.plan_type.to_string(),
                state,
                server.cpu_cores,
                server.mem_limit,
            );
        }
    }
}
