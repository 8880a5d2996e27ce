//! Terminal palette for operator output.

use owo_colors::Style;

/// Styles for report glyphs and server listings. All plain when color is off.
#[derive(Default, Clone, Copy)]
pub struct Styles {
    pub ok: Style,
    pub warn: Style,
    pub fail: Style,
    pub note: Style,
    /// Keys in key/value lines.
    pub label: Style,
    /// Listing column titles.
    pub title: Style,
    pub running: Style,
    pub stopped: Style,
    /// Host port column; the port players connect to.
    pub port: Style,
}

impl Styles {
    #[must_use]
    pub fn new(colored: bool) -> Self {
        if !colored {
            return Self::default();
        }
        Self {
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red().bold(),
            note: Style::new().blue(),
            label: Style::new().dimmed(),
            title: Style::new().bold().cyan(),
            running: Style::new().green().bold(),
            stopped: Style::new().dimmed(),
            port: Style::new().cyan(),
        }
    }

    /// Label and style for a server's activity column.
    #[must_use]
    pub fn activity(&self, is_active: bool) -> (&'static str, Style) {
        if is_active {
            ("running", self.running)
        } else {
            ("stopped", self.stopped)
        }
    }
}
