//! Coloured notices on stderr.

use std::io::{self, Write};

use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::{execute, tty::IsTty};
use tokenkeep_core::{NoticeKind, Notifier};

pub struct TerminalNotifier {
    color: bool,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self {
            color: io::stderr().is_tty(),
        }
    }

    fn prefix(kind: NoticeKind) -> (&'static str, Color) {
        match kind {
            NoticeKind::Success => ("✓", Color::Green),
            NoticeKind::Error => ("✗", Color::Red),
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        let (symbol, color) = Self::prefix(kind);
        let mut stderr = io::stderr().lock();

        let written = if self.color {
            execute!(
                stderr,
                SetForegroundColor(color),
                SetAttribute(Attribute::Bold),
                Print(format!("{} {}", symbol, message)),
                SetAttribute(Attribute::Reset),
                ResetColor,
                Print("\n"),
            )
        } else {
            writeln!(stderr, "{} {}", symbol, message)
        };

        if written.is_err() {
            tracing::warn!(notice = message, "Failed to display notice");
        }
    }
}
