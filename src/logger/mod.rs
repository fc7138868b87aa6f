use crate::HookResult;
use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
    tty::IsTty,
};
use std::cell::RefCell;
use std::io::{self, Write};

/// Phase shown next to the status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    Scanning,
    Running,
    Done(HookResult),
}

impl StatusPhase {
    fn symbol(self) -> &'static str {
        match self {
            StatusPhase::Scanning => "…",
            StatusPhase::Running => "⟳",
            StatusPhase::Done(HookResult::Clean) => "✓",
            StatusPhase::Done(HookResult::HasChanges) => "✎",
            StatusPhase::Done(HookResult::HasUnstagedChanges) => "⚠",
            StatusPhase::Done(HookResult::Rejected) => "✗",
        }
    }
}

/// A partial update of the status line. Unset fields keep their old value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub message: Option<String>,
    pub detail: Option<String>,
    pub phase: Option<StatusPhase>,
    /// Reset message and detail before applying this update.
    pub clear: bool,
}

impl StatusUpdate {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            clear: true,
            ..Self::default()
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn phase(mut self, phase: StatusPhase) -> Self {
        self.phase = Some(phase);
        self
    }
}

/// User-facing progress output.
///
/// Debug-level traces go through `tracing` directly.
pub trait Logger {
    fn update_status(&self, update: StatusUpdate);

    /// Finish the current status line. Must be safe to call repeatedly.
    fn complete_status(&self);
}

/// Completes the logger's status line when dropped.
pub struct StatusGuard<'a> {
    logger: &'a dyn Logger,
}

impl<'a> StatusGuard<'a> {
    pub fn new(logger: &'a dyn Logger) -> Self {
        Self { logger }
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        self.logger.complete_status();
    }
}

#[derive(Debug, Default)]
struct StatusLine {
    message: String,
    detail: Option<String>,
    phase: Option<StatusPhase>,
    open: bool,
}

impl StatusLine {
    fn apply(&mut self, update: StatusUpdate) {
        if update.clear {
            self.message.clear();
            self.detail = None;
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if update.detail.is_some() {
            self.detail = update.detail;
        }
        if update.phase.is_some() {
            self.phase = update.phase;
        }
    }

    fn render(&self) -> String {
        let mut line = String::new();
        if let Some(phase) = self.phase {
            line.push_str(phase.symbol());
            line.push(' ');
        }
        line.push_str(&self.message);
        if let Some(detail) = &self.detail {
            line.push(' ');
            line.push_str(detail);
        }
        line
    }
}

/// Status line on stdout. Rewrites a single line in place on a terminal,
/// prints one line per update otherwise.
pub struct ConsoleLogger {
    state: RefCell<StatusLine>,
    interactive: bool,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(StatusLine::default()),
            interactive: io::stdout().is_tty(),
        }
    }

    fn draw(&self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        if self.interactive {
            queue!(
                stdout,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(line)
            )?;
        } else {
            writeln!(stdout, "{}", line)?;
        }
        stdout.flush()
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for ConsoleLogger {
    fn update_status(&self, update: StatusUpdate) {
        let line = {
            let mut state = self.state.borrow_mut();
            state.apply(update);
            state.open = true;
            state.render()
        };
        if let Err(err) = self.draw(&line) {
            tracing::debug!("failed to draw status line: {}", err);
        }
    }

    fn complete_status(&self) {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return;
        }
        *state = StatusLine::default();
        if self.interactive {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout);
            let _ = stdout.flush();
        }
    }
}
