// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Diagnostics sink shared by every weaving component
//!
//! The engine never aborts on a user-facing problem. Missing types, binding
//! errors, precedence conflicts and declare error/warning matches are all
//! routed through a [`MessageHandler`] and the engine degrades to "no match".

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Severity of a reported message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Suppressed entirely (used by lint configuration)
    Ignore,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ignore => write!(f, "ignore"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A position in a source or compiled unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self { file: file.into(), line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A single diagnostic with one or two source locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
    pub location: Option<SourceLocation>,
    /// Secondary location, e.g. the declare statement that matched a shadow
    pub related: Option<SourceLocation>,
}

impl Message {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            location: None,
            related: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Severity::Info, text)
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn related_to(mut self, related: Option<SourceLocation>) -> Self {
        self.related = related;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.text)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        if let Some(rel) = &self.related {
            write!(f, " (see also {})", rel)?;
        }
        Ok(())
    }
}

/// Receiver of diagnostics
pub trait MessageHandler: Send + Sync {
    /// Handle a message. Implementations must not panic.
    fn handle(&self, message: Message);

    /// Whether messages of this severity are discarded before formatting
    fn is_ignoring(&self, severity: Severity) -> bool {
        severity == Severity::Ignore
    }
}

/// Forwards every message to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHandler;

impl MessageHandler for TracingHandler {
    fn handle(&self, message: Message) {
        match message.severity {
            Severity::Ignore => {}
            Severity::Info => info!(location = ?message.location, "{}", message.text),
            Severity::Warning => warn!(location = ?message.location, related = ?message.related, "{}", message.text),
            Severity::Error => error!(location = ?message.location, related = ?message.related, "{}", message.text),
        }
    }
}

/// Stores messages for later inspection; clones share the same buffer
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all collected messages in arrival order
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn errors(&self) -> Vec<Message> {
        self.messages.lock().iter().filter(|m| m.severity == Severity::Error).cloned().collect()
    }

    pub fn warnings(&self) -> Vec<Message> {
        self.messages.lock().iter().filter(|m| m.severity == Severity::Warning).cloned().collect()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.lock().iter().any(Message::is_error)
    }

    /// True if any message text contains `fragment`
    pub fn contains(&self, fragment: &str) -> bool {
        self.messages.lock().iter().any(|m| m.text.contains(fragment))
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl MessageHandler for CollectingHandler {
    fn handle(&self, message: Message) {
        if message.severity == Severity::Ignore {
            return;
        }
        debug!("collected diagnostic: {}", message);
        self.messages.lock().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_handler_shares_buffer_between_clones() {
        let handler = CollectingHandler::new();
        let clone = handler.clone();
        clone.handle(Message::error("can't find type Foo"));
        clone.handle(Message::warning("unmatched"));
        clone.handle(Message::new(Severity::Ignore, "dropped"));

        assert_eq!(handler.messages().len(), 2);
        assert!(handler.has_errors());
        assert_eq!(handler.warnings().len(), 1);
        assert!(handler.contains("Foo"));
        assert!(!handler.contains("dropped"));
    }

    #[test]
    fn test_message_display_includes_both_locations() {
        let msg = Message::warning("declare warning matched")
            .at(Some(SourceLocation::new("Foo.java", 10, 4)))
            .related_to(Some(SourceLocation::new("Aspect.aj", 3, 1)));
        let text = msg.to_string();
        assert!(text.contains("Foo.java:10:4"));
        assert!(text.contains("Aspect.aj:3:1"));
        assert!(text.starts_with("[warning]"));
    }
}
