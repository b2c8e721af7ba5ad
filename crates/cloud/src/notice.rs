use serde::Serialize;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// A message surfaced to the operator next to the response it belongs to.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

/// Notices collected while handling one user action.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Notices(Vec<Notice>);

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Level::Success, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Level::Warning, message.into());
    }

    /// Report a failure. Also logged, since the operator may not be looking.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(notice = %message, "Surfaced error to operator");
        self.push(Level::Error, message);
    }

    /// Shorthand for `error(format!("{context}: {err}"))`
    pub fn failure(&mut self, context: &str, err: impl Display) {
        self.error(format!("{}: {}", context, err));
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|n| n.level == Level::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, level: Level, message: String) {
        self.0.push(Notice { level, message });
    }
}
