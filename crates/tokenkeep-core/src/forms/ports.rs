//! Presentation ports implemented by front ends.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Displays a transient message to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NoticeKind);
}

/// Read access to the controls of a form, by control name.
pub trait FormReader {
    /// Text value of a control, `None` if the form has no such control
    fn field(&self, name: &str) -> Option<String>;

    /// Checkbox state; a missing control reads as unchecked
    fn checked(&self, name: &str) -> bool;

    /// Text value with surrounding whitespace removed, empty if absent
    fn trimmed(&self, name: &str) -> String {
        self.field(name)
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }

    /// Text value as entered, empty if absent
    fn raw(&self, name: &str) -> String {
        self.field(name).unwrap_or_default()
    }
}

/// Form contents collected up front, e.g. from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    fields: HashMap<String, String>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

impl FormReader for FormValues {
    fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn checked(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .map(|value| matches!(value.trim(), "true" | "on" | "1" | "yes"))
            .unwrap_or(false)
    }
}
