use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub text: String,
}

impl ValidationMessage {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        ValidationMessage {
            severity,
            text: text.into(),
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

    /// `"ERROR: text"`, or just the label when there is no text.
    pub fn as_prefixed(&self) -> String {
        if self.text.is_empty() {
            self.severity.label().to_string()
        } else {
            format!("{}: {}", self.severity, self.text)
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_prefixed())
    }
}

/// Messages collected over one validation pass, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    messages: Vec<ValidationMessage>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, severity: Severity, text: impl Into<String>) {
        self.messages.push(ValidationMessage::new(severity, text));
    }

    pub fn add_error(&mut self, text: impl Into<String>) {
        self.add(Severity::Error, text);
    }

    pub fn add_warning(&mut self, text: impl Into<String>) {
        self.add(Severity::Warning, text);
    }

    pub fn add_info(&mut self, text: impl Into<String>) {
        self.add(Severity::Info, text);
    }

    pub fn push(&mut self, message: ValidationMessage) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = ValidationMessage>) {
        self.messages.extend(other);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    fn with_severity(&self, severity: Severity) -> Vec<&ValidationMessage> {
        self.messages
            .iter()
            .filter(|message| message.severity == severity)
            .collect()
    }

    pub fn errors(&self) -> Vec<&ValidationMessage> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<&ValidationMessage> {
        self.with_severity(Severity::Warning)
    }

    pub fn infos(&self) -> Vec<&ValidationMessage> {
        self.with_severity(Severity::Info)
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|message| message.severity == Severity::Error)
    }

    pub fn as_strings(&self) -> Vec<String> {
        self.messages.iter().map(ValidationMessage::as_prefixed).collect()
    }

    /// Errors first, then warnings, then infos. Order within a severity is kept.
    pub fn ordered(&self) -> ValidationResult {
        let mut messages = self.messages.clone();
        messages.sort_by_key(|message| message.severity);
        ValidationResult { messages }
    }
}

impl IntoIterator for ValidationResult {
    type Item = ValidationMessage;
    type IntoIter = std::vec::IntoIter<ValidationMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl FromIterator<ValidationMessage> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationMessage>>(iter: I) -> Self {
        ValidationResult {
            messages: iter.into_iter().collect(),
        }
    }
}
