//! Subject identity and profile entities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque, stable identifier of the user an avatar belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct SubjectId(String);

/// Input rejected by [`SubjectId::new`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid subject id: {0:?}")]
pub struct InvalidSubjectId(pub String);

impl SubjectId {
    /// Creates a subject id, rejecting empty or whitespace-only input and
    /// input containing path separators.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubjectId {
    type Error = InvalidSubjectId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.clone()).ok_or(InvalidSubjectId(value))
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata keys checked, in order, for a human-readable name.
const NAME_KEYS: &[&str] = &["full_name", "name", "display_name", "user_name"];

/// Session-supplied identity of a subject, resolved once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    subject: SubjectId,
    display_name: Option<String>,
    email: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn new(subject: SubjectId, display_name: Option<String>) -> Self {
        Self {
            subject,
            display_name: display_name.and_then(non_blank),
            email: None,
        }
    }

    /// Builds a profile from loosely-typed session metadata.
    ///
    /// The first non-blank string among `full_name`, `name`, `display_name`
    /// and `user_name` becomes the display name. `email` is kept when present.
    #[must_use]
    pub fn from_metadata(subject: SubjectId, metadata: &serde_json::Value) -> Self {
        let display_name = NAME_KEYS
            .iter()
            .filter_map(|key| metadata.get(*key).and_then(serde_json::Value::as_str))
            .find_map(|value| non_blank(value.to_string()));

        let email = metadata
            .get("email")
            .and_then(serde_json::Value::as_str)
            .and_then(|value| non_blank(value.to_string()));

        Self {
            subject,
            display_name,
            email,
        }
    }

    #[must_use]
    pub const fn subject(&self) -> &SubjectId {
        &self.subject
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Name used for the initials fallback.
    ///
    /// Falls back to the local part of the email, then to the subject id.
    #[must_use]
    pub fn fallback_name(&self) -> &str {
        if let Some(name) = self.display_name.as_deref() {
            return name;
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or_else(|| self.subject.as_str())
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
