//! Parsed units of a change bundle

use crate::error::BundleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mutation requested by one bundle entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    /// Create a file that must not exist yet
    Create,
    /// Replace the content of an existing file
    Modify,
    /// Remove an existing file
    Delete,
}

impl ChangeOperation {
    /// Keyword used in the bundle header
    #[inline]
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Modify => "MODIFY",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the entry carries a content region
    #[inline]
    #[must_use]
    pub fn has_content(&self) -> bool {
        !matches!(self, Self::Delete)
    }

    /// Whether the target path must already exist
    #[inline]
    #[must_use]
    pub fn requires_existing(&self) -> bool {
        !matches!(self, Self::Create)
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for ChangeOperation {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "MODIFY" => Ok(Self::Modify),
            "DELETE" => Ok(Self::Delete),
            other => Err(BundleError::UnknownOperation(other.to_string())),
        }
    }
}

/// One change in a proposal bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Requested mutation
    pub operation: ChangeOperation,
    /// Target artifact path
    pub path: String,
    /// New content, absent for deletes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChangeEntry {
    /// Create entry
    #[must_use]
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            operation: ChangeOperation::Create,
            path: path.into(),
            content: Some(content.into()),
        }
    }

    /// Modify entry
    #[must_use]
    pub fn modify(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            operation: ChangeOperation::Modify,
            path: path.into(),
            content: Some(content.into()),
        }
    }

    /// Delete entry
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            operation: ChangeOperation::Delete,
            path: path.into(),
            content: None,
        }
    }

    /// Content or empty string
    #[inline]
    #[must_use]
    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_parse_is_case_insensitive() {
        assert_eq!("create".parse::<ChangeOperation>().unwrap(), ChangeOperation::Create);
        assert_eq!(" Modify ".parse::<ChangeOperation>().unwrap(), ChangeOperation::Modify);
        assert_eq!("DELETE".parse::<ChangeOperation>().unwrap(), ChangeOperation::Delete);
    }

    #[test]
    fn unknown_operation_is_error() {
        let err = "RENAME".parse::<ChangeOperation>().unwrap_err();
        assert!(matches!(err, BundleError::UnknownOperation(ref op) if op == "RENAME"));
    }

    #[test]
    fn operation_preconditions() {
        assert!(!ChangeOperation::Create.requires_existing());
        assert!(ChangeOperation::Modify.requires_existing());
        assert!(ChangeOperation::Delete.requires_existing());
        assert!(!ChangeOperation::Delete.has_content());
    }

    #[test]
    fn entry_serializes_without_content_for_delete() {
        let json = serde_json::to_string(&ChangeEntry::delete("a.js")).unwrap();
        assert_eq!(json, r#"{"operation":"DELETE","path":"a.js"}"#);
    }
}
