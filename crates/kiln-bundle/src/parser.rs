//! Change bundle parser and renderer
//!
//! A change bundle is plain text holding zero or more blocks:
//!
//! ````text
//! ```kiln-change
//! operation: CREATE
//! file_path: src/ui/theme.js
//! ```
//! ```js
//! export const dark = true;
//! ```
//! ````
//!
//! The header block is introduced by the reserved `kiln-change` fence tag.
//! Non-delete entries are followed by an ordinary fenced region holding the
//! new content verbatim, closed by the next bare fence line. Every content
//! line is kept with its trailing newline, so a region with one line `x`
//! yields `"x\n"`.

use crate::entry::{ChangeEntry, ChangeOperation};
use crate::error::BundleError;
use std::iter::Peekable;

/// Reserved fence tag opening a change header
pub const CHANGE_FENCE: &str = "```kiln-change";

/// Bare fence closing headers and content regions
pub const FENCE: &str = "```";

/// An ordered list of parsed change entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBundle {
    entries: Vec<ChangeEntry>,
    skipped: usize,
}

#[derive(Debug, Default)]
struct Header {
    operation: Option<String>,
    file_path: Option<String>,
}

impl ChangeBundle {
    /// Build a bundle from entries
    #[inline]
    #[must_use]
    pub fn from_entries(entries: Vec<ChangeEntry>) -> Self {
        Self {
            entries,
            skipped: 0,
        }
    }

    /// Parse bundle text
    ///
    /// Header blocks missing `operation` or `file_path` are skipped and
    /// counted in [`skipped`](Self::skipped).
    ///
    /// # Errors
    /// - `BundleError::UnknownOperation` for an unrecognised operation keyword
    /// - `BundleError::MissingContent` if a create/modify has no content region
    /// - `BundleError::UnterminatedContent` if a content region is never closed
    pub fn parse(text: &str) -> Result<Self, BundleError> {
        let mut lines = text.lines().peekable();
        let mut bundle = Self::default();

        while let Some(line) = lines.next() {
            if line.trim() != CHANGE_FENCE {
                continue;
            }

            let Some(header) = read_header(&mut lines) else {
                tracing::debug!("unterminated change header at end of bundle");
                bundle.skipped += 1;
                break;
            };

            let (Some(op), Some(path)) = (header.operation, header.file_path) else {
                bundle.skipped += 1;
                continue;
            };

            let operation: ChangeOperation = op.parse()?;
            let content = if operation.has_content() {
                Some(read_content(&mut lines, operation, &path)?)
            } else {
                None
            };

            bundle.entries.push(ChangeEntry {
                operation,
                path,
                content,
            });
        }

        Ok(bundle)
    }

    /// Render entries back into bundle text
    ///
    /// # Errors
    /// - `BundleError::EmbeddedFence` if some content has a bare fence line
    pub fn render(&self) -> Result<String, BundleError> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(CHANGE_FENCE);
            out.push('\n');
            out.push_str(&format!("operation: {}\n", entry.operation));
            out.push_str(&format!("file_path: {}\n", entry.path));
            out.push_str(FENCE);
            out.push('\n');

            let content = entry
                .content
                .as_deref()
                .filter(|_| entry.operation.has_content());
            if let Some(content) = content {
                if content.lines().any(|l| l.trim() == FENCE) {
                    return Err(BundleError::EmbeddedFence(entry.path.clone()));
                }
                out.push_str(FENCE);
                out.push('\n');
                out.push_str(content);
                if !content.is_empty() && !content.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(FENCE);
                out.push('\n');
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Parsed entries in bundle order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    /// Consume into entries
    #[inline]
    #[must_use]
    pub fn into_entries(self) -> Vec<ChangeEntry> {
        self.entries
    }

    /// Header blocks skipped for missing fields
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths written (created or modified) by the bundle
    #[must_use]
    pub fn written_paths(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.operation.has_content())
            .map(|e| e.path.clone())
            .collect()
    }
}

fn read_header<'a, I>(lines: &mut Peekable<I>) -> Option<Header>
where
    I: Iterator<Item = &'a str>,
{
    let mut header = Header::default();
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed == FENCE {
            return Some(header);
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "operation" => header.operation = Some(value.to_string()),
            "file_path" => header.file_path = Some(value.to_string()),
            _ => {}
        }
    }
    None
}

fn read_content<'a, I>(
    lines: &mut Peekable<I>,
    operation: ChangeOperation,
    path: &str,
) -> Result<String, BundleError>
where
    I: Iterator<Item = &'a str>,
{
    let missing = || BundleError::MissingContent {
        operation: operation.to_string(),
        path: path.to_string(),
    };

    while lines.peek().is_some_and(|l| l.trim().is_empty()) {
        lines.next();
    }

    // The opening fence may carry a language tag, but never the reserved one.
    match lines.peek() {
        Some(l) if l.trim_start().starts_with(FENCE) && l.trim() != CHANGE_FENCE => {
            lines.next();
        }
        _ => return Err(missing()),
    }

    let mut content = String::new();
    for line in lines.by_ref() {
        if line.trim() == FENCE {
            return Ok(content);
        }
        content.push_str(line);
        content.push('\n');
    }
    Err(BundleError::UnterminatedContent(path.to_string()))
}
