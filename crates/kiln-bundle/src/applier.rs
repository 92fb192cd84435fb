//! Transactional change bundle applier
//!
//! Applies a parsed [`ChangeBundle`] against an [`ArtifactStore`]:
//!
//! 1. Checkpoint the store, labelled with the bundle's source path
//! 2. For each entry in order: check the precondition, then mutate
//! 3. On any failure restore the checkpoint and return the wrapped cause
//! 4. Optionally hand the written paths to a [`ChangeVerifier`]
//!
//! The checkpoint/restore pair is the only consistency mechanism; there is
//! no per-entry undo log. Entries see the effects of earlier entries, so a
//! create followed by a modify of the same path succeeds.

use crate::entry::{ChangeEntry, ChangeOperation};
use crate::error::{ApplyError, ApplyFailure, VerifierError};
use crate::parser::ChangeBundle;
use async_trait::async_trait;
use kiln_artifact::{ArtifactKind, ArtifactStore, CheckpointId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Message returned when a bundle parses to nothing
pub const NO_CHANGES_MESSAGE: &str = "no valid changes found";

/// Outcome of a verification run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Whether verification passed
    pub success: bool,
    /// Captured output
    pub output: String,
}

/// Post-apply verification seam
///
/// The applier does not own verification; it delegates the command to
/// whatever is wired here (normally the verification coordinator).
#[async_trait]
pub trait ChangeVerifier: Send + Sync {
    /// Run `command` over the freshly written `paths`
    async fn verify(
        &self,
        command: &str,
        paths: &[String],
    ) -> Result<VerificationReport, VerifierError>;
}

/// Structured result of [`ChangeBundleApplier::apply`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Whether the changes are now live
    pub success: bool,
    /// Summary or failure reason
    pub message: String,
    /// Entries applied (before any rollback)
    pub changes_applied: usize,
    /// Checkpoint taken for this call, if one was taken
    pub checkpoint: Option<CheckpointId>,
}

impl ApplyOutcome {
    fn no_changes() -> Self {
        Self {
            success: false,
            message: NO_CHANGES_MESSAGE.to_string(),
            changes_applied: 0,
            checkpoint: None,
        }
    }
}

/// Applies change bundles with checkpoint/rollback semantics
pub struct ChangeBundleApplier {
    store: Arc<dyn ArtifactStore>,
    verifier: Option<Arc<dyn ChangeVerifier>>,
    /// Held for the whole transaction so two applies never interleave
    txn: Mutex<()>,
}

impl std::fmt::Debug for ChangeBundleApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBundleApplier")
            .field("has_verifier", &self.verifier.is_some())
            .finish_non_exhaustive()
    }
}

impl ChangeBundleApplier {
    /// Create applier without verification
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            verifier: None,
            txn: Mutex::new(()),
        }
    }

    /// With a post-apply verifier
    #[inline]
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn ChangeVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Apply the bundle stored at `bundle_path`
    ///
    /// # Errors
    /// - `ApplyError::BundleNotFound` if the bundle artifact is missing
    /// - see [`apply_text`](Self::apply_text)
    pub async fn apply(
        &self,
        bundle_path: &str,
        verify_command: Option<&str>,
    ) -> Result<ApplyOutcome, ApplyError> {
        let text = self
            .store
            .content(bundle_path)
            .await?
            .ok_or_else(|| ApplyError::BundleNotFound(bundle_path.to_string()))?;
        self.apply_text(bundle_path, &text, verify_command).await
    }

    /// Apply bundle text, labelling the checkpoint with `source`
    ///
    /// Returns `success: false` without a checkpoint when the bundle holds no
    /// entries, and `success: false` after a rollback when verification
    /// reports failure.
    ///
    /// # Errors
    /// - `ApplyError::Bundle` if the text does not parse (store untouched)
    /// - `ApplyError::NoVerifier` if a command is given without a verifier
    /// - `ApplyError::RolledBack` on precondition, store or verifier failure
    /// - `ApplyError::RollbackFailed` if the restore itself failed
    pub async fn apply_text(
        &self,
        source: &str,
        text: &str,
        verify_command: Option<&str>,
    ) -> Result<ApplyOutcome, ApplyError> {
        let bundle = ChangeBundle::parse(text)?;
        if bundle.is_empty() {
            tracing::info!(source, skipped = bundle.skipped(), "bundle has no valid changes");
            return Ok(ApplyOutcome::no_changes());
        }
        let verifier = match verify_command {
            Some(cmd) => Some((cmd, self.verifier.as_ref().ok_or(ApplyError::NoVerifier)?)),
            None => None,
        };

        let _txn = self.txn.lock().await;
        let checkpoint = self.store.create_checkpoint(source).await?.id;
        tracing::info!(source, %checkpoint, entries = bundle.len(), "applying change bundle");

        let applied = match self.apply_entries(bundle.entries()).await {
            Ok(n) => n,
            Err(cause) => return Err(self.rollback(checkpoint, cause).await),
        };

        let Some((command, verifier)) = verifier else {
            return Ok(ApplyOutcome {
                success: true,
                message: format!("applied {applied} change(s)"),
                changes_applied: applied,
                checkpoint: Some(checkpoint),
            });
        };

        match verifier.verify(command, &bundle.written_paths()).await {
            Ok(report) if report.success => Ok(ApplyOutcome {
                success: true,
                message: format!("applied {applied} change(s), verification passed"),
                changes_applied: applied,
                checkpoint: Some(checkpoint),
            }),
            Ok(report) => {
                tracing::warn!(source, command, "verification failed, restoring checkpoint");
                self.store
                    .restore_checkpoint(checkpoint)
                    .await
                    .map_err(|restore| ApplyError::RollbackFailed {
                        checkpoint,
                        cause: ApplyFailure::Verification(VerifierError::new(
                            report.output.clone(),
                        )),
                        restore,
                    })?;
                Ok(ApplyOutcome {
                    success: false,
                    message: format!("verification failed: {}", report.output),
                    changes_applied: applied,
                    checkpoint: Some(checkpoint),
                })
            }
            Err(e) => Err(self.rollback(checkpoint, ApplyFailure::Verification(e)).await),
        }
    }

    async fn apply_entries(&self, entries: &[ChangeEntry]) -> Result<usize, ApplyFailure> {
        for (index, entry) in entries.iter().enumerate() {
            self.check_precondition(entry).await?;
            self.mutate(entry).await?;
            tracing::debug!(index, op = %entry.operation, path = %entry.path, "entry applied");
        }
        Ok(entries.len())
    }

    async fn check_precondition(&self, entry: &ChangeEntry) -> Result<(), ApplyFailure> {
        let exists = self
            .store
            .exists(&entry.path)
            .await
            .map_err(|error| ApplyFailure::Store {
                path: entry.path.clone(),
                error,
            })?;
        match (entry.operation.requires_existing(), exists) {
            (false, true) => Err(ApplyFailure::PathExists(entry.path.clone())),
            (true, false) => Err(ApplyFailure::PathMissing {
                operation: entry.operation.keyword().to_ascii_lowercase(),
                path: entry.path.clone(),
            }),
            _ => Ok(()),
        }
    }

    async fn mutate(&self, entry: &ChangeEntry) -> Result<(), ApplyFailure> {
        let path = entry.path.as_str();
        let result = match entry.operation {
            ChangeOperation::Create => {
                self.store
                    .create_artifact(
                        path,
                        ArtifactKind::from_path(path),
                        entry.content_or_empty(),
                        "created by change bundle",
                    )
                    .await
            }
            ChangeOperation::Modify => {
                self.store
                    .update_artifact(path, entry.content_or_empty())
                    .await
            }
            ChangeOperation::Delete => self.store.delete_artifact(path).await,
        };
        result.map_err(|error| ApplyFailure::Store {
            path: path.to_string(),
            error,
        })
    }

    async fn rollback(&self, checkpoint: CheckpointId, cause: ApplyFailure) -> ApplyError {
        tracing::warn!(%checkpoint, error = %cause, "apply failed, restoring checkpoint");
        match self.store.restore_checkpoint(checkpoint).await {
            Ok(()) => ApplyError::RolledBack { checkpoint, cause },
            Err(restore) => {
                tracing::error!(%checkpoint, error = %restore, "checkpoint restore failed");
                ApplyError::RollbackFailed {
                    checkpoint,
                    cause,
                    restore,
                }
            }
        }
    }
}
