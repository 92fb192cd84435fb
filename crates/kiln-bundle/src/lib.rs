//! Kiln Bundles
//!
//! Text bundles exchanged between the planner and the artifact store:
//!
//! - [`ChangeBundle`]: proposal format, parsed by an explicit line tokenizer
//! - [`ContextBundle`]: read-only snapshot of relevant files for a prompt
//! - [`ChangeBundleApplier`]: checkpointed, all-or-nothing application
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_bundle::{ChangeBundleApplier, ChangeBundle, ChangeEntry};
//!
//! let text = ChangeBundle::from_entries(vec![ChangeEntry::create("a.js", "x\n")]).render()?;
//! let applier = ChangeBundleApplier::new(store.clone());
//! let outcome = applier.apply_text("proposal", &text, None).await?;
//! assert!(outcome.success);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod applier;
mod context;
mod entry;
mod error;
mod parser;

pub use applier::{
    ApplyOutcome, ChangeBundleApplier, ChangeVerifier, VerificationReport, NO_CHANGES_MESSAGE,
};
pub use context::{ContextBundle, CONTEXT_FENCE};
pub use entry::{ChangeEntry, ChangeOperation};
pub use error::{ApplyError, ApplyFailure, BundleError, VerifierError};
pub use parser::{ChangeBundle, CHANGE_FENCE, FENCE};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        ApplyError, ApplyOutcome, ChangeBundle, ChangeBundleApplier, ChangeEntry, ChangeOperation,
        ChangeVerifier, ContextBundle, VerificationReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
