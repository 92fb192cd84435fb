//! Applier behaviour when the store or the verifier misbehaves

use kiln_artifact::{MemoryStore, StoreError};
use kiln_bundle::{ApplyError, ApplyFailure, ChangeBundleApplier, ChangeEntry, VerifierError};
use kiln_test_utils::{bundle_text, FailingStore, ScriptedVerifier, StoreOp};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn seeded() -> Arc<FailingStore> {
    FailingStore::new(MemoryStore::with_files([("src/ui/panel.js", "panel v1\n")]))
}

#[tokio::test]
async fn checkpoint_failure_touches_nothing() {
    let store = seeded();
    store.fail(StoreOp::Checkpoint);
    let applier = ChangeBundleApplier::new(store.clone());
    let text = bundle_text(vec![ChangeEntry::create("src/ui/theme.js", "dark\n")]);

    let err = applier.apply_text("p.bundle", &text, None).await.unwrap_err();
    assert!(matches!(err, ApplyError::Store(StoreError::Unavailable(_))));
    assert_eq!(store.inner().files().len(), 1);
    assert_eq!(store.inner().checkpoint_count(), 0);
}

#[tokio::test]
async fn mutation_failure_mid_bundle_rolls_back_earlier_entries() {
    let store = seeded();
    store.fail(StoreOp::Update);
    let before = store.inner().files();
    let applier = ChangeBundleApplier::new(store.clone());
    let text = bundle_text(vec![
        ChangeEntry::create("src/ui/theme.js", "dark\n"),
        ChangeEntry::modify("src/ui/panel.js", "panel v2\n"),
    ]);

    let err = applier.apply_text("p.bundle", &text, None).await.unwrap_err();
    match err.cause() {
        Some(ApplyFailure::Store { path, .. }) => assert_eq!(path, "src/ui/panel.js"),
        other => panic!("unexpected cause {other:?}"),
    }
    assert!(!err.is_inconsistent());
    assert_eq!(store.inner().files(), before);
}

#[tokio::test]
async fn failed_restore_is_reported_as_inconsistent() {
    let store = seeded();
    store.fail(StoreOp::Restore);
    let applier = ChangeBundleApplier::new(store.clone());
    let text = bundle_text(vec![
        ChangeEntry::create("src/ui/theme.js", "dark\n"),
        ChangeEntry::create("src/ui/panel.js", "clash\n"),
    ]);

    let err = applier.apply_text("p.bundle", &text, None).await.unwrap_err();
    assert!(err.is_inconsistent());
    assert!(matches!(
        err,
        ApplyError::RollbackFailed {
            cause: ApplyFailure::PathExists(_),
            ..
        }
    ));
}

#[tokio::test]
async fn reported_verification_failure_restores_and_returns_data() {
    let store = seeded();
    let verifier = ScriptedVerifier::new();
    verifier.fail("lint: unclosed `{`");
    let applier = ChangeBundleApplier::new(store.clone()).with_verifier(verifier.clone());
    let before = store.inner().files();
    let text = bundle_text(vec![
        ChangeEntry::create("src/ui/theme.js", "export const t = {\n"),
        ChangeEntry::delete("src/ui/panel.js"),
    ]);

    let outcome = applier.apply_text("p.bundle", &text, Some("full")).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "verification failed: lint: unclosed `{`");
    assert_eq!(store.inner().files(), before);
    assert_eq!(
        verifier.calls(),
        vec![("full".to_string(), vec!["src/ui/theme.js".to_string()])]
    );
}

#[tokio::test]
async fn verifier_timeout_rolls_back_and_raises() {
    let store = seeded();
    let verifier = ScriptedVerifier::new();
    verifier.push(Err(VerifierError::timeout("verification timed out after 30s")));
    let applier = ChangeBundleApplier::new(store.clone()).with_verifier(verifier);
    let before = store.inner().files();
    let text = bundle_text(vec![ChangeEntry::create("src/ui/theme.js", "x\n")]);

    let err = applier
        .apply_text("p.bundle", &text, Some("lint:src/ui/theme.js"))
        .await
        .unwrap_err();
    match err.cause() {
        Some(ApplyFailure::Verification(e)) => assert!(e.timed_out),
        other => panic!("unexpected cause {other:?}"),
    }
    assert_eq!(store.inner().files(), before);
}
