//! Property tests for transactional application
//!
//! Whatever entry of a bundle violates its precondition, the store must be
//! observably identical to its state before `apply()`.

use kiln_artifact::{ArtifactStore, MemoryStore};
use kiln_bundle::{ApplyError, ChangeBundle, ChangeBundleApplier, ChangeEntry};
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Valid entries against a store seeded with `seed_0.js .. seed_{n-1}.js`
fn valid_entry(i: usize, seeded: usize) -> ChangeEntry {
    match i % 3 {
        0 => ChangeEntry::create(format!("new_{i}.js"), format!("created {i}\n")),
        1 if i / 3 < seeded => {
            ChangeEntry::modify(format!("seed_{}.js", i / 3), format!("modified {i}\n"))
        }
        _ => ChangeEntry::create(format!("extra_{i}.js"), "x\n"),
    }
}

fn violating_entry(kind: u8) -> ChangeEntry {
    match kind % 3 {
        0 => ChangeEntry::create("seed_0.js", "clobber\n"),
        1 => ChangeEntry::modify("missing.js", "nope\n"),
        _ => ChangeEntry::delete("missing.js"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn violation_at_any_index_leaves_store_unchanged(
        len in 1usize..8,
        k_seed in any::<usize>(),
        kind in any::<u8>(),
    ) {
        let seeded = 4;
        let store = Arc::new(MemoryStore::with_files(
            (0..seeded).map(|i| (format!("seed_{i}.js"), format!("seed {i}\n"))),
        ));
        let before = store.files();

        let k = k_seed % len;
        let entries: Vec<_> = (0..len)
            .map(|i| if i == k { violating_entry(kind) } else { valid_entry(i, seeded) })
            .collect();
        let text = ChangeBundle::from_entries(entries).render().unwrap();

        let applier = ChangeBundleApplier::new(store.clone());
        let result = runtime().block_on(applier.apply_text("prop", &text, None));

        let is_rolled_back = matches!(result, Err(ApplyError::RolledBack { .. }));
        prop_assert!(is_rolled_back);
        prop_assert_eq!(store.files(), before);
        prop_assert_eq!(store.checkpoint_count(), 1);
    }

    #[test]
    fn parser_never_panics(text in ".{0,400}") {
        let _ = ChangeBundle::parse(&text);
    }

    #[test]
    fn created_content_is_stored_verbatim(
        lines in proptest::collection::vec("[a-z ;(){}]{0,20}", 0..6)
    ) {
        let content: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let store = Arc::new(MemoryStore::new());
        let text = ChangeBundle::from_entries(vec![ChangeEntry::create("p.js", content.clone())])
            .render()
            .unwrap();

        let applier = ChangeBundleApplier::new(store.clone());
        let outcome = runtime().block_on(applier.apply_text("prop", &text, None)).unwrap();

        prop_assert!(outcome.success);
        let stored = runtime().block_on(store.content("p.js")).unwrap();
        prop_assert_eq!(stored, Some(content));
    }
}
