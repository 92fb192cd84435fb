//! Read-only context bundles
//!
//! Curation gathers the artifacts relevant to a goal into a single text
//! document the planner embeds in its prompt. Context bundles are never
//! applied; they only describe the current state.

use kiln_artifact::{ArtifactKind, ArtifactStore, StoreError};

/// Reserved fence tag opening a context file header
pub const CONTEXT_FENCE: &str = "```kiln-context";

/// Snapshot of selected artifacts for a planning prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBundle {
    files: Vec<(String, String)>,
}

impl ContextBundle {
    /// Collect the current content of `paths` from the store
    ///
    /// Paths that vanished between listing and reading are left out.
    pub async fn collect<S>(store: &S, paths: &[String]) -> Result<Self, StoreError>
    where
        S: ArtifactStore + ?Sized,
    {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match store.content(path).await? {
                Some(content) => files.push((path.clone(), content)),
                None => tracing::debug!(path = %path, "context file vanished, skipping"),
            }
        }
        Ok(Self { files })
    }

    /// Paths included in the bundle
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(p, _)| p.as_str())
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the bundle holds no files
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Render as bundle text
    #[must_use]
    pub fn render(&self, goal: &str) -> String {
        let mut out = format!("# Context for: {goal}\n# Files: {}\n\n", self.files.len());
        for (path, content) in &self.files {
            // Widen the content fence until it cannot collide with the file.
            let mut fence = String::from("```");
            while content.lines().any(|l| l.trim_start().starts_with(fence.as_str())) {
                fence.push('`');
            }
            out.push_str(CONTEXT_FENCE);
            out.push_str(&format!("\nfile_path: {path}\n```\n{fence}\n"));
            out.push_str(content);
            if !content.is_empty() && !content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push_str("\n\n");
        }
        out
    }

    /// Render and store the bundle at `path`
    pub async fn write<S>(&self, store: &S, path: &str, goal: &str) -> Result<(), StoreError>
    where
        S: ArtifactStore + ?Sized,
    {
        let text = self.render(goal);
        store
            .put_artifact(path, ArtifactKind::Bundle, &text, "context bundle")
            .await?;
        tracing::info!(path, files = self.files.len(), "context bundle written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_artifact::MemoryStore;

    #[tokio::test]
    async fn collects_and_renders_selected_files() {
        let store = MemoryStore::with_files([
            ("src/ui/panel.js", "export const panel = 1;\n"),
            ("src/agent/loop.js", "run()"),
        ]);
        let paths = vec!["src/ui/panel.js".to_string(), "src/agent/loop.js".to_string()];
        let bundle = ContextBundle::collect(&store, &paths).await.unwrap();
        assert_eq!(bundle.len(), 2);

        let text = bundle.render("Add dark mode");
        assert!(text.starts_with("# Context for: Add dark mode"));
        assert!(text.contains("file_path: src/ui/panel.js"));
        assert!(text.contains("export const panel = 1;\n```"));
        assert!(text.contains("run()\n```"));
    }

    #[tokio::test]
    async fn missing_paths_are_skipped() {
        let store = MemoryStore::with_files([("a.js", "a")]);
        let paths = vec!["a.js".to_string(), "gone.js".to_string()];
        let bundle = ContextBundle::collect(&store, &paths).await.unwrap();
        assert_eq!(bundle.paths().collect::<Vec<_>>(), vec!["a.js"]);
    }

    #[test]
    fn fence_widens_around_embedded_fences() {
        let bundle = ContextBundle {
            files: vec![("doc.md".into(), "```rust\nfn x() {}\n```\n".into())],
        };
        let text = bundle.render("g");
        assert!(text.contains("````\n```rust"));
    }

    #[tokio::test]
    async fn write_stores_bundle_artifact() {
        let store = MemoryStore::with_files([("a.js", "a")]);
        let bundle = ContextBundle::collect(&store, &["a.js".to_string()]).await.unwrap();
        bundle.write(&store, "/s/turn-0.context.bundle", "g").await.unwrap();
        let stored = store.content("/s/turn-0.context.bundle").await.unwrap().unwrap();
        assert_eq!(stored, bundle.render("g"));
    }
}
