//! Verification coordinator
//!
//! Multiplexes concurrent verification requests over one isolated worker:
//!
//! 1. Register a pending request under a correlation id
//! 2. Snapshot the relevant store files
//! 3. Post `VERIFY` to the worker and wait, bounded by the configured timeout
//! 4. The dispatch task resolves the request when `VERIFY_COMPLETE` arrives
//!
//! Only one party ever resolves a request: whichever removes its id from the
//! pending map first. A response arriving after a timeout finds nothing and
//! is dropped. When the worker crashes every pending request is rejected and
//! a fresh worker is spawned in place.
//! A caller dropped mid-wait releases its own entry on the way out.

use crate::config::VerificationConfig;
use crate::error::VerifyError;
use crate::protocol::{LogLevel, VerifyPayload, VfsSnapshot, WorkerRequest, WorkerResponse};
use crate::worker::{SnapshotWorkerSpawner, WorkerEvent, WorkerSpawner};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kiln_artifact::ArtifactStore;
use kiln_bundle::{ChangeVerifier, VerificationReport, VerifierError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Command accepted by the [`ChangeVerifier`] impl that runs
/// [`run_full_verification`](VerificationCoordinator::run_full_verification)
/// over the changed paths
pub const FULL_VERIFICATION: &str = "full";

type Responder = oneshot::Sender<Result<VerificationReport, VerifyError>>;

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// `init` not yet called
    Uninitialized,
    /// Worker running (possibly restarting after a crash)
    Initialized,
    /// `terminate` called; final
    Terminated,
}

enum Lifecycle {
    Uninitialized,
    Initialized {
        requests: mpsc::UnboundedSender<WorkerRequest>,
        dispatch: JoinHandle<()>,
    },
    Terminated,
}

struct Shared {
    store: Arc<dyn ArtifactStore>,
    spawner: Arc<dyn WorkerSpawner>,
    config: VerificationConfig,
    lifecycle: Mutex<Lifecycle>,
    pending: DashMap<String, Responder>,
    pings: Mutex<VecDeque<oneshot::Sender<()>>>,
    ready: AtomicBool,
}

/// Result of one check inside a full verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// File checked
    pub path: String,
    /// Whether the check passed
    pub success: bool,
    /// Worker output
    pub output: String,
    /// Set when the check raised instead of reporting
    pub error: Option<String>,
}

impl CheckResult {
    fn from_result(path: &str, result: Result<VerificationReport, VerifyError>) -> Self {
        match result {
            Ok(report) => Self {
                path: path.to_string(),
                success: report.success,
                output: report.output,
                error: None,
            },
            Err(e) => Self {
                path: path.to_string(),
                success: false,
                output: String::new(),
                error: Some(e.to_string()),
            },
        }
    }

    #[inline]
    fn passed(&self) -> bool {
        self.success && self.error.is_none()
    }
}

/// Aggregate of [`VerificationCoordinator::run_full_verification`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullVerification {
    /// Test checks, one per changed test file
    pub tests: Vec<CheckResult>,
    /// Lint checks, one per changed script
    pub linting: Vec<CheckResult>,
    /// Type checks, one per changed script or JSON file
    pub types: Vec<CheckResult>,
    /// False if any check failed or raised
    pub overall: bool,
}

impl FullVerification {
    /// One line per failed check, or a pass line
    #[must_use]
    pub fn summary(&self) -> String {
        let checks = self.tests.iter().chain(&self.linting).chain(&self.types);
        let failures: Vec<String> = checks
            .filter(|c| !c.passed())
            .map(|c| match &c.error {
                Some(e) => format!("{}: {e}", c.path),
                None => c.output.clone(),
            })
            .collect();
        if failures.is_empty() {
            let total = self.tests.len() + self.linting.len() + self.types.len();
            format!("{total} check(s) passed")
        } else {
            failures.join("\n")
        }
    }
}

/// Routes verification requests to an isolated worker
pub struct VerificationCoordinator {
    shared: Arc<Shared>,
}

impl VerificationCoordinator {
    /// Create coordinator; call [`init`](Self::init) before use
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        spawner: Arc<dyn WorkerSpawner>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                spawner,
                config,
                lifecycle: Mutex::new(Lifecycle::Uninitialized),
                pending: DashMap::new(),
                pings: Mutex::new(VecDeque::new()),
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// Create coordinator backed by the built-in snapshot worker
    #[must_use]
    pub fn with_snapshot_worker(store: Arc<dyn ArtifactStore>, config: VerificationConfig) -> Self {
        Self::new(store, Arc::new(SnapshotWorkerSpawner), config)
    }

    /// Spawn the worker and start dispatching its messages
    ///
    /// Calling `init` on an initialized coordinator does nothing.
    ///
    /// # Errors
    /// - `VerifyError::Terminated` after [`terminate`](Self::terminate)
    /// - `VerifyError::Spawn` if the worker cannot be started
    pub async fn init(&self) -> Result<(), VerifyError> {
        match self.state() {
            LifecycleState::Initialized => return Ok(()),
            LifecycleState::Terminated => return Err(VerifyError::Terminated),
            LifecycleState::Uninitialized => {}
        }

        let channels = self.shared.spawner.spawn().await?;
        let mut lifecycle = self.shared.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Uninitialized) {
            // Lost a race with another init or a terminate; drop our worker.
            return match *lifecycle {
                Lifecycle::Terminated => Err(VerifyError::Terminated),
                _ => Ok(()),
            };
        }
        let dispatch = tokio::spawn(dispatch(Arc::clone(&self.shared), channels.events));
        *lifecycle = Lifecycle::Initialized {
            requests: channels.requests,
            dispatch,
        };
        tracing::info!("verification worker started");
        Ok(())
    }

    /// Stop the worker and reject all pending requests
    ///
    /// Idempotent.
    pub fn terminate(&self) {
        let previous = std::mem::replace(&mut *self.shared.lifecycle.lock(), Lifecycle::Terminated);
        match previous {
            Lifecycle::Terminated => return,
            Lifecycle::Initialized { dispatch, .. } => dispatch.abort(),
            Lifecycle::Uninitialized => {}
        }
        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.pings.lock().clear();
        let rejected = self.shared.reject_all(|| VerifyError::Terminated);
        tracing::info!(rejected, "verification coordinator terminated");
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match *self.shared.lifecycle.lock() {
            Lifecycle::Uninitialized => LifecycleState::Uninitialized,
            Lifecycle::Initialized { .. } => LifecycleState::Initialized,
            Lifecycle::Terminated => LifecycleState::Terminated,
        }
    }

    /// Whether the current worker has announced `READY`
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    /// Requests awaiting a response
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &VerificationConfig {
        &self.shared.config
    }

    /// Relevant store files, as handed to the worker
    ///
    /// # Errors
    /// - `VerifyError::Store` if the store cannot be read
    pub async fn snapshot(&self) -> Result<VfsSnapshot, VerifyError> {
        let store = &self.shared.store;
        let metadata = store.all_metadata().await?;
        let mut snapshot = VfsSnapshot::new();
        for path in metadata.keys().filter(|p| self.shared.config.is_relevant(p)) {
            if let Some(content) = store.content(path).await? {
                snapshot.insert(path.clone(), content);
            }
        }
        Ok(snapshot)
    }

    /// Run one verification command in the worker
    ///
    /// `session_id` becomes the correlation id; a fresh ULID is used when
    /// none is given.
    ///
    /// # Errors
    /// - `VerifyError::NotInitialized` / `VerifyError::Terminated`
    /// - `VerifyError::DuplicateId` if `session_id` is already pending
    /// - `VerifyError::Timeout` if the worker does not answer in time
    /// - `VerifyError::WorkerCrashed` / `VerifyError::WorkerError` on worker failure
    /// - `VerifyError::Reported` if the worker completed with an error
    pub async fn run_verification(
        &self,
        command: &str,
        session_id: Option<&str>,
    ) -> Result<VerificationReport, VerifyError> {
        let requests = self.shared.sender()?;
        let id = session_id.map_or_else(|| Ulid::new().to_string(), str::to_string);

        let (tx, rx) = oneshot::channel();
        match self.shared.pending.entry(id.clone()) {
            Entry::Occupied(_) => return Err(VerifyError::DuplicateId(id)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }
        let mut slot = PendingSlot {
            pending: &self.shared.pending,
            id: id.clone(),
            rx,
        };

        let snapshot = self.snapshot().await?;

        tracing::debug!(id = %id, command, files = snapshot.len(), "posting verification");
        let request = WorkerRequest::Verify(VerifyPayload {
            command: command.to_string(),
            vfs_snapshot: snapshot,
            session_id: id.clone(),
        });
        if requests.send(request).is_err() {
            return Err(VerifyError::WorkerCrashed("worker channel closed".to_string()));
        }

        let limit = self.shared.config.timeout();
        match tokio::time::timeout(limit, &mut slot.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(VerifyError::WorkerCrashed(
                "request dropped without a response".to_string(),
            )),
            Err(_) => {
                if self.shared.pending.remove(&id).is_some() {
                    tracing::warn!(id = %id, command, "verification timed out");
                    Err(VerifyError::Timeout {
                        id,
                        after_secs: limit.as_secs(),
                    })
                } else {
                    // The dispatcher claimed the request as the timer fired.
                    (&mut slot.rx).await.unwrap_or_else(|_| {
                        Err(VerifyError::WorkerCrashed(
                            "request dropped without a response".to_string(),
                        ))
                    })
                }
            }
        }
    }

    /// Run the tests in `path`
    pub async fn verify_tests(&self, path: &str) -> Result<VerificationReport, VerifyError> {
        self.run_verification(&format!("test:{path}"), None).await
    }

    /// Lint `path`
    pub async fn verify_linting(&self, path: &str) -> Result<VerificationReport, VerifyError> {
        self.run_verification(&format!("lint:{path}"), None).await
    }

    /// Type-check `path`
    pub async fn verify_types(&self, path: &str) -> Result<VerificationReport, VerifyError> {
        self.run_verification(&format!("type-check:{path}"), None).await
    }

    /// Evaluate `code` in the worker
    pub async fn verify_safe_eval(&self, code: &str) -> Result<VerificationReport, VerifyError> {
        self.run_verification(&format!("eval:{code}"), None).await
    }

    /// Test, lint and type-check every changed file
    ///
    /// Never stops early: a failing or raising check is recorded and the
    /// remaining checks still run.
    pub async fn run_full_verification(&self, changed_files: &[String]) -> FullVerification {
        let mut full = FullVerification {
            tests: Vec::new(),
            linting: Vec::new(),
            types: Vec::new(),
            overall: true,
        };

        for path in changed_files {
            if is_test_path(path) {
                let result = self.verify_tests(path).await;
                full.tests.push(CheckResult::from_result(path, result));
            } else if is_script_path(path) {
                let result = self.verify_linting(path).await;
                full.linting.push(CheckResult::from_result(path, result));
                let result = self.verify_types(path).await;
                full.types.push(CheckResult::from_result(path, result));
            } else if has_extension(path, &["json"]) {
                let result = self.verify_types(path).await;
                full.types.push(CheckResult::from_result(path, result));
            }
        }

        full.overall = full
            .tests
            .iter()
            .chain(&full.linting)
            .chain(&full.types)
            .all(CheckResult::passed);
        tracing::info!(
            files = changed_files.len(),
            overall = full.overall,
            "full verification finished"
        );
        full
    }

    /// Round-trip a `PING` through the worker
    ///
    /// # Errors
    /// - `VerifyError::Timeout` if no `PONG` arrives in time
    /// - `VerifyError::WorkerCrashed` if the worker died first
    pub async fn ping(&self) -> Result<Duration, VerifyError> {
        let requests = self.shared.sender()?;
        let (tx, rx) = oneshot::channel();
        self.shared.pings.lock().push_back(tx);

        let started = Instant::now();
        requests
            .send(WorkerRequest::Ping)
            .map_err(|_| VerifyError::WorkerCrashed("worker channel closed".to_string()))?;

        let limit = self.shared.config.timeout();
        match tokio::time::timeout(limit, rx).await {
            Ok(Ok(())) => Ok(started.elapsed()),
            Ok(Err(_)) => Err(VerifyError::WorkerCrashed(
                "worker restarted before answering".to_string(),
            )),
            Err(_) => Err(VerifyError::Timeout {
                id: "ping".to_string(),
                after_secs: limit.as_secs(),
            }),
        }
    }
}

impl Drop for VerificationCoordinator {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[async_trait]
impl ChangeVerifier for VerificationCoordinator {
    async fn verify(
        &self,
        command: &str,
        paths: &[String],
    ) -> Result<VerificationReport, VerifierError> {
        if command == FULL_VERIFICATION {
            let full = self.run_full_verification(paths).await;
            return Ok(VerificationReport {
                success: full.overall,
                output: full.summary(),
            });
        }
        self.run_verification(command, None).await.map_err(|e| {
            if e.is_timeout() {
                VerifierError::timeout(e.to_string())
            } else {
                VerifierError::new(e.to_string())
            }
        })
    }
}

/// Pending-map entry owned by one in-flight request
///
/// Dropping it closes the receiver and clears the entry, so a caller that
/// is cancelled mid-wait leaves nothing behind. An entry re-registered
/// under the same id by a later request still has a live receiver and is
/// left alone.
struct PendingSlot<'a> {
    pending: &'a DashMap<String, Responder>,
    id: String,
    rx: oneshot::Receiver<Result<VerificationReport, VerifyError>>,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.rx.close();
        if self
            .pending
            .remove_if(&self.id, |_, tx| tx.is_closed())
            .is_some()
        {
            tracing::debug!(id = %self.id, "pending entry cleared on drop");
        }
    }
}

impl Shared {
    fn sender(&self) -> Result<mpsc::UnboundedSender<WorkerRequest>, VerifyError> {
        match &*self.lifecycle.lock() {
            Lifecycle::Initialized { requests, .. } => Ok(requests.clone()),
            Lifecycle::Uninitialized => Err(VerifyError::NotInitialized),
            Lifecycle::Terminated => Err(VerifyError::Terminated),
        }
    }

    fn reject_all(&self, error: impl Fn() -> VerifyError) -> usize {
        let ids: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut rejected = 0;
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(error()));
                rejected += 1;
            }
        }
        rejected
    }

    fn handle(&self, message: WorkerResponse) {
        match message {
            WorkerResponse::Ready => {
                self.ready.store(true, Ordering::SeqCst);
                tracing::info!("verification worker ready");
            }
            WorkerResponse::Pong => {
                let mut pings = self.pings.lock();
                while let Some(tx) = pings.pop_front() {
                    if tx.send(()).is_ok() {
                        break;
                    }
                }
            }
            WorkerResponse::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!(target: "kiln_verify::worker", "{message}"),
                LogLevel::Info => tracing::info!(target: "kiln_verify::worker", "{message}"),
                LogLevel::Warn => tracing::warn!(target: "kiln_verify::worker", "{message}"),
                LogLevel::Error => tracing::error!(target: "kiln_verify::worker", "{message}"),
            },
            WorkerResponse::VerifyComplete {
                session_id,
                success,
                output,
                error,
            } => {
                let Some((_, tx)) = self.pending.remove(&session_id) else {
                    tracing::debug!(
                        id = %session_id,
                        "ignoring response for unknown or expired request"
                    );
                    return;
                };
                let result = match error {
                    Some(e) => Err(VerifyError::Reported(e)),
                    None => Ok(VerificationReport {
                        success,
                        output: output.unwrap_or_default(),
                    }),
                };
                let _ = tx.send(result);
            }
            WorkerResponse::Error { error } => {
                let rejected = self.reject_all(|| VerifyError::WorkerError(error.clone()));
                tracing::warn!(error = %error, rejected, "verification worker reported an error");
            }
        }
    }

    fn is_initialized(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Initialized { .. })
    }
}

async fn dispatch(shared: Arc<Shared>, mut events: mpsc::UnboundedReceiver<WorkerEvent>) {
    loop {
        let reason = loop {
            match events.recv().await {
                Some(WorkerEvent::Message(message)) => shared.handle(message),
                Some(WorkerEvent::Crashed(reason)) => break reason,
                None => break "worker channel closed".to_string(),
            }
        };

        shared.ready.store(false, Ordering::SeqCst);
        shared.pings.lock().clear();
        let rejected = shared.reject_all(|| VerifyError::WorkerCrashed(reason.clone()));
        tracing::warn!(reason = %reason, rejected, "verification worker crashed");

        if !shared.is_initialized() {
            return;
        }
        match shared.spawner.spawn().await {
            Ok(channels) => {
                let mut lifecycle = shared.lifecycle.lock();
                let Lifecycle::Initialized { requests, .. } = &mut *lifecycle else {
                    return;
                };
                *requests = channels.requests;
                drop(lifecycle);
                events = channels.events;
                tracing::info!("verification worker restarted");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to restart verification worker");
                let mut lifecycle = shared.lifecycle.lock();
                if matches!(*lifecycle, Lifecycle::Initialized { .. }) {
                    *lifecycle = Lifecycle::Uninitialized;
                }
                return;
            }
        }
    }
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

fn is_script_path(path: &str) -> bool {
    has_extension(path, &["js", "mjs", "cjs", "jsx", "ts", "tsx"])
}

fn is_test_path(path: &str) -> bool {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.contains(".test.")
        || name.contains(".spec.")
        || path.starts_with("tests/")
        || path.contains("/tests/")
        || path.contains("/__tests__/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_artifact::MemoryStore;
    use pretty_assertions::assert_eq;

    fn coordinator(files: &[(&str, &str)]) -> VerificationCoordinator {
        let store = Arc::new(MemoryStore::with_files(files.iter().copied()));
        VerificationCoordinator::with_snapshot_worker(store, VerificationConfig::default())
    }

    #[tokio::test]
    async fn requests_before_init_are_rejected() {
        let c = coordinator(&[]);
        assert_eq!(c.state(), LifecycleState::Uninitialized);
        assert_eq!(
            c.run_verification("lint:a.js", None).await.unwrap_err(),
            VerifyError::NotInitialized
        );
    }

    #[tokio::test]
    async fn lint_round_trip_through_worker() {
        let c = coordinator(&[("src/ui/panel.js", "export const x = [1];\n")]);
        c.init().await.unwrap();
        let report = c.verify_linting("src/ui/panel.js").await.unwrap();
        assert!(report.success, "{}", report.output);
        assert_eq!(c.pending_count(), 0);
    }

    #[tokio::test]
    async fn snapshot_only_holds_relevant_files() {
        let c = coordinator(&[
            ("src/a.js", "a"),
            ("notes/readme.md", "b"),
            ("logo.png", "c"),
            ("app.config", "d"),
        ]);
        let snap = c.snapshot().await.unwrap();
        assert_eq!(
            snap.keys().cloned().collect::<Vec<_>>(),
            vec!["app.config".to_string(), "src/a.js".to_string()]
        );
    }

    #[tokio::test]
    async fn concurrent_requests_are_independent() {
        let c = coordinator(&[("good.js", "f();\n"), ("bad.js", "f(;\n")]);
        c.init().await.unwrap();
        let (good, bad) = tokio::join!(c.verify_linting("good.js"), c.verify_linting("bad.js"));
        assert!(good.unwrap().success);
        assert!(!bad.unwrap().success);
    }

    #[tokio::test]
    async fn explicit_session_id_must_be_unique_while_pending() {
        let c = coordinator(&[("a.js", "x\n")]);
        c.init().await.unwrap();
        let report = c.run_verification("lint:a.js", Some("turn-1")).await.unwrap();
        assert!(report.success);
        // Completed ids may be reused.
        assert!(c.run_verification("lint:a.js", Some("turn-1")).await.is_ok());
    }

    #[tokio::test]
    async fn terminate_is_idempotent_and_final() {
        let c = coordinator(&[]);
        c.init().await.unwrap();
        c.terminate();
        c.terminate();
        assert_eq!(c.state(), LifecycleState::Terminated);
        assert_eq!(c.init().await.unwrap_err(), VerifyError::Terminated);
        assert_eq!(c.ping().await.unwrap_err(), VerifyError::Terminated);
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let c = coordinator(&[]);
        c.init().await.unwrap();
        assert!(c.ping().await.is_ok());
        assert!(c.is_ready());
    }

    #[tokio::test]
    async fn full_verification_covers_every_file_and_keeps_going() {
        let c = coordinator(&[
            ("src/ui/panel.test.js", "test('renders', () => {});\n"),
            ("src/ui/panel.js", "render(;\n"),
            ("package.json", "{\"name\": \"kiln\"}"),
        ]);
        c.init().await.unwrap();
        let changed = vec![
            "src/ui/panel.test.js".to_string(),
            "src/ui/panel.js".to_string(),
            "package.json".to_string(),
            "notes.txt".to_string(),
        ];
        let full = c.run_full_verification(&changed).await;
        assert_eq!(full.tests.len(), 1);
        assert_eq!(full.linting.len(), 1);
        assert_eq!(full.types.len(), 2);
        assert!(full.tests[0].success);
        assert!(!full.linting[0].success);
        assert!(!full.overall);
        assert!(full.summary().contains("src/ui/panel.js"));
    }

    #[tokio::test]
    async fn full_verification_records_raised_checks() {
        let c = coordinator(&[("a.js", "x\n")]);
        let full = c.run_full_verification(&["a.js".to_string()]).await;
        assert!(!full.overall);
        assert_eq!(
            full.linting[0].error.as_deref(),
            Some("verification worker is not initialized")
        );
    }

    #[tokio::test]
    async fn change_verifier_full_command() {
        let c = coordinator(&[("a.js", "ok();\n")]);
        c.init().await.unwrap();
        let report = ChangeVerifier::verify(&c, FULL_VERIFICATION, &["a.js".to_string()])
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.output, "2 check(s) passed");
    }

    #[tokio::test]
    async fn change_verifier_maps_errors() {
        let c = coordinator(&[]);
        let err = ChangeVerifier::verify(&c, "lint:a.js", &[]).await.unwrap_err();
        assert!(!err.timed_out);
        assert!(err.message.contains("not initialized"));
    }

    #[test]
    fn path_classification() {
        assert!(is_test_path("src/ui/panel.test.js"));
        assert!(is_test_path("tests/loop.js"));
        assert!(is_test_path("src/__tests__/x.js"));
        assert!(!is_test_path("src/ui/panel.js"));
        assert!(is_script_path("a.tsx"));
        assert!(!is_script_path("a.json"));
    }
}
