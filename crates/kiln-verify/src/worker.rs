//! Verification workers
//!
//! A worker is anything that consumes [`WorkerRequest`]s and produces
//! [`WorkerEvent`]s over a pair of channels. The coordinator never shares
//! memory with it: every request carries its own file snapshot.
//!
//! [`SnapshotWorker`] is the built-in worker. It runs as a separate task and
//! performs static checks on the snapshot it was handed.

use crate::error::VerifyError;
use crate::protocol::{LogLevel, VerifyCommand, VerifyPayload, WorkerRequest, WorkerResponse};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Something the worker told the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A protocol message
    Message(WorkerResponse),
    /// The worker died; the string describes why
    Crashed(String),
}

/// Channel pair connecting the coordinator to one worker instance
#[derive(Debug)]
pub struct WorkerChannels {
    /// Requests to the worker
    pub requests: mpsc::UnboundedSender<WorkerRequest>,
    /// Events from the worker; closing means the worker is gone
    pub events: mpsc::UnboundedReceiver<WorkerEvent>,
}

/// Starts worker instances
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    /// Start a fresh worker
    async fn spawn(&self) -> Result<WorkerChannels, VerifyError>;
}

/// Spawns [`SnapshotWorker`] tasks on the current runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotWorkerSpawner;

#[async_trait]
impl WorkerSpawner for SnapshotWorkerSpawner {
    async fn spawn(&self) -> Result<WorkerChannels, VerifyError> {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        tokio::spawn(SnapshotWorker::run(req_rx, ev_tx));
        Ok(WorkerChannels {
            requests: req_tx,
            events: ev_rx,
        })
    }
}

const EVAL_REFUSED: &str = "script evaluation is not available in the snapshot worker";

const TEST_MARKERS: &[&str] = &["test(", "it(", "describe(", "#[test]", "def test_", "assert"];

/// Built-in worker performing static checks on a snapshot
///
/// | command        | passes when                                        |
/// |----------------|----------------------------------------------------|
/// | `test:<path>`  | file is non-empty and contains a test marker       |
/// | `lint:<path>`  | delimiters balance, no trailing or mixed whitespace |
/// | `type-check:`  | JSON parses, otherwise delimiters balance           |
/// | `eval:<code>`  | never; evaluation is refused                        |
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotWorker;

impl SnapshotWorker {
    /// Serve requests until the request channel closes
    pub async fn run(
        mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) {
        if events.send(WorkerEvent::Message(WorkerResponse::Ready)).is_err() {
            return;
        }
        while let Some(request) = requests.recv().await {
            let reply = match request {
                WorkerRequest::Ping => WorkerResponse::Pong,
                WorkerRequest::Verify(payload) => {
                    let log = WorkerResponse::Log {
                        level: LogLevel::Debug,
                        message: format!(
                            "running {} over {} file(s)",
                            payload.command,
                            payload.vfs_snapshot.len()
                        ),
                    };
                    if events.send(WorkerEvent::Message(log)).is_err() {
                        break;
                    }
                    Self::evaluate(&payload)
                }
            };
            if events.send(WorkerEvent::Message(reply)).is_err() {
                break;
            }
        }
    }

    /// Evaluate one request against its snapshot
    #[must_use]
    pub fn evaluate(payload: &VerifyPayload) -> WorkerResponse {
        let complete = |success: bool, output: String| WorkerResponse::VerifyComplete {
            session_id: payload.session_id.clone(),
            success,
            output: Some(output),
            error: None,
        };

        let command: VerifyCommand = match payload.command.parse() {
            Ok(c) => c,
            Err(e) => {
                return WorkerResponse::VerifyComplete {
                    session_id: payload.session_id.clone(),
                    success: false,
                    output: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let (success, output) = match &command {
            VerifyCommand::Eval(_) => (false, EVAL_REFUSED.to_string()),
            other => {
                let path = other.argument();
                match (other, payload.vfs_snapshot.get(path)) {
                    (_, None) => (false, format!("{path}: not found in snapshot")),
                    (VerifyCommand::Test(_), Some(content)) => check_tests(path, content),
                    (VerifyCommand::Lint(_), Some(content)) => report(path, lint(content)),
                    (_, Some(content)) => type_check(path, content),
                }
            }
        };
        complete(success, output)
    }
}

fn type_check(path: &str, content: &str) -> (bool, String) {
    if path.to_ascii_lowercase().ends_with(".json") {
        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(_) => (true, format!("{path}: valid JSON")),
            Err(e) => (false, format!("{path}: {e}")),
        }
    } else {
        report(path, check_delimiters(content).into_iter().collect())
    }
}

fn report(path: &str, issues: Vec<String>) -> (bool, String) {
    if issues.is_empty() {
        (true, format!("{path}: ok"))
    } else {
        let lines: Vec<String> = issues.iter().map(|i| format!("{path}: {i}")).collect();
        (false, lines.join("\n"))
    }
}

fn check_tests(path: &str, content: &str) -> (bool, String) {
    if content.trim().is_empty() {
        return (false, format!("{path}: empty test file"));
    }
    let markers = content
        .lines()
        .filter(|l| TEST_MARKERS.iter().any(|m| l.contains(m)))
        .count();
    if markers == 0 {
        (false, format!("{path}: no tests found"))
    } else {
        (true, format!("{path}: {markers} test marker(s) found"))
    }
}

fn lint(content: &str) -> Vec<String> {
    let mut issues = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let n = idx + 1;
        if line.ends_with(' ') || line.ends_with('\t') {
            issues.push(format!("line {n}: trailing whitespace"));
        }
        let indent: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        if indent.contains(' ') && indent.contains('\t') {
            issues.push(format!("line {n}: mixed tabs and spaces"));
        }
    }
    issues.extend(check_delimiters(content));
    issues
}

/// First delimiter imbalance, skipping string literals and line comments
fn check_delimiters(content: &str) -> Option<String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut in_template = false;

    for (idx, line) in content.lines().enumerate() {
        let n = idx + 1;
        let mut quote: Option<char> = None;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            if in_template {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '`' => in_template = false,
                    _ => {}
                }
                continue;
            }
            if let Some(q) = quote {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    c if c == q => quote = None,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '`' => in_template = true,
                '/' if chars.peek() == Some(&'/') => break,
                '(' | '[' | '{' => stack.push((c, n)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => return Some(format!("line {n}: unexpected `{c}`")),
                    }
                }
                _ => {}
            }
        }
    }

    if in_template {
        return Some("unterminated template literal".to_string());
    }
    stack
        .pop()
        .map(|(open, line)| format!("unclosed `{open}` opened on line {line}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::VfsSnapshot;
    use pretty_assertions::assert_eq;

    fn payload(command: &str, files: &[(&str, &str)]) -> VerifyPayload {
        VerifyPayload {
            command: command.to_string(),
            vfs_snapshot: files
                .iter()
                .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
                .collect::<VfsSnapshot>(),
            session_id: "s1".to_string(),
        }
    }

    fn outcome(resp: WorkerResponse) -> (bool, Option<String>, Option<String>) {
        match resp {
            WorkerResponse::VerifyComplete {
                success,
                output,
                error,
                ..
            } => (success, output, error),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn lint_passes_clean_file() {
        let p = payload("lint:a.js", &[("a.js", "function f() {\n  return [1, 2];\n}\n")]);
        let (ok, out, _) = outcome(SnapshotWorker::evaluate(&p));
        assert!(ok);
        assert_eq!(out.as_deref(), Some("a.js: ok"));
    }

    #[test]
    fn lint_reports_every_issue() {
        let p = payload("lint:a.js", &[("a.js", "function f() { \n\t  x();\n")]);
        let (ok, out, _) = outcome(SnapshotWorker::evaluate(&p));
        assert!(!ok);
        let out = out.unwrap();
        assert!(out.contains("line 1: trailing whitespace"));
        assert!(out.contains("line 2: mixed tabs and spaces"));
        assert!(out.contains("unclosed `{` opened on line 1"));
    }

    #[test]
    fn delimiters_inside_strings_and_comments_are_ignored() {
        let src = "const s = \"(\";\nconst t = `}\n{`;\n// )\nf('[');\n";
        assert_eq!(check_delimiters(src), None);
        assert_eq!(
            check_delimiters("f(]"),
            Some("line 1: unexpected `]`".to_string())
        );
    }

    #[test]
    fn type_check_json() {
        let good = payload("type-check:package.json", &[("package.json", "{\"a\": 1}")]);
        assert!(outcome(SnapshotWorker::evaluate(&good)).0);
        let bad = payload("type-check:package.json", &[("package.json", "{\"a\": }")]);
        assert!(!outcome(SnapshotWorker::evaluate(&bad)).0);
    }

    #[test]
    fn tests_need_markers() {
        let with = payload("test:a.test.js", &[("a.test.js", "test('x', () => {});\n")]);
        assert!(outcome(SnapshotWorker::evaluate(&with)).0);
        let without = payload("test:a.test.js", &[("a.test.js", "const x = 1;\n")]);
        assert!(!outcome(SnapshotWorker::evaluate(&without)).0);
    }

    #[test]
    fn missing_file_is_reported_failure() {
        let p = payload("lint:gone.js", &[]);
        let (ok, out, err) = outcome(SnapshotWorker::evaluate(&p));
        assert!(!ok);
        assert!(err.is_none());
        assert!(out.unwrap().contains("not found in snapshot"));
    }

    #[test]
    fn eval_is_refused() {
        let (ok, _, err) = outcome(SnapshotWorker::evaluate(&payload("eval:1+1", &[])));
        assert!(!ok);
        assert!(err.is_none());
    }

    #[test]
    fn unknown_command_is_an_error_response() {
        let (ok, _, err) = outcome(SnapshotWorker::evaluate(&payload("format:a.js", &[])));
        assert!(!ok);
        assert!(err.unwrap().contains("unrecognised verification command"));
    }

    #[tokio::test]
    async fn spawned_worker_announces_ready_and_answers_ping() {
        let mut ch = SnapshotWorkerSpawner.spawn().await.unwrap();
        assert_eq!(
            ch.events.recv().await,
            Some(WorkerEvent::Message(WorkerResponse::Ready))
        );
        ch.requests.send(WorkerRequest::Ping).unwrap();
        assert_eq!(
            ch.events.recv().await,
            Some(WorkerEvent::Message(WorkerResponse::Pong))
        );
        drop(ch.requests);
        assert_eq!(ch.events.recv().await, None);
    }
}
