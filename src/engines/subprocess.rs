use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::comparator::outputs_match;
use crate::domain::{EngineOutcome, Language, ResourceLimits, TestCase};
use crate::engines::Engine;
use crate::error::EngineFailure;
use crate::scratch::ScratchDir;

/// Runs submissions under an external interpreter. Code is staged to a
/// collision-free scratch file, the interpreter runs as a child process with
/// the test input piped to its stdin and a hard timeout (the child is killed
/// on expiry), and the scratch file is removed on every exit path.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    scratch: ScratchDir,
    interpreters: HashMap<Language, PathBuf>,
}

impl SubprocessExecutor {
    pub fn new(scratch: ScratchDir) -> Self {
        let mut interpreters = HashMap::new();
        interpreters.insert(Language::Python, PathBuf::from("python3"));
        interpreters.insert(Language::JavaScript, PathBuf::from("node"));
        interpreters.insert(Language::Ruby, PathBuf::from("ruby"));
        interpreters.insert(Language::Shell, PathBuf::from("bash"));
        Self {
            scratch,
            interpreters,
        }
    }

    /// Overrides the interpreter binary for one language.
    pub fn with_interpreter<P: Into<PathBuf>>(mut self, language: Language, path: P) -> Self {
        self.interpreters.insert(language, path.into());
        self
    }

    fn source_extension(language: &Language) -> &'static str {
        match language {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::Ruby => "rb",
            _ => "sh",
        }
    }

    async fn run_child(
        &self,
        program: &Path,
        code_path: &Path,
        test: &TestCase,
        limits: &ResourceLimits,
    ) -> Result<EngineOutcome, EngineFailure> {
        let mut cmd = Command::new(program);
        cmd.arg(code_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must take the child with it.
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            EngineFailure::SpawnFailed(format!("{}: {e}", program.display()))
        })?;

        let stdin = child.stdin.take();

        // The stdin write sits inside the timed section: a child that never
        // reads can block the write past the pipe buffer, and that stall
        // counts against the test's time limit like any other.
        let started = Instant::now();
        let interaction = async {
            if let Some(mut stdin) = stdin {
                // A child may exit without draining stdin; its exit status,
                // not the pipe error, is what gets reported.
                if let Err(error) = stdin.write_all(test.input.as_bytes()).await {
                    tracing::debug!(test = %test.id, %error, "stdin write did not complete");
                }
            }
            child.wait_with_output().await
        };
        let output = match timeout(limits.time_limit, interaction).await {
            Err(_) => {
                tracing::debug!(test = %test.id, "child process exceeded its time limit");
                return Err(EngineFailure::Timeout {
                    seconds: limits.time_limit.as_secs(),
                });
            }
            Ok(result) => result.map_err(|e| {
                EngineFailure::Internal(format!("failed to wait for interpreter: {e}"))
            })?,
        };
        let elapsed = started.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Ok(EngineOutcome {
                passed: false,
                output: Some(stdout),
                error: Some(format!(
                    "exit code {}: {stderr}",
                    output.status.code().unwrap_or(-1)
                )),
                execution_time_ms: elapsed,
                memory_used_mb: None,
            });
        }

        if !stderr.is_empty() {
            return Ok(EngineOutcome {
                passed: false,
                output: Some(stdout),
                error: Some(stderr),
                execution_time_ms: elapsed,
                memory_used_mb: None,
            });
        }

        let passed = outputs_match(&stdout, &test.expected_output);
        let error = if passed {
            None
        } else {
            Some(format!(
                "wrong answer: expected {:?}, got {:?}",
                test.expected_output.trim(),
                stdout
            ))
        };
        Ok(EngineOutcome {
            passed,
            output: Some(stdout),
            error,
            execution_time_ms: elapsed,
            memory_used_mb: None,
        })
    }
}

#[async_trait::async_trait]
impl Engine for SubprocessExecutor {
    #[tracing::instrument(skip(self, code))]
    async fn execute(
        &self,
        language: &Language,
        code: &str,
        test: &TestCase,
        limits: &ResourceLimits,
    ) -> Result<EngineOutcome, EngineFailure> {
        let program = self
            .interpreters
            .get(language)
            .ok_or_else(|| EngineFailure::NoInterpreter(language.name().to_string()))?
            .clone();

        let code_path = self.scratch.unique_path("submission", Self::source_extension(language));

        let staged = tokio::fs::write(&code_path, code).await.map_err(|e| {
            EngineFailure::Internal(format!("failed to stage submission: {e}"))
        });

        let outcome = match staged {
            Ok(()) => self.run_child(&program, &code_path, test, limits).await,
            Err(e) => Err(e),
        };

        // Scoped cleanup on every exit path. Failures go to the observer,
        // never to the caller.
        self.scratch.remove(&code_path).await;

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn executor() -> (tempfile::TempDir, SubprocessExecutor) {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path()).unwrap();
        (tmp, SubprocessExecutor::new(scratch))
    }

    fn limits(secs: u64) -> ResourceLimits {
        ResourceLimits {
            time_limit: Duration::from_secs(secs),
            memory_limit_mb: 256,
        }
    }

    fn scratch_file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn shell_script_output_reaches_the_comparator() {
        let (tmp, executor) = executor();
        let test = TestCase::new("t1", "", "hello");

        let outcome = executor
            .execute(&Language::Shell, "echo hello", &test, &limits(5))
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.output.as_deref(), Some("hello"));
        assert_eq!(scratch_file_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn stdin_receives_the_test_input() {
        let (_tmp, executor) = executor();
        let test = TestCase::new("t1", "world", "world");

        let outcome = executor
            .execute(&Language::Shell, "read line; echo $line", &test, &limits(5))
            .await
            .unwrap();

        assert!(outcome.passed);
    }

    #[tokio::test]
    async fn nonzero_exit_fails_with_captured_stderr() {
        let (tmp, executor) = executor();
        let test = TestCase::new("t1", "", "");

        let outcome = executor
            .execute(
                &Language::Shell,
                "echo boom >&2; exit 3",
                &test,
                &limits(5),
            )
            .await
            .unwrap();

        assert!(!outcome.passed);
        let error = outcome.error.unwrap();
        assert!(error.contains("exit code 3"));
        assert!(error.contains("boom"));
        assert_eq!(scratch_file_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn stderr_on_zero_exit_still_fails() {
        let (_tmp, executor) = executor();
        let test = TestCase::new("t1", "", "ok");

        let outcome = executor
            .execute(&Language::Shell, "echo ok; echo warn >&2", &test, &limits(5))
            .await
            .unwrap();

        assert!(!outcome.passed);
        assert_eq!(outcome.error.as_deref(), Some("warn"));
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_cleans_up() {
        let (tmp, executor) = executor();
        let markers = tempfile::tempdir().unwrap();
        let marker = markers.path().join("survived");
        let test = TestCase::new("t1", "", "");
        let code = format!("sleep 2; echo alive > {}", marker.display());

        let result = executor
            .execute(&Language::Shell, &code, &test, &limits(1))
            .await;

        assert!(matches!(result, Err(EngineFailure::Timeout { seconds: 1 })));
        assert_eq!(scratch_file_count(tmp.path()), 0);

        // A child that outlived expiry would reach the write after its sleep.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists(), "child survived its time limit");
    }

    #[tokio::test]
    async fn timeout_bounds_a_blocked_stdin_write() {
        let (tmp, executor) = executor();
        // Larger than any OS pipe buffer, against a child that never reads.
        let input = "x".repeat(1 << 20);
        let test = TestCase::new("t1", &input, "");
        let started = Instant::now();

        let result = executor
            .execute(&Language::Shell, "sleep 30", &test, &limits(1))
            .await;

        assert!(matches!(result, Err(EngineFailure::Timeout { seconds: 1 })));
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "expiry must not wait on the stalled write"
        );
        assert_eq!(scratch_file_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_spawn_failure() {
        let (tmp, executor) = executor();
        let executor =
            executor.with_interpreter(Language::Shell, "/nonexistent/interpreter");
        let test = TestCase::new("t1", "", "");

        let result = executor
            .execute(&Language::Shell, "echo hi", &test, &limits(5))
            .await;

        assert!(matches!(result, Err(EngineFailure::SpawnFailed(_))));
        assert_eq!(scratch_file_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn unconfigured_language_reports_no_interpreter() {
        let (_tmp, executor) = executor();
        let test = TestCase::new("t1", "", "");

        let result = executor
            .execute(&Language::Html, "<h1>hi</h1>", &test, &limits(5))
            .await;

        assert!(matches!(result, Err(EngineFailure::NoInterpreter(_))));
    }

    #[tokio::test]
    #[ignore = "requires python3 on PATH"]
    async fn python_submission_runs_end_to_end() {
        let (_tmp, executor) = executor();
        let test = TestCase::new("t1", "", "42");

        let outcome = executor
            .execute(&Language::Python, "print(6 * 7)", &test, &limits(5))
            .await
            .unwrap();

        assert!(outcome.passed);
    }
}
