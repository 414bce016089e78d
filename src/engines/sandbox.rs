use std::time::Instant;

use rhai::Dynamic;
use rhai::packages::{
    BasicArrayPackage, BasicMapPackage, BasicMathPackage, BasicTimePackage, CorePackage,
    MoreStringPackage, Package,
};

use crate::comparator::outputs_match;
use crate::domain::{EngineOutcome, Language, ResourceLimits, TestCase};
use crate::engines::Engine;
use crate::error::EngineFailure;

/// Explicit allow-list of what a sandboxed script may touch. The restricted
/// execution context is a first-class value: whatever is not granted here is
/// simply never registered on the interpreter. There is no file system,
/// network, process, or host-console access in any configuration, and
/// `print`/`debug` calls inside the script are no-ops.
#[derive(Debug, Clone)]
pub struct SandboxCapabilities {
    pub math: bool,
    pub strings: bool,
    pub collections: bool,
    pub time: bool,
}

impl Default for SandboxCapabilities {
    fn default() -> Self {
        Self {
            math: true,
            strings: true,
            collections: true,
            time: true,
        }
    }
}

impl SandboxCapabilities {
    fn build_engine(&self) -> rhai::Engine {
        let mut engine = rhai::Engine::new_raw();
        // Core covers arithmetic, logic, iterators, and basic strings.
        CorePackage::new().register_into_engine(&mut engine);
        if self.math {
            BasicMathPackage::new().register_into_engine(&mut engine);
        }
        if self.strings {
            MoreStringPackage::new().register_into_engine(&mut engine);
        }
        if self.collections {
            BasicArrayPackage::new().register_into_engine(&mut engine);
            BasicMapPackage::new().register_into_engine(&mut engine);
        }
        if self.time {
            BasicTimePackage::new().register_into_engine(&mut engine);
        }
        engine.on_print(|_| {});
        engine.on_debug(|_, _, _| {});
        engine
    }
}

/// In-process evaluator for languages with an embeddable interpreter. The
/// learner's code runs first, then the test's `input` expression is
/// evaluated against the learner's declared symbols; the value of that final
/// expression is the actual output.
///
/// The timeout here is soft: evaluation is synchronous on a blocking thread,
/// and expiry only stops the result from being reported late. A script that
/// never returns keeps its thread until the interpreter itself errors. The
/// subprocess engine is the one with a hard cancellation boundary.
#[derive(Debug, Clone, Default)]
pub struct SandboxEvaluator {
    capabilities: SandboxCapabilities,
}

impl SandboxEvaluator {
    pub fn new(capabilities: SandboxCapabilities) -> Self {
        Self { capabilities }
    }
}

fn render_value(value: Dynamic) -> String {
    if value.is::<()>() {
        String::new()
    } else {
        value.to_string()
    }
}

#[async_trait::async_trait]
impl Engine for SandboxEvaluator {
    #[tracing::instrument(skip(self, code))]
    async fn execute(
        &self,
        language: &Language,
        code: &str,
        test: &TestCase,
        limits: &ResourceLimits,
    ) -> Result<EngineOutcome, EngineFailure> {
        if !matches!(language, Language::Rhai) {
            return Err(EngineFailure::NoInterpreter(language.name().to_string()));
        }

        // The call expression goes last so its value is what the script
        // evaluates to.
        let script = format!("{code}\n{}", test.input);
        let capabilities = self.capabilities.clone();

        let evaluation = tokio::task::spawn_blocking(move || {
            let engine = capabilities.build_engine();
            let started = Instant::now();
            let result = engine
                .eval::<Dynamic>(&script)
                .map(render_value)
                .map_err(|e| e.to_string());
            (result, started.elapsed().as_millis() as u64)
        });

        let (result, elapsed) = match tokio::time::timeout(limits.time_limit, evaluation).await {
            Err(_) => {
                tracing::debug!(test = %test.id, "sandbox evaluation exceeded its time limit");
                return Err(EngineFailure::Timeout {
                    seconds: limits.time_limit.as_secs(),
                });
            }
            Ok(Err(join_error)) => {
                return Err(EngineFailure::Internal(format!(
                    "evaluation thread panicked: {join_error}"
                )));
            }
            Ok(Ok(outcome)) => outcome,
        };

        match result {
            Ok(actual) => {
                let passed = outputs_match(&actual, &test.expected_output);
                let error = if passed {
                    None
                } else {
                    Some(format!(
                        "wrong answer: expected {:?}, got {:?}",
                        test.expected_output.trim(),
                        actual.trim()
                    ))
                };
                Ok(EngineOutcome {
                    passed,
                    output: Some(actual),
                    error,
                    execution_time_ms: elapsed,
                    memory_used_mb: None,
                })
            }
            Err(message) => Err(EngineFailure::Runtime(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limits() -> ResourceLimits {
        ResourceLimits {
            time_limit: Duration::from_secs(5),
            memory_limit_mb: 256,
        }
    }

    #[tokio::test]
    async fn evaluates_a_declared_function_against_the_input_expression() {
        let engine = SandboxEvaluator::default();
        let test = TestCase::new("t1", "add(2, 3)", "5");

        let outcome = engine
            .execute(
                &Language::Rhai,
                "fn add(a, b) { a + b }",
                &test,
                &limits(),
            )
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.output.as_deref(), Some("5"));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn numeric_tolerance_applies_to_sandbox_output() {
        let engine = SandboxEvaluator::default();
        let test = TestCase::new("t1", "third()", "0.333");

        let outcome = engine
            .execute(
                &Language::Rhai,
                "fn third() { 1.0 / 3.0 }",
                &test,
                &limits(),
            )
            .await
            .unwrap();

        assert!(outcome.passed);
    }

    #[tokio::test]
    async fn wrong_answer_is_a_failed_outcome_not_an_engine_failure() {
        let engine = SandboxEvaluator::default();
        let test = TestCase::new("t1", "add(2, 2)", "5");

        let outcome = engine
            .execute(
                &Language::Rhai,
                "fn add(a, b) { a + b }",
                &test,
                &limits(),
            )
            .await
            .unwrap();

        assert!(!outcome.passed);
        assert!(outcome.error.unwrap().contains("expected"));
    }

    #[tokio::test]
    async fn script_errors_surface_as_runtime_failures() {
        let engine = SandboxEvaluator::default();
        let test = TestCase::new("t1", "missing()", "1");

        let result = engine
            .execute(&Language::Rhai, "let x = 1;", &test, &limits())
            .await;

        assert!(matches!(result, Err(EngineFailure::Runtime(_))));
    }

    #[tokio::test]
    async fn host_escape_hatches_are_not_registered() {
        let engine = SandboxEvaluator::default();
        let test = TestCase::new("t1", "open_file(\"/etc/passwd\")", "x");

        let result = engine
            .execute(&Language::Rhai, "let x = 1;", &test, &limits())
            .await;

        assert!(matches!(result, Err(EngineFailure::Runtime(_))));
    }

    #[tokio::test]
    async fn print_inside_the_sandbox_is_a_no_op() {
        let engine = SandboxEvaluator::default();
        let test = TestCase::new("t1", "f()", "7");

        let outcome = engine
            .execute(
                &Language::Rhai,
                "fn f() { print(\"noise\"); 7 }",
                &test,
                &limits(),
            )
            .await
            .unwrap();

        assert!(outcome.passed);
    }

    #[tokio::test]
    async fn capability_flags_withhold_bindings() {
        let capabilities = SandboxCapabilities {
            math: false,
            strings: false,
            collections: false,
            time: false,
        };
        let engine = SandboxEvaluator::new(capabilities);
        let test = TestCase::new("t1", "sqrt(4.0)", "2");

        let result = engine
            .execute(&Language::Rhai, "let x = 1;", &test, &limits())
            .await;

        assert!(matches!(result, Err(EngineFailure::Runtime(_))));
    }

    #[tokio::test]
    async fn non_sandbox_languages_are_rejected() {
        let engine = SandboxEvaluator::default();
        let test = TestCase::new("t1", "1", "1");

        let result = engine
            .execute(&Language::Python, "x = 1", &test, &limits())
            .await;

        assert!(matches!(result, Err(EngineFailure::NoInterpreter(_))));
    }
}
