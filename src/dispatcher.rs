use std::sync::Arc;
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::StreamExt;

use crate::domain::{
    EngineKind, EngineOutcome, ExecutionOptions, ExecutionResult, Language,
};
use crate::engines::rules::StaticRuleValidator;
use crate::engines::sandbox::SandboxEvaluator;
use crate::engines::subprocess::SubprocessExecutor;
use crate::engines::Engine;
use crate::error::{BatchError, EngineFailure};
use crate::scratch::ScratchDir;

const SLOT_ERR: &str = "every test index is filled exactly once";

/// Routes each test case to one of the three engines by its declared
/// language and owns per-test error containment: configuration errors abort
/// the batch before any test runs, runtime errors degrade to a failed result
/// for that test only.
pub struct Dispatcher {
    sandbox: Arc<dyn Engine>,
    subprocess: Arc<dyn Engine>,
    validator: Arc<dyn Engine>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        sandbox: Arc<dyn Engine>,
        subprocess: Arc<dyn Engine>,
        validator: Arc<dyn Engine>,
    ) -> Self {
        Self {
            sandbox,
            subprocess,
            validator,
        }
    }

    /// Production wiring: real engines, scratch space under the system temp
    /// directory.
    pub fn with_defaults() -> std::io::Result<Self> {
        let scratch = ScratchDir::new(std::env::temp_dir().join("codegrader"))?;
        Ok(Self::new(
            Arc::new(SandboxEvaluator::default()),
            Arc::new(SubprocessExecutor::new(scratch)),
            Arc::new(StaticRuleValidator),
        ))
    }

    fn engine_for(&self, language: &Language) -> Arc<dyn Engine> {
        match language.kind() {
            EngineKind::Sandbox => self.sandbox.clone(),
            EngineKind::Subprocess => self.subprocess.clone(),
            EngineKind::StaticRules => self.validator.clone(),
        }
    }

    /// Runs every test case in `options` and returns one result per test
    /// case, in input order, regardless of individual failures. Test cases
    /// run concurrently on isolated resources; results are collected into
    /// indexed slots so completion order cannot reorder them.
    #[tracing::instrument(
        skip_all,
        fields(language = %options.language, tests = options.test_cases.len())
    )]
    pub async fn execute_tests(
        &self,
        options: &ExecutionOptions,
    ) -> Result<Vec<ExecutionResult>, BatchError> {
        let language = Language::from_identifier(&options.language)
            .ok_or_else(|| BatchError::UnsupportedLanguage(options.language.clone()))?;
        if options.code.trim().is_empty() {
            return Err(BatchError::EmptyCode);
        }

        let engine = self.engine_for(&language);
        tracing::info!(engine = ?language.kind(), "starting batch");

        let mut futures = FuturesUnordered::new();
        for (index, test) in options.test_cases.iter().enumerate() {
            let engine = engine.clone();
            let code = options.code.clone();
            let test = test.clone();
            let limits = options.limits_for(&test);

            futures.push(async move {
                let test_id = test.id.clone();
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let outcome = engine.execute(&language, &code, &test, &limits).await;
                    (outcome, started.elapsed().as_millis() as u64)
                });
                (index, test_id, handle.await)
            });
        }

        let mut slots: Vec<Option<ExecutionResult>> = vec![None; options.test_cases.len()];
        while let Some((index, test_id, joined)) = futures.next().await {
            let result = match joined {
                Ok((outcome, elapsed)) => finish(test_id, outcome, elapsed),
                // A panicked engine task is contained like any other
                // per-test failure.
                Err(join_error) => ExecutionResult {
                    test_case_id: test_id,
                    passed: false,
                    output: None,
                    error: Some(format!("internal error: engine task failed: {join_error}")),
                    execution_time_ms: 0,
                    memory_used_mb: None,
                },
            };
            slots[index] = Some(result);
        }

        Ok(slots.into_iter().map(|slot| slot.expect(SLOT_ERR)).collect())
    }
}

fn finish(
    test_case_id: String,
    outcome: Result<EngineOutcome, EngineFailure>,
    elapsed_ms: u64,
) -> ExecutionResult {
    match outcome {
        Ok(outcome) => ExecutionResult {
            test_case_id,
            passed: outcome.passed,
            output: outcome.output,
            error: outcome.error,
            execution_time_ms: outcome.execution_time_ms,
            memory_used_mb: outcome.memory_used_mb,
        },
        Err(failure) => {
            tracing::debug!(test = %test_case_id, %failure, "test failed");
            ExecutionResult {
                test_case_id,
                passed: false,
                output: None,
                error: Some(failure.to_string()),
                execution_time_ms: elapsed_ms,
                memory_used_mb: None,
            }
        }
    }
}
