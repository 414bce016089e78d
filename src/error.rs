/// Configuration errors that reject the whole batch before any test runs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BatchError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("no code submitted")]
    EmptyCode,
}

/// Per-test runtime failures. The dispatcher converts these into failed
/// `ExecutionResult`s so the rest of the batch keeps running.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineFailure {
    #[error("execution timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
    #[error("unsupported language for this engine: {0}")]
    NoInterpreter(String),
    #[error("failed to launch interpreter: {0}")]
    SpawnFailed(String),
    #[error("{0}")]
    Runtime(String),
    #[error("internal error: {0}")]
    Internal(String),
}
