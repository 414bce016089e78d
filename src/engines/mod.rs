pub mod rules;
pub mod sandbox;
pub mod subprocess;

use crate::domain::{EngineOutcome, Language, ResourceLimits, TestCase};
use crate::error::EngineFailure;

/// One execution strategy: in-process sandbox, subprocess, or static rule
/// validation. The dispatcher owns per-test error containment, so an engine
/// is free to return `Err` for anything that stops it from producing a
/// verdict; a wrong answer is still an `Ok` outcome with `passed = false`.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    async fn execute(
        &self,
        language: &Language,
        code: &str,
        test: &TestCase,
        limits: &ResourceLimits,
    ) -> Result<EngineOutcome, EngineFailure>;
}
