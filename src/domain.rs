use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIME_LIMIT_SECS: u64 = 5;
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 256;

/// One graded check against a submission.
///
/// `input` is dual-purpose: for executable languages it is a call expression
/// (or stdin payload) handed to the engine, for statically validated
/// languages it is a semicolon-delimited rule string. The engine selected by
/// the language decides how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub input: String,
    pub expected_output: String,
    pub is_hidden: bool,
    pub points: f64,
    pub time_limit_secs: Option<u64>,
    pub memory_limit_mb: Option<u64>,
}

impl TestCase {
    pub fn new(id: &str, input: &str, expected_output: &str) -> Self {
        Self {
            id: id.to_string(),
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            is_hidden: false,
            points: 1.0,
            time_limit_secs: None,
            memory_limit_mb: None,
        }
    }
}

/// One batch of test cases against one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOptions {
    pub language: String,
    pub code: String,
    pub test_cases: Vec<TestCase>,
    pub time_limit_secs: u64,
    pub memory_limit_mb: u64,
}

impl ExecutionOptions {
    pub fn new(language: &str, code: &str, test_cases: Vec<TestCase>) -> Self {
        Self {
            language: language.to_string(),
            code: code.to_string(),
            test_cases,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
        }
    }

    /// Effective limits for one test case: per-test override if present,
    /// batch default otherwise.
    pub fn limits_for(&self, test: &TestCase) -> ResourceLimits {
        ResourceLimits {
            time_limit: Duration::from_secs(test.time_limit_secs.unwrap_or(self.time_limit_secs)),
            memory_limit_mb: test.memory_limit_mb.unwrap_or(self.memory_limit_mb),
        }
    }
}

/// Effective limits for a single test case. The memory limit is advisory:
/// no engine currently enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub time_limit: Duration,
    pub memory_limit_mb: u64,
}

/// Verdict for one test case. Created fresh per test and never mutated
/// after the dispatcher hands it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub test_case_id: String,
    pub passed: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub memory_used_mb: Option<u64>,
}

/// What an engine reports back for one test, before the dispatcher attaches
/// the test case id.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub passed: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub memory_used_mb: Option<u64>,
}

/// Which of the three engines handles a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Sandbox,
    Subprocess,
    StaticRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rhai,
    Python,
    JavaScript,
    Ruby,
    Shell,
    Html,
    Css,
    React,
}

impl Language {
    /// Case-insensitive lookup of a declared language identifier.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier.trim().to_ascii_lowercase().as_str() {
            "rhai" | "script" => Some(Language::Rhai),
            "python" | "python3" | "py" => Some(Language::Python),
            "javascript" | "js" | "node" => Some(Language::JavaScript),
            "ruby" | "rb" => Some(Language::Ruby),
            "bash" | "sh" | "shell" => Some(Language::Shell),
            "html" => Some(Language::Html),
            "css" => Some(Language::Css),
            "react" | "jsx" => Some(Language::React),
            _ => None,
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Language::Rhai => EngineKind::Sandbox,
            Language::Python | Language::JavaScript | Language::Ruby | Language::Shell => {
                EngineKind::Subprocess
            }
            Language::Html | Language::Css | Language::React => EngineKind::StaticRules,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Rhai => "rhai",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Ruby => "ruby",
            Language::Shell => "shell",
            Language::Html => "html",
            Language::Css => "css",
            Language::React => "react",
        }
    }
}
