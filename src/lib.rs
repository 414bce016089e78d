//! Execution and validation engine for graded code submissions.
//!
//! Given a learner's source code and a set of test cases, produces one
//! pass/fail verdict per test case. Three engines cover the language
//! spectrum: an in-process sandboxed interpreter, an external-interpreter
//! subprocess executor, and a static rule validator for languages that
//! cannot be meaningfully run.

pub mod comparator;
pub mod dispatcher;
pub mod domain;
pub mod engines;
pub mod error;
pub mod scratch;


pub use dispatcher::Dispatcher;
pub use domain::{
    EngineKind, ExecutionOptions, ExecutionResult, Language, ResourceLimits, TestCase,
};
pub use error::{BatchError, EngineFailure};
