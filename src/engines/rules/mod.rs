//! Static rule validation for languages where running the snippet is
//! meaningless (markup, stylesheets) or where execution-based grading is
//! undesirable. The test case's `input` field is a semicolon-delimited rule
//! string; each `category:argument` token is parsed into a typed [`Rule`] at
//! the boundary and dispatched by pattern matching.

pub mod markup;
pub mod source;
pub mod stylesheet;

use std::time::Instant;

use itertools::Itertools;

use crate::domain::{EngineOutcome, Language, ResourceLimits, TestCase};
use crate::engines::Engine;
use crate::error::EngineFailure;

/// Code shapes detectable by `uses:` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Loop,
    Conditional,
    Recursion,
    Class,
}

impl Construct {
    fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier.to_ascii_lowercase().as_str() {
            "loop" | "loops" => Some(Construct::Loop),
            "conditional" | "conditionals" | "if" => Some(Construct::Conditional),
            "recursion" => Some(Construct::Recursion),
            "class" | "classes" => Some(Construct::Class),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Construct::Loop => "a loop",
            Construct::Conditional => "a conditional",
            Construct::Recursion => "recursion",
            Construct::Class => "a class",
        }
    }
}

/// One parsed rule. Unknown categories (and malformed arguments to known
/// categories) parse to `Unknown`, which evaluates vacuously true: rule
/// strings written for a newer validator must not break this one.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Contains(String),
    NotContains(String),
    Count { target: String, min: usize },
    Selector(String),
    Property(String),
    Value { property: String, value: String },
    Uses(Construct),
    Function(String),
    Variable(String),
    BestPractice(String),
    Avoids(String),
    Unknown { category: String, argument: String },
}

impl Rule {
    fn parse(token: &str) -> Rule {
        let Some((category, argument)) = token.split_once(':') else {
            return Rule::Unknown {
                category: token.to_string(),
                argument: String::new(),
            };
        };
        let category = category.trim();
        let argument = argument.trim();
        let unknown = || Rule::Unknown {
            category: category.to_string(),
            argument: argument.to_string(),
        };

        match category.to_ascii_lowercase().as_str() {
            "contains" => Rule::Contains(argument.to_string()),
            "not-contains" => Rule::NotContains(argument.to_string()),
            "count" => match argument.split_once(':') {
                Some((target, min)) => match min.trim().parse::<usize>() {
                    Ok(min) => Rule::Count {
                        target: target.trim().to_string(),
                        min,
                    },
                    Err(_) => unknown(),
                },
                None => unknown(),
            },
            "selector" => Rule::Selector(argument.to_string()),
            "property" => Rule::Property(argument.to_string()),
            "value" => match argument.split_once('=') {
                Some((property, value)) => Rule::Value {
                    property: property.trim().to_string(),
                    value: value.trim().to_string(),
                },
                None => unknown(),
            },
            "uses" => match Construct::from_identifier(argument) {
                Some(construct) => Rule::Uses(construct),
                None => unknown(),
            },
            "function" => Rule::Function(argument.to_string()),
            "variable" => Rule::Variable(argument.to_string()),
            "best-practice" => Rule::BestPractice(argument.to_string()),
            "avoids" => Rule::Avoids(argument.to_string()),
            _ => unknown(),
        }
    }
}

/// Parses a `rule1;rule2;...` string, preserving insertion order.
pub fn parse_rules(input: &str) -> Vec<Rule> {
    input
        .split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Rule::parse)
        .collect()
}

enum RuleVerdict {
    Satisfied,
    Violated(String),
    Skipped { category: String },
}

fn evaluate_rule(language: &Language, code: &str, rule: &Rule) -> RuleVerdict {
    use RuleVerdict::{Satisfied, Skipped, Violated};

    let check = |ok: bool, message: String| if ok { Satisfied } else { Violated(message) };
    let registry = |result: Option<bool>, message: String, category: &str| match result {
        Some(true) => Satisfied,
        Some(false) => Violated(message),
        None => Skipped {
            category: category.to_string(),
        },
    };

    match rule {
        Rule::Contains(target) => match language {
            Language::Css => check(
                code.contains(target.as_str()),
                format!("required token '{target}' not found"),
            ),
            _ => check(
                markup::contains_tag(code, target),
                format!("required tag <{target}> not found"),
            ),
        },
        Rule::NotContains(target) => match language {
            Language::Css => check(
                !code.contains(target.as_str()),
                format!("forbidden token '{target}' is present"),
            ),
            _ => check(
                !markup::contains_tag(code, target),
                format!("forbidden tag <{target}> is present"),
            ),
        },
        Rule::Count { target, min } => {
            let found = match language {
                Language::Css => stylesheet::selector_count(code, target),
                _ => markup::tag_count(code, target),
            };
            check(
                found >= *min,
                format!("expected at least {min} <{target}> element(s), found {found}"),
            )
        }
        Rule::Selector(selector) => check(
            stylesheet::has_selector(code, selector),
            format!("selector '{selector}' not found"),
        ),
        Rule::Property(property) => check(
            stylesheet::has_property(code, property),
            format!("property '{property}' not found"),
        ),
        Rule::Value { property, value } => check(
            stylesheet::has_declaration(code, property, value),
            format!("declaration '{property}: {value}' not found"),
        ),
        Rule::Uses(construct) => check(
            source::uses_construct(code, construct),
            format!("expected use of {}", construct.describe()),
        ),
        Rule::Function(name) => check(
            source::declares_function(code, name),
            format!("function '{name}' is not defined"),
        ),
        Rule::Variable(name) => check(
            source::declares_variable(code, name),
            format!("variable '{name}' is not declared"),
        ),
        Rule::BestPractice(id) => {
            let result = match language {
                Language::Css => stylesheet::best_practice(code, id),
                Language::Html | Language::React => {
                    markup::best_practice(code, id).or_else(|| source::best_practice(code, id))
                }
                _ => source::best_practice(code, id),
            };
            registry(
                result,
                format!("best practice '{id}' is not followed"),
                &format!("best-practice:{id}"),
            )
        }
        Rule::Avoids(id) => {
            let result = match language {
                Language::Css => stylesheet::avoids(code, id),
                Language::Html | Language::React => {
                    markup::avoids(code, id).or_else(|| source::avoids(code, id))
                }
                _ => source::avoids(code, id),
            };
            // Unregistered ids degrade to a literal token-absence check.
            let ok = result.unwrap_or_else(|| !code.contains(id.as_str()));
            check(ok, format!("submission must avoid '{id}'"))
        }
        Rule::Unknown { category, .. } => Skipped {
            category: category.clone(),
        },
    }
}

/// Validates a submission against the rule string in the test case's `input`
/// field. Every rule is evaluated (no short-circuit) so the failure list is
/// complete; learners rely on fixing all violations in one pass.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleValidator;

#[async_trait::async_trait]
impl Engine for StaticRuleValidator {
    #[tracing::instrument(skip(self, code))]
    async fn execute(
        &self,
        language: &Language,
        code: &str,
        test: &TestCase,
        _limits: &ResourceLimits,
    ) -> Result<EngineOutcome, EngineFailure> {
        let started = Instant::now();
        let rules = parse_rules(&test.input);

        let mut violations = Vec::new();
        for rule in &rules {
            match evaluate_rule(language, code, rule) {
                RuleVerdict::Satisfied => {}
                RuleVerdict::Violated(message) => violations.push(message),
                RuleVerdict::Skipped { category } => {
                    tracing::debug!(%category, test = %test.id, "skipping unrecognized rule");
                }
            }
        }

        let elapsed = started.elapsed().as_millis() as u64;
        if violations.is_empty() {
            Ok(EngineOutcome {
                passed: true,
                output: None,
                error: None,
                execution_time_ms: elapsed,
                memory_used_mb: None,
            })
        } else {
            let message = violations.iter().join("; ");
            Ok(EngineOutcome {
                passed: false,
                output: Some(message.clone()),
                error: Some(message),
                execution_time_ms: elapsed,
                memory_used_mb: None,
            })
        }
    }
}
