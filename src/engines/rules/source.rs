//! Source-convention heuristics shared across languages. Shape-matching
//! covers both brace-style (JavaScript/React) and indentation-style (Python)
//! syntax so a single rule set can grade either.

use regex::Regex;

use super::Construct;

fn matches(source: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(source),
        Err(error) => {
            tracing::warn!(pattern, %error, "invalid source pattern");
            false
        }
    }
}

/// Names bound to a function definition, across definition styles.
fn function_names(source: &str) -> Vec<String> {
    let definition_patterns = [
        r"function\s+([A-Za-z_]\w*)",
        r"def\s+([A-Za-z_]\w*)",
        r"fn\s+([A-Za-z_]\w*)",
        r"(?:const|let|var)\s+([A-Za-z_]\w*)\s*=\s*(?:\([^)]*\)|[A-Za-z_]\w*)\s*=>",
        r"(?:const|let|var)\s+([A-Za-z_]\w*)\s*=\s*function",
        r"([A-Za-z_]\w*)\s*=\s*lambda",
    ];

    let mut names = Vec::new();
    for pattern in definition_patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for captures in re.captures_iter(source) {
            if let Some(name) = captures.get(1) {
                let name = name.as_str().to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }
    names
}

fn has_recursion(source: &str) -> bool {
    function_names(source).iter().any(|name| {
        let Ok(re) = Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))) else {
            return false;
        };
        // Definition plus at least one call site.
        re.find_iter(source).count() >= 2
    })
}

pub fn uses_construct(source: &str, construct: &Construct) -> bool {
    match construct {
        Construct::Loop => matches(source, r"\b(for|while|loop)\b|\bdo\s*\{"),
        Construct::Conditional => matches(source, r"\b(if|elif|switch|match)\b"),
        Construct::Recursion => has_recursion(source),
        Construct::Class => matches(source, r"\bclass\s+[A-Za-z_]"),
    }
}

/// A function with the given name is defined, in any supported style.
pub fn declares_function(source: &str, name: &str) -> bool {
    let name = regex::escape(name);
    let patterns = [
        format!(r"function\s+{name}\b"),
        format!(r"def\s+{name}\b"),
        format!(r"fn\s+{name}\b"),
        format!(r"(?:const|let|var)\s+{name}\s*=\s*(?:function\b|\(|[A-Za-z_]\w*\s*=>)"),
        format!(r"{name}\s*=\s*lambda\b"),
    ];
    patterns.iter().any(|p| matches(source, p))
}

/// A variable with the given name is declared or assigned.
pub fn declares_variable(source: &str, name: &str) -> bool {
    let name = regex::escape(name);
    matches(source, &format!(r"(?:const|let|var)\s+{name}\b"))
        || matches(source, &format!(r"(?m)^\s*{name}\s*=[^=]"))
}

/// Known best-practice checks. `None` means the id is not a source check.
pub fn best_practice(source: &str, id: &str) -> Option<bool> {
    match id {
        // No loose equality anywhere. Strict `===`/`!==` are fine.
        "strict-equality" => Some(!matches(source, r"[^=!<>]==([^=]|$)")),
        "const-over-var" => Some(!matches(source, r"\bvar\b")),
        _ => None,
    }
}

/// Known avoidance checks. `None` lets the caller fall back to a literal
/// token-absence check.
pub fn avoids(source: &str, id: &str) -> Option<bool> {
    match id {
        "eval" => Some(!matches(source, r"\beval\s*\(")),
        "var" => Some(!matches(source, r"\bvar\b")),
        "document-write" => Some(!matches(source, r"document\s*\.\s*write")),
        "inner-html" => Some(!matches(source, r"\.innerHTML\b")),
        _ => None,
    }
}
