//! Structural checks for stylesheet submissions.

use regex::Regex;

fn strip_comments(source: &str) -> String {
    match Regex::new(r"(?s)/\*.*?\*/") {
        Ok(re) => re.replace_all(source, "").into_owned(),
        Err(_) => source.to_string(),
    }
}

fn matches(source: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(source),
        Err(error) => {
            tracing::warn!(pattern, %error, "invalid stylesheet pattern");
            false
        }
    }
}

fn selector_pattern(selector: &str) -> String {
    // Selector may appear alone, in a comma group, or after a combinator.
    format!(
        r"(?i)(^|[\s,}}>+~]){}\s*[,{{]",
        regex::escape(selector)
    )
}

/// Presence of a selector anywhere a rule block is opened.
pub fn has_selector(source: &str, selector: &str) -> bool {
    matches(&strip_comments(source), &selector_pattern(selector))
}

/// Number of rule blocks opened for a selector.
pub fn selector_count(source: &str, selector: &str) -> usize {
    let stripped = strip_comments(source);
    match Regex::new(&selector_pattern(selector)) {
        Ok(re) => re.find_iter(&stripped).count(),
        Err(error) => {
            tracing::warn!(selector, %error, "invalid stylesheet pattern");
            0
        }
    }
}

/// Presence of a property declaration inside any rule block.
pub fn has_property(source: &str, property: &str) -> bool {
    matches(
        &strip_comments(source),
        &format!(r"(?i)[{{;]\s*{}\s*:", regex::escape(property)),
    )
}

/// Presence of a `property: ...value...` declaration inside any rule block.
pub fn has_declaration(source: &str, property: &str, value: &str) -> bool {
    matches(
        &strip_comments(source),
        &format!(
            r"(?i)[{{;]\s*{}\s*:\s*[^;}}]*{}",
            regex::escape(property),
            regex::escape(value)
        ),
    )
}

/// Known best-practice checks. `None` means the id is not a stylesheet check.
pub fn best_practice(source: &str, id: &str) -> Option<bool> {
    match id {
        "no-important" => Some(!source.contains("!important")),
        _ => None,
    }
}

/// Known avoidance checks. `None` means the id is not a stylesheet check.
pub fn avoids(source: &str, id: &str) -> Option<bool> {
    match id {
        "important" => Some(!source.contains("!important")),
        "universal-selector" => Some(!matches(&strip_comments(source), r"(^|[\s,}])\*\s*\{")),
        _ => None,
    }
}
