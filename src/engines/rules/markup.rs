//! Lexical checks for markup submissions (HTML and component markup).

use regex::Regex;

fn matches(source: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(source),
        Err(error) => {
            tracing::warn!(pattern, %error, "invalid markup pattern");
            false
        }
    }
}

fn count_matches(source: &str, pattern: &str) -> usize {
    match Regex::new(pattern) {
        Ok(re) => re.find_iter(source).count(),
        Err(error) => {
            tracing::warn!(pattern, %error, "invalid markup pattern");
            0
        }
    }
}

fn is_tag_name(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Opening-tag presence. A non-tag-like token degrades to a
/// case-insensitive substring check so rule authors can target attributes
/// or literal text as well.
pub fn contains_tag(source: &str, tag: &str) -> bool {
    if is_tag_name(tag) {
        matches(
            source,
            &format!(r"(?i)<\s*{}(\s|>|/)", regex::escape(tag)),
        )
    } else {
        source.to_ascii_lowercase().contains(&tag.to_ascii_lowercase())
    }
}

/// Number of opening tags (or literal occurrences for non-tag tokens).
pub fn tag_count(source: &str, tag: &str) -> usize {
    if is_tag_name(tag) {
        count_matches(
            source,
            &format!(r"(?i)<\s*{}(\s|>|/)", regex::escape(tag)),
        )
    } else {
        source
            .to_ascii_lowercase()
            .matches(&tag.to_ascii_lowercase())
            .count()
    }
}

/// Known best-practice checks. `None` means the id is not a markup check.
pub fn best_practice(source: &str, id: &str) -> Option<bool> {
    match id {
        "doctype" => Some(matches(source, r"(?i)<!doctype\s+html")),
        "alt-text" => {
            let images = count_matches(source, r"(?i)<\s*img\b");
            let with_alt = count_matches(source, r#"(?i)<\s*img[^>]*\balt\s*="#);
            Some(images == with_alt)
        }
        "lang-attribute" => Some(matches(source, r"(?i)<\s*html[^>]*\blang\s*=")),
        "semantic-tags" => Some(matches(
            source,
            r"(?i)<\s*(header|nav|main|section|article|aside|footer)\b",
        )),
        _ => None,
    }
}

/// Known avoidance checks. `None` means the id is not a markup check.
pub fn avoids(source: &str, id: &str) -> Option<bool> {
    match id {
        "inline-styles" => Some(!matches(source, r"(?i)<[^>]*\bstyle\s*=")),
        "deprecated-tags" => Some(!matches(
            source,
            r"(?i)<\s*(font|center|marquee|blink)\b",
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <body>
    <h1>Title</h1>
    <ul><li>one</li><li>two</li></ul>
    <img src="a.png" alt="a" />
  </body>
</html>"#;

    #[test]
    fn finds_present_tags_case_insensitively() {
        assert!(contains_tag(PAGE, "h1"));
        assert!(contains_tag(PAGE, "LI"));
        assert!(!contains_tag(PAGE, "table"));
    }

    #[test]
    fn counts_opening_tags() {
        assert_eq!(tag_count(PAGE, "li"), 2);
        assert_eq!(tag_count(PAGE, "h1"), 1);
        assert_eq!(tag_count(PAGE, "h2"), 0);
    }

    #[test]
    fn tag_names_do_not_match_prefixes() {
        assert!(!contains_tag("<html><head></head></html>", "h1"));
    }

    #[test]
    fn best_practices_report_expected_verdicts() {
        assert_eq!(best_practice(PAGE, "doctype"), Some(true));
        assert_eq!(best_practice(PAGE, "alt-text"), Some(true));
        assert_eq!(best_practice(PAGE, "lang-attribute"), Some(true));
        assert_eq!(best_practice("<img src='x.png'>", "alt-text"), Some(false));
        assert_eq!(best_practice(PAGE, "made-up"), None);
    }

    #[test]
    fn avoidance_checks_flag_inline_styles() {
        assert_eq!(avoids(PAGE, "inline-styles"), Some(true));
        assert_eq!(
            avoids("<div style=\"color: red\"></div>", "inline-styles"),
            Some(false)
        );
        assert_eq!(avoids("<center>old</center>", "deprecated-tags"), Some(false));
        assert_eq!(avoids(PAGE, "made-up"), None);
    }
}
