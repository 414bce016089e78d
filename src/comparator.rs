/// Absolute tolerance used when both sides of a comparison look numeric.
/// Absorbs floating-point drift between interpreter output and the expected
/// value a test author typed in.
pub const NUMERIC_TOLERANCE: f64 = 1e-3;

/// Compares an engine's actual output against the expected output of a test
/// case. Both sides are trimmed. If both parse as numbers the comparison is
/// numeric with an absolute tolerance; otherwise it falls back to exact
/// string equality. Test suites may supply literal numeric strings as the
/// expected output, so the opportunistic parse must stay.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    let actual = actual.trim();
    let expected = expected.trim();

    if let (Ok(a), Ok(e)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
        return (a - e).abs() <= NUMERIC_TOLERANCE;
    }

    actual == expected
}
