//! Parse-or-default handling for form inputs.
//!
//! Every text field that feeds the cost breakdown goes through this module.
//! Anything that is not a finite, non-negative number degrades to the
//! caller's default, so a half-typed value never poisons the breakdown.

/// Indirect cost percentage used when the field is empty or invalid.
pub const DEFAULT_INDIRECT_PERCENT: f64 = 15.0;

/// Profit margin percentage used when the field is empty or invalid.
pub const DEFAULT_MARGIN_PERCENT: f64 = 30.0;

/// Parses a form value, returning `default` for anything unusable.
///
/// Accepts a comma as decimal separator (`"1,50"`).
pub fn parse_or(input: &str, default: f64) -> f64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return default;
    }
    let normalized = trimmed.replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => default,
    }
}

/// Parses a form value, returning 0 for anything unusable.
pub fn parse_or_zero(input: &str) -> f64 {
    parse_or(input, 0.0)
}

/// Clamps a number into the non-negative finite range. NaN becomes 0.
pub const fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Formats a number for storage in a text field without trailing zeros.
pub fn to_input(value: f64) -> String {
    format!("{}", non_negative(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_reads_plain_numbers() {
        assert!((parse_or(" 12.5 ", 0.0) - 12.5).abs() < f64::EPSILON);
        assert!((parse_or("0", 15.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_or_accepts_decimal_comma() {
        assert!((parse_or_zero("1,50") - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_or_falls_back_for_garbage() {
        assert!((parse_or("", DEFAULT_INDIRECT_PERCENT) - 15.0).abs() < f64::EPSILON);
        assert!((parse_or("abc", DEFAULT_MARGIN_PERCENT) - 30.0).abs() < f64::EPSILON);
        assert!((parse_or("-4", 7.0) - 7.0).abs() < f64::EPSILON);
        assert!((parse_or("NaN", 7.0) - 7.0).abs() < f64::EPSILON);
        assert!((parse_or("inf", 7.0) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_negative_clamps() {
        assert!(non_negative(f64::NAN).abs() < f64::EPSILON);
        assert!(non_negative(-3.0).abs() < f64::EPSILON);
        assert!((non_negative(3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn to_input_drops_trailing_zeros() {
        assert_eq!(to_input(15.0), "15");
        assert_eq!(to_input(12.5), "12.5");
        assert_eq!(to_input(f64::NAN), "0");
    }
}
