//! Locale-style number formatting for label text

use serde::{Deserialize, Serialize};

/// Decimal formatting applied to printed label figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub decimal_separator: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::comma()
    }
}

impl NumberFormat {
    /// Comma separated decimals, as printed on Czech labels
    pub fn comma() -> Self {
        Self {
            decimal_separator: ',',
        }
    }

    pub fn point() -> Self {
        Self {
            decimal_separator: '.',
        }
    }

    /// Round to at most `max_fraction_digits` and drop trailing zeros
    pub fn format(&self, value: f64, max_fraction_digits: usize) -> String {
        let rounded = format!("{:.*}", max_fraction_digits, value);
        let trimmed = if rounded.contains('.') {
            rounded.trim_end_matches('0').trim_end_matches('.')
        } else {
            rounded.as_str()
        };
        // "-0" after rounding a tiny negative
        let trimmed = if trimmed == "-0" { "0" } else { trimmed };
        trimmed.replace('.', &self.decimal_separator.to_string())
    }

    /// Whole part only, truncated toward zero
    pub fn format_whole(&self, value: f64) -> String {
        format!("{}", value.trunc() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_trailing_zeros() {
        let fmt = NumberFormat::comma();
        assert_eq!(fmt.format(7.0, 1), "7");
        assert_eq!(fmt.format(7.25, 3), "7,25");
        assert_eq!(fmt.format(0.0049, 3), "0,005");
        assert_eq!(fmt.format(0.04, 1), "0");
        assert_eq!(fmt.format(-0.01, 1), "0");
        assert_eq!(fmt.format(12.345, 0), "12");
    }

    #[test]
    fn test_separator() {
        assert_eq!(NumberFormat::point().format(1.56, 1), "1.6");
        assert_eq!(NumberFormat::default().format(1.56, 1), "1,6");
    }

    #[test]
    fn test_whole_truncates() {
        let fmt = NumberFormat::comma();
        assert_eq!(fmt.format_whole(1628.99), "1628");
        assert_eq!(fmt.format_whole(0.5), "0");
    }
}
