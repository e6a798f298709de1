use crate::host::ValueFormatter;

/// Rounds to a fixed number of significant digits and drops trailing zeros.
#[derive(Debug, Clone, Copy)]
pub struct SignificantFormatter {
    digits: u32,
}

impl SignificantFormatter {
    pub fn new(digits: u32) -> Self {
        Self {
            digits: digits.max(1),
        }
    }
}

impl ValueFormatter for SignificantFormatter {
    fn format(&self, value: f64) -> String {
        format_significant(value, self.digits)
    }
}

pub fn format_significant(value: f64, digits: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = digits as i32 - 1 - magnitude;
    if decimals > 0 {
        let s = format!("{:.*}", decimals as usize, value);
        let s = s.trim_end_matches('0').trim_end_matches('.');
        return s.to_string();
    }
    let scale = 10f64.powi(-decimals);
    format!("{:.0}", (value / scale).round() * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_significant_digits() {
        let f = SignificantFormatter::new(3);
        assert_eq!(f.format(0.0), "0");
        assert_eq!(f.format(10.0), "10");
        assert_eq!(f.format(12345.0), "12300");
        assert_eq!(f.format(1.23456), "1.23");
        assert_eq!(f.format(0.012345), "0.0123");
        assert_eq!(f.format(-456.78), "-457");
        assert_eq!(f.format(2.5), "2.5");
    }
}
