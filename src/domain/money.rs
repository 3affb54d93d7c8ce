use std::fmt;

/// Amounts are integers in the currency's minor unit.
/// Yen have no sub-unit, so ¥1,500 = 1500.
pub type Amount = i64;

/// Format an amount with thousands separators.
/// Example: 1234567 -> "1,234,567", -1500 -> "-1,500"
pub fn format_amount(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Parse amount text into an integer.
/// Accepts thousands separators and a trailing yen sign: "1,500円" -> 1500.
/// Decimal text is accepted only when the fraction is zero: "1500.0" -> 1500.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let cleaned: String = input
        .trim()
        .trim_end_matches('円')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    if let Ok(value) = cleaned.parse::<i64>() {
        return Ok(value);
    }

    match cleaned.split_once('.') {
        Some((units, fraction))
            if !fraction.is_empty() && fraction.chars().all(|c| c == '0') =>
        {
            units
                .parse::<i64>()
                .map_err(|_| ParseAmountError::InvalidFormat)
        }
        Some(_) => Err(ParseAmountError::Fractional),
        None => Err(ParseAmountError::InvalidFormat),
    }
}

/// Coerce a floating point cell value, truncating toward zero.
pub fn amount_from_float(value: f64) -> Result<Amount, ParseAmountError> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return Err(ParseAmountError::InvalidFormat);
    }
    Ok(value.trunc() as i64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
    Fractional,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "empty amount"),
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
            ParseAmountError::Fractional => write!(f, "amount has a fractional part"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1,000");
        assert_eq!(format_amount(1234567), "1,234,567");
        assert_eq!(format_amount(-1500), "-1,500");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("150000"), Ok(150000));
        assert_eq!(parse_amount(" 1,500 "), Ok(1500));
        assert_eq!(parse_amount("1,500円"), Ok(1500));
        assert_eq!(parse_amount("-300"), Ok(-300));
        assert_eq!(parse_amount("1500.0"), Ok(1500));
        assert_eq!(parse_amount("1500.00"), Ok(1500));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount(""), Err(ParseAmountError::Empty));
        assert_eq!(parse_amount("円"), Err(ParseAmountError::Empty));
        assert_eq!(parse_amount("abc"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("12.5"), Err(ParseAmountError::Fractional));
        assert_eq!(parse_amount("1.2.3"), Err(ParseAmountError::Fractional));
    }

    #[test]
    fn test_amount_from_float() {
        assert_eq!(amount_from_float(2023.0), Ok(2023));
        assert_eq!(amount_from_float(12.9), Ok(12));
        assert_eq!(amount_from_float(-12.9), Ok(-12));
        assert!(amount_from_float(f64::NAN).is_err());
        assert!(amount_from_float(f64::INFINITY).is_err());
    }
}
