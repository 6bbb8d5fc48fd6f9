use std::sync::LazyLock;

use regex::Regex;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([-+])?[^\d\s+\-.,]*((?:\d[\d,]*(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?)")
        .expect("amount pattern compiles")
});

/// Reads the numeric part of a spreadsheet cell. Formatted values such as
/// `N$1,200.50` keep their number, a sign written before the currency
/// symbol still applies, and cells without a number read as zero.
pub fn parse_amount(cell: &str) -> f64 {
    let Some(found) = AMOUNT_RE.captures(cell.trim()) else {
        return 0.0;
    };
    let sign = found.get(1).map_or("", |sign| sign.as_str());
    let digits = found.get(2).map_or("", |digits| digits.as_str());
    let plain = format!("{sign}{}", digits.replace(',', ""));
    match plain.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Two-decimal rounding with thousands separators and no trailing zeros:
/// `1234.5` prints as `1,234.5`, `75.0` as `75`.
pub fn format_grouped(value: f64) -> String {
    let (negative, int_part, frac_part) = split_rounded(value);
    let frac_part = frac_part.trim_end_matches('0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(&int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Fixed two decimals with thousands separators: `120` prints as `120.00`.
pub fn format_money(value: f64) -> String {
    let (negative, int_part, frac_part) = split_rounded(value);
    let sign = if negative { "-" } else { "" };
    format!("{sign}{}.{frac_part}", group_thousands(&int_part))
}

fn split_rounded(value: f64) -> (bool, String, String) {
    let value = if value.is_finite() { value } else { 0.0 };
    let rounded = round2(value);
    let negative = rounded < 0.0;
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    (negative, int_part.to_string(), frac_part.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_formatted_cells() {
        assert_eq!(parse_amount("100"), 100.0);
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("N$1,200.50"), 1200.5);
        assert_eq!(parse_amount("-30"), -30.0);
        assert_eq!(parse_amount(".5"), 0.5);
        assert_eq!(parse_amount("12 units"), 12.0);
    }

    #[test]
    fn sign_before_currency_symbol_applies() {
        assert_eq!(parse_amount("-N$1,200.50"), -1200.5);
        assert_eq!(parse_amount("-$30"), -30.0);
        assert_eq!(parse_amount("+$7"), 7.0);
        assert_eq!(parse_amount("USD-5"), -5.0);
        assert_eq!(parse_amount("Refund -40"), -40.0);
    }

    #[test]
    fn scientific_notation_keeps_exponent() {
        assert_eq!(parse_amount("1.5E+3"), 1500.0);
        assert_eq!(parse_amount("2e6"), 2_000_000.0);
        assert_eq!(parse_amount("-N$2.5e-1"), -0.25);
        assert_eq!(parse_amount("1e999"), 0.0);
    }

    #[test]
    fn invalid_cells_read_as_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("n/a"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
    }

    #[test]
    fn grouped_formatting() {
        assert_eq!(format_grouped(75.0), "75");
        assert_eq!(format_grouped(1234.5), "1,234.5");
        assert_eq!(format_grouped(1234567.891), "1,234,567.89");
        assert_eq!(format_grouped(-0.001), "0");
        assert_eq!(format_grouped(-2500.0), "-2,500");
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(120.0), "120.00");
        assert_eq!(format_money(-1234.5), "-1,234.50");
        assert_eq!(format_money(1000000.99), "1,000,000.99");
        assert_eq!(format_money(0.0), "0.00");
    }
}
