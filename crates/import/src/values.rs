//! Cell normalisation: dates, numbers, money, e-mails and enum values.

use bow_core::models::normalize_email;
use bow_core::validation::is_valid_email;
use chrono::NaiveDate;
use serde_json::Value;

use crate::target::{FieldKind, FieldSpec};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Spreadsheet exports often carry a midnight time component.
    let date_part = raw
        .split_once(['T', ' '])
        .map(|(date, _)| date)
        .unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    // "3.0" from spreadsheets
    let f = raw.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

/// `"1,234.50"` → `123450`. Currency symbols and thousands separators are
/// ignored; at most two decimal places.
pub fn parse_money_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '$' | '£' | '€' | '\u{a0}'))
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
        || fraction.len() > 2
    {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    let total = whole.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -total } else { total })
}

/// Normalise one non-empty cell for `spec`, or describe why it is invalid.
pub fn normalize_cell(spec: &FieldSpec, raw: &str) -> Result<Value, String> {
    let raw = raw.trim();
    match spec.kind {
        FieldKind::Text => Ok(Value::String(raw.to_string())),
        FieldKind::LongText => Ok(Value::String(raw.replace("\r\n", "\n"))),
        FieldKind::Date => parse_date(raw)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| {
                format!(
                    "The {} '{}' is not a valid date (use YYYY-MM-DD or DD/MM/YYYY).",
                    spec.label, raw
                )
            }),
        FieldKind::Integer { min, max } => match parse_integer(raw) {
            Some(n) if (min..=max).contains(&n) => Ok(Value::from(n)),
            Some(_) => Err(format!("The {} must be between {} and {}.", spec.label, min, max)),
            None => Err(format!("The {} '{}' is not a whole number.", spec.label, raw)),
        },
        FieldKind::Money => match parse_money_cents(raw) {
            Some(cents) if cents >= 0 => Ok(Value::from(cents)),
            Some(_) => Err(format!("The {} must be at least 0.", spec.label)),
            None => Err(format!("The {} '{}' is not a valid amount.", spec.label, raw)),
        },
        FieldKind::Email => {
            if is_valid_email(raw) {
                Ok(Value::String(normalize_email(raw)))
            } else {
                Err(format!("The {} '{}' is not a valid email address.", spec.label, raw))
            }
        }
        FieldKind::Choice(parse) => parse(raw)
            .map(Value::String)
            .ok_or_else(|| format!("The {} '{}' is not a recognised value.", spec.label, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImportTarget;

    #[test]
    fn dates_in_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 7);
        assert_eq!(parse_date("2026-03-07"), expected);
        assert_eq!(parse_date("07/03/2026"), expected);
        assert_eq!(parse_date("07-03-2026"), expected);
        assert_eq!(parse_date("2026-03-07T00:00:00"), expected);
        assert_eq!(parse_date("2026-03-07 00:00:00"), expected);
        assert_eq!(parse_date("31/02/2026"), None);
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn money_to_cents() {
        assert_eq!(parse_money_cents("1,234.50"), Some(123_450));
        assert_eq!(parse_money_cents("£ 12"), Some(1_200));
        assert_eq!(parse_money_cents("0.5"), Some(50));
        assert_eq!(parse_money_cents(".99"), Some(99));
        assert_eq!(parse_money_cents("-3"), Some(-300));
        assert_eq!(parse_money_cents("1.234"), None);
        assert_eq!(parse_money_cents("12a"), None);
        assert_eq!(parse_money_cents("."), None);
    }

    #[test]
    fn integers_accept_spreadsheet_floats() {
        assert_eq!(parse_integer("4"), Some(4));
        assert_eq!(parse_integer("4.0"), Some(4));
        assert_eq!(parse_integer("4.5"), None);
    }

    #[test]
    fn cell_errors_name_the_column() {
        let likelihood = ImportTarget::Risks.field("likelihood").unwrap();
        assert_eq!(normalize_cell(likelihood, "3"), Ok(Value::from(3)));
        assert_eq!(
            normalize_cell(likelihood, "9"),
            Err("The Likelihood must be between 1 and 5.".to_string())
        );

        let email = ImportTarget::Suppliers.field("contact_email").unwrap();
        assert_eq!(
            normalize_cell(email, " Ops@Example.COM "),
            Ok(Value::String("ops@example.com".into()))
        );
        assert!(normalize_cell(email, "not-an-email").is_err());

        let value = ImportTarget::Suppliers.field("annual_value_cents").unwrap();
        assert_eq!(normalize_cell(value, "-5").unwrap_err(), "The Annual value must be at least 0.");
    }
}
