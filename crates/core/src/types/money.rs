//! Monetary amounts.
//!
//! The commerce API sends totals as decimal strings (`"49.95"`). They are
//! parsed with [`rust_decimal`] so revenue sums never pick up float error.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse a backend amount string.
///
/// Returns `None` for empty or non-numeric input instead of failing, so
/// aggregations can skip malformed totals.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// Format an amount as euros using Dutch conventions (`€ 1.234,56`).
#[must_use]
pub fn format_eur(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();

    let text = format!("{abs:.2}");
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("€ -{grouped},{cents}")
    } else {
        format!("€ {grouped},{cents}")
    }
}
