//! Currency display formatting.
//!
//! The formatter is an explicit dependency: construct one at process start
//! and pass it by reference to presentation collaborators. Amounts are
//! carried as `i64` minor units everywhere; rendering to major units happens
//! only here.

use crate::wallet::models::Amount;

/// Currency formatter with the payout currencies the platform supports.
#[derive(Debug, Clone, Default)]
pub struct CurrencyFormatter {}

impl CurrencyFormatter {
    pub fn new() -> Self {
        Self {}
    }

    /// Render a minor-unit amount as `₦1,250.00`. Unknown currency codes
    /// fall back to `CODE 1,250.00`.
    pub fn format(&self, amount: Amount, currency: &str) -> String {
        let sign = if amount < 0 { "-" } else { "" };
        let rendered = render_minor_units(amount);
        match symbol_for(currency) {
            Some(symbol) => format!("{sign}{symbol}{rendered}"),
            None => format!("{sign}{currency} {rendered}"),
        }
    }
}

fn symbol_for(currency: &str) -> Option<&'static str> {
    match currency {
        "NGN" => Some("₦"),
        "USD" => Some("$"),
        "GHS" => Some("GH₵"),
        "ZAR" => Some("R"),
        "KES" => Some("KSh"),
        _ => None,
    }
}

/// Unsigned two-decimal rendering with thousands separators in the major part.
fn render_minor_units(amount: Amount) -> String {
    let abs = amount.unsigned_abs();
    let major = abs / 100;
    let minor = abs % 100;

    let digits = major.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{grouped}.{minor:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_naira_with_thousands_separators() {
        let formatter = CurrencyFormatter::new();
        assert_eq!(formatter.format(125_000, "NGN"), "₦1,250.00");
        assert_eq!(formatter.format(1_234_567_89, "NGN"), "₦1,234,567.89");
    }

    #[test]
    fn formats_small_and_zero_amounts() {
        let formatter = CurrencyFormatter::new();
        assert_eq!(formatter.format(0, "USD"), "$0.00");
        assert_eq!(formatter.format(5, "USD"), "$0.05");
        assert_eq!(formatter.format(100, "USD"), "$1.00");
    }

    #[test]
    fn unknown_codes_fall_back_to_prefix() {
        let formatter = CurrencyFormatter::new();
        assert_eq!(formatter.format(250_00, "XOF"), "XOF 250.00");
    }

    #[test]
    fn negative_amounts_keep_the_sign_outside_the_symbol() {
        let formatter = CurrencyFormatter::new();
        assert_eq!(formatter.format(-125_000, "NGN"), "-₦1,250.00");
    }
}
