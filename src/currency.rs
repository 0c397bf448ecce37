//! Formatting amounts of money for display.

use numfmt::{Formatter, Precision};

/// Format `amount` with thousands separators and two decimal places, e.g.
/// `format_currency(1234.5, "₹")` gives "₹1,234.50".
///
/// Negative amounts put the minus sign before the symbol: "-₹12.30".
pub fn format_currency(amount: f64, symbol: &str) -> String {
    if amount == 0.0 || !amount.is_finite() {
        // numfmt renders zero as a bare "0".
        return format!("{symbol}0.00");
    }

    let prefix = if amount < 0.0 {
        format!("-{symbol}")
    } else {
        symbol.to_owned()
    };

    let formatter = match Formatter::currency(&prefix) {
        Ok(formatter) => formatter.precision(Precision::Decimals(2)),
        Err(error) => {
            tracing::warn!("Could not use {prefix:?} as a currency prefix: {error:?}");
            return format!("{prefix}{:.2}", amount.abs());
        }
    };

    let mut formatted = formatter.fmt_string(amount.abs());

    // numfmt drops trailing zeros, e.g. "12.30" comes out as "12.3".
    match formatted.rfind('.') {
        Some(point) => {
            let decimals = formatted.len() - point - 1;
            formatted.push_str(&"0".repeat(2usize.saturating_sub(decimals)));
        }
        None => formatted.push_str(".00"),
    }

    formatted
}
