use super::value_objects::{Amount, CurrencyCode};

/// Capability for turning an `Amount` into a display string for a given
/// currency. The engine only guarantees the underlying integer; everything
/// about presentation lives behind this trait.
pub trait CurrencyFormatter: Send + Sync {
  /// Symbol for the code, when this formatter knows one.
  fn symbol(&self, currency: &CurrencyCode) -> Option<&'static str>;

  fn format(&self, amount: Amount, currency: &CurrencyCode) -> String;
}

/// Symbol table plus thousands grouping, two fractional digits. Codes
/// without a known symbol fall back to a `CODE ` prefix — an explicit
/// default, not a rescue path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCurrencyFormatter;

impl CurrencyFormatter for DefaultCurrencyFormatter {
  fn symbol(&self, currency: &CurrencyCode) -> Option<&'static str> {
    match currency.as_str() {
      "USD" => Some("$"),
      "EUR" => Some("€"),
      "GBP" => Some("£"),
      "INR" => Some("₹"),
      "JPY" => Some("¥"),
      "DKK" | "SEK" | "NOK" => Some("kr"),
      _ => None,
    }
  }

  fn format(&self, amount: Amount, currency: &CurrencyCode) -> String {
    let minor_units = amount.minor_units();
    let sign = if minor_units < 0 { "-" } else { "" };
    let whole = group_thousands((minor_units / 100).abs());
    let fraction = (minor_units % 100).abs();
    match self.symbol(currency) {
      Some(symbol) => format!("{}{}{}.{:02}", sign, symbol, whole, fraction),
      None => format!("{}{} {}.{:02}", sign, currency.as_str(), whole, fraction),
    }
  }
}

fn group_thousands(value: i64) -> String {
  let digits = value.to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }
  grouped
}
