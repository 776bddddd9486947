use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueObjectError {
  #[error("Invalid amount: {0}")]
  InvalidAmount(String),
  #[error("Invalid tax rate: {0}")]
  InvalidTaxRate(String),
  #[error("Invalid exchange rate: {0}")]
  InvalidExchangeRate(String),
  #[error("Invalid currency code: {0}")]
  InvalidCurrency(String),
  #[error("Invalid line item description: {0}")]
  InvalidDescription(String),
  #[error("Invalid document number: {0}")]
  InvalidDocumentNumber(String),
  #[error("Invalid document kind: {0}")]
  InvalidDocumentKind(String),
  #[error("Invalid document status: {0}")]
  InvalidStatus(String),
}

/// Rounds `numerator / denominator` to the nearest integer, ties away from zero.
///
/// All monetary rate math funnels through this so a negative line net and a
/// positive one round symmetrically.
pub(crate) const fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
  if numerator >= 0 {
    (numerator + denominator / 2) / denominator
  } else {
    (numerator - denominator / 2) / denominator
  }
}

// Amount - integer count of minor currency units (scale 100)
//
// Every stored or computed monetary value in the system is an Amount. Decimal
// strings exist only at the parse/format boundary; arithmetic is plain
// integer arithmetic throughout.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(i64);

impl Amount {
  pub const ZERO: Amount = Amount(0);

  pub const fn from_minor_units(minor_units: i64) -> Self {
    Amount(minor_units)
  }

  pub const fn minor_units(&self) -> i64 {
    self.0
  }

  pub const fn is_negative(&self) -> bool {
    self.0 < 0
  }

  pub const fn is_zero(&self) -> bool {
    self.0 == 0
  }

  /// Parses a decimal string into minor units, rounding half away from zero
  /// at the minor-unit boundary (`"0.005"` becomes 1, `"-0.005"` becomes -1).
  pub fn parse(input: &str) -> Result<Self, ValueObjectError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidAmount(
        "Amount cannot be empty".to_string(),
      ));
    }
    let value = Decimal::from_str(trimmed)
      .map_err(|_| ValueObjectError::InvalidAmount(format!("Not a decimal number: {}", trimmed)))?;
    let scaled = value.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(|| {
      ValueObjectError::InvalidAmount(format!("Amount out of range: {}", trimmed))
    })?;
    let minor_units = scaled
      .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
      .to_i64()
      .ok_or_else(|| {
        ValueObjectError::InvalidAmount(format!("Amount out of range: {}", trimmed))
      })?;
    Ok(Amount(minor_units))
  }

  /// Renders the canonical decimal string, always two fractional digits.
  pub fn to_decimal_string(&self) -> String {
    let sign = if self.0 < 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
  }

  pub fn multiply(&self, quantity: Quantity) -> Amount {
    Amount(self.0 * quantity.value() as i64)
  }

  /// Applies a basis-of-100 percentage: `round(amount × rate / 10000)`,
  /// ties away from zero. Widened through i128 so large totals cannot
  /// overflow mid-computation.
  pub fn apply_rate(&self, rate: TaxRate) -> Amount {
    let numerator = self.0 as i128 * rate.value() as i128;
    Amount(div_round_half_away(numerator, 10_000) as i64)
  }
}

impl std::ops::Add for Amount {
  type Output = Amount;

  fn add(self, other: Amount) -> Amount {
    Amount(self.0 + other.0)
  }
}

impl std::ops::Sub for Amount {
  type Output = Amount;

  fn sub(self, other: Amount) -> Amount {
    Amount(self.0 - other.0)
  }
}

impl std::ops::Neg for Amount {
  type Output = Amount;

  fn neg(self) -> Amount {
    Amount(-self.0)
  }
}

impl std::iter::Sum for Amount {
  fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
    iter.fold(Amount::ZERO, |acc, a| acc + a)
  }
}

impl fmt::Display for Amount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_decimal_string())
  }
}

// TaxRate - basis-of-100 percentage (1800 = 18.00%)
//
// The u16 range covers 0.00% through 655.35%. Used for per-line tax rates and
// for the document-level TDS/TCS rates; absence (None at the call site) is
// distinct from a zero rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxRate(u16);

impl TaxRate {
  pub const ZERO: TaxRate = TaxRate(0);

  pub const fn new(basis_of_100: u16) -> Self {
    TaxRate(basis_of_100)
  }

  pub const fn value(&self) -> u16 {
    self.0
  }

  /// Parses a percentage string such as `"18"` or `"18.50"` (max two
  /// fractional digits, 0 to 655.35).
  pub fn from_percent_str(input: &str) -> Result<Self, ValueObjectError> {
    let trimmed = input.trim();
    let percent = Decimal::from_str(trimmed).map_err(|_| {
      ValueObjectError::InvalidTaxRate(format!("Not a decimal number: {}", trimmed))
    })?;
    if percent.is_sign_negative() {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate cannot be negative".to_string(),
      ));
    }
    if percent.normalize().scale() > 2 {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate cannot have more than 2 decimal places".to_string(),
      ));
    }
    let scaled = (percent * Decimal::ONE_HUNDRED)
      .to_i64()
      .filter(|v| (0..=u16::MAX as i64).contains(v))
      .ok_or_else(|| {
        ValueObjectError::InvalidTaxRate(format!("Tax rate out of range: {}", trimmed))
      })?;
    Ok(TaxRate(scaled as u16))
  }

  pub fn as_percent_string(&self) -> String {
    format!("{}.{:02}", self.0 / 100, self.0 % 100)
  }
}

impl fmt::Display for TaxRate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}%", self.as_percent_string())
  }
}

// ExchangeRate - fixed point at scale 1,000,000 (six decimal places)
//
// Exchange rates need more precision than money amounts, hence the wider
// scale. Parity (1.000000) is the default when no rate is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExchangeRate(u64);

impl ExchangeRate {
  pub const SCALE: u64 = 1_000_000;
  pub const PARITY: ExchangeRate = ExchangeRate(Self::SCALE);

  pub fn new(scaled: u64) -> Result<Self, ValueObjectError> {
    if scaled == 0 {
      return Err(ValueObjectError::InvalidExchangeRate(
        "Exchange rate cannot be zero".to_string(),
      ));
    }
    Ok(ExchangeRate(scaled))
  }

  pub const fn value(&self) -> u64 {
    self.0
  }

  pub fn parse(input: &str) -> Result<Self, ValueObjectError> {
    let trimmed = input.trim();
    let value = Decimal::from_str(trimmed).map_err(|_| {
      ValueObjectError::InvalidExchangeRate(format!("Not a decimal number: {}", trimmed))
    })?;
    if value.is_sign_negative() {
      return Err(ValueObjectError::InvalidExchangeRate(
        "Exchange rate cannot be negative".to_string(),
      ));
    }
    let scaled = (value * Decimal::from(Self::SCALE))
      .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
      .to_u64()
      .ok_or_else(|| {
        ValueObjectError::InvalidExchangeRate(format!("Exchange rate out of range: {}", trimmed))
      })?;
    Self::new(scaled)
  }

  pub fn to_decimal_string(&self) -> String {
    format!("{}.{:06}", self.0 / Self::SCALE, self.0 % Self::SCALE)
  }

  /// Converts an amount into the target currency, rounding half away from
  /// zero at the minor-unit boundary.
  pub fn apply(&self, amount: Amount) -> Amount {
    let numerator = amount.minor_units() as i128 * self.0 as i128;
    Amount::from_minor_units(div_round_half_away(numerator, Self::SCALE as i128) as i64)
  }
}

impl Default for ExchangeRate {
  fn default() -> Self {
    Self::PARITY
  }
}

// CurrencyCode - three-letter ISO-style code
//
// Shape validation only; whether the code exists in the currency reference
// table is the surrounding application's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
  pub fn new(value: &str) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(ValueObjectError::InvalidCurrency(format!(
        "Expected a three-letter code, got: {}",
        trimmed
      )));
    }
    Ok(CurrencyCode(trimmed.to_ascii_uppercase()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl FromStr for CurrencyCode {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::new(s)
  }
}

impl fmt::Display for CurrencyCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Quantity - whole billable units, zero allowed
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Quantity(u32);

impl Quantity {
  pub const fn new(value: u32) -> Self {
    Quantity(value)
  }

  pub const fn value(&self) -> u32 {
    self.0
  }
}

// Line item description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDescription(String);

impl LineItemDescription {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 500 {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot exceed 500 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

// DocumentNumber - PREFIX-YYYY-MM-NNNN
//
// The sequence is scoped to prefix + year + month; allocation lives in the
// billing service, uniqueness enforcement in the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNumber {
  prefix: String,
  year: i32,
  month: u32,
  sequence: u32,
}

impl DocumentNumber {
  pub const INVOICE_PREFIX: &'static str = "INV";
  pub const ESTIMATE_PREFIX: &'static str = "EST";
  pub const MAX_SEQUENCE: u32 = 9999;

  pub fn new(prefix: &str, year: i32, month: u32, sequence: u32) -> Result<Self, ValueObjectError> {
    if prefix.is_empty()
      || prefix.len() > 10
      || !prefix.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
    {
      return Err(ValueObjectError::InvalidDocumentNumber(format!(
        "Prefix must be 1-10 uppercase alphanumeric characters, got: {}",
        prefix
      )));
    }
    if !(1..=12).contains(&month) {
      return Err(ValueObjectError::InvalidDocumentNumber(format!(
        "Month out of range: {}",
        month
      )));
    }
    if !(1..=9999).contains(&year) {
      return Err(ValueObjectError::InvalidDocumentNumber(format!(
        "Year out of range: {}",
        year
      )));
    }
    if sequence == 0 || sequence > Self::MAX_SEQUENCE {
      return Err(ValueObjectError::InvalidDocumentNumber(format!(
        "Sequence out of range 1-{}: {}",
        Self::MAX_SEQUENCE,
        sequence
      )));
    }
    Ok(Self {
      prefix: prefix.to_string(),
      year,
      month,
      sequence,
    })
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  pub const fn year(&self) -> i32 {
    self.year
  }

  pub const fn month(&self) -> u32 {
    self.month
  }

  pub const fn sequence(&self) -> u32 {
    self.sequence
  }
}

impl fmt::Display for DocumentNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}-{:04}-{:02}-{:04}",
      self.prefix, self.year, self.month, self.sequence
    )
  }
}

impl FromStr for DocumentNumber {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let malformed =
      || ValueObjectError::InvalidDocumentNumber(format!("Expected PREFIX-YYYY-MM-NNNN: {}", s));
    let mut parts = s.rsplitn(4, '-');
    let sequence = parts.next().ok_or_else(malformed)?;
    let month = parts.next().ok_or_else(malformed)?;
    let year = parts.next().ok_or_else(malformed)?;
    let prefix = parts.next().ok_or_else(malformed)?;
    Self::new(
      prefix,
      year.parse().map_err(|_| malformed())?,
      month.parse().map_err(|_| malformed())?,
      sequence.parse().map_err(|_| malformed())?,
    )
  }
}

// Document kind - invoice vs estimate discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
  Invoice,
  Estimate,
}

impl DocumentKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      DocumentKind::Invoice => "invoice",
      DocumentKind::Estimate => "estimate",
    }
  }

  pub fn default_prefix(&self) -> &'static str {
    match self {
      DocumentKind::Invoice => DocumentNumber::INVOICE_PREFIX,
      DocumentKind::Estimate => DocumentNumber::ESTIMATE_PREFIX,
    }
  }
}

impl FromStr for DocumentKind {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "invoice" => Ok(DocumentKind::Invoice),
      "estimate" => Ok(DocumentKind::Estimate),
      _ => Err(ValueObjectError::InvalidDocumentKind(format!(
        "Unknown kind: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for DocumentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// Document status
//
// Invoices move draft -> sent -> paid | void; estimates move
// draft -> sent -> accepted. Paid, Void, and Accepted are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
  Draft,
  Sent,
  Paid,
  Void,
  Accepted,
}

impl DocumentStatus {
  pub fn is_valid_for(&self, kind: DocumentKind) -> bool {
    match self {
      DocumentStatus::Draft | DocumentStatus::Sent => true,
      DocumentStatus::Paid | DocumentStatus::Void => kind == DocumentKind::Invoice,
      DocumentStatus::Accepted => kind == DocumentKind::Estimate,
    }
  }

  pub fn can_transition_to(&self, kind: DocumentKind, new_status: DocumentStatus) -> bool {
    if !new_status.is_valid_for(kind) {
      return false;
    }
    match (self, new_status) {
      (DocumentStatus::Draft, DocumentStatus::Sent) => true,
      (DocumentStatus::Draft, DocumentStatus::Void) => true,
      (DocumentStatus::Sent, DocumentStatus::Paid) => true,
      (DocumentStatus::Sent, DocumentStatus::Void) => true,
      (DocumentStatus::Sent, DocumentStatus::Accepted) => true,
      _ => false,
    }
  }

  pub fn is_editable(&self) -> bool {
    matches!(self, DocumentStatus::Draft)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      DocumentStatus::Draft => "draft",
      DocumentStatus::Sent => "sent",
      DocumentStatus::Paid => "paid",
      DocumentStatus::Void => "void",
      DocumentStatus::Accepted => "accepted",
    }
  }
}

impl FromStr for DocumentStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "draft" => Ok(DocumentStatus::Draft),
      "sent" => Ok(DocumentStatus::Sent),
      "paid" => Ok(DocumentStatus::Paid),
      "void" => Ok(DocumentStatus::Void),
      "accepted" => Ok(DocumentStatus::Accepted),
      _ => Err(ValueObjectError::InvalidStatus(format!(
        "Unknown status: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for DocumentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
