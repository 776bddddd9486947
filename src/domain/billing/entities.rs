use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::BillingError;
use super::value_objects::{
  Amount, CurrencyCode, DocumentKind, DocumentNumber, DocumentStatus, ExchangeRate,
  LineItemDescription, Quantity, TaxRate,
};

// Line item - one billable row on an invoice or estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
  pub id: Uuid,
  pub document_id: Uuid,
  pub description: LineItemDescription,
  pub quantity: Quantity,
  pub unit_price: Amount,
  pub tax_rate: Option<TaxRate>,
  pub discount: Amount,
  pub line_order: i32,
}

impl LineItem {
  pub fn new(
    document_id: Uuid,
    description: LineItemDescription,
    quantity: Quantity,
    unit_price: Amount,
    tax_rate: Option<TaxRate>,
    discount: Amount,
    line_order: i32,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      document_id,
      description,
      quantity,
      unit_price,
      tax_rate,
      discount,
      line_order,
    }
  }

  pub fn gross_amount(&self) -> Amount {
    self.unit_price.multiply(self.quantity)
  }

  /// Gross minus discount. A discount larger than the gross produces a
  /// negative net; the calculator sums it as-is.
  pub fn net_amount(&self) -> Amount {
    self.gross_amount() - self.discount
  }

  pub fn tax_amount(&self) -> Amount {
    self
      .net_amount()
      .apply_rate(self.tax_rate.unwrap_or(TaxRate::ZERO))
  }

  /// The (net, tax) pair consumed by the totals calculator.
  pub fn valuation(&self) -> (Amount, Amount) {
    (self.net_amount(), self.tax_amount())
  }

  /// Deep copy with fresh identity, owned by another document. Used when
  /// materializing an invoice from an estimate.
  pub fn duplicate_for(&self, document_id: Uuid) -> LineItem {
    LineItem {
      id: Uuid::new_v4(),
      document_id,
      description: self.description.clone(),
      quantity: self.quantity,
      unit_price: self.unit_price,
      tax_rate: self.tax_rate,
      discount: self.discount,
      line_order: self.line_order,
    }
  }
}

// Invoice - the document header; estimates share the struct via `kind`
//
// subtotal/tax/total are derived fields, only ever written from an
// InvoiceTotals produced by the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: Uuid,
  pub organization_id: Uuid,
  pub customer_id: Uuid,
  pub location_id: Option<Uuid>,
  pub kind: DocumentKind,
  pub number: DocumentNumber,
  pub status: DocumentStatus,
  pub currency: CurrencyCode,
  pub exchange_rate: ExchangeRate,
  pub subtotal: Amount,
  pub tax: Amount,
  pub total: Amount,
  pub adjustment: Amount,
  pub tds: Option<TaxRate>,
  pub tcs: Option<TaxRate>,
  pub issue_date: NaiveDate,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Invoice {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    organization_id: Uuid,
    customer_id: Uuid,
    location_id: Option<Uuid>,
    kind: DocumentKind,
    number: DocumentNumber,
    currency: CurrencyCode,
    exchange_rate: ExchangeRate,
    adjustment: Amount,
    tds: Option<TaxRate>,
    tcs: Option<TaxRate>,
    issue_date: NaiveDate,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      organization_id,
      customer_id,
      location_id,
      kind,
      number,
      status: DocumentStatus::Draft,
      currency,
      exchange_rate,
      subtotal: Amount::ZERO,
      tax: Amount::ZERO,
      total: Amount::ZERO,
      adjustment,
      tds,
      tcs,
      issue_date,
      created_at: now,
      updated_at: now,
    }
  }

  /// Overwrites the stored derived totals. Persisting the change is the
  /// caller's explicit save step.
  pub fn apply_totals(&mut self, totals: &InvoiceTotals) {
    self.subtotal = totals.subtotal;
    self.tax = totals.tax;
    self.total = totals.total;
    self.updated_at = Utc::now();
  }

  /// Replaces the document-level billing terms. Only draft documents accept
  /// edits; totals must be recomputed afterwards.
  pub fn update_terms(
    &mut self,
    customer_id: Uuid,
    location_id: Option<Uuid>,
    adjustment: Amount,
    tds: Option<TaxRate>,
    tcs: Option<TaxRate>,
    issue_date: NaiveDate,
  ) -> Result<(), BillingError> {
    if !self.status.is_editable() {
      return Err(BillingError::CannotEditDocument(format!(
        "document is in {} status",
        self.status
      )));
    }
    self.customer_id = customer_id;
    self.location_id = location_id;
    self.adjustment = adjustment;
    self.tds = tds;
    self.tcs = tcs;
    self.issue_date = issue_date;
    self.updated_at = Utc::now();
    Ok(())
  }

  pub fn change_status(&mut self, new_status: DocumentStatus) -> Result<(), BillingError> {
    if !self.status.can_transition_to(self.kind, new_status) {
      return Err(BillingError::InvalidStatusTransition {
        from: self.status,
        to: new_status,
      });
    }
    self.status = new_status;
    self.updated_at = Utc::now();
    Ok(())
  }

  pub fn is_editable(&self) -> bool {
    self.status.is_editable()
  }
}

// Invoice totals - calculated, never persisted as its own entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
  pub subtotal: Amount,
  pub tax: Amount,
  pub total: Amount,
}

impl InvoiceTotals {
  pub const fn zero() -> Self {
    Self {
      subtotal: Amount::ZERO,
      tax: Amount::ZERO,
      total: Amount::ZERO,
    }
  }

  /// The sole authority for a document's subtotal/tax/total.
  ///
  /// An empty item sequence short-circuits to the zero triple no matter what
  /// adjustment/TDS/TCS say. Otherwise the ordering is fixed: adjustment is
  /// applied before TDS, TDS before TCS, and TCS is computed on the post-TDS
  /// total. `tax` always reports the pre-withholding sum of line taxes.
  pub fn calculate(
    line_items: &[LineItem],
    adjustment: Amount,
    tds: Option<TaxRate>,
    tcs: Option<TaxRate>,
  ) -> Self {
    if line_items.is_empty() {
      return Self::zero();
    }

    let mut subtotal = Amount::ZERO;
    let mut tax = Amount::ZERO;
    for item in line_items {
      let (net, line_tax) = item.valuation();
      subtotal = subtotal + net;
      tax = tax + line_tax;
    }

    let mut total = subtotal + tax + adjustment;
    if let Some(rate) = tds {
      total = total - total.apply_rate(rate);
    }
    if let Some(rate) = tcs {
      total = total + total.apply_rate(rate);
    }

    Self {
      subtotal,
      tax,
      total,
    }
  }
}
