use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::billing::{
  Amount, BillingError, BillingService, CurrencyCode, DocumentData, DocumentKind, DocumentNumber,
  ExchangeRate, LineItemData, LineItemDescription, Quantity, TaxRate,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DocumentLineItemDto {
  #[validate(length(min = 1, max = 500, message = "description must be 1-500 characters"))]
  pub description: String,
  pub quantity: u32,
  /// Decimal string, e.g. "149.99"
  pub unit_price: String,
  /// Percentage string, e.g. "18" or "18.50"; absent means no tax applied
  pub tax_rate: Option<String>,
  /// Decimal string; absent means no discount
  pub discount: Option<String>,
}

impl DocumentLineItemDto {
  pub(crate) fn into_data(self) -> Result<LineItemData, BillingError> {
    Ok(LineItemData {
      description: LineItemDescription::new(self.description)?,
      quantity: Quantity::new(self.quantity),
      unit_price: Amount::parse(&self.unit_price)?,
      tax_rate: self
        .tax_rate
        .as_deref()
        .map(TaxRate::from_percent_str)
        .transpose()?,
      discount: self
        .discount
        .as_deref()
        .map(Amount::parse)
        .transpose()?
        .unwrap_or(Amount::ZERO),
    })
  }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentCommand {
  pub organization_id: Uuid,
  pub customer_id: Uuid,
  pub location_id: Option<Uuid>,
  /// "invoice" or "estimate"
  pub kind: String,
  /// PREFIX-YYYY-MM-NNNN
  pub number: String,
  pub currency: String,
  /// Decimal string at six-digit precision; absent means parity
  pub exchange_rate: Option<String>,
  /// Decimal string, may be negative; absent means zero
  pub adjustment: Option<String>,
  /// Withholding percentage; absent means not applied
  pub tds: Option<String>,
  /// Collection percentage; absent means not applied
  pub tcs: Option<String>,
  pub issue_date: NaiveDate,
  #[validate(nested, length(max = 200, message = "too many line items"))]
  pub line_items: Vec<DocumentLineItemDto>,
}

#[derive(Debug, Serialize)]
pub struct CreateDocumentResponse {
  pub document_id: Uuid,
  pub number: String,
  pub kind: String,
  pub status: String,
  pub subtotal: i64,
  pub tax: i64,
  pub total: i64,
  pub created_at: DateTime<Utc>,
}

pub struct CreateDocumentUseCase {
  billing_service: Arc<BillingService>,
}

impl CreateDocumentUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: CreateDocumentCommand,
  ) -> Result<CreateDocumentResponse, BillingError> {
    command.validate()?;

    let kind = DocumentKind::from_str(&command.kind)?;
    let number = DocumentNumber::from_str(&command.number)?;
    let currency = CurrencyCode::from_str(&command.currency)?;
    let exchange_rate = command
      .exchange_rate
      .as_deref()
      .map(ExchangeRate::parse)
      .transpose()?
      .unwrap_or_default();
    let adjustment = command
      .adjustment
      .as_deref()
      .map(Amount::parse)
      .transpose()?
      .unwrap_or(Amount::ZERO);
    let tds = command
      .tds
      .as_deref()
      .map(TaxRate::from_percent_str)
      .transpose()?;
    let tcs = command
      .tcs
      .as_deref()
      .map(TaxRate::from_percent_str)
      .transpose()?;
    let line_items = command
      .line_items
      .into_iter()
      .map(DocumentLineItemDto::into_data)
      .collect::<Result<Vec<_>, BillingError>>()?;

    let data = DocumentData {
      customer_id: command.customer_id,
      location_id: command.location_id,
      kind,
      number,
      currency,
      exchange_rate,
      adjustment,
      tds,
      tcs,
      issue_date: command.issue_date,
      line_items,
    };

    let (document, _items) = self
      .billing_service
      .create_document(command.organization_id, data)
      .await?;

    Ok(CreateDocumentResponse {
      document_id: document.id,
      number: document.number.to_string(),
      kind: document.kind.as_str().to_string(),
      status: document.status.as_str().to_string(),
      subtotal: document.subtotal.minor_units(),
      tax: document.tax.minor_units(),
      total: document.total.minor_units(),
      created_at: document.created_at,
    })
  }
}
