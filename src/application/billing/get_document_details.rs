use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService, CurrencyFormatter, InvoiceTotals};

#[derive(Debug, Deserialize)]
pub struct GetDocumentDetailsCommand {
  pub organization_id: Uuid,
  pub document_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DocumentLineItemDetailsDto {
  pub id: Uuid,
  pub description: String,
  pub quantity: u32,
  pub unit_price: i64,
  pub unit_price_formatted: String,
  pub tax_rate: Option<String>,
  pub discount: i64,
  pub line_order: i32,
  pub net: i64,
  pub net_formatted: String,
  pub tax: i64,
}

#[derive(Debug, Serialize)]
pub struct DocumentTotalsDto {
  pub subtotal: i64,
  pub subtotal_formatted: String,
  pub tax: i64,
  pub tax_formatted: String,
  pub total: i64,
  pub total_formatted: String,
  pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentDetailsResponse {
  pub id: Uuid,
  pub organization_id: Uuid,
  pub customer_id: Uuid,
  pub location_id: Option<Uuid>,
  pub kind: String,
  pub number: String,
  pub status: String,
  pub currency: String,
  pub exchange_rate: String,
  pub adjustment: i64,
  pub tds: Option<String>,
  pub tcs: Option<String>,
  pub issue_date: NaiveDate,
  pub line_items: Vec<DocumentLineItemDetailsDto>,
  pub totals: DocumentTotalsDto,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

pub struct GetDocumentDetailsUseCase {
  billing_service: Arc<BillingService>,
  formatter: Arc<dyn CurrencyFormatter>,
}

impl GetDocumentDetailsUseCase {
  pub fn new(billing_service: Arc<BillingService>, formatter: Arc<dyn CurrencyFormatter>) -> Self {
    Self {
      billing_service,
      formatter,
    }
  }

  pub async fn execute(
    &self,
    command: GetDocumentDetailsCommand,
  ) -> Result<DocumentDetailsResponse, BillingError> {
    let (document, line_items) = self
      .billing_service
      .get_document_with_items(command.organization_id, command.document_id)
      .await?;

    // Always a fresh computation; the stored fields are never trusted for
    // display.
    let totals = InvoiceTotals::calculate(
      &line_items,
      document.adjustment,
      document.tds,
      document.tcs,
    );

    let currency = &document.currency;
    let line_item_dtos = line_items
      .iter()
      .map(|item| DocumentLineItemDetailsDto {
        id: item.id,
        description: item.description.value().to_string(),
        quantity: item.quantity.value(),
        unit_price: item.unit_price.minor_units(),
        unit_price_formatted: self.formatter.format(item.unit_price, currency),
        tax_rate: item.tax_rate.map(|r| r.as_percent_string()),
        discount: item.discount.minor_units(),
        line_order: item.line_order,
        net: item.net_amount().minor_units(),
        net_formatted: self.formatter.format(item.net_amount(), currency),
        tax: item.tax_amount().minor_units(),
      })
      .collect();

    let totals_dto = DocumentTotalsDto {
      subtotal: totals.subtotal.minor_units(),
      subtotal_formatted: self.formatter.format(totals.subtotal, currency),
      tax: totals.tax.minor_units(),
      tax_formatted: self.formatter.format(totals.tax, currency),
      total: totals.total.minor_units(),
      total_formatted: self.formatter.format(totals.total, currency),
      currency: currency.as_str().to_string(),
    };

    Ok(DocumentDetailsResponse {
      id: document.id,
      organization_id: document.organization_id,
      customer_id: document.customer_id,
      location_id: document.location_id,
      kind: document.kind.as_str().to_string(),
      number: document.number.to_string(),
      status: document.status.as_str().to_string(),
      currency: currency.as_str().to_string(),
      exchange_rate: document.exchange_rate.to_decimal_string(),
      adjustment: document.adjustment.minor_units(),
      tds: document.tds.map(|r| r.as_percent_string()),
      tcs: document.tcs.map(|r| r.as_percent_string()),
      issue_date: document.issue_date,
      line_items: line_item_dtos,
      totals: totals_dto,
      created_at: document.created_at,
      updated_at: document.updated_at,
    })
  }
}
