use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::billing::{
  Amount, BillingError, BillingService, DocumentUpdateData, TaxRate,
};

use super::create_document::DocumentLineItemDto;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDocumentCommand {
  pub organization_id: Uuid,
  pub document_id: Uuid,
  pub customer_id: Uuid,
  pub location_id: Option<Uuid>,
  pub adjustment: Option<String>,
  pub tds: Option<String>,
  pub tcs: Option<String>,
  pub issue_date: NaiveDate,
  #[validate(nested, length(max = 200, message = "too many line items"))]
  pub line_items: Vec<DocumentLineItemDto>,
}

#[derive(Debug, Serialize)]
pub struct UpdateDocumentResponse {
  pub document_id: Uuid,
  pub subtotal: i64,
  pub tax: i64,
  pub total: i64,
  pub updated_at: DateTime<Utc>,
}

pub struct UpdateDocumentUseCase {
  billing_service: Arc<BillingService>,
}

impl UpdateDocumentUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: UpdateDocumentCommand,
  ) -> Result<UpdateDocumentResponse, BillingError> {
    command.validate()?;

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

    let data = DocumentUpdateData {
      customer_id: command.customer_id,
      location_id: command.location_id,
      adjustment,
      tds,
      tcs,
      issue_date: command.issue_date,
      line_items,
    };

    let (document, _items) = self
      .billing_service
      .update_document(command.organization_id, command.document_id, data)
      .await?;

    Ok(UpdateDocumentResponse {
      document_id: document.id,
      subtotal: document.subtotal.minor_units(),
      tax: document.tax.minor_units(),
      total: document.total.minor_units(),
      updated_at: document.updated_at,
    })
  }
}
