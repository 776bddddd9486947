use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct ConvertEstimateCommand {
  pub organization_id: Uuid,
  pub estimate_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ConvertEstimateResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub line_item_count: usize,
  pub subtotal: i64,
  pub tax: i64,
  pub total: i64,
  pub created_at: DateTime<Utc>,
}

pub struct ConvertEstimateUseCase {
  billing_service: Arc<BillingService>,
}

impl ConvertEstimateUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: ConvertEstimateCommand,
  ) -> Result<ConvertEstimateResponse, BillingError> {
    let (invoice, items) = self
      .billing_service
      .convert_estimate(command.organization_id, command.estimate_id)
      .await?;

    Ok(ConvertEstimateResponse {
      invoice_id: invoice.id,
      invoice_number: invoice.number.to_string(),
      line_item_count: items.len(),
      subtotal: invoice.subtotal.minor_units(),
      tax: invoice.tax.minor_units(),
      total: invoice.total.minor_units(),
      created_at: invoice.created_at,
    })
  }
}
