use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct RecalculateTotalsCommand {
  pub organization_id: Uuid,
  pub document_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RecalculateTotalsResponse {
  pub document_id: Uuid,
  pub subtotal: i64,
  pub tax: i64,
  pub total: i64,
}

/// Forces a reload of the document and its items before recomputation, so a
/// caller never persists totals derived from a stale in-memory snapshot.
pub struct RecalculateTotalsUseCase {
  billing_service: Arc<BillingService>,
}

impl RecalculateTotalsUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: RecalculateTotalsCommand,
  ) -> Result<RecalculateTotalsResponse, BillingError> {
    let totals = self
      .billing_service
      .recalculate(command.organization_id, command.document_id)
      .await?;

    Ok(RecalculateTotalsResponse {
      document_id: command.document_id,
      subtotal: totals.subtotal.minor_units(),
      tax: totals.tax.minor_units(),
      total: totals.total.minor_units(),
    })
  }
}
