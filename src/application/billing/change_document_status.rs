use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService, DocumentStatus};

#[derive(Debug, Deserialize)]
pub struct ChangeDocumentStatusCommand {
  pub organization_id: Uuid,
  pub document_id: Uuid,
  pub new_status: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeDocumentStatusResponse {
  pub document_id: Uuid,
  pub status: String,
}

pub struct ChangeDocumentStatusUseCase {
  billing_service: Arc<BillingService>,
}

impl ChangeDocumentStatusUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: ChangeDocumentStatusCommand,
  ) -> Result<ChangeDocumentStatusResponse, BillingError> {
    let new_status = DocumentStatus::from_str(&command.new_status)?;

    let document = self
      .billing_service
      .change_status(command.organization_id, command.document_id, new_status)
      .await?;

    Ok(ChangeDocumentStatusResponse {
      document_id: document.id,
      status: document.status.as_str().to_string(),
    })
  }
}
