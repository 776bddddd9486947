use thiserror::Error;
use uuid::Uuid;

use super::value_objects::{DocumentKind, DocumentStatus, ValueObjectError};

#[derive(Debug, Error)]
pub enum BillingError {
  #[error("Validation error: {0}")]
  Validation(#[from] ValueObjectError),

  #[error("Invalid payload: {0}")]
  InvalidPayload(String),

  #[error("Document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("Only estimates can be converted; document {id} has kind {kind}")]
  NotAnEstimate { id: Uuid, kind: DocumentKind },

  #[error("Cannot edit document: {0}")]
  CannotEditDocument(String),

  #[error("Invalid status transition from {from} to {to}")]
  InvalidStatusTransition {
    from: DocumentStatus,
    to: DocumentStatus,
  },

  #[error("Recalculation is not permitted while the document is in {status} status")]
  RecalculationNotPermitted { status: DocumentStatus },

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Document number '{0}' already exists")]
  NumberAlreadyExists(String),

  #[error("Gave up allocating a unique document number after {attempts} attempts")]
  NumberAllocationExhausted { attempts: u32 },

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}

/// Convert validation errors from validator crate
impl From<validator::ValidationErrors> for BillingError {
  fn from(errors: validator::ValidationErrors) -> Self {
    let messages: Vec<String> = errors
      .field_errors()
      .iter()
      .flat_map(|(field, errors)| {
        errors
          .iter()
          .map(|error| {
            error
              .message
              .as_ref()
              .map(|m| m.to_string())
              .unwrap_or_else(|| format!("Invalid field: {}", field))
          })
          .collect::<Vec<_>>()
      })
      .collect();

    BillingError::InvalidPayload(messages.join(", "))
  }
}
