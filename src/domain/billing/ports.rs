use async_trait::async_trait;
use uuid::Uuid;

use super::entities::{Invoice, InvoiceTotals, LineItem};
use super::errors::BillingError;
use super::value_objects::DocumentKind;

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError>;
  async fn find_by_organization(
    &self,
    organization_id: Uuid,
    kind: Option<DocumentKind>,
  ) -> Result<Vec<Invoice>, BillingError>;

  /// Persists a freshly computed totals triple for an existing document.
  async fn update_totals(&self, id: Uuid, totals: &InvoiceTotals) -> Result<(), BillingError>;

  /// Highest sequence already allocated for `prefix-year-month` within the
  /// organization, or None when the month has no documents yet. Advisory:
  /// the unique constraint on the number is the real arbiter.
  async fn max_sequence(
    &self,
    organization_id: Uuid,
    prefix: &str,
    year: i32,
    month: u32,
  ) -> Result<Option<u32>, BillingError>;

  /// Writes the document header, its line items, and the recomputed totals
  /// in a single transaction. Any failure rolls the whole write back; a
  /// number collision surfaces as `NumberAlreadyExists`.
  async fn create_with_items(
    &self,
    invoice: Invoice,
    items: Vec<LineItem>,
    recomputed: InvoiceTotals,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError>;

  /// Deletes the document and, through its exclusive ownership, the line
  /// items that belong to it.
  async fn delete(&self, id: Uuid) -> Result<(), BillingError>;
}

#[async_trait]
pub trait LineItemRepository: Send + Sync {
  async fn create_many(&self, items: Vec<LineItem>) -> Result<Vec<LineItem>, BillingError>;
  async fn find_by_document_id(&self, document_id: Uuid) -> Result<Vec<LineItem>, BillingError>;
  async fn delete_by_document_id(&self, document_id: Uuid) -> Result<(), BillingError>;
}
