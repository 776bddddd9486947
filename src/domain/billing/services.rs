use chrono::{Datelike, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::entities::{Invoice, InvoiceTotals, LineItem};
use super::errors::BillingError;
use super::ports::{InvoiceRepository, LineItemRepository};
use super::value_objects::{
  Amount, CurrencyCode, DocumentKind, DocumentNumber, DocumentStatus, ExchangeRate,
  LineItemDescription, Quantity, TaxRate,
};

/// Whether stored totals may be recomputed once a document has left draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalculationPolicy {
  /// Totals are frozen after the document is sent.
  DraftOnly,
  /// Totals may be recomputed in any status.
  Always,
}

#[derive(Debug, Clone)]
pub struct BillingServiceConfig {
  /// Bound on the re-query-and-retry loop around number allocation during
  /// conversion.
  pub conversion_retry_attempts: u32,
  pub recalculation: RecalculationPolicy,
}

impl Default for BillingServiceConfig {
  fn default() -> Self {
    Self {
      conversion_retry_attempts: 3,
      recalculation: RecalculationPolicy::DraftOnly,
    }
  }
}

/// Line item creation data
pub struct LineItemData {
  pub description: LineItemDescription,
  pub quantity: Quantity,
  pub unit_price: Amount,
  pub tax_rate: Option<TaxRate>,
  pub discount: Amount,
}

/// Document creation data
pub struct DocumentData {
  pub customer_id: Uuid,
  pub location_id: Option<Uuid>,
  pub kind: DocumentKind,
  pub number: DocumentNumber,
  pub currency: CurrencyCode,
  pub exchange_rate: ExchangeRate,
  pub adjustment: Amount,
  pub tds: Option<TaxRate>,
  pub tcs: Option<TaxRate>,
  pub issue_date: NaiveDate,
  pub line_items: Vec<LineItemData>,
}

/// Document update data (kind, number, and currency are fixed at creation)
pub struct DocumentUpdateData {
  pub customer_id: Uuid,
  pub location_id: Option<Uuid>,
  pub adjustment: Amount,
  pub tds: Option<TaxRate>,
  pub tcs: Option<TaxRate>,
  pub issue_date: NaiveDate,
  pub line_items: Vec<LineItemData>,
}

pub struct BillingService {
  invoice_repo: Arc<dyn InvoiceRepository>,
  line_item_repo: Arc<dyn LineItemRepository>,
  config: BillingServiceConfig,
}

impl BillingService {
  pub fn new(
    invoice_repo: Arc<dyn InvoiceRepository>,
    line_item_repo: Arc<dyn LineItemRepository>,
    config: BillingServiceConfig,
  ) -> Self {
    Self {
      invoice_repo,
      line_item_repo,
      config,
    }
  }

  // Document operations

  pub async fn create_document(
    &self,
    organization_id: Uuid,
    data: DocumentData,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    let mut invoice = Invoice::new(
      organization_id,
      data.customer_id,
      data.location_id,
      data.kind,
      data.number,
      data.currency,
      data.exchange_rate,
      data.adjustment,
      data.tds,
      data.tcs,
      data.issue_date,
    );

    let items = Self::build_line_items(invoice.id, data.line_items);
    let totals = self.update_totals(&mut invoice, &items)?;

    tracing::debug!(
      document = %invoice.number,
      kind = %invoice.kind,
      total = %totals.total,
      "creating document"
    );
    self
      .invoice_repo
      .create_with_items(invoice, items, totals)
      .await
  }

  pub async fn update_document(
    &self,
    organization_id: Uuid,
    document_id: Uuid,
    data: DocumentUpdateData,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    let mut invoice = self.get_document(organization_id, document_id).await?;
    invoice.update_terms(
      data.customer_id,
      data.location_id,
      data.adjustment,
      data.tds,
      data.tcs,
      data.issue_date,
    )?;

    let items = Self::build_line_items(invoice.id, data.line_items);
    self.update_totals(&mut invoice, &items)?;

    let updated = self.invoice_repo.update(invoice).await?;
    self
      .line_item_repo
      .delete_by_document_id(document_id)
      .await?;
    let created_items = self.line_item_repo.create_many(items).await?;

    Ok((updated, created_items))
  }

  pub async fn change_status(
    &self,
    organization_id: Uuid,
    document_id: Uuid,
    new_status: DocumentStatus,
  ) -> Result<Invoice, BillingError> {
    let mut invoice = self.get_document(organization_id, document_id).await?;
    invoice.change_status(new_status)?;
    self.invoice_repo.update(invoice).await
  }

  pub async fn get_document(
    &self,
    organization_id: Uuid,
    document_id: Uuid,
  ) -> Result<Invoice, BillingError> {
    let invoice = self
      .invoice_repo
      .find_by_id(document_id)
      .await?
      .ok_or(BillingError::DocumentNotFound(document_id))?;

    if invoice.organization_id != organization_id {
      return Err(BillingError::PermissionDenied(
        "Document does not belong to this organization".to_string(),
      ));
    }

    Ok(invoice)
  }

  pub async fn get_document_with_items(
    &self,
    organization_id: Uuid,
    document_id: Uuid,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    let invoice = self.get_document(organization_id, document_id).await?;
    let items = self.line_item_repo.find_by_document_id(document_id).await?;
    Ok((invoice, items))
  }

  pub async fn list_documents(
    &self,
    organization_id: Uuid,
    kind: Option<DocumentKind>,
  ) -> Result<Vec<Invoice>, BillingError> {
    self
      .invoice_repo
      .find_by_organization(organization_id, kind)
      .await
  }

  pub async fn delete_document(
    &self,
    organization_id: Uuid,
    document_id: Uuid,
  ) -> Result<(), BillingError> {
    // Ownership check before the destructive call
    self.get_document(organization_id, document_id).await?;
    self.invoice_repo.delete(document_id).await
  }

  // Totals

  /// "Update" mode: recomputes from the given items and overwrites the
  /// in-memory document's stored totals. Persisting is the caller's explicit
  /// save step.
  pub fn update_totals(
    &self,
    invoice: &mut Invoice,
    items: &[LineItem],
  ) -> Result<InvoiceTotals, BillingError> {
    self.ensure_recalculation_allowed(invoice)?;
    let totals = InvoiceTotals::calculate(items, invoice.adjustment, invoice.tds, invoice.tcs);
    invoice.apply_totals(&totals);
    Ok(totals)
  }

  /// "Recalculate" mode: reloads the document and its items from the system
  /// of record before computing, then persists the result. Guards against
  /// acting on a stale in-memory snapshot; idempotent when nothing changed
  /// in between.
  pub async fn recalculate(
    &self,
    organization_id: Uuid,
    document_id: Uuid,
  ) -> Result<InvoiceTotals, BillingError> {
    let mut invoice = self.get_document(organization_id, document_id).await?;
    self.ensure_recalculation_allowed(&invoice)?;

    let items = self.line_item_repo.find_by_document_id(document_id).await?;
    let totals = InvoiceTotals::calculate(&items, invoice.adjustment, invoice.tds, invoice.tcs);
    invoice.apply_totals(&totals);
    self.invoice_repo.update_totals(document_id, &totals).await?;

    tracing::debug!(document = %invoice.number, total = %totals.total, "recalculated totals");
    Ok(totals)
  }

  // Conversion

  /// Materializes a new draft invoice from an estimate: copies the line
  /// items with fresh identity, allocates the next `INV-{year}-{month}-NNNN`
  /// number for the current month, and recomputes totals over the copies.
  /// Header, items, and recomputed totals are written in one transaction;
  /// a number collision re-queries the sequence and retries up to the
  /// configured bound.
  pub async fn convert_estimate(
    &self,
    organization_id: Uuid,
    estimate_id: Uuid,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    let estimate = self.get_document(organization_id, estimate_id).await?;
    if estimate.kind != DocumentKind::Estimate {
      return Err(BillingError::NotAnEstimate {
        id: estimate.id,
        kind: estimate.kind,
      });
    }

    let source_items = self.line_item_repo.find_by_document_id(estimate_id).await?;
    let today = Utc::now().date_naive();
    let attempts = self.config.conversion_retry_attempts.max(1);

    for attempt in 1..=attempts {
      let max_sequence = self
        .invoice_repo
        .max_sequence(
          organization_id,
          DocumentNumber::INVOICE_PREFIX,
          today.year(),
          today.month(),
        )
        .await?;
      let number = DocumentNumber::new(
        DocumentNumber::INVOICE_PREFIX,
        today.year(),
        today.month(),
        max_sequence.unwrap_or(0) + 1,
      )?;

      let mut invoice = Invoice::new(
        organization_id,
        estimate.customer_id,
        estimate.location_id,
        DocumentKind::Invoice,
        number,
        estimate.currency.clone(),
        estimate.exchange_rate,
        estimate.adjustment,
        estimate.tds,
        estimate.tcs,
        today,
      );
      // Seed with the estimate's stored totals; the transactional write
      // overwrites them with a fresh computation over the copies.
      invoice.subtotal = estimate.subtotal;
      invoice.tax = estimate.tax;
      invoice.total = estimate.total;

      let copies: Vec<LineItem> = source_items
        .iter()
        .map(|item| item.duplicate_for(invoice.id))
        .collect();
      let recomputed =
        InvoiceTotals::calculate(&copies, invoice.adjustment, invoice.tds, invoice.tcs);

      match self
        .invoice_repo
        .create_with_items(invoice, copies, recomputed)
        .await
      {
        Ok(created) => {
          tracing::info!(
            estimate = %estimate.number,
            invoice = %created.0.number,
            "converted estimate to invoice"
          );
          return Ok(created);
        }
        Err(BillingError::NumberAlreadyExists(number)) => {
          if attempt == attempts {
            return Err(BillingError::NumberAllocationExhausted { attempts });
          }
          tracing::warn!(
            %number,
            attempt,
            "document number collided during conversion, re-querying sequence"
          );
        }
        Err(e) => return Err(e),
      }
    }

    Err(BillingError::NumberAllocationExhausted { attempts })
  }

  // Helpers

  fn build_line_items(document_id: Uuid, data: Vec<LineItemData>) -> Vec<LineItem> {
    data
      .into_iter()
      .enumerate()
      .map(|(i, item)| {
        LineItem::new(
          document_id,
          item.description,
          item.quantity,
          item.unit_price,
          item.tax_rate,
          item.discount,
          (i + 1) as i32,
        )
      })
      .collect()
  }

  fn ensure_recalculation_allowed(&self, invoice: &Invoice) -> Result<(), BillingError> {
    match self.config.recalculation {
      RecalculationPolicy::Always => Ok(()),
      RecalculationPolicy::DraftOnly if invoice.status.is_editable() => Ok(()),
      RecalculationPolicy::DraftOnly => Err(BillingError::RecalculationNotPermitted {
        status: invoice.status,
      }),
    }
  }
}
