#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use billflow::domain::billing::{
  Amount, BillingError, BillingService, BillingServiceConfig, CurrencyCode, DocumentData,
  DocumentKind, DocumentNumber, ExchangeRate, Invoice, InvoiceRepository, InvoiceTotals,
  LineItem, LineItemData, LineItemDescription, LineItemRepository, Quantity, RecalculationPolicy,
  TaxRate,
};

// In-memory backing store shared by both repository fakes

#[derive(Default)]
pub struct InMemoryStore {
  pub documents: Mutex<HashMap<Uuid, Invoice>>,
  pub line_items: Mutex<HashMap<Uuid, Vec<LineItem>>>,
}

impl InMemoryStore {
  pub fn document_count(&self) -> usize {
    self.documents.lock().unwrap().len()
  }

  pub fn item_count(&self) -> usize {
    self.line_items.lock().unwrap().values().map(Vec::len).sum()
  }

  fn number_taken(&self, organization_id: Uuid, number: &DocumentNumber) -> bool {
    self
      .documents
      .lock()
      .unwrap()
      .values()
      .any(|doc| doc.organization_id == organization_id && &doc.number == number)
  }
}

pub struct InMemoryInvoiceRepository {
  store: Arc<InMemoryStore>,
}

impl InMemoryInvoiceRepository {
  pub fn new(store: Arc<InMemoryStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
    let mut documents = self.store.documents.lock().unwrap();
    if !documents.contains_key(&invoice.id) {
      return Err(BillingError::DocumentNotFound(invoice.id));
    }
    documents.insert(invoice.id, invoice.clone());
    Ok(invoice)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    Ok(self.store.documents.lock().unwrap().get(&id).cloned())
  }

  async fn find_by_organization(
    &self,
    organization_id: Uuid,
    kind: Option<DocumentKind>,
  ) -> Result<Vec<Invoice>, BillingError> {
    Ok(
      self
        .store
        .documents
        .lock()
        .unwrap()
        .values()
        .filter(|doc| doc.organization_id == organization_id)
        .filter(|doc| kind.is_none_or(|k| doc.kind == k))
        .cloned()
        .collect(),
    )
  }

  async fn update_totals(&self, id: Uuid, totals: &InvoiceTotals) -> Result<(), BillingError> {
    let mut documents = self.store.documents.lock().unwrap();
    let document = documents
      .get_mut(&id)
      .ok_or(BillingError::DocumentNotFound(id))?;
    document.apply_totals(totals);
    Ok(())
  }

  async fn max_sequence(
    &self,
    organization_id: Uuid,
    prefix: &str,
    year: i32,
    month: u32,
  ) -> Result<Option<u32>, BillingError> {
    Ok(
      self
        .store
        .documents
        .lock()
        .unwrap()
        .values()
        .filter(|doc| doc.organization_id == organization_id)
        .map(|doc| &doc.number)
        .filter(|n| n.prefix() == prefix && n.year() == year && n.month() == month)
        .map(DocumentNumber::sequence)
        .max(),
    )
  }

  async fn create_with_items(
    &self,
    mut invoice: Invoice,
    items: Vec<LineItem>,
    recomputed: InvoiceTotals,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    if self.store.number_taken(invoice.organization_id, &invoice.number) {
      return Err(BillingError::NumberAlreadyExists(invoice.number.to_string()));
    }
    invoice.apply_totals(&recomputed);
    self
      .store
      .documents
      .lock()
      .unwrap()
      .insert(invoice.id, invoice.clone());
    self
      .store
      .line_items
      .lock()
      .unwrap()
      .insert(invoice.id, items.clone());
    Ok((invoice, items))
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    self.store.documents.lock().unwrap().remove(&id);
    self.store.line_items.lock().unwrap().remove(&id);
    Ok(())
  }
}

pub struct InMemoryLineItemRepository {
  store: Arc<InMemoryStore>,
}

impl InMemoryLineItemRepository {
  pub fn new(store: Arc<InMemoryStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl LineItemRepository for InMemoryLineItemRepository {
  async fn create_many(&self, items: Vec<LineItem>) -> Result<Vec<LineItem>, BillingError> {
    let mut line_items = self.store.line_items.lock().unwrap();
    for item in &items {
      line_items
        .entry(item.document_id)
        .or_default()
        .push(item.clone());
    }
    Ok(items)
  }

  async fn find_by_document_id(&self, document_id: Uuid) -> Result<Vec<LineItem>, BillingError> {
    let mut items = self
      .store
      .line_items
      .lock()
      .unwrap()
      .get(&document_id)
      .cloned()
      .unwrap_or_default();
    items.sort_by_key(|item| item.line_order);
    Ok(items)
  }

  async fn delete_by_document_id(&self, document_id: Uuid) -> Result<(), BillingError> {
    self.store.line_items.lock().unwrap().remove(&document_id);
    Ok(())
  }
}

// Fault-injecting wrappers for the conversion retry path

/// Simulates a concurrent writer: the first `create_with_items` call inserts
/// a competing document under the same number, then reports the collision.
pub struct CollideOnceInvoiceRepository {
  inner: InMemoryInvoiceRepository,
  store: Arc<InMemoryStore>,
  collided: AtomicBool,
}

impl CollideOnceInvoiceRepository {
  pub fn new(store: Arc<InMemoryStore>) -> Self {
    Self {
      inner: InMemoryInvoiceRepository::new(store.clone()),
      store,
      collided: AtomicBool::new(false),
    }
  }
}

#[async_trait]
impl InvoiceRepository for CollideOnceInvoiceRepository {
  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
    self.inner.update(invoice).await
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    self.inner.find_by_id(id).await
  }

  async fn find_by_organization(
    &self,
    organization_id: Uuid,
    kind: Option<DocumentKind>,
  ) -> Result<Vec<Invoice>, BillingError> {
    self.inner.find_by_organization(organization_id, kind).await
  }

  async fn update_totals(&self, id: Uuid, totals: &InvoiceTotals) -> Result<(), BillingError> {
    self.inner.update_totals(id, totals).await
  }

  async fn max_sequence(
    &self,
    organization_id: Uuid,
    prefix: &str,
    year: i32,
    month: u32,
  ) -> Result<Option<u32>, BillingError> {
    self.inner.max_sequence(organization_id, prefix, year, month).await
  }

  async fn create_with_items(
    &self,
    invoice: Invoice,
    items: Vec<LineItem>,
    recomputed: InvoiceTotals,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    if !self.collided.swap(true, Ordering::SeqCst) {
      let mut competitor = invoice.clone();
      competitor.id = Uuid::new_v4();
      self
        .store
        .documents
        .lock()
        .unwrap()
        .insert(competitor.id, competitor);
      return Err(BillingError::NumberAlreadyExists(invoice.number.to_string()));
    }
    self.inner.create_with_items(invoice, items, recomputed).await
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    self.inner.delete(id).await
  }
}

/// Every transactional write reports a collision; drives the service into
/// its retry bound.
pub struct AlwaysCollideInvoiceRepository {
  inner: InMemoryInvoiceRepository,
}

impl AlwaysCollideInvoiceRepository {
  pub fn new(store: Arc<InMemoryStore>) -> Self {
    Self {
      inner: InMemoryInvoiceRepository::new(store),
    }
  }
}

#[async_trait]
impl InvoiceRepository for AlwaysCollideInvoiceRepository {
  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
    self.inner.update(invoice).await
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    self.inner.find_by_id(id).await
  }

  async fn find_by_organization(
    &self,
    organization_id: Uuid,
    kind: Option<DocumentKind>,
  ) -> Result<Vec<Invoice>, BillingError> {
    self.inner.find_by_organization(organization_id, kind).await
  }

  async fn update_totals(&self, id: Uuid, totals: &InvoiceTotals) -> Result<(), BillingError> {
    self.inner.update_totals(id, totals).await
  }

  async fn max_sequence(
    &self,
    organization_id: Uuid,
    prefix: &str,
    year: i32,
    month: u32,
  ) -> Result<Option<u32>, BillingError> {
    self.inner.max_sequence(organization_id, prefix, year, month).await
  }

  async fn create_with_items(
    &self,
    invoice: Invoice,
    _items: Vec<LineItem>,
    _recomputed: InvoiceTotals,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    Err(BillingError::NumberAlreadyExists(invoice.number.to_string()))
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    self.inner.delete(id).await
  }
}

// Fixtures

pub fn new_service(policy: RecalculationPolicy) -> (Arc<BillingService>, Arc<InMemoryStore>) {
  let store = Arc::new(InMemoryStore::default());
  let service = service_with_invoice_repo(
    Arc::new(InMemoryInvoiceRepository::new(store.clone())),
    store.clone(),
    policy,
  );
  (service, store)
}

pub fn service_with_invoice_repo(
  invoice_repo: Arc<dyn InvoiceRepository>,
  store: Arc<InMemoryStore>,
  policy: RecalculationPolicy,
) -> Arc<BillingService> {
  let line_item_repo = Arc::new(InMemoryLineItemRepository::new(store));
  let config = BillingServiceConfig {
    conversion_retry_attempts: 3,
    recalculation: policy,
  };
  Arc::new(BillingService::new(invoice_repo, line_item_repo, config))
}

pub fn line_item_data(
  description: &str,
  quantity: u32,
  unit_price: i64,
  tax_rate: Option<u16>,
  discount: i64,
) -> LineItemData {
  LineItemData {
    description: LineItemDescription::new(description.to_string()).unwrap(),
    quantity: Quantity::new(quantity),
    unit_price: Amount::from_minor_units(unit_price),
    tax_rate: tax_rate.map(TaxRate::new),
    discount: Amount::from_minor_units(discount),
  }
}

pub fn document_data(
  kind: DocumentKind,
  sequence: u32,
  adjustment: i64,
  tds: Option<u16>,
  tcs: Option<u16>,
  line_items: Vec<LineItemData>,
) -> DocumentData {
  DocumentData {
    customer_id: Uuid::new_v4(),
    location_id: None,
    kind,
    number: DocumentNumber::new(kind.default_prefix(), 2026, 8, sequence).unwrap(),
    currency: CurrencyCode::new("USD").unwrap(),
    exchange_rate: ExchangeRate::default(),
    adjustment: Amount::from_minor_units(adjustment),
    tds: tds.map(TaxRate::new),
    tcs: tcs.map(TaxRate::new),
    issue_date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
    line_items,
  }
}
