use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  Amount, BillingError, CurrencyCode, DocumentKind, DocumentNumber, DocumentStatus, ExchangeRate,
  Invoice, InvoiceTotals, LineItem, TaxRate, ValueObjectError, ports::InvoiceRepository,
};

const DOCUMENT_COLUMNS: &str = "id, organization_id, customer_id, location_id, kind, number, \
                                status, currency, exchange_rate, subtotal, tax, total, \
                                adjustment, tds, tcs, issue_date, created_at, updated_at";

#[derive(Debug, FromRow)]
struct DocumentRow {
  id: Uuid,
  organization_id: Uuid,
  customer_id: Uuid,
  location_id: Option<Uuid>,
  kind: String,
  number: String,
  status: String,
  currency: String,
  exchange_rate: i64,
  subtotal: i64,
  tax: i64,
  total: i64,
  adjustment: i64,
  tds: Option<i32>,
  tcs: Option<i32>,
  issue_date: NaiveDate,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

fn rate_from_column(value: i32) -> Result<TaxRate, ValueObjectError> {
  u16::try_from(value)
    .map(TaxRate::new)
    .map_err(|_| ValueObjectError::InvalidTaxRate(format!("Stored rate out of range: {}", value)))
}

impl TryFrom<DocumentRow> for Invoice {
  type Error = BillingError;

  fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
    let kind = DocumentKind::from_str(&row.kind)?;
    let number = DocumentNumber::from_str(&row.number)?;
    let status = DocumentStatus::from_str(&row.status)?;
    let currency = CurrencyCode::from_str(&row.currency)?;
    let exchange_rate = ExchangeRate::new(u64::try_from(row.exchange_rate).map_err(|_| {
      ValueObjectError::InvalidExchangeRate(format!(
        "Stored rate out of range: {}",
        row.exchange_rate
      ))
    })?)?;
    let tds = row.tds.map(rate_from_column).transpose()?;
    let tcs = row.tcs.map(rate_from_column).transpose()?;

    Ok(Invoice {
      id: row.id,
      organization_id: row.organization_id,
      customer_id: row.customer_id,
      location_id: row.location_id,
      kind,
      number,
      status,
      currency,
      exchange_rate,
      subtotal: Amount::from_minor_units(row.subtotal),
      tax: Amount::from_minor_units(row.tax),
      total: Amount::from_minor_units(row.total),
      adjustment: Amount::from_minor_units(row.adjustment),
      tds,
      tcs,
      issue_date: row.issue_date,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

pub struct PostgresInvoiceRepository {
  pool: PgPool,
}

impl PostgresInvoiceRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  fn map_number_collision(error: sqlx::Error, number: &str) -> BillingError {
    if let sqlx::Error::Database(db_err) = &error {
      // PostgreSQL unique violation code
      if db_err.code().as_deref() == Some("23505")
        && db_err.constraint() == Some("documents_org_number_unique")
      {
        return BillingError::NumberAlreadyExists(number.to_string());
      }
    }
    BillingError::Database(error)
  }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
      r#"
            UPDATE documents
            SET customer_id = $2, location_id = $3, status = $4,
                subtotal = $5, tax = $6, total = $7, adjustment = $8,
                tds = $9, tcs = $10, issue_date = $11, updated_at = $12
            WHERE id = $1
            RETURNING {DOCUMENT_COLUMNS}
            "#
    ))
    .bind(invoice.id)
    .bind(invoice.customer_id)
    .bind(invoice.location_id)
    .bind(invoice.status.as_str())
    .bind(invoice.subtotal.minor_units())
    .bind(invoice.tax.minor_units())
    .bind(invoice.total.minor_units())
    .bind(invoice.adjustment.minor_units())
    .bind(invoice.tds.map(|r| r.value() as i32))
    .bind(invoice.tcs.map(|r| r.value() as i32))
    .bind(invoice.issue_date)
    .bind(invoice.updated_at)
    .fetch_one(&self.pool)
    .await?;

    row.try_into()
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
      r#"
            SELECT {DOCUMENT_COLUMNS}
            FROM documents
            WHERE id = $1
            "#
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn find_by_organization(
    &self,
    organization_id: Uuid,
    kind: Option<DocumentKind>,
  ) -> Result<Vec<Invoice>, BillingError> {
    let rows = match kind {
      Some(kind) => {
        sqlx::query_as::<_, DocumentRow>(&format!(
          r#"
                SELECT {DOCUMENT_COLUMNS}
                FROM documents
                WHERE organization_id = $1 AND kind = $2
                ORDER BY number DESC
                "#
        ))
        .bind(organization_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?
      }
      None => {
        sqlx::query_as::<_, DocumentRow>(&format!(
          r#"
                SELECT {DOCUMENT_COLUMNS}
                FROM documents
                WHERE organization_id = $1
                ORDER BY number DESC
                "#
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?
      }
    };

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn update_totals(&self, id: Uuid, totals: &InvoiceTotals) -> Result<(), BillingError> {
    sqlx::query(
      r#"
      UPDATE documents
      SET subtotal = $2, tax = $3, total = $4, updated_at = $5
      WHERE id = $1
      "#,
    )
    .bind(id)
    .bind(totals.subtotal.minor_units())
    .bind(totals.tax.minor_units())
    .bind(totals.total.minor_units())
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn max_sequence(
    &self,
    organization_id: Uuid,
    prefix: &str,
    year: i32,
    month: u32,
  ) -> Result<Option<u32>, BillingError> {
    let pattern = format!("{}-{:04}-{:02}-%", prefix, year, month);

    let numbers: Vec<(String,)> = sqlx::query_as(
      r#"
      SELECT number FROM documents
      WHERE organization_id = $1 AND number LIKE $2
      "#,
    )
    .bind(organization_id)
    .bind(&pattern)
    .fetch_all(&self.pool)
    .await?;

    // A row that does not parse as PREFIX-YYYY-MM-NNNN cannot collide with a
    // composed number, so it is skipped rather than treated as an error.
    Ok(
      numbers
        .into_iter()
        .filter_map(|(number,)| DocumentNumber::from_str(&number).ok())
        .map(|number| number.sequence())
        .max(),
    )
  }

  async fn create_with_items(
    &self,
    mut invoice: Invoice,
    items: Vec<LineItem>,
    recomputed: InvoiceTotals,
  ) -> Result<(Invoice, Vec<LineItem>), BillingError> {
    let number_value = invoice.number.to_string();
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
      INSERT INTO documents (
          id, organization_id, customer_id, location_id, kind, number,
          status, currency, exchange_rate, subtotal, tax, total,
          adjustment, tds, tcs, issue_date, created_at, updated_at
      )
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
              $13, $14, $15, $16, $17, $18)
      "#,
    )
    .bind(invoice.id)
    .bind(invoice.organization_id)
    .bind(invoice.customer_id)
    .bind(invoice.location_id)
    .bind(invoice.kind.as_str())
    .bind(&number_value)
    .bind(invoice.status.as_str())
    .bind(invoice.currency.as_str())
    .bind(invoice.exchange_rate.value() as i64)
    .bind(invoice.subtotal.minor_units())
    .bind(invoice.tax.minor_units())
    .bind(invoice.total.minor_units())
    .bind(invoice.adjustment.minor_units())
    .bind(invoice.tds.map(|r| r.value() as i32))
    .bind(invoice.tcs.map(|r| r.value() as i32))
    .bind(invoice.issue_date)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| Self::map_number_collision(e, &number_value))?;

    for item in &items {
      sqlx::query(
        r#"
        INSERT INTO document_line_items (
            id, document_id, description, quantity, unit_price,
            tax_rate, discount, line_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
      )
      .bind(item.id)
      .bind(item.document_id)
      .bind(item.description.value())
      .bind(item.quantity.value() as i64)
      .bind(item.unit_price.minor_units())
      .bind(item.tax_rate.map(|r| r.value() as i32))
      .bind(item.discount.minor_units())
      .bind(item.line_order)
      .execute(&mut *tx)
      .await?;
    }

    // The header was seeded with the caller's initial totals; overwrite them
    // with the fresh computation before anything becomes visible.
    invoice.apply_totals(&recomputed);
    sqlx::query(
      r#"
      UPDATE documents
      SET subtotal = $2, tax = $3, total = $4, updated_at = $5
      WHERE id = $1
      "#,
    )
    .bind(invoice.id)
    .bind(invoice.subtotal.minor_units())
    .bind(invoice.tax.minor_units())
    .bind(invoice.total.minor_units())
    .bind(invoice.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((invoice, items))
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM document_line_items WHERE document_id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    sqlx::query("DELETE FROM documents WHERE id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(())
  }
}
