use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::billing::{
  Amount, BillingError, LineItem, LineItemDescription, Quantity, TaxRate, ValueObjectError,
  ports::LineItemRepository,
};

#[derive(Debug, FromRow)]
struct LineItemRow {
  id: Uuid,
  document_id: Uuid,
  description: String,
  quantity: i64,
  unit_price: i64,
  tax_rate: Option<i32>,
  discount: i64,
  line_order: i32,
}

impl TryFrom<LineItemRow> for LineItem {
  type Error = BillingError;

  fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
    let description = LineItemDescription::new(row.description)?;
    let quantity = u32::try_from(row.quantity)
      .map(Quantity::new)
      .map_err(|_| BillingError::Internal(format!("Stored quantity out of range: {}", row.quantity)))?;
    let tax_rate = row
      .tax_rate
      .map(|value| {
        u16::try_from(value).map(TaxRate::new).map_err(|_| {
          ValueObjectError::InvalidTaxRate(format!("Stored rate out of range: {}", value))
        })
      })
      .transpose()?;

    Ok(LineItem {
      id: row.id,
      document_id: row.document_id,
      description,
      quantity,
      unit_price: Amount::from_minor_units(row.unit_price),
      tax_rate,
      discount: Amount::from_minor_units(row.discount),
      line_order: row.line_order,
    })
  }
}

pub struct PostgresLineItemRepository {
  pool: PgPool,
}

impl PostgresLineItemRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl LineItemRepository for PostgresLineItemRepository {
  async fn create_many(&self, items: Vec<LineItem>) -> Result<Vec<LineItem>, BillingError> {
    let mut created_items = Vec::with_capacity(items.len());

    for item in items {
      let row = sqlx::query_as::<_, LineItemRow>(
        r#"
            INSERT INTO document_line_items (
                id, document_id, description, quantity, unit_price,
                tax_rate, discount, line_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, document_id, description, quantity, unit_price,
                      tax_rate, discount, line_order
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
      .fetch_one(&self.pool)
      .await?;

      created_items.push(row.try_into()?);
    }

    Ok(created_items)
  }

  async fn find_by_document_id(&self, document_id: Uuid) -> Result<Vec<LineItem>, BillingError> {
    let rows = sqlx::query_as::<_, LineItemRow>(
      r#"
            SELECT id, document_id, description, quantity, unit_price,
                   tax_rate, discount, line_order
            FROM document_line_items
            WHERE document_id = $1
            ORDER BY line_order ASC
            "#,
    )
    .bind(document_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn delete_by_document_id(&self, document_id: Uuid) -> Result<(), BillingError> {
    sqlx::query("DELETE FROM document_line_items WHERE document_id = $1")
      .bind(document_id)
      .execute(&self.pool)
      .await?;

    Ok(())
  }
}
