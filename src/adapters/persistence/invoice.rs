use chrono::{DateTime, Utc};

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::invoice::{Invoice, InvoiceAttributes, InvoiceStatus},
};

#[derive(sqlx::FromRow, Debug)]
struct InvoiceRow {
    id: String,
    customer_id: String,
    number: Option<String>,
    amount_due: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice::new(InvoiceAttributes {
            id: row.id,
            customer: row.customer_id,
            number: row.number,
            amount_due: row.amount_due,
            status: Some(InvoiceStatus::from_str(&row.status)),
            created: row.created_at,
            payment_intent: None,
        })
        .with_updated_at(row.updated_at)
    }
}

const SELECT_COLS: &str = "id, customer_id, number, amount_due, status, created_at, updated_at";

impl PostgresPersistence {
    pub(super) async fn find_invoice_by_number(
        &self,
        customer_id: &str,
        number: &str,
    ) -> AppResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE customer_id = $1 AND number = $2",
            SELECT_COLS
        ))
        .bind(customer_id)
        .bind(number)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(Invoice::from))
    }

    pub(super) async fn list_invoices(&self, customer_id: &str) -> AppResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE customer_id = $1 ORDER BY created_at DESC, id DESC",
            SELECT_COLS
        ))
        .bind(customer_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(Invoice::from).collect())
    }

    /// Status and updated time are the only columns that change after insert.
    pub(super) async fn upsert_invoice(&self, invoice: &Invoice) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (id, customer_id, number, amount_due, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET number = COALESCE(EXCLUDED.number, invoices.number),
                amount_due = EXCLUDED.amount_due,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(invoice.id())
        .bind(invoice.customer_id())
        .bind(invoice.number())
        .bind(invoice.amount_due())
        .bind(invoice.status().as_str())
        .bind(invoice.created_at())
        .bind(invoice.updated_at())
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    pub(super) async fn delete_invoice(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
