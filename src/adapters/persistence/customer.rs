use chrono::{DateTime, Utc};

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::customer::{Customer, CustomerAttributes},
};

#[derive(sqlx::FromRow, Debug)]
struct CustomerRow {
    id: String,
    email: String,
    jurisdiction: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer::new(CustomerAttributes {
            id: row.id,
            email: Some(row.email),
            created: row.created_at,
        })
        .with_jurisdiction(row.jurisdiction)
    }
}

const SELECT_COLS: &str = "id, email, jurisdiction, created_at";

impl PostgresPersistence {
    pub(super) async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE email = $1",
            SELECT_COLS
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(Customer::from))
    }

    pub(super) async fn find_customer_by_id(&self, id: &str) -> AppResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(Customer::from))
    }

    pub(super) async fn upsert_customer(&self, customer: &Customer) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, email, jurisdiction, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                jurisdiction = EXCLUDED.jurisdiction
            "#,
        )
        .bind(customer.id())
        .bind(customer.email())
        .bind(customer.jurisdiction())
        .bind(customer.created_at())
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    pub(super) async fn delete_customer(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
