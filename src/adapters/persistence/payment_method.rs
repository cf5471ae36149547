use chrono::{DateTime, Utc};

use crate::{
    adapters::persistence::{PostgresPersistence, parse_payment_method_info},
    app_error::{AppError, AppResult},
    domain::entities::payment_method::{PaymentMethod, PaymentMethodAttributes},
};

#[derive(sqlx::FromRow, Debug)]
struct PaymentMethodRow {
    id: String,
    customer_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    info: serde_json::Value,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<PaymentMethodRow> for PaymentMethod {
    fn from(row: PaymentMethodRow) -> Self {
        let details = parse_payment_method_info(&row.kind, row.info, &row.id);
        PaymentMethod::new(PaymentMethodAttributes::from_parts(
            row.id,
            row.customer_id,
            row.kind,
            details,
            row.created_at,
        ))
        .with_default(row.is_default)
    }
}

const SELECT_COLS: &str = "id, customer_id, type, info, is_default, created_at";

impl PostgresPersistence {
    pub(super) async fn find_default_payment_method(
        &self,
        customer_id: &str,
    ) -> AppResult<Option<PaymentMethod>> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(&format!(
            "SELECT {} FROM payment_methods WHERE customer_id = $1 AND is_default",
            SELECT_COLS
        ))
        .bind(customer_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(PaymentMethod::from))
    }

    pub(super) async fn find_payment_method_by_id(
        &self,
        id: &str,
    ) -> AppResult<Option<PaymentMethod>> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(&format!(
            "SELECT {} FROM payment_methods WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(PaymentMethod::from))
    }

    pub(super) async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> AppResult<Vec<PaymentMethod>> {
        let rows = sqlx::query_as::<_, PaymentMethodRow>(&format!(
            "SELECT {} FROM payment_methods WHERE customer_id = $1 ORDER BY created_at, id",
            SELECT_COLS
        ))
        .bind(customer_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(PaymentMethod::from).collect())
    }

    /// Upsert under a per-customer advisory lock. A default payment method
    /// clears the flag on its siblings before it is written.
    pub(super) async fn upsert_payment_method(&self, pm: &PaymentMethod) -> AppResult<()> {
        let customer_id = pm.customer_id().ok_or_else(|| {
            AppError::InvalidInput(format!("payment method {} has no customer", pm.id()))
        })?;

        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(customer_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;

        if pm.is_default() {
            sqlx::query(
                r#"
                UPDATE payment_methods
                SET is_default = FALSE
                WHERE customer_id = $1 AND id <> $2 AND is_default
                "#,
            )
            .bind(customer_id)
            .bind(pm.id())
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        }

        sqlx::query(
            r#"
            INSERT INTO payment_methods (id, customer_id, type, info, is_default, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET customer_id = EXCLUDED.customer_id,
                type = EXCLUDED.type,
                info = EXCLUDED.info,
                is_default = EXCLUDED.is_default
            "#,
        )
        .bind(pm.id())
        .bind(customer_id)
        .bind(pm.kind())
        .bind(pm.details().to_info())
        .bind(pm.is_default())
        .bind(pm.created_at())
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }

    pub(super) async fn delete_payment_method(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM payment_methods WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
