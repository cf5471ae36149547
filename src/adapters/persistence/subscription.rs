use chrono::{DateTime, Utc};

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

#[derive(sqlx::FromRow, Debug)]
struct SubscriptionRow {
    id: String,
    customer_id: String,
    status: String,
    started_at: DateTime<Utc>,
    current_period_end: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription::from_parts(
            row.id,
            row.customer_id,
            SubscriptionStatus::from_str(&row.status),
            row.started_at,
            row.current_period_end,
            row.ends_at,
        )
    }
}

impl PostgresPersistence {
    pub(super) async fn latest_subscription(
        &self,
        customer_id: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, customer_id, status, started_at, current_period_end, ends_at
            FROM subscriptions
            WHERE customer_id = $1
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(Subscription::from))
    }

    pub(super) async fn upsert_subscription(&self, subscription: &Subscription) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, customer_id, status, started_at, current_period_end, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                ends_at = EXCLUDED.ends_at
            "#,
        )
        .bind(subscription.id())
        .bind(subscription.customer_id())
        .bind(subscription.status().as_str())
        .bind(subscription.started_at())
        .bind(subscription.current_period_end())
        .bind(subscription.ends_at())
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(())
    }

    pub(super) async fn delete_subscription(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
