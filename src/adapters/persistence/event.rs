use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
};

impl PostgresPersistence {
    /// Insert the event id; zero affected rows means it was logged before.
    pub(super) async fn insert_event(&self, event_id: &str) -> AppResult<()> {
        let result = sqlx::query("INSERT INTO events (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(event_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::DuplicateEvent);
        }
        Ok(())
    }
}
