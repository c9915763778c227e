use std::{future::Future, time::Duration};

use sea_orm::DbErr;

use crate::hierarchy::HierarchyError;

const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF_MS: u64 = 50;
const MAX_BACKOFF_MS: u64 = 1_000;

/// Errors that can report a transient SQLite lock.
pub(crate) trait StorageBusy {
    fn is_storage_busy(&self) -> bool;
}

impl StorageBusy for DbErr {
    fn is_storage_busy(&self) -> bool {
        is_sqlite_busy(self)
    }
}

impl StorageBusy for HierarchyError {
    fn is_storage_busy(&self) -> bool {
        match self {
            HierarchyError::Database(err) => err.is_storage_busy(),
            _ => false,
        }
    }
}

pub(crate) async fn retry_on_sqlite_busy<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
    E: StorageBusy,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
    for attempt in 0..=MAX_RETRIES {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_storage_busy() && attempt < MAX_RETRIES => {
                tracing::debug!(
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    "Database busy, retrying"
                );
                tokio::time::sleep(backoff).await;
                let next_ms = (backoff.as_millis() as u64)
                    .saturating_mul(2)
                    .min(MAX_BACKOFF_MS);
                backoff = Duration::from_millis(next_ms);
            }
            Err(err) => return Err(err),
        }
    }

    unreachable!("retry loop returns on success or error")
}

// sea-orm flattens the sqlx error into text, so the SQLITE_BUSY (5) and
// SQLITE_LOCKED (6) codes are matched on the rendered message.
fn is_sqlite_busy(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("database is locked")
        || message.contains("database is busy")
        || message.contains("database table is locked")
        || message.contains("(code: 5)")
        || message.contains("(code: 6)")
}
