use crate::domain::types::FeeSchedule;
use crate::error::{RentalError, Result};
use crate::storage::postgres::PgDatabase;
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Read access to the fee schedule in effect right now.
///
/// Schedules are versioned rows; "current" is the newest `valid_from` at or
/// before now. Invoicing always snapshots this at creation time.
#[async_trait]
pub trait FeeScheduleStore: Send + Sync {
    async fn current(&self) -> Result<FeeSchedule>;
}

pub struct SqlFeeScheduleRepository {
    db: Arc<PgDatabase>,
}

impl SqlFeeScheduleRepository {
    pub fn new(db: Arc<PgDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeeScheduleStore for SqlFeeScheduleRepository {
    async fn current(&self) -> Result<FeeSchedule> {
        let row = sqlx::query(
            r#"
            SELECT start_fee, minute_fee, discount, penalty, valid_from
            FROM fee_schedules
            WHERE valid_from <= NOW()
            ORDER BY valid_from DESC
            LIMIT 1
            "#,
        )
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("current_fee_schedule", e))?;

        Ok(FeeSchedule {
            start: row.get("start_fee"),
            minute: row.get("minute_fee"),
            discount: row.get("discount"),
            penalty: row.get("penalty"),
            valid_from: row.get("valid_from"),
        })
    }
}

/// Fixed fee schedule for tests.
pub struct StaticFeeSchedule {
    fee: FeeSchedule,
}

impl StaticFeeSchedule {
    pub fn new(fee: FeeSchedule) -> Self {
        Self { fee }
    }
}

#[async_trait]
impl FeeScheduleStore for StaticFeeSchedule {
    async fn current(&self) -> Result<FeeSchedule> {
        Ok(self.fee.clone())
    }
}
