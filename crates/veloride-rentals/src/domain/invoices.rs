use crate::domain::billing::BillingCalculator;
use crate::domain::types::{InvoiceId, InvoiceStatus, RentalId, ZoneLabel};
use crate::error::{RentalError, Result};
use crate::storage::fees::FeeScheduleStore;
use crate::storage::invoices::InvoiceRepository;
use crate::storage::rentals::RentalRepository;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_DUE_DAYS: i64 = 30;

/// The bill for one completed rental; 1:1 with the rental.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub rental_id: RentalId,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(rental_id: RentalId, amount: Decimal, due_date: DateTime<Utc>) -> Self {
        Self {
            id: InvoiceId::new(),
            rental_id,
            amount,
            due_date,
            status: InvoiceStatus::Unpaid,
            created_at: Utc::now(),
        }
    }
}

/// Turns a completed rental into a persisted invoice.
///
/// Strictly an orchestration seam: it loads the rental and the current fee
/// schedule, delegates the arithmetic to [`BillingCalculator`], and writes
/// one invoice. It holds no classification or rental-persistence logic.
pub struct InvoiceIssuer {
    rentals: Arc<dyn RentalRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    fees: Arc<dyn FeeScheduleStore>,
}

impl InvoiceIssuer {
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        fees: Arc<dyn FeeScheduleStore>,
    ) -> Self {
        Self {
            rentals,
            invoices,
            fees,
        }
    }

    /// Create the invoice for a completed rental.
    ///
    /// A rental that is missing or still active fails with `NotCompleted`.
    /// Safe to re-run after a crash between completion and invoicing; it
    /// only requires `end_time` to be set.
    pub async fn create_for_rental(&self, rental_id: &RentalId, due_days: i64) -> Result<Invoice> {
        let rental = self
            .rentals
            .get(rental_id)
            .await?
            .filter(|r| r.end_time.is_some())
            .ok_or_else(|| RentalError::NotCompleted {
                id: rental_id.to_string(),
            })?;

        let end_zone = rental.end_zone.unwrap_or(ZoneLabel::OutOfBounds);

        let fee = self.fees.current().await?;
        let duration_minutes = rental.duration().num_seconds() as f64 / 60.0;
        let amount =
            BillingCalculator::compute(rental.start_zone, end_zone, duration_minutes, &fee);

        let invoice = Invoice::new(rental.id, amount, Utc::now() + Duration::days(due_days));
        self.invoices.create(&invoice).await?;

        debug!(
            rental_id = %rental.id,
            invoice_id = %invoice.id,
            amount = %invoice.amount,
            "issued invoice"
        );

        Ok(invoice)
    }
}
