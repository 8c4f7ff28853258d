use crate::domain::invoices::Invoice;
use crate::domain::types::{InvoiceId, InvoiceStatus, RentalId};
use crate::error::{RentalError, Result};
use crate::storage::postgres::PgDatabase;
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn create(&self, invoice: &Invoice) -> Result<()>;
    async fn get_by_rental(&self, rental_id: &RentalId) -> Result<Option<Invoice>>;
}

pub struct SqlInvoiceRepository {
    db: Arc<PgDatabase>,
}

impl SqlInvoiceRepository {
    pub fn new(db: Arc<PgDatabase>) -> Self {
        Self { db }
    }

    fn invoice_from_row(row: &sqlx::postgres::PgRow) -> Invoice {
        let status: String = row.get("status");
        Invoice {
            id: InvoiceId::from_uuid(row.get("invoice_id")),
            rental_id: RentalId::from_uuid(row.get("rental_id")),
            amount: row.get("amount"),
            due_date: row.get("due_date"),
            status: InvoiceStatus::parse(&status),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl InvoiceRepository for SqlInvoiceRepository {
    async fn create(&self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (invoice_id, rental_id, amount, due_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.rental_id.as_uuid())
        .bind(invoice.amount)
        .bind(invoice.due_date)
        .bind(invoice.status.as_str())
        .bind(invoice.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("create_invoice", e))?;

        Ok(())
    }

    async fn get_by_rental(&self, rental_id: &RentalId) -> Result<Option<Invoice>> {
        let row = sqlx::query(
            r#"
            SELECT invoice_id, rental_id, amount, due_date, status, created_at
            FROM invoices
            WHERE rental_id = $1
            "#,
        )
        .bind(rental_id.as_uuid())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("get_invoice_by_rental", e))?;

        Ok(row.map(|r| Self::invoice_from_row(&r)))
    }
}

/// In-memory invoice store for tests.
pub struct InvoiceBook {
    invoices: Arc<RwLock<HashMap<RentalId, Invoice>>>,
}

impl InvoiceBook {
    pub fn new() -> Self {
        Self {
            invoices: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InvoiceBook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvoiceRepository for InvoiceBook {
    async fn create(&self, invoice: &Invoice) -> Result<()> {
        let mut invoices = self.invoices.write().await;
        invoices.insert(invoice.rental_id, invoice.clone());
        Ok(())
    }

    async fn get_by_rental(&self, rental_id: &RentalId) -> Result<Option<Invoice>> {
        let invoices = self.invoices.read().await;
        Ok(invoices.get(rental_id).cloned())
    }
}
