//! Transaction log query surface
//!
//! Read-only: entries are appended exclusively inside the three workflow
//! transactions and are never updated or deleted afterwards.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use shared::{
    PaginatedResponse, Pagination, PaginationMeta, StockTransaction, TransactionType,
};

/// Transaction log service
#[derive(Clone)]
pub struct TransactionService {
    db: PgPool,
}

/// Filter for listing transactions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub product_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TransactionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List transactions matching the filter, newest first
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockTransaction>> {
        let transaction_type = filter.transaction_type.map(|t| t.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM stock_transactions
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::text IS NULL OR transaction_type = $2)
              AND ($3::timestamptz IS NULL OR transaction_date >= $3)
              AND ($4::timestamptz IS NULL OR transaction_date <= $4)
            "#,
        )
        .bind(filter.product_id)
        .bind(transaction_type)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, super::stock::StockTransactionRow>(
            r#"
            SELECT id, product_id, transaction_type, quantity, source_type, source_id,
                   destination_type, destination_id, created_by, notes, transaction_date
            FROM stock_transactions
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::text IS NULL OR transaction_type = $2)
              AND ($3::timestamptz IS NULL OR transaction_date >= $3)
              AND ($4::timestamptz IS NULL OR transaction_date <= $4)
            ORDER BY transaction_date DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.product_id)
        .bind(transaction_type)
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(StockTransaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta {
                page: pagination.page,
                per_page: pagination.per_page,
                total: total as u64,
            },
        })
    }

    /// Full movement history for one product, newest first
    pub async fn get_transactions_for_product(
        &self,
        product_id: Uuid,
    ) -> AppResult<Vec<StockTransaction>> {
        let rows = sqlx::query_as::<_, super::stock::StockTransactionRow>(
            r#"
            SELECT id, product_id, transaction_type, quantity, source_type, source_id,
                   destination_type, destination_id, created_by, notes, transaction_date
            FROM stock_transactions
            WHERE product_id = $1
            ORDER BY transaction_date DESC, id DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockTransaction::try_from).collect()
    }
}
