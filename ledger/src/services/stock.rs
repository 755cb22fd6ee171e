//! Stock account service
//!
//! Owns the two account stores and the transaction log. The three
//! workflows never touch the counters directly: every mutation goes
//! through `apply_warehouse_movement` / `apply_salesman_movement`, so each
//! movement kind has exactly one definition of its effect. The decrement
//! form is a single conditional update (`decrement iff current >=
//! requested`), which serializes concurrent read-check-write sequences on
//! the same account; a failed condition surfaces as `InsufficientStock`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::LowStockEvents;
use shared::{
    validate_quantity, PartyType, SalesmanMovement, SalesmanStockAccount, StockAccount,
    StockTransaction, TransactionType, WarehouseMovement,
};

/// Stock account service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    events: LowStockEvents,
}

#[derive(Debug, FromRow)]
struct StockAccountRow {
    id: Uuid,
    product_id: Uuid,
    current_stock: i32,
    warehouse_stock: i32,
    allocated_stock: i32,
    minimum_threshold: i32,
    reorder_quantity: i32,
    last_updated: DateTime<Utc>,
}

impl From<StockAccountRow> for StockAccount {
    fn from(row: StockAccountRow) -> Self {
        StockAccount {
            id: row.id,
            product_id: row.product_id,
            current_stock: row.current_stock,
            warehouse_stock: row.warehouse_stock,
            allocated_stock: row.allocated_stock,
            minimum_threshold: row.minimum_threshold,
            reorder_quantity: row.reorder_quantity,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, FromRow)]
struct SalesmanStockAccountRow {
    id: Uuid,
    salesman_id: Uuid,
    product_id: Uuid,
    allocated_quantity: i32,
    remaining_quantity: i32,
    sold_quantity: i32,
    returned_quantity: i32,
    last_updated: DateTime<Utc>,
}

impl From<SalesmanStockAccountRow> for SalesmanStockAccount {
    fn from(row: SalesmanStockAccountRow) -> Self {
        SalesmanStockAccount {
            id: row.id,
            salesman_id: row.salesman_id,
            product_id: row.product_id,
            allocated_quantity: row.allocated_quantity,
            remaining_quantity: row.remaining_quantity,
            sold_quantity: row.sold_quantity,
            returned_quantity: row.returned_quantity,
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct StockTransactionRow {
    id: Uuid,
    product_id: Uuid,
    transaction_type: String,
    quantity: i32,
    source_type: String,
    source_id: Option<Uuid>,
    destination_type: String,
    destination_id: Option<Uuid>,
    created_by: Option<Uuid>,
    notes: Option<String>,
    transaction_date: DateTime<Utc>,
}

impl TryFrom<StockTransactionRow> for StockTransaction {
    type Error = AppError;

    fn try_from(row: StockTransactionRow) -> Result<Self, AppError> {
        let transaction_type = TransactionType::from_str(&row.transaction_type)
            .ok_or_else(|| anyhow::anyhow!("unknown transaction type {}", row.transaction_type))?;
        let source_type = PartyType::from_str(&row.source_type)
            .ok_or_else(|| anyhow::anyhow!("unknown party type {}", row.source_type))?;
        let destination_type = PartyType::from_str(&row.destination_type)
            .ok_or_else(|| anyhow::anyhow!("unknown party type {}", row.destination_type))?;

        Ok(StockTransaction {
            id: row.id,
            product_id: row.product_id,
            transaction_type,
            quantity: row.quantity,
            source_type,
            source_id: row.source_id,
            destination_type,
            destination_id: row.destination_id,
            created_by: row.created_by,
            notes: row.notes,
            transaction_date: row.transaction_date,
        })
    }
}

/// A log entry to append inside a workflow transaction
#[derive(Debug, Clone)]
pub struct NewStockTransaction {
    pub product_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub source_type: PartyType,
    pub source_id: Option<Uuid>,
    pub destination_type: PartyType,
    pub destination_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// Input for receiving supplier stock
#[derive(Debug, serde::Deserialize)]
pub struct ReceiveStockInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Input for a manual stock adjustment
#[derive(Debug, serde::Deserialize)]
pub struct AdjustStockInput {
    pub product_id: Uuid,
    /// Signed change applied to both warehouse and current stock
    pub quantity_change: i32,
    pub reason: String,
}

/// Input for recording a physical stocktake
#[derive(Debug, serde::Deserialize)]
pub struct StocktakeInput {
    pub product_id: Uuid,
    /// Units counted on the warehouse floor
    pub counted_quantity: i32,
    pub notes: Option<String>,
}

impl StockService {
    pub fn new(db: PgPool, events: LowStockEvents) -> Self {
        Self { db, events }
    }

    pub fn events(&self) -> &LowStockEvents {
        &self.events
    }

    /// Get the stock account for a product
    pub async fn get_stock_account(&self, product_id: Uuid) -> AppResult<StockAccount> {
        let row = sqlx::query_as::<_, StockAccountRow>(
            r#"
            SELECT id, product_id, current_stock, warehouse_stock, allocated_stock,
                   minimum_threshold, reorder_quantity, last_updated
            FROM stock_accounts
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Stock account for product {}", product_id)))?;

        Ok(row.into())
    }

    /// List all stock accounts
    pub async fn list_stock_accounts(&self) -> AppResult<Vec<StockAccount>> {
        let rows = sqlx::query_as::<_, StockAccountRow>(
            r#"
            SELECT id, product_id, current_stock, warehouse_stock, allocated_stock,
                   minimum_threshold, reorder_quantity, last_updated
            FROM stock_accounts
            ORDER BY last_updated DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List accounts at or below their minimum threshold
    pub async fn list_low_stock_accounts(&self) -> AppResult<Vec<StockAccount>> {
        let rows = sqlx::query_as::<_, StockAccountRow>(
            r#"
            SELECT id, product_id, current_stock, warehouse_stock, allocated_stock,
                   minimum_threshold, reorder_quantity, last_updated
            FROM stock_accounts
            WHERE current_stock <= minimum_threshold
            ORDER BY current_stock ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get the field stock account for a (salesman, product) pair
    pub async fn get_salesman_stock_account(
        &self,
        salesman_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<SalesmanStockAccount> {
        let row = sqlx::query_as::<_, SalesmanStockAccountRow>(
            r#"
            SELECT id, salesman_id, product_id, allocated_quantity, remaining_quantity,
                   sold_quantity, returned_quantity, last_updated
            FROM salesman_stock_accounts
            WHERE salesman_id = $1 AND product_id = $2
            "#,
        )
        .bind(salesman_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Stock account for salesman {} and product {}",
                salesman_id, product_id
            ))
        })?;

        Ok(row.into())
    }

    /// List all field stock accounts for a salesman
    pub async fn list_salesman_stock_accounts(
        &self,
        salesman_id: Uuid,
    ) -> AppResult<Vec<SalesmanStockAccount>> {
        let rows = sqlx::query_as::<_, SalesmanStockAccountRow>(
            r#"
            SELECT id, salesman_id, product_id, allocated_quantity, remaining_quantity,
                   sold_quantity, returned_quantity, last_updated
            FROM salesman_stock_accounts
            WHERE salesman_id = $1
            ORDER BY last_updated DESC
            "#,
        )
        .bind(salesman_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Lazily create the stock account for a product, seeded from the
    /// catalog's threshold and reorder settings. Idempotent.
    pub(crate) async fn ensure_stock_account(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_accounts (product_id, current_stock, warehouse_stock, allocated_stock,
                                        minimum_threshold, reorder_quantity)
            SELECT p.id, 0, 0, 0, p.minimum_stock, p.reorder_quantity
            FROM products p
            WHERE p.id = $1
            ON CONFLICT (product_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Apply one warehouse movement to a product's stock account
    ///
    /// The update carries its own non-negativity conditions, so two
    /// concurrent operations can never jointly over-allocate: the second
    /// one finds the condition false and fails here.
    pub(crate) async fn apply_warehouse_movement(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
        movement: WarehouseMovement,
        quantity: i32,
    ) -> AppResult<StockAccount> {
        validate_quantity(quantity).map_err(|msg| AppError::validation("quantity", msg))?;

        self.ensure_stock_account(tx, product_id).await?;

        let delta = movement.delta(quantity);

        let row = sqlx::query_as::<_, StockAccountRow>(
            r#"
            UPDATE stock_accounts
            SET warehouse_stock = warehouse_stock + $2,
                current_stock   = current_stock + $3,
                allocated_stock = GREATEST(allocated_stock + $4, 0),
                last_updated    = NOW()
            WHERE product_id = $1
              AND warehouse_stock + $2 >= 0
              AND current_stock + $3 >= 0
            RETURNING id, product_id, current_stock, warehouse_stock, allocated_stock,
                      minimum_threshold, reorder_quantity, last_updated
            "#,
        )
        .bind(product_id)
        .bind(delta.warehouse)
        .bind(delta.current)
        .bind(delta.allocated)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let account = sqlx::query_as::<_, StockAccountRow>(
                    r#"
                    SELECT id, product_id, current_stock, warehouse_stock, allocated_stock,
                           minimum_threshold, reorder_quantity, last_updated
                    FROM stock_accounts
                    WHERE product_id = $1
                    "#,
                )
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Stock account for product {}", product_id))
                })?;

                let available = if movement.checks_warehouse_stock() {
                    account.warehouse_stock
                } else {
                    account.current_stock
                };

                Err(AppError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                })
            }
        }
    }

    /// Apply one salesman movement to a (salesman, product) field account
    ///
    /// Allocations upsert the account; every other movement requires it to
    /// exist and carries its own counter conditions, same rationale as the
    /// warehouse update.
    pub(crate) async fn apply_salesman_movement(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        salesman_id: Uuid,
        product_id: Uuid,
        movement: SalesmanMovement,
        quantity: i32,
    ) -> AppResult<SalesmanStockAccount> {
        validate_quantity(quantity).map_err(|msg| AppError::validation("quantity", msg))?;

        let delta = movement.delta(quantity);

        if movement == SalesmanMovement::Allocation {
            let row = sqlx::query_as::<_, SalesmanStockAccountRow>(
                r#"
                INSERT INTO salesman_stock_accounts
                    (salesman_id, product_id, allocated_quantity, remaining_quantity,
                     sold_quantity, returned_quantity)
                VALUES ($1, $2, $3, $3, 0, 0)
                ON CONFLICT (salesman_id, product_id) DO UPDATE
                SET allocated_quantity = salesman_stock_accounts.allocated_quantity + EXCLUDED.allocated_quantity,
                    remaining_quantity = salesman_stock_accounts.remaining_quantity + EXCLUDED.remaining_quantity,
                    last_updated = NOW()
                RETURNING id, salesman_id, product_id, allocated_quantity, remaining_quantity,
                          sold_quantity, returned_quantity, last_updated
                "#,
            )
            .bind(salesman_id)
            .bind(product_id)
            .bind(quantity)
            .fetch_one(&mut **tx)
            .await?;

            return Ok(row.into());
        }

        let row = sqlx::query_as::<_, SalesmanStockAccountRow>(
            r#"
            UPDATE salesman_stock_accounts
            SET remaining_quantity = remaining_quantity + $3,
                sold_quantity      = sold_quantity + $4,
                returned_quantity  = returned_quantity + $5,
                last_updated       = NOW()
            WHERE salesman_id = $1 AND product_id = $2
              AND remaining_quantity + $3 >= 0
              AND sold_quantity + $4 >= 0
            RETURNING id, salesman_id, product_id, allocated_quantity, remaining_quantity,
                      sold_quantity, returned_quantity, last_updated
            "#,
        )
        .bind(salesman_id)
        .bind(product_id)
        .bind(delta.remaining)
        .bind(delta.sold)
        .bind(delta.returned)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let account = sqlx::query_as::<_, SalesmanStockAccountRow>(
                    r#"
                    SELECT id, salesman_id, product_id, allocated_quantity, remaining_quantity,
                           sold_quantity, returned_quantity, last_updated
                    FROM salesman_stock_accounts
                    WHERE salesman_id = $1 AND product_id = $2
                    "#,
                )
                .bind(salesman_id)
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "Stock account for salesman {} and product {}",
                        salesman_id, product_id
                    ))
                })?;

                let available = if movement.checks_sold() {
                    account.sold_quantity
                } else {
                    account.remaining_quantity
                };

                Err(AppError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                })
            }
        }
    }

    /// Append one immutable entry to the transaction log
    pub(crate) async fn log_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: NewStockTransaction,
    ) -> AppResult<StockTransaction> {
        let row = sqlx::query_as::<_, StockTransactionRow>(
            r#"
            INSERT INTO stock_transactions
                (product_id, transaction_type, quantity, source_type, source_id,
                 destination_type, destination_id, created_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, product_id, transaction_type, quantity, source_type, source_id,
                      destination_type, destination_id, created_by, notes, transaction_date
            "#,
        )
        .bind(entry.product_id)
        .bind(entry.transaction_type.as_str())
        .bind(entry.quantity)
        .bind(entry.source_type.as_str())
        .bind(entry.source_id)
        .bind(entry.destination_type.as_str())
        .bind(entry.destination_id)
        .bind(entry.created_by)
        .bind(&entry.notes)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }

    /// Receive goods from a supplier into warehouse stock
    pub async fn receive_stock(
        &self,
        created_by: Uuid,
        input: ReceiveStockInput,
    ) -> AppResult<StockAccount> {
        let mut tx = self.db.begin().await?;

        let account = self
            .apply_warehouse_movement(
                &mut tx,
                input.product_id,
                WarehouseMovement::SupplierReceipt,
                input.quantity,
            )
            .await?;

        self.log_transaction(
            &mut tx,
            NewStockTransaction {
                product_id: input.product_id,
                transaction_type: TransactionType::StockIn,
                quantity: input.quantity,
                source_type: PartyType::Supplier,
                source_id: input.supplier_id,
                destination_type: PartyType::Warehouse,
                destination_id: None,
                created_by: Some(created_by),
                notes: input.notes,
            },
        )
        .await?;

        tx.commit().await?;

        // A receipt can still leave the account at or below threshold
        self.events.notify_if_low(&account);

        tracing::info!(
            product_id = %input.product_id,
            quantity = input.quantity,
            "received supplier stock"
        );

        Ok(account)
    }

    /// Apply a manual signed adjustment to a product's stock
    pub async fn adjust_stock(
        &self,
        created_by: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<StockAccount> {
        if input.quantity_change == 0 {
            return Err(AppError::validation(
                "quantity_change",
                "Adjustment must be non-zero",
            ));
        }
        if input.reason.trim().is_empty() {
            return Err(AppError::validation("reason", "Reason is required"));
        }

        let movement = WarehouseMovement::Adjustment {
            increase: input.quantity_change > 0,
        };
        let quantity = input.quantity_change.abs();

        let mut tx = self.db.begin().await?;

        let account = self
            .apply_warehouse_movement(&mut tx, input.product_id, movement, quantity)
            .await?;

        self.log_transaction(
            &mut tx,
            NewStockTransaction {
                product_id: input.product_id,
                transaction_type: TransactionType::Adjustment,
                quantity,
                source_type: PartyType::Warehouse,
                source_id: None,
                destination_type: PartyType::Warehouse,
                destination_id: None,
                created_by: Some(created_by),
                notes: Some(input.reason),
            },
        )
        .await?;

        tx.commit().await?;

        self.events.notify_if_low(&account);

        Ok(account)
    }

    /// Reconcile warehouse stock against a physical count
    ///
    /// The difference between the count and the book figure is applied to
    /// both warehouse and current stock and logged as a stocktake.
    pub async fn record_stocktake(
        &self,
        created_by: Uuid,
        input: StocktakeInput,
    ) -> AppResult<StockAccount> {
        if input.counted_quantity < 0 {
            return Err(AppError::validation(
                "counted_quantity",
                "Counted quantity cannot be negative",
            ));
        }

        let mut tx = self.db.begin().await?;

        self.ensure_stock_account(&mut tx, input.product_id).await?;

        let book: i32 = sqlx::query_scalar(
            "SELECT warehouse_stock FROM stock_accounts WHERE product_id = $1 FOR UPDATE",
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Stock account for product {}", input.product_id))
        })?;

        let difference = input.counted_quantity - book;
        if difference == 0 {
            tx.commit().await?;
            return self.get_stock_account(input.product_id).await;
        }

        let movement = WarehouseMovement::Adjustment {
            increase: difference > 0,
        };
        let account = self
            .apply_warehouse_movement(&mut tx, input.product_id, movement, difference.abs())
            .await?;

        self.log_transaction(
            &mut tx,
            NewStockTransaction {
                product_id: input.product_id,
                transaction_type: TransactionType::Stocktake,
                quantity: difference.abs(),
                source_type: PartyType::Warehouse,
                source_id: None,
                destination_type: PartyType::Warehouse,
                destination_id: None,
                created_by: Some(created_by),
                notes: input.notes,
            },
        )
        .await?;

        tx.commit().await?;

        self.events.notify_if_low(&account);

        Ok(account)
    }
}
