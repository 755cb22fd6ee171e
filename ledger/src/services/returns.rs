//! Return workflow
//!
//! Two reverse movements: a shop handing goods back to its salesman (the
//! goods stay inside the salesman's scope, so no ledger transaction is
//! logged), and a salesman's end-of-day hand-back to the warehouse.
//! End-of-day items in sellable condition go back into warehouse stock as
//! a `transfer_in`; damaged/expired items leave circulation permanently as
//! a `stock_out` to waste.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::reference::{generate_unique_reference, DEFAULT_MAX_ATTEMPTS};
use crate::services::catalog::CatalogService;
use crate::services::stock::{NewStockTransaction, StockService};
use shared::{
    validate_item_quantities, validate_unit_price, ItemCondition, PartyType, Product, Return,
    ReturnItem, ReturnStatus, ReturnType, SalesmanMovement, StockAccount, WarehouseMovement,
};

/// Return workflow service
#[derive(Clone)]
pub struct ReturnService {
    db: PgPool,
    catalog: CatalogService,
    stock: StockService,
}

/// A requested line on a return
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Explicit price override; defaults to retail (shop returns) or
    /// wholesale (end-of-day returns)
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub condition: ItemCondition,
}

/// Input for a shop handing goods back to its salesman
#[derive(Debug, Deserialize)]
pub struct CreateShopReturnInput {
    pub shop_id: Uuid,
    pub items: Vec<ReturnItemInput>,
    pub reason: Option<String>,
    /// Order the goods originally went out on, when known
    pub order_id: Option<Uuid>,
}

/// Input for a salesman's end-of-day hand-back to the warehouse
#[derive(Debug, Deserialize)]
pub struct CreateSalesmanReturnInput {
    pub salesman_id: Uuid,
    pub items: Vec<ReturnItemInput>,
    pub notes: Option<String>,
}

#[derive(Debug, FromRow)]
struct ReturnRow {
    id: Uuid,
    reference_number: String,
    return_type: String,
    shop_id: Option<Uuid>,
    salesman_id: Uuid,
    order_id: Option<Uuid>,
    return_reason: Option<String>,
    status: String,
    total_amount: Decimal,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReturnRow> for Return {
    type Error = AppError;

    fn try_from(row: ReturnRow) -> Result<Self, AppError> {
        let return_type = ReturnType::from_str(&row.return_type)
            .ok_or_else(|| anyhow::anyhow!("unknown return type {}", row.return_type))?;
        let status = ReturnStatus::from_str(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown return status {}", row.status))?;

        Ok(Return {
            id: row.id,
            reference_number: row.reference_number,
            return_type,
            shop_id: row.shop_id,
            salesman_id: row.salesman_id,
            order_id: row.order_id,
            return_reason: row.return_reason,
            status,
            total_amount: row.total_amount,
            created_by: row.created_by,
            created_at: row.created_at,
            items: Vec::new(),
        })
    }
}

#[derive(Debug, FromRow)]
struct ReturnItemRow {
    id: Uuid,
    return_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
    condition: String,
}

impl TryFrom<ReturnItemRow> for ReturnItem {
    type Error = AppError;

    fn try_from(row: ReturnItemRow) -> Result<Self, AppError> {
        let condition = ItemCondition::from_str(&row.condition)
            .ok_or_else(|| anyhow::anyhow!("unknown item condition {}", row.condition))?;

        Ok(ReturnItem {
            id: row.id,
            return_id: row.return_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
            condition,
        })
    }
}

impl ReturnService {
    pub fn new(db: PgPool, catalog: CatalogService, stock: StockService) -> Self {
        Self { db, catalog, stock }
    }

    /// Record a shop handing goods back to its salesman
    ///
    /// The acting salesman must be the shop's assigned salesman. The
    /// goods go back into the salesman's remaining stock regardless of
    /// condition; disposal of damaged goods happens later, on the
    /// end-of-day return. Priced at retail.
    pub async fn create_shop_return(
        &self,
        acting_salesman_id: Uuid,
        input: CreateShopReturnInput,
    ) -> AppResult<Return> {
        self.validate_items(&input.items)?;

        let shop = self.catalog.get_shop(input.shop_id).await?;
        if shop.assigned_salesman_id != Some(acting_salesman_id) {
            return Err(AppError::Unauthorized(format!(
                "Salesman {} is not assigned to shop {}",
                acting_salesman_id, shop.id
            )));
        }

        if let Some(order_id) = input.order_id {
            let shop_matches: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1 AND shop_id = $2)",
            )
            .bind(order_id)
            .bind(shop.id)
            .fetch_one(&self.db)
            .await?;
            if !shop_matches {
                return Err(AppError::NotFound(format!(
                    "Order {} for shop {}",
                    order_id, shop.id
                )));
            }
        }

        let products = self.load_products(&input.items).await?;

        let mut tx = self.db.begin().await?;

        let reference = generate_unique_reference(
            &mut tx,
            "returns",
            ReturnType::Shop.reference_prefix(),
            DEFAULT_MAX_ATTEMPTS,
        )
        .await?;

        let header = self
            .insert_header(
                &mut tx,
                &reference,
                ReturnType::Shop,
                Some(shop.id),
                acting_salesman_id,
                input.order_id,
                input.reason.as_deref(),
                acting_salesman_id,
            )
            .await?;

        let mut items = Vec::with_capacity(input.items.len());
        let mut total = Decimal::ZERO;

        for item in &input.items {
            let product = &products[&item.product_id];
            let unit_price = self.unit_price(item, product.retail_price)?;
            let inserted = self
                .insert_item(&mut tx, header.id, item, unit_price)
                .await?;
            total += inserted.line_total;
            items.push(ReturnItem::try_from(inserted)?);

            // Back into the salesman's bag; no ledger transaction because
            // stock never left the salesman's scope.
            self.stock
                .apply_salesman_movement(
                    &mut tx,
                    acting_salesman_id,
                    item.product_id,
                    SalesmanMovement::ShopReturn,
                    item.quantity,
                )
                .await?;
        }

        let mut shop_return = self.finalize_header(&mut tx, header.id, total).await?;

        tx.commit().await?;

        tracing::info!(
            reference = %shop_return.reference_number,
            shop_id = %shop.id,
            total = %shop_return.total_amount,
            "shop return recorded"
        );

        shop_return.items = items;
        Ok(shop_return)
    }

    /// Record a salesman's end-of-day return to the warehouse
    ///
    /// Warehouse-manager initiated. Every item must still be in the
    /// salesman's remaining stock. Sellable items go back into warehouse
    /// stock (`transfer_in`); damaged/expired items are written out of
    /// circulation (`stock_out` to waste). Priced at wholesale.
    pub async fn create_salesman_return(
        &self,
        created_by: Uuid,
        input: CreateSalesmanReturnInput,
    ) -> AppResult<Return> {
        self.validate_items(&input.items)?;
        let salesman = self.catalog.get_salesman(input.salesman_id).await?;
        let products = self.load_products(&input.items).await?;

        let mut tx = self.db.begin().await?;

        let reference = generate_unique_reference(
            &mut tx,
            "returns",
            ReturnType::Salesman.reference_prefix(),
            DEFAULT_MAX_ATTEMPTS,
        )
        .await?;

        let header = self
            .insert_header(
                &mut tx,
                &reference,
                ReturnType::Salesman,
                None,
                salesman.id,
                None,
                input.notes.as_deref(),
                created_by,
            )
            .await?;

        let mut items = Vec::with_capacity(input.items.len());
        let mut touched_accounts: Vec<StockAccount> = Vec::new();
        let mut total = Decimal::ZERO;

        for item in &input.items {
            let product = &products[&item.product_id];
            let unit_price = self.unit_price(item, product.wholesale_price)?;
            let inserted = self
                .insert_item(&mut tx, header.id, item, unit_price)
                .await?;
            total += inserted.line_total;
            items.push(ReturnItem::try_from(inserted)?);

            self.stock
                .apply_salesman_movement(
                    &mut tx,
                    salesman.id,
                    item.product_id,
                    SalesmanMovement::WarehouseReturn,
                    item.quantity,
                )
                .await?;

            let movement = if item.condition.is_sellable() {
                WarehouseMovement::SalesmanReturn
            } else {
                WarehouseMovement::WasteDisposal
            };
            let destination = if item.condition.is_sellable() {
                PartyType::Warehouse
            } else {
                PartyType::Waste
            };

            let account = self
                .stock
                .apply_warehouse_movement(&mut tx, item.product_id, movement, item.quantity)
                .await?;
            touched_accounts.push(account);

            self.stock
                .log_transaction(
                    &mut tx,
                    NewStockTransaction {
                        product_id: item.product_id,
                        transaction_type: movement.transaction_type(),
                        quantity: item.quantity,
                        source_type: PartyType::Salesman,
                        source_id: Some(salesman.id),
                        destination_type: destination,
                        destination_id: None,
                        created_by: Some(created_by),
                        notes: Some(format!("Return {}", reference)),
                    },
                )
                .await?;
        }

        let mut eod_return = self.finalize_header(&mut tx, header.id, total).await?;

        tx.commit().await?;

        for account in &touched_accounts {
            self.stock.events().notify_if_low(account);
        }

        tracing::info!(
            reference = %eod_return.reference_number,
            salesman_id = %salesman.id,
            total = %eod_return.total_amount,
            "end-of-day return processed"
        );

        eod_return.items = items;
        Ok(eod_return)
    }

    /// Get a return with its items
    pub async fn get_return(&self, return_id: Uuid) -> AppResult<Return> {
        let row = sqlx::query_as::<_, ReturnRow>(
            r#"
            SELECT id, reference_number, return_type, shop_id, salesman_id, order_id,
                   return_reason, status, total_amount, created_by, created_at
            FROM returns
            WHERE id = $1
            "#,
        )
        .bind(return_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Return {}", return_id)))?;

        let mut ret = Return::try_from(row)?;

        let items = sqlx::query_as::<_, ReturnItemRow>(
            r#"
            SELECT id, return_id, product_id, quantity, unit_price, line_total, condition
            FROM return_items
            WHERE return_id = $1
            ORDER BY id
            "#,
        )
        .bind(return_id)
        .fetch_all(&self.db)
        .await?;

        ret.items = items
            .into_iter()
            .map(ReturnItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ret)
    }

    /// List returns involving a salesman, newest first
    pub async fn list_returns_for_salesman(&self, salesman_id: Uuid) -> AppResult<Vec<Return>> {
        let rows = sqlx::query_as::<_, ReturnRow>(
            r#"
            SELECT id, reference_number, return_type, shop_id, salesman_id, order_id,
                   return_reason, status, total_amount, created_by, created_at
            FROM returns
            WHERE salesman_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(salesman_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Return::try_from).collect()
    }

    fn validate_items(&self, items: &[ReturnItemInput]) -> AppResult<()> {
        let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
        validate_item_quantities(&quantities).map_err(|msg| AppError::validation("items", msg))
    }

    async fn load_products(
        &self,
        items: &[ReturnItemInput],
    ) -> AppResult<std::collections::HashMap<Uuid, Product>> {
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        self.catalog.get_products(&ids).await
    }

    fn unit_price(&self, item: &ReturnItemInput, default_price: Decimal) -> AppResult<Decimal> {
        match item.unit_price {
            Some(price) => {
                validate_unit_price(price)
                    .map_err(|msg| AppError::validation("unit_price", msg))?;
                Ok(price)
            }
            None => Ok(default_price),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reference: &str,
        return_type: ReturnType,
        shop_id: Option<Uuid>,
        salesman_id: Uuid,
        order_id: Option<Uuid>,
        reason: Option<&str>,
        created_by: Uuid,
    ) -> AppResult<Return> {
        let row = sqlx::query_as::<_, ReturnRow>(
            r#"
            INSERT INTO returns
                (reference_number, return_type, shop_id, salesman_id, order_id,
                 return_reason, status, total_amount, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8)
            RETURNING id, reference_number, return_type, shop_id, salesman_id, order_id,
                      return_reason, status, total_amount, created_by, created_at
            "#,
        )
        .bind(reference)
        .bind(return_type.as_str())
        .bind(shop_id)
        .bind(salesman_id)
        .bind(order_id)
        .bind(reason)
        .bind(ReturnStatus::Completed.as_str())
        .bind(created_by)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }

    async fn insert_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        return_id: Uuid,
        item: &ReturnItemInput,
        unit_price: Decimal,
    ) -> AppResult<ReturnItemRow> {
        let line_total = unit_price * Decimal::from(item.quantity);

        let row = sqlx::query_as::<_, ReturnItemRow>(
            r#"
            INSERT INTO return_items (return_id, product_id, quantity, unit_price, line_total, condition)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, return_id, product_id, quantity, unit_price, line_total, condition
            "#,
        )
        .bind(return_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(unit_price)
        .bind(line_total)
        .bind(item.condition.as_str())
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    async fn finalize_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        return_id: Uuid,
        total: Decimal,
    ) -> AppResult<Return> {
        let row = sqlx::query_as::<_, ReturnRow>(
            r#"
            UPDATE returns
            SET total_amount = $2
            WHERE id = $1
            RETURNING id, reference_number, return_type, shop_id, salesman_id, order_id,
                      return_reason, status, total_amount, created_by, created_at
            "#,
        )
        .bind(return_id)
        .bind(total)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }
}
