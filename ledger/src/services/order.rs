//! Order workflow
//!
//! Records sales to shops against the assigned salesman's field stock.
//! Salesman-created orders complete immediately and debit stock at
//! creation; shop-created orders start pending and debit stock exactly
//! once, on the transition into `completed`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::reference::{generate_unique_reference, DEFAULT_MAX_ATTEMPTS};
use crate::services::catalog::CatalogService;
use crate::services::stock::StockService;
use shared::{
    validate_item_quantities, validate_unit_price, ActorRole, Order, OrderItem, OrderStatus,
    PaymentMethod, SalesmanMovement,
};

/// Identity of the already-authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct ActorContext {
    pub actor_id: Uuid,
    pub role: ActorRole,
}

/// Order workflow service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    catalog: CatalogService,
    stock: StockService,
}

/// A requested line on an order
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Explicit price override; defaults to the product's retail price
    pub unit_price: Option<Decimal>,
}

/// Input for creating an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub shop_id: Uuid,
    pub items: Vec<OrderItemInput>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    reference_number: String,
    shop_id: Uuid,
    salesman_id: Uuid,
    status: String,
    payment_method: Option<String>,
    total_amount: Decimal,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, AppError> {
        let status = OrderStatus::from_str(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown order status {}", row.status))?;

        Ok(Order {
            id: row.id,
            reference_number: row.reference_number,
            shop_id: row.shop_id,
            salesman_id: row.salesman_id,
            status,
            payment_method: row.payment_method,
            total_amount: row.total_amount,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            items: Vec::new(),
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

impl OrderService {
    pub fn new(db: PgPool, catalog: CatalogService, stock: StockService) -> Self {
        Self { db, catalog, stock }
    }

    /// Create an order for a shop
    ///
    /// The actor must be the shop itself or the shop's assigned salesman.
    /// Salesman orders are created `completed` and consume the salesman's
    /// remaining stock; shop orders are created `pending` with no stock
    /// check until completion.
    pub async fn create_order(
        &self,
        actor: ActorContext,
        input: CreateOrderInput,
    ) -> AppResult<Order> {
        let quantities: Vec<i32> = input.items.iter().map(|i| i.quantity).collect();
        validate_item_quantities(&quantities)
            .map_err(|msg| AppError::validation("items", msg))?;

        let shop = self.catalog.get_active_shop(input.shop_id).await?;
        let salesman_id = shop.assigned_salesman_id.ok_or_else(|| {
            AppError::validation(
                "shop_id",
                format!("Shop {} has no assigned salesman", shop.id),
            )
        })?;

        let initial_status = match actor.role {
            ActorRole::Salesman => {
                if actor.actor_id != salesman_id {
                    return Err(AppError::Unauthorized(format!(
                        "Salesman {} is not assigned to shop {}",
                        actor.actor_id, shop.id
                    )));
                }
                OrderStatus::Completed
            }
            ActorRole::Shop => {
                if actor.actor_id != shop.id {
                    return Err(AppError::Unauthorized(format!(
                        "Actor {} does not own shop {}",
                        actor.actor_id, shop.id
                    )));
                }
                OrderStatus::Pending
            }
            ActorRole::WarehouseManager => {
                return Err(AppError::Unauthorized(
                    "Orders are created by salesmen or shops".to_string(),
                ));
            }
        };

        let ids: Vec<Uuid> = input.items.iter().map(|i| i.product_id).collect();
        let products = self.catalog.get_products(&ids).await?;

        let mut tx = self.db.begin().await?;

        let reference =
            generate_unique_reference(&mut tx, "orders", "ORD", DEFAULT_MAX_ATTEMPTS).await?;

        let header = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders
                (reference_number, shop_id, salesman_id, status, payment_method,
                 total_amount, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
            RETURNING id, reference_number, shop_id, salesman_id, status, payment_method,
                      total_amount, notes, created_by, created_at
            "#,
        )
        .bind(&reference)
        .bind(shop.id)
        .bind(salesman_id)
        .bind(initial_status.as_str())
        .bind(input.payment_method.map(|m| m.as_str()))
        .bind(&input.notes)
        .bind(actor.actor_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        let mut total = Decimal::ZERO;

        for item in &input.items {
            let product = &products[&item.product_id];
            let unit_price = match item.unit_price {
                Some(price) => {
                    validate_unit_price(price)
                        .map_err(|msg| AppError::validation("unit_price", msg))?;
                    price
                }
                None => product.retail_price,
            };
            let line_total = unit_price * Decimal::from(item.quantity);
            total += line_total;

            let row = sqlx::query_as::<_, OrderItemRow>(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, order_id, product_id, quantity, unit_price, line_total
                "#,
            )
            .bind(header.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(unit_price)
            .bind(line_total)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(row));

            // Stock is debited exactly once, at completion; for salesman
            // orders that is right now.
            if initial_status == OrderStatus::Completed {
                self.stock
                    .apply_salesman_movement(
                        &mut tx,
                        salesman_id,
                        item.product_id,
                        SalesmanMovement::Sale,
                        item.quantity,
                    )
                    .await?;
            }
        }

        let finalized = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders
            SET total_amount = $2
            WHERE id = $1
            RETURNING id, reference_number, shop_id, salesman_id, status, payment_method,
                      total_amount, notes, created_by, created_at
            "#,
        )
        .bind(header.id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            reference = %reference,
            shop_id = %shop.id,
            status = initial_status.as_str(),
            "order created"
        );

        let mut order = Order::try_from(finalized)?;
        order.items = items;
        Ok(order)
    }

    /// Transition an order through its state machine
    ///
    /// `pending -> processing|cancelled`,
    /// `processing -> completed|cancelled`; completed and cancelled are
    /// terminal. Moving into `completed` debits the salesman's stock;
    /// cancelling earlier performs no reversal because nothing was
    /// debited.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        notes: Option<String>,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;

        // Lock the order row so two concurrent transitions serialize
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, reference_number, shop_id, salesman_id, status, payment_method,
                   total_amount, notes, created_by, created_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", order_id)))?;

        let order = Order::try_from(row)?;

        if !order.status.can_transition_to(new_status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Order {} cannot move from {} to {}",
                order.reference_number,
                order.status.as_str(),
                new_status.as_str()
            )));
        }

        let items = self.load_items(&mut tx, order_id).await?;

        if new_status == OrderStatus::Completed {
            for item in &items {
                self.stock
                    .apply_salesman_movement(
                        &mut tx,
                        order.salesman_id,
                        item.product_id,
                        SalesmanMovement::Sale,
                        item.quantity,
                    )
                    .await?;
            }
        }

        let updated = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders
            SET status = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            RETURNING id, reference_number, shop_id, salesman_id, status, payment_method,
                      total_amount, notes, created_by, created_at
            "#,
        )
        .bind(order_id)
        .bind(new_status.as_str())
        .bind(&notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            reference = %order.reference_number,
            from = order.status.as_str(),
            to = new_status.as_str(),
            "order status updated"
        );

        let mut order = Order::try_from(updated)?;
        order.items = items;
        Ok(order)
    }

    /// Get an order with its items
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, reference_number, shop_id, salesman_id, status, payment_method,
                   total_amount, notes, created_by, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", order_id)))?;

        let mut order = Order::try_from(row)?;

        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price, line_total
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        order.items = items.into_iter().map(Into::into).collect();
        Ok(order)
    }

    /// List orders for a shop, newest first
    pub async fn list_orders_for_shop(&self, shop_id: Uuid) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, reference_number, shop_id, salesman_id, status, payment_method,
                   total_amount, notes, created_by, created_at
            FROM orders
            WHERE shop_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn load_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> AppResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price, line_total
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(items.into_iter().map(Into::into).collect())
    }
}
