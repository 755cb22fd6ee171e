//! Distribution workflow
//!
//! Moves stock out of the warehouse: to a salesman's field account
//! (ownership stays with the business) or straight to a wholesale/retail
//! buyer (goods leave the business). Every operation runs inside one
//! database transaction: header, items, account deltas and log entries
//! commit or roll back together.

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
    validate_item_quantities, validate_unit_price, Distribution, DistributionItem,
    DistributionStatus, DistributionType, PartyType, PaymentMethod, Product, SalesmanMovement,
    StockAccount, WarehouseMovement,
};

/// Distribution workflow service
#[derive(Clone)]
pub struct DistributionService {
    db: PgPool,
    catalog: CatalogService,
    stock: StockService,
}

/// A requested line on a distribution
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Explicit price override; defaults to the product's wholesale price
    /// (salesman/wholesale) or retail price (retail)
    pub unit_price: Option<Decimal>,
}

/// Input for distributing stock to a salesman
#[derive(Debug, Deserialize)]
pub struct DistributeToSalesmanInput {
    pub salesman_id: Uuid,
    pub items: Vec<DistributionItemInput>,
    pub notes: Option<String>,
}

/// Input for a wholesale or retail sale out of the warehouse
#[derive(Debug, Deserialize)]
pub struct DistributeExternalInput {
    pub recipient_name: String,
    pub recipient_contact: Option<String>,
    pub items: Vec<DistributionItemInput>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, FromRow)]
struct DistributionRow {
    id: Uuid,
    reference_number: String,
    distribution_type: String,
    salesman_id: Option<Uuid>,
    recipient_name: Option<String>,
    recipient_contact: Option<String>,
    status: String,
    payment_method: Option<String>,
    total_amount: Decimal,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DistributionRow> for Distribution {
    type Error = AppError;

    fn try_from(row: DistributionRow) -> Result<Self, AppError> {
        let distribution_type = DistributionType::from_str(&row.distribution_type)
            .ok_or_else(|| anyhow::anyhow!("unknown distribution type {}", row.distribution_type))?;
        let status = DistributionStatus::from_str(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown distribution status {}", row.status))?;

        Ok(Distribution {
            id: row.id,
            reference_number: row.reference_number,
            distribution_type,
            salesman_id: row.salesman_id,
            recipient_name: row.recipient_name,
            recipient_contact: row.recipient_contact,
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
struct DistributionItemRow {
    id: Uuid,
    distribution_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
}

impl From<DistributionItemRow> for DistributionItem {
    fn from(row: DistributionItemRow) -> Self {
        DistributionItem {
            id: row.id,
            distribution_id: row.distribution_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

impl DistributionService {
    pub fn new(db: PgPool, catalog: CatalogService, stock: StockService) -> Self {
        Self { db, catalog, stock }
    }

    /// Distribute stock from the warehouse to a salesman
    ///
    /// Warehouse stock drops and allocated stock rises by the same amount;
    /// current stock is unchanged because ownership stays internal. The
    /// salesman's field account is credited and a `transfer_out` logged
    /// per item.
    pub async fn distribute_to_salesman(
        &self,
        created_by: Uuid,
        input: DistributeToSalesmanInput,
    ) -> AppResult<Distribution> {
        self.validate_items(&input.items)?;
        let salesman = self.catalog.get_active_salesman(input.salesman_id).await?;
        let products = self.load_products(&input.items).await?;

        let mut tx = self.db.begin().await?;

        let reference = generate_unique_reference(
            &mut tx,
            "distributions",
            DistributionType::Salesman.reference_prefix(),
            DEFAULT_MAX_ATTEMPTS,
        )
        .await?;

        let header = self
            .insert_header(
                &mut tx,
                &reference,
                DistributionType::Salesman,
                Some(salesman.id),
                None,
                None,
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
            let unit_price = self.unit_price(item, product, DistributionType::Salesman)?;
            let inserted = self
                .insert_item(&mut tx, header.id, item, unit_price)
                .await?;
            total += inserted.total_price;
            items.push(DistributionItem::from(inserted));

            let account = self
                .stock
                .apply_warehouse_movement(
                    &mut tx,
                    item.product_id,
                    WarehouseMovement::SalesmanAllocation,
                    item.quantity,
                )
                .await?;
            touched_accounts.push(account);

            self.stock
                .apply_salesman_movement(
                    &mut tx,
                    salesman.id,
                    item.product_id,
                    SalesmanMovement::Allocation,
                    item.quantity,
                )
                .await?;

            self.stock
                .log_transaction(
                    &mut tx,
                    NewStockTransaction {
                        product_id: item.product_id,
                        transaction_type: WarehouseMovement::SalesmanAllocation.transaction_type(),
                        quantity: item.quantity,
                        source_type: PartyType::Warehouse,
                        source_id: None,
                        destination_type: PartyType::Salesman,
                        destination_id: Some(salesman.id),
                        created_by: Some(created_by),
                        notes: Some(format!("Distribution {}", reference)),
                    },
                )
                .await?;
        }

        let mut distribution = self.finalize_header(&mut tx, header.id, total).await?;

        tx.commit().await?;

        for account in &touched_accounts {
            self.stock.events().notify_if_low(account);
        }

        tracing::info!(
            reference = %distribution.reference_number,
            salesman_id = %salesman.id,
            total = %distribution.total_amount,
            "distributed stock to salesman"
        );

        distribution.items = items;
        Ok(distribution)
    }

    /// Sell stock wholesale straight out of the warehouse
    pub async fn distribute_wholesale(
        &self,
        created_by: Uuid,
        input: DistributeExternalInput,
    ) -> AppResult<Distribution> {
        self.distribute_external(created_by, DistributionType::Wholesale, input)
            .await
    }

    /// Sell stock retail straight out of the warehouse
    pub async fn distribute_retail(
        &self,
        created_by: Uuid,
        input: DistributeExternalInput,
    ) -> AppResult<Distribution> {
        self.distribute_external(created_by, DistributionType::Retail, input)
            .await
    }

    async fn distribute_external(
        &self,
        created_by: Uuid,
        distribution_type: DistributionType,
        input: DistributeExternalInput,
    ) -> AppResult<Distribution> {
        self.validate_items(&input.items)?;
        if input.recipient_name.trim().is_empty() {
            return Err(AppError::validation(
                "recipient_name",
                "Recipient name is required",
            ));
        }
        let products = self.load_products(&input.items).await?;

        let customer_party = match distribution_type {
            DistributionType::Wholesale => PartyType::WholesaleCustomer,
            DistributionType::Retail => PartyType::RetailCustomer,
            DistributionType::Salesman => unreachable!("external path"),
        };

        let mut tx = self.db.begin().await?;

        let reference = generate_unique_reference(
            &mut tx,
            "distributions",
            distribution_type.reference_prefix(),
            DEFAULT_MAX_ATTEMPTS,
        )
        .await?;

        let header = self
            .insert_header(
                &mut tx,
                &reference,
                distribution_type,
                None,
                Some(input.recipient_name.trim()),
                input.recipient_contact.as_deref(),
                Some(input.payment_method),
                input.notes.as_deref(),
                created_by,
            )
            .await?;

        let mut items = Vec::with_capacity(input.items.len());
        let mut touched_accounts: Vec<StockAccount> = Vec::new();
        let mut total = Decimal::ZERO;

        for item in &input.items {
            let product = &products[&item.product_id];
            let unit_price = self.unit_price(item, product, distribution_type)?;
            let inserted = self
                .insert_item(&mut tx, header.id, item, unit_price)
                .await?;
            total += inserted.total_price;
            items.push(DistributionItem::from(inserted));

            let account = self
                .stock
                .apply_warehouse_movement(
                    &mut tx,
                    item.product_id,
                    WarehouseMovement::ExternalSale,
                    item.quantity,
                )
                .await?;
            touched_accounts.push(account);

            self.stock
                .log_transaction(
                    &mut tx,
                    NewStockTransaction {
                        product_id: item.product_id,
                        transaction_type: WarehouseMovement::ExternalSale.transaction_type(),
                        quantity: item.quantity,
                        source_type: PartyType::Warehouse,
                        source_id: None,
                        destination_type: customer_party,
                        destination_id: None,
                        created_by: Some(created_by),
                        notes: Some(format!("Distribution {}", reference)),
                    },
                )
                .await?;
        }

        let mut distribution = self.finalize_header(&mut tx, header.id, total).await?;

        tx.commit().await?;

        for account in &touched_accounts {
            self.stock.events().notify_if_low(account);
        }

        tracing::info!(
            reference = %distribution.reference_number,
            distribution_type = distribution_type.as_str(),
            total = %distribution.total_amount,
            "sold stock to external buyer"
        );

        distribution.items = items;
        Ok(distribution)
    }

    /// Get a distribution with its items
    pub async fn get_distribution(&self, distribution_id: Uuid) -> AppResult<Distribution> {
        let row = sqlx::query_as::<_, DistributionRow>(
            r#"
            SELECT id, reference_number, distribution_type, salesman_id, recipient_name,
                   recipient_contact, status, payment_method, total_amount, notes,
                   created_by, created_at
            FROM distributions
            WHERE id = $1
            "#,
        )
        .bind(distribution_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Distribution {}", distribution_id)))?;

        let mut distribution = Distribution::try_from(row)?;

        let items = sqlx::query_as::<_, DistributionItemRow>(
            r#"
            SELECT id, distribution_id, product_id, quantity, unit_price, total_price
            FROM distribution_items
            WHERE distribution_id = $1
            ORDER BY id
            "#,
        )
        .bind(distribution_id)
        .fetch_all(&self.db)
        .await?;

        distribution.items = items.into_iter().map(Into::into).collect();
        Ok(distribution)
    }

    /// List distributions for a salesman, newest first
    pub async fn list_distributions_for_salesman(
        &self,
        salesman_id: Uuid,
    ) -> AppResult<Vec<Distribution>> {
        let rows = sqlx::query_as::<_, DistributionRow>(
            r#"
            SELECT id, reference_number, distribution_type, salesman_id, recipient_name,
                   recipient_contact, status, payment_method, total_amount, notes,
                   created_by, created_at
            FROM distributions
            WHERE salesman_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(salesman_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Distribution::try_from).collect()
    }

    fn validate_items(&self, items: &[DistributionItemInput]) -> AppResult<()> {
        let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
        validate_item_quantities(&quantities).map_err(|msg| AppError::validation("items", msg))
    }

    async fn load_products(
        &self,
        items: &[DistributionItemInput],
    ) -> AppResult<std::collections::HashMap<Uuid, Product>> {
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = self.catalog.get_products(&ids).await?;
        for product in products.values() {
            if !product.is_active {
                return Err(AppError::validation(
                    "items",
                    format!("Product {} is not active", product.id),
                ));
            }
        }
        Ok(products)
    }

    fn unit_price(
        &self,
        item: &DistributionItemInput,
        product: &Product,
        distribution_type: DistributionType,
    ) -> AppResult<Decimal> {
        let price = match item.unit_price {
            Some(price) => {
                validate_unit_price(price)
                    .map_err(|msg| AppError::validation("unit_price", msg))?;
                price
            }
            None => match distribution_type {
                DistributionType::Salesman | DistributionType::Wholesale => {
                    product.wholesale_price
                }
                DistributionType::Retail => product.retail_price,
            },
        };
        Ok(price)
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reference: &str,
        distribution_type: DistributionType,
        salesman_id: Option<Uuid>,
        recipient_name: Option<&str>,
        recipient_contact: Option<&str>,
        payment_method: Option<PaymentMethod>,
        notes: Option<&str>,
        created_by: Uuid,
    ) -> AppResult<Distribution> {
        let row = sqlx::query_as::<_, DistributionRow>(
            r#"
            INSERT INTO distributions
                (reference_number, distribution_type, salesman_id, recipient_name,
                 recipient_contact, status, payment_method, total_amount, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9)
            RETURNING id, reference_number, distribution_type, salesman_id, recipient_name,
                      recipient_contact, status, payment_method, total_amount, notes,
                      created_by, created_at
            "#,
        )
        .bind(reference)
        .bind(distribution_type.as_str())
        .bind(salesman_id)
        .bind(recipient_name)
        .bind(recipient_contact)
        .bind(DistributionStatus::Completed.as_str())
        .bind(payment_method.map(|m| m.as_str()))
        .bind(notes)
        .bind(created_by)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }

    async fn insert_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        distribution_id: Uuid,
        item: &DistributionItemInput,
        unit_price: Decimal,
    ) -> AppResult<DistributionItemRow> {
        let total_price = unit_price * Decimal::from(item.quantity);

        let row = sqlx::query_as::<_, DistributionItemRow>(
            r#"
            INSERT INTO distribution_items (distribution_id, product_id, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, distribution_id, product_id, quantity, unit_price, total_price
            "#,
        )
        .bind(distribution_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(unit_price)
        .bind(total_price)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Write the summed item total back onto the header
    async fn finalize_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        distribution_id: Uuid,
        total: Decimal,
    ) -> AppResult<Distribution> {
        let row = sqlx::query_as::<_, DistributionRow>(
            r#"
            UPDATE distributions
            SET total_amount = $2
            WHERE id = $1
            RETURNING id, reference_number, distribution_type, salesman_id, recipient_name,
                      recipient_contact, status, payment_method, total_amount, notes,
                      created_by, created_at
            "#,
        )
        .bind(distribution_id)
        .bind(total)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }
}
