//! Read-only access to catalog collaborator entities
//!
//! Products, salesmen and shops are owned elsewhere; the workflows only
//! need existence, pricing, activity and assignment lookups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{Product, Salesman, Shop};

/// Catalog lookup service
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    sku: String,
    retail_price: Decimal,
    wholesale_price: Decimal,
    unit_cost: Decimal,
    minimum_stock: i32,
    reorder_quantity: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            sku: row.sku,
            retail_price: row.retail_price,
            wholesale_price: row.wholesale_price,
            unit_cost: row.unit_cost,
            minimum_stock: row.minimum_stock,
            reorder_quantity: row.reorder_quantity,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a product by id
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, sku, retail_price, wholesale_price, unit_cost,
                   minimum_stock, reorder_quantity, is_active, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

        Ok(row.into())
    }

    /// Resolve every product id in a line-item list, failing with
    /// `NotFound` naming the first unresolved id
    pub async fn get_products(&self, product_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, sku, retail_price, wholesale_price, unit_cost,
                   minimum_stock, reorder_quantity, is_active, created_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        let products: HashMap<Uuid, Product> =
            rows.into_iter().map(|r| (r.id, Product::from(r))).collect();

        for id in product_ids {
            if !products.contains_key(id) {
                return Err(AppError::NotFound(format!("Product {}", id)));
            }
        }

        Ok(products)
    }

    /// Get a salesman by id
    pub async fn get_salesman(&self, salesman_id: Uuid) -> AppResult<Salesman> {
        let row = sqlx::query_as::<_, (Uuid, String, Option<String>, bool)>(
            "SELECT id, name, phone, is_active FROM salesmen WHERE id = $1",
        )
        .bind(salesman_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Salesman {}", salesman_id)))?;

        Ok(Salesman {
            id: row.0,
            name: row.1,
            phone: row.2,
            is_active: row.3,
        })
    }

    /// Get a salesman, rejecting inactive ones
    pub async fn get_active_salesman(&self, salesman_id: Uuid) -> AppResult<Salesman> {
        let salesman = self.get_salesman(salesman_id).await?;
        if !salesman.is_active {
            return Err(AppError::validation(
                "salesman_id",
                format!("Salesman {} is not active", salesman_id),
            ));
        }
        Ok(salesman)
    }

    /// Get a shop by id
    pub async fn get_shop(&self, shop_id: Uuid) -> AppResult<Shop> {
        let row = sqlx::query_as::<_, (Uuid, String, Option<Uuid>, bool)>(
            "SELECT id, name, assigned_salesman_id, is_active FROM shops WHERE id = $1",
        )
        .bind(shop_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shop {}", shop_id)))?;

        Ok(Shop {
            id: row.0,
            name: row.1,
            assigned_salesman_id: row.2,
            is_active: row.3,
        })
    }

    /// Get a shop, rejecting inactive ones
    pub async fn get_active_shop(&self, shop_id: Uuid) -> AppResult<Shop> {
        let shop = self.get_shop(shop_id).await?;
        if !shop.is_active {
            return Err(AppError::validation(
                "shop_id",
                format!("Shop {} is not active", shop_id),
            ));
        }
        Ok(shop)
    }
}
