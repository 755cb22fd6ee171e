//! Read-only views of catalog collaborator entities
//!
//! Products, salesmen and shops are owned and mutated by the catalog and
//! personnel collaborators; the ledger only reads them for existence,
//! pricing and assignment checks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product as seen by the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    /// Price charged per unit on retail sales and shop orders
    pub retail_price: Decimal,
    /// Price charged per unit on salesman and wholesale movements
    pub wholesale_price: Decimal,
    /// Production/purchase cost per unit, read-only to the ledger
    pub unit_cost: Decimal,
    /// Low-stock alert threshold copied onto the stock account at creation
    pub minimum_stock: i32,
    pub reorder_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Field salesman reference view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salesman {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub is_active: bool,
}

/// Shop reference view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub id: Uuid,
    pub name: String,
    /// Salesman responsible for serving this shop
    pub assigned_salesman_id: Option<Uuid>,
    pub is_active: bool,
}
