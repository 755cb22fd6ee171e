//! Stock transaction log models
//!
//! Every stock movement is recorded as an immutable transaction; the log
//! is the audit trail from which running balances can be recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of stock transactions
///
/// Closed set: unrecognized strings are rejected at the boundary instead
/// of falling through to an adjustment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Goods entering the business (supplier delivery)
    StockIn,
    /// Goods leaving the business (sale or disposal)
    StockOut,
    /// Goods moving back in from a salesman
    TransferIn,
    /// Goods moving out to a salesman
    TransferOut,
    /// Manual correction by a warehouse manager
    Adjustment,
    /// Physical count reconciliation
    Stocktake,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::StockIn => "stock_in",
            TransactionType::StockOut => "stock_out",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Stocktake => "stocktake",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stock_in" => Some(TransactionType::StockIn),
            "stock_out" => Some(TransactionType::StockOut),
            "transfer_in" => Some(TransactionType::TransferIn),
            "transfer_out" => Some(TransactionType::TransferOut),
            "adjustment" => Some(TransactionType::Adjustment),
            "stocktake" => Some(TransactionType::Stocktake),
            _ => None,
        }
    }
}

/// Parties a movement can originate from or arrive at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
    Warehouse,
    Salesman,
    Shop,
    Supplier,
    WholesaleCustomer,
    RetailCustomer,
    Waste,
}

impl PartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::Warehouse => "warehouse",
            PartyType::Salesman => "salesman",
            PartyType::Shop => "shop",
            PartyType::Supplier => "supplier",
            PartyType::WholesaleCustomer => "wholesale_customer",
            PartyType::RetailCustomer => "retail_customer",
            PartyType::Waste => "waste",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "warehouse" => Some(PartyType::Warehouse),
            "salesman" => Some(PartyType::Salesman),
            "shop" => Some(PartyType::Shop),
            "supplier" => Some(PartyType::Supplier),
            "wholesale_customer" => Some(PartyType::WholesaleCustomer),
            "retail_customer" => Some(PartyType::RetailCustomer),
            "waste" => Some(PartyType::Waste),
            _ => None,
        }
    }
}

/// An immutable stock movement record
///
/// `quantity` is always stored positive; `transaction_type` together with
/// the source/destination parties determines direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub source_type: PartyType,
    pub source_id: Option<Uuid>,
    pub destination_type: PartyType,
    pub destination_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub notes: Option<String>,
    pub transaction_date: DateTime<Utc>,
}
