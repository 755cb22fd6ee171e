//! Return models
//!
//! A return is a reverse movement of stock: shop -> salesman (goods back
//! in the salesman's bag) or salesman -> warehouse (end-of-day
//! reconciliation, with damaged/expired items leaving circulation).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of return
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Shop,
    Salesman,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Shop => "shop",
            ReturnType::Salesman => "salesman",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "shop" => Some(ReturnType::Shop),
            "salesman" => Some(ReturnType::Salesman),
            _ => None,
        }
    }

    /// Reference-number prefix stamped on this kind of return
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            ReturnType::Shop => "RET",
            ReturnType::Salesman => "EOD",
        }
    }
}

/// Physical condition of a returned item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    #[default]
    Good,
    Damaged,
    Expired,
    Other,
}

impl ItemCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCondition::Good => "good",
            ItemCondition::Damaged => "damaged",
            ItemCondition::Expired => "expired",
            ItemCondition::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "good" => Some(ItemCondition::Good),
            "damaged" => Some(ItemCondition::Damaged),
            "expired" => Some(ItemCondition::Expired),
            "other" => Some(ItemCondition::Other),
            _ => None,
        }
    }

    /// Whether goods in this condition go back into sellable warehouse
    /// stock on an end-of-day return; anything else is disposed of.
    pub fn is_sellable(&self) -> bool {
        matches!(self, ItemCondition::Good)
    }
}

/// Return lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Completed => "completed",
            ReturnStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReturnStatus::Pending),
            "completed" => Some(ReturnStatus::Completed),
            "cancelled" => Some(ReturnStatus::Cancelled),
            _ => None,
        }
    }
}

/// A return document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Return {
    pub id: Uuid,
    pub reference_number: String,
    pub return_type: ReturnType,
    /// Set for shop returns only
    pub shop_id: Option<Uuid>,
    pub salesman_id: Uuid,
    /// Order the goods originally went out on, when known
    pub order_id: Option<Uuid>,
    pub return_reason: Option<String>,
    pub status: ReturnStatus,
    pub total_amount: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ReturnItem>,
}

/// A line on a return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnItem {
    pub id: Uuid,
    pub return_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub condition: ItemCondition,
}
