//! Distribution models
//!
//! A distribution is a warehouse-initiated movement of stock to a salesman
//! or straight out of the business to a wholesale/retail buyer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of distribution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    Salesman,
    Wholesale,
    Retail,
}

impl DistributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionType::Salesman => "salesman",
            DistributionType::Wholesale => "wholesale",
            DistributionType::Retail => "retail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "salesman" => Some(DistributionType::Salesman),
            "wholesale" => Some(DistributionType::Wholesale),
            "retail" => Some(DistributionType::Retail),
            _ => None,
        }
    }

    /// Reference-number prefix stamped on this kind of distribution
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            DistributionType::Salesman => "DIST",
            DistributionType::Wholesale => "WHSL",
            DistributionType::Retail => "RTL",
        }
    }
}

/// Distribution lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    #[default]
    Completed,
    Cancelled,
}

impl DistributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionStatus::Completed => "completed",
            DistributionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(DistributionStatus::Completed),
            "cancelled" => Some(DistributionStatus::Cancelled),
            _ => None,
        }
    }
}

/// A distribution document
///
/// Created once and immutable except for status transitions. For salesman
/// distributions `salesman_id` is set; for wholesale/retail the buyer is
/// external and only `recipient_name`/`recipient_contact` are recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub id: Uuid,
    pub reference_number: String,
    pub distribution_type: DistributionType,
    pub salesman_id: Option<Uuid>,
    pub recipient_name: Option<String>,
    pub recipient_contact: Option<String>,
    pub status: DistributionStatus,
    pub payment_method: Option<String>,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<DistributionItem>,
}

/// A line on a distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionItem {
    pub id: Uuid,
    pub distribution_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}
