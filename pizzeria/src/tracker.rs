use crate::model::{Customizations, Order, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// The delivery pipeline, in strict forward order.
pub const STATUS_STEPS: [&str; 4] = ["Received", "In Kitchen", "Sent to Delivery", "Delivered"];

/// Pipeline step index for a status, 0..=3.
///
/// A status outside the known enumeration maps to the furthest known step so
/// the tracker renders gracefully if the pipeline grows new states.
pub fn step_index(status: &OrderStatus) -> usize {
    match status {
        OrderStatus::Received => 0,
        OrderStatus::InKitchen => 1,
        OrderStatus::SentToDelivery => 2,
        OrderStatus::Delivered => 3,
        OrderStatus::Unknown(_) => STATUS_STEPS.len() - 1,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub name: String,
    pub quantity: u32,
    pub line_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
}

/// Read-only render model of an order's position in the pipeline, derived
/// entirely from the order's immutable snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProgress {
    pub order_number: String,
    pub status: OrderStatus,
    pub steps: Vec<String>,
    pub current_step: usize,
    pub items: Vec<ItemDetail>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderProgress {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            status: order.status.clone(),
            steps: STATUS_STEPS.iter().map(|s| s.to_string()).collect(),
            current_step: step_index(&order.status),
            items: order
                .items
                .iter()
                .map(|i| ItemDetail {
                    name: i.name.clone(),
                    quantity: i.quantity,
                    line_total: i.line_total(),
                    customizations: i.customizations.clone(),
                })
                .collect(),
            total: order.total,
            created_at: order.created_at,
        }
    }
}
