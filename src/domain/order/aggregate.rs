use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::value_objects::{Address, DeliveryStatus, OrderStatus};

// ============================================================================
// Order Aggregate - Entity Graph
// ============================================================================
//
// Order is the aggregate root. Member and Delivery are referenced one per
// order, OrderItem rows belong to exactly one order and point at an Item.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub address: Address,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    /// Current list price, may differ from the price an order was placed at
    pub price: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub item: Item,
    pub order_price: i32,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub member: Member,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub delivery: Delivery,
    pub order_items: Vec<OrderItem>,
}
