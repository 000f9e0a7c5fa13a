use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::order::{Address, OrderStatus};

// ============================================================================
// Query Projections
// ============================================================================
//
// Read-only shapes assembled straight from query rows. None of them is a
// persisted entity; they are built per request and dropped after
// serialization.
//
// ============================================================================

/// One row of the Order→Member→Delivery join
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    pub order_id: i64,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
}

/// Item line of an order as the query repository reads it.
///
/// `order_price` is the item's list price here; only flat rows carry the
/// price recorded on the order line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemQueryDto {
    #[serde(skip)]
    pub order_id: i64,
    pub item_name: String,
    pub order_price: i32,
    pub count: i32,
}

/// One order with its item lines nested
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQueryDto {
    pub order_id: i64,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
    pub order_items: Vec<OrderItemQueryDto>,
}

impl OrderQueryDto {
    pub fn new(header: OrderHeader, order_items: Vec<OrderItemQueryDto>) -> Self {
        Self {
            order_id: header.order_id,
            member_name: header.member_name,
            order_date: header.order_date,
            status: header.status,
            address: header.address,
            order_items,
        }
    }
}

/// One row per (order, item) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFlatDto {
    pub order_id: i64,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
    pub item_name: String,
    pub order_price: i32,
    pub count: i32,
}

impl OrderFlatDto {
    pub fn header(&self) -> OrderHeader {
        OrderHeader {
            order_id: self.order_id,
            member_name: self.member_name.clone(),
            order_date: self.order_date,
            status: self.status,
            address: self.address.clone(),
        }
    }

    pub fn item(&self) -> OrderItemQueryDto {
        OrderItemQueryDto {
            order_id: self.order_id,
            item_name: self.item_name.clone(),
            order_price: self.order_price,
            count: self.count,
        }
    }
}
