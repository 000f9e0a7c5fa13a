// ============================================================================
// Order Store - Read Access to the Relational Store
// ============================================================================
//
// Two seams over the same tables:
// - OrderQueryStore: hand-written projection queries used by the query
//   repository. Each method is exactly one round trip.
// - OrderRepository: the primary order repository returning full entity
//   graphs filtered by an OrderSearch.
//
// Implementations:
// - PgReadScope (one PostgreSQL read transaction, opened by PgOrderStore)
// - InMemoryOrderStore (table-shaped fixture with the same join semantics)
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::order::{Order, OrderSearch};
use crate::query::{OrderFlatDto, OrderHeader, OrderItemQueryDto, QueryResult};

pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

/// Query names used as metric labels and log fields
pub mod query_names {
    pub const SELECT_ORDERS: &str = "select_orders";
    pub const SELECT_ORDER_ITEMS: &str = "select_order_items";
    pub const SELECT_ORDER_ITEMS_IN: &str = "select_order_items_in";
    pub const SELECT_ORDER_FLAT: &str = "select_order_flat";
    pub const SEARCH_ORDERS: &str = "search_orders";
    pub const SEARCH_ORDER_ITEMS: &str = "search_order_items";
}

#[async_trait]
pub trait OrderQueryStore: Send + Sync {
    /// Order→Member→Delivery join, one row per order, ordered by order id
    async fn select_orders(&self) -> QueryResult<Vec<OrderHeader>>;

    /// Item lines of a single order
    async fn select_order_items(&self, order_id: i64) -> QueryResult<Vec<OrderItemQueryDto>>;

    /// Item lines of every order in `order_ids`, in one round trip
    async fn select_order_items_in(&self, order_ids: &[i64]) -> QueryResult<Vec<OrderItemQueryDto>>;

    /// Full five-table join, one row per (order, item)
    async fn select_order_flat(&self) -> QueryResult<Vec<OrderFlatDto>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Orders matching `search` with member, delivery and items loaded
    async fn find_all_by_search(&self, search: &OrderSearch) -> QueryResult<Vec<Order>>;
}
