use std::collections::HashMap;
use std::sync::Arc;

use crate::store::OrderQueryStore;

use super::dto::{OrderFlatDto, OrderHeader, OrderItemQueryDto, OrderQueryDto};
use super::errors::{QueryError, QueryResult};

// ============================================================================
// Order Query Repository
// ============================================================================
//
// Read-only projections over the order tables, in three shapes:
// - find_order_query_dtos:        1 + N queries (one item query per order)
// - find_all_by_dto_optimization: 2 queries (headers, then items IN (...))
// - find_all_by_dto_flat:         1 query, one row per (order, item)
//
// ============================================================================

pub struct OrderQueryRepository<S: OrderQueryStore> {
    store: Arc<S>,
}

impl<S: OrderQueryStore> OrderQueryRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// One row per order with member name and delivery address inlined
    pub async fn find_orders(&self) -> QueryResult<Vec<OrderHeader>> {
        self.store.select_orders().await
    }

    /// Item lines of a single order
    pub async fn find_order_items(&self, order_id: i64) -> QueryResult<Vec<OrderItemQueryDto>> {
        self.store.select_order_items(order_id).await
    }

    /// Item lines of every listed order in one query, grouped by order id.
    ///
    /// Orders without items get no entry. Duplicate ids are allowed.
    pub async fn find_order_item_map(
        &self,
        order_ids: &[i64],
    ) -> QueryResult<HashMap<i64, Vec<OrderItemQueryDto>>> {
        if order_ids.is_empty() {
            return Err(QueryError::EmptyOrderIds);
        }

        let order_items = self.store.select_order_items_in(order_ids).await?;

        let mut order_item_map: HashMap<i64, Vec<OrderItemQueryDto>> = HashMap::new();
        for item in order_items {
            order_item_map.entry(item.order_id).or_default().push(item);
        }
        Ok(order_item_map)
    }

    /// Headers first, then one item query per order
    pub async fn find_order_query_dtos(&self) -> QueryResult<Vec<OrderQueryDto>> {
        let orders = self.find_orders().await?;

        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let order_items = self.find_order_items(order.order_id).await?;
            result.push(OrderQueryDto::new(order, order_items));
        }

        tracing::debug!(order_count = result.len(), queries = result.len() + 1, "Loaded orders per-row");
        Ok(result)
    }

    /// Headers first, then all items for those headers in a single query
    pub async fn find_all_by_dto_optimization(&self) -> QueryResult<Vec<OrderQueryDto>> {
        let orders = self.find_orders().await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i64> = orders.iter().map(|o| o.order_id).collect();
        let mut order_item_map = self.find_order_item_map(&order_ids).await?;

        let result: Vec<OrderQueryDto> = orders
            .into_iter()
            .map(|order| {
                let order_items = order_item_map.remove(&order.order_id).unwrap_or_default();
                OrderQueryDto::new(order, order_items)
            })
            .collect();

        tracing::debug!(order_count = result.len(), queries = 2, "Loaded orders with batched items");
        Ok(result)
    }

    /// Single five-table join; rows are not grouped
    pub async fn find_all_by_dto_flat(&self) -> QueryResult<Vec<OrderFlatDto>> {
        self.store.select_order_flat().await
    }
}

/// Fold flat rows back into one DTO per order, keeping first-seen order.
///
/// Orders without items never appear in flat rows, so they are absent here
/// too. Item prices stay the order-time prices of the flat rows, so the
/// result equals the batched one only where list and order prices agree.
pub fn group_flat(rows: Vec<OrderFlatDto>) -> Vec<OrderQueryDto> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut grouped: Vec<OrderQueryDto> = Vec::new();

    for row in rows {
        let item = row.item();
        match index.get(&row.order_id) {
            Some(&at) => grouped[at].order_items.push(item),
            None => {
                index.insert(row.order_id, grouped.len());
                grouped.push(OrderQueryDto::new(row.header(), vec![item]));
            }
        }
    }

    grouped
}

// ============================================================================
// Unit Tests
// ============================================================================
