use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;

use crate::domain::order::{Address, Order, OrderItem, OrderSearch, OrderStatus};
use crate::query::QueryResult;
use crate::store::OrderRepository;

// ============================================================================
// Order Query Service
// ============================================================================
//
// Orchestrates: OrderSearch → OrderRepository → Order entities → OrderQDto
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemQDto {
    pub item_name: String,
    pub order_price: i32,
    pub count: i32,
}

impl From<&OrderItem> for OrderItemQDto {
    fn from(order_item: &OrderItem) -> Self {
        Self {
            item_name: order_item.item.name.clone(),
            order_price: order_item.order_price,
            count: order_item.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
    pub order_items: Vec<OrderItemQDto>,
}

impl From<&Order> for OrderQDto {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            name: order.member.name.clone(),
            order_date: order.order_date,
            order_status: order.status,
            address: order.delivery.address.clone(),
            order_items: order.order_items.iter().map(OrderItemQDto::from).collect(),
        }
    }
}

pub struct OrderQueryService<R: OrderRepository> {
    order_repository: Arc<R>,
}

impl<R: OrderRepository> OrderQueryService<R> {
    pub fn new(order_repository: Arc<R>) -> Self {
        Self { order_repository }
    }

    /// Every order, mapped to view objects in repository order
    pub async fn orders_query_v2(&self) -> QueryResult<Vec<OrderQDto>> {
        self.orders_query(&OrderSearch::new()).await
    }

    /// Orders matching `search`, mapped to view objects in repository order
    pub async fn orders_query(&self, search: &OrderSearch) -> QueryResult<Vec<OrderQDto>> {
        let orders = self.order_repository.find_all_by_search(search).await?;
        let result: Vec<OrderQDto> = orders.iter().map(OrderQDto::from).collect();

        tracing::debug!(
            order_count = result.len(),
            member_name = ?search.member_name,
            order_status = ?search.order_status,
            "Mapped orders to view objects"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::store::InMemoryOrderStore;
    use chrono::Utc;

    fn service() -> OrderQueryService<InMemoryOrderStore> {
        let metrics = Arc::new(Metrics::new().unwrap());
        let mut store = InMemoryOrderStore::with_sample_data(metrics);

        let member = store.insert_member("userC", Address::new("Daegu", "3", "3333"));
        let book = store.insert_item("RUST BOOK", 30000);
        store.insert_order(
            member,
            Address::new("Daegu", "3", "3333"),
            Utc::now().naive_utc(),
            OrderStatus::Cancel,
            &[(book, 28000, 1)],
        );

        OrderQueryService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_orders_query_v2_maps_every_order_in_order() {
        let result = service().orders_query_v2().await.unwrap();

        let names: Vec<_> = result.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["userA", "userB", "userC"]);
        assert!(result.windows(2).all(|w| w[0].order_id < w[1].order_id));

        let first = &result[0];
        assert_eq!(first.order_status, OrderStatus::Order);
        assert_eq!(first.address.city, "Seoul");
        assert_eq!(
            first.order_items,
            vec![
                OrderItemQDto { item_name: "JPA1 BOOK".to_string(), order_price: 10000, count: 1 },
                OrderItemQDto { item_name: "JPA2 BOOK".to_string(), order_price: 20000, count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_item_view_uses_price_at_order_time() {
        let result = service().orders_query_v2().await.unwrap();

        let cancelled = &result[2];
        assert_eq!(cancelled.order_items[0].item_name, "RUST BOOK");
        assert_eq!(cancelled.order_items[0].order_price, 28000);
    }

    #[tokio::test]
    async fn test_orders_query_filters_by_status() {
        let search = OrderSearch::new().with_status(OrderStatus::Cancel);
        let result = service().orders_query(&search).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "userC");
    }

    #[tokio::test]
    async fn test_orders_query_filters_by_member_name_substring() {
        let search = OrderSearch::new().with_member_name("erB");
        let result = service().orders_query(&search).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "userB");
        assert_eq!(result[0].order_items.len(), 2);
    }

    #[tokio::test]
    async fn test_orders_query_without_matches_is_empty() {
        let search = OrderSearch::new().with_member_name("nobody");
        assert!(service().orders_query(&search).await.unwrap().is_empty());
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = OrderQDto {
            order_id: 1,
            name: "userA".to_string(),
            order_date: Utc::now().naive_utc(),
            order_status: OrderStatus::Order,
            address: Address::new("Seoul", "1", "1111"),
            order_items: vec![],
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["orderId"], 1);
        assert_eq!(json["orderStatus"], "ORDER");
        assert!(json["orderItems"].as_array().unwrap().is_empty());
    }
}
