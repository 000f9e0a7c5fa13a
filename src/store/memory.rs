use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::order::{
    Address, Delivery, DeliveryStatus, Item, Member, Order, OrderItem, OrderSearch, OrderStatus,
    MAX_SEARCH_RESULTS,
};
use crate::metrics::Metrics;
use crate::query::{OrderFlatDto, OrderHeader, OrderItemQueryDto, QueryResult};

use super::query_names::*;
use super::{OrderQueryStore, OrderRepository};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Holds the five tables as plain rows and answers every query with the same
// inner-join semantics as the SQL in PgOrderStore: an order without a member
// or delivery row is invisible, and an order without items produces no flat
// rows. Each call counts as one query in the metrics registry.
//
// ============================================================================

#[derive(Debug, Clone)]
struct OrderRow {
    id: i64,
    member_id: i64,
    delivery_id: i64,
    order_date: NaiveDateTime,
    status: OrderStatus,
}

#[derive(Debug, Clone)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    item_id: i64,
    order_price: i32,
    count: i32,
}

pub struct InMemoryOrderStore {
    members: Vec<Member>,
    deliveries: Vec<Delivery>,
    items: Vec<Item>,
    orders: Vec<OrderRow>,
    order_items: Vec<OrderItemRow>,
    next_id: i64,
    metrics: Arc<Metrics>,
}

impl InMemoryOrderStore {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            members: Vec::new(),
            deliveries: Vec::new(),
            items: Vec::new(),
            orders: Vec::new(),
            order_items: Vec::new(),
            next_id: 1,
            metrics,
        }
    }

    /// Two members with one two-line book order each
    pub fn with_sample_data(metrics: Arc<Metrics>) -> Self {
        let mut store = Self::new(metrics);
        let now = Utc::now().naive_utc();

        let seoul = Address::new("Seoul", "1", "1111");
        let user_a = store.insert_member("userA", seoul.clone());
        let jpa1 = store.insert_item("JPA1 BOOK", 10000);
        let jpa2 = store.insert_item("JPA2 BOOK", 20000);
        store.insert_order(user_a, seoul, now, OrderStatus::Order, &[(jpa1, 10000, 1), (jpa2, 20000, 2)]);

        let jinju = Address::new("Jinju", "2", "2222");
        let user_b = store.insert_member("userB", jinju.clone());
        let spring1 = store.insert_item("SPRING1 BOOK", 20000);
        let spring2 = store.insert_item("SPRING2 BOOK", 40000);
        store.insert_order(user_b, jinju, now, OrderStatus::Order, &[(spring1, 20000, 3), (spring2, 40000, 4)]);

        store
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert_member(&mut self, name: &str, address: Address) -> i64 {
        let id = self.next_id();
        self.members.push(Member {
            id,
            name: name.to_string(),
            address,
        });
        id
    }

    pub fn insert_item(&mut self, name: &str, price: i32) -> i64 {
        let id = self.next_id();
        self.items.push(Item {
            id,
            name: name.to_string(),
            price,
        });
        id
    }

    /// Insert an order with its delivery and item lines.
    ///
    /// `lines` are `(item_id, order_price, count)` triples.
    pub fn insert_order(
        &mut self,
        member_id: i64,
        delivery_address: Address,
        order_date: NaiveDateTime,
        status: OrderStatus,
        lines: &[(i64, i32, i32)],
    ) -> i64 {
        let delivery_id = self.next_id();
        self.deliveries.push(Delivery {
            id: delivery_id,
            address: delivery_address,
            status: DeliveryStatus::Ready,
        });

        let order_id = self.next_id();
        self.orders.push(OrderRow {
            id: order_id,
            member_id,
            delivery_id,
            order_date,
            status,
        });

        for &(item_id, order_price, count) in lines {
            let id = self.next_id();
            self.order_items.push(OrderItemRow {
                id,
                order_id,
                item_id,
                order_price,
                count,
            });
        }

        order_id
    }

    fn member(&self, id: i64) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    fn delivery(&self, id: i64) -> Option<&Delivery> {
        self.deliveries.iter().find(|d| d.id == id)
    }

    fn item(&self, id: i64) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Orders joined to member and delivery, ordered by id
    fn joined_orders(&self) -> Vec<(&OrderRow, &Member, &Delivery)> {
        let mut joined: Vec<_> = self
            .orders
            .iter()
            .filter_map(|o| Some((o, self.member(o.member_id)?, self.delivery(o.delivery_id)?)))
            .collect();
        joined.sort_by_key(|(o, _, _)| o.id);
        joined
    }

    /// Item lines joined to their item, ordered by line id
    fn joined_items<'a>(
        &'a self,
        mut matches: impl FnMut(i64) -> bool,
    ) -> Vec<(&'a OrderItemRow, &'a Item)> {
        let mut joined: Vec<_> = self
            .order_items
            .iter()
            .filter(|oi| matches(oi.order_id))
            .filter_map(|oi| Some((oi, self.item(oi.item_id)?)))
            .collect();
        joined.sort_by_key(|(oi, _)| oi.id);
        joined
    }

    fn observe<T>(&self, query: &str, started: Instant, rows: Vec<T>) -> QueryResult<Vec<T>> {
        self.metrics.record_query(query, started.elapsed(), Some(rows.len()));
        tracing::debug!(query, rows = rows.len(), "In-memory query executed");
        Ok(rows)
    }
}

fn header(order: &OrderRow, member: &Member, delivery: &Delivery) -> OrderHeader {
    OrderHeader {
        order_id: order.id,
        member_name: member.name.clone(),
        order_date: order.order_date,
        status: order.status,
        address: delivery.address.clone(),
    }
}

/// Nested item views carry the item's list price, not the price at order time
fn item_dto(line: &OrderItemRow, item: &Item) -> OrderItemQueryDto {
    OrderItemQueryDto {
        order_id: line.order_id,
        item_name: item.name.clone(),
        order_price: item.price,
        count: line.count,
    }
}

#[async_trait]
impl OrderQueryStore for InMemoryOrderStore {
    async fn select_orders(&self) -> QueryResult<Vec<OrderHeader>> {
        let started = Instant::now();
        let rows = self
            .joined_orders()
            .into_iter()
            .map(|(o, m, d)| header(o, m, d))
            .collect();
        self.observe(SELECT_ORDERS, started, rows)
    }

    async fn select_order_items(&self, order_id: i64) -> QueryResult<Vec<OrderItemQueryDto>> {
        let started = Instant::now();
        let rows = self
            .joined_items(|id| id == order_id)
            .into_iter()
            .map(|(line, item)| item_dto(line, item))
            .collect();
        self.observe(SELECT_ORDER_ITEMS, started, rows)
    }

    async fn select_order_items_in(&self, order_ids: &[i64]) -> QueryResult<Vec<OrderItemQueryDto>> {
        let started = Instant::now();
        let rows = self
            .joined_items(|id| order_ids.contains(&id))
            .into_iter()
            .map(|(line, item)| item_dto(line, item))
            .collect();
        self.observe(SELECT_ORDER_ITEMS_IN, started, rows)
    }

    async fn select_order_flat(&self) -> QueryResult<Vec<OrderFlatDto>> {
        let started = Instant::now();
        let mut rows = Vec::new();
        for (order, member, delivery) in self.joined_orders() {
            for (line, item) in self.joined_items(|id| id == order.id) {
                rows.push(OrderFlatDto {
                    order_id: order.id,
                    member_name: member.name.clone(),
                    order_date: order.order_date,
                    status: order.status,
                    address: delivery.address.clone(),
                    item_name: item.name.clone(),
                    order_price: line.order_price,
                    count: line.count,
                });
            }
        }
        self.observe(SELECT_ORDER_FLAT, started, rows)
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn find_all_by_search(&self, search: &OrderSearch) -> QueryResult<Vec<Order>> {
        let started = Instant::now();
        let name_filter = search.member_name_filter();
        let matched: Vec<_> = self
            .joined_orders()
            .into_iter()
            .filter(|(o, _, _)| search.order_status.map_or(true, |status| o.status == status))
            .filter(|(_, m, _)| name_filter.map_or(true, |name| m.name.contains(name)))
            .take(MAX_SEARCH_RESULTS as usize)
            .collect();
        self.metrics.record_query(SEARCH_ORDERS, started.elapsed(), Some(matched.len()));

        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let order_ids: Vec<i64> = matched.iter().map(|(o, _, _)| o.id).collect();
        let mut lines_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        let mut line_count = 0;
        for (line, item) in self.joined_items(|id| order_ids.contains(&id)) {
            line_count += 1;
            lines_by_order.entry(line.order_id).or_default().push(OrderItem {
                id: line.id,
                order_id: line.order_id,
                item: item.clone(),
                order_price: line.order_price,
                count: line.count,
            });
        }
        self.metrics.record_query(SEARCH_ORDER_ITEMS, started.elapsed(), Some(line_count));

        Ok(matched
            .into_iter()
            .map(|(o, m, d)| Order {
                id: o.id,
                member: m.clone(),
                order_date: o.order_date,
                status: o.status,
                delivery: d.clone(),
                order_items: lines_by_order.remove(&o.id).unwrap_or_default(),
            })
            .collect())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
