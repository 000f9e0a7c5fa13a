use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::DatabaseConfig;
use crate::domain::order::{
    Address, Delivery, Item, Member, Order, OrderItem, OrderSearch, MAX_SEARCH_RESULTS,
};
use crate::metrics::Metrics;
use crate::query::{OrderFlatDto, OrderHeader, OrderItemQueryDto, QueryError, QueryResult};

use super::query_names::*;
use super::{OrderQueryStore, OrderRepository};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// Expected tables:
//
//   member     (id BIGINT PK, name TEXT, city TEXT, street TEXT, zipcode TEXT)
//   delivery   (id BIGINT PK, city TEXT, street TEXT, zipcode TEXT, status TEXT)
//   item       (id BIGINT PK, name TEXT, price INTEGER)
//   orders     (id BIGINT PK, member_id BIGINT, delivery_id BIGINT,
//               order_date TIMESTAMP, status TEXT)
//   order_item (id BIGINT PK, order_id BIGINT, item_id BIGINT,
//               order_price INTEGER, count INTEGER)
//
// Every query method is one round trip. The IN-clause is bound as a single
// BIGINT[] parameter so the statement text does not depend on list size.
//
// ============================================================================

const SELECT_ORDERS_SQL: &str = "\
    SELECT o.id AS order_id, m.name AS member_name, o.order_date, o.status, \
           d.city, d.street, d.zipcode \
    FROM orders o \
    JOIN member m ON m.id = o.member_id \
    JOIN delivery d ON d.id = o.delivery_id \
    ORDER BY o.id";

const SELECT_ORDER_ITEMS_SQL: &str = "\
    SELECT oi.order_id, i.name AS item_name, i.price AS order_price, oi.count \
    FROM order_item oi \
    JOIN item i ON i.id = oi.item_id \
    WHERE oi.order_id = $1 \
    ORDER BY oi.id";

const SELECT_ORDER_ITEMS_IN_SQL: &str = "\
    SELECT oi.order_id, i.name AS item_name, i.price AS order_price, oi.count \
    FROM order_item oi \
    JOIN item i ON i.id = oi.item_id \
    WHERE oi.order_id = ANY($1) \
    ORDER BY oi.id";

const SELECT_ORDER_FLAT_SQL: &str = "\
    SELECT o.id AS order_id, m.name AS member_name, o.order_date, o.status, \
           d.city, d.street, d.zipcode, \
           i.name AS item_name, oi.order_price, oi.count \
    FROM orders o \
    JOIN member m ON m.id = o.member_id \
    JOIN delivery d ON d.id = o.delivery_id \
    JOIN order_item oi ON oi.order_id = o.id \
    JOIN item i ON i.id = oi.item_id \
    ORDER BY o.id, oi.id";

const SEARCH_ORDERS_SQL: &str = "\
    SELECT o.id AS order_id, o.order_date, o.status, \
           m.id AS member_id, m.name AS member_name, \
           m.city AS member_city, m.street AS member_street, m.zipcode AS member_zipcode, \
           d.id AS delivery_id, d.status AS delivery_status, \
           d.city AS delivery_city, d.street AS delivery_street, d.zipcode AS delivery_zipcode \
    FROM orders o \
    JOIN member m ON m.id = o.member_id \
    JOIN delivery d ON d.id = o.delivery_id";

const SEARCH_ORDER_ITEMS_SQL: &str = "\
    SELECT oi.id, oi.order_id, oi.order_price, oi.count, \
           i.id AS item_id, i.name AS item_name, i.price AS item_price \
    FROM order_item oi \
    JOIN item i ON i.id = oi.item_id \
    WHERE oi.order_id = ANY($1) \
    ORDER BY oi.id";

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderHeaderRow {
    order_id: i64,
    member_name: String,
    order_date: NaiveDateTime,
    status: String,
    #[sqlx(flatten)]
    address: Address,
}

impl TryFrom<OrderHeaderRow> for OrderHeader {
    type Error = QueryError;

    fn try_from(row: OrderHeaderRow) -> Result<Self, Self::Error> {
        Ok(OrderHeader {
            order_id: row.order_id,
            member_name: row.member_name,
            order_date: row.order_date,
            status: row.status.parse()?,
            address: row.address,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i64,
    item_name: String,
    order_price: i32,
    count: i32,
}

impl From<OrderItemRow> for OrderItemQueryDto {
    fn from(row: OrderItemRow) -> Self {
        OrderItemQueryDto {
            order_id: row.order_id,
            item_name: row.item_name,
            order_price: row.order_price,
            count: row.count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderFlatRow {
    order_id: i64,
    member_name: String,
    order_date: NaiveDateTime,
    status: String,
    #[sqlx(flatten)]
    address: Address,
    item_name: String,
    order_price: i32,
    count: i32,
}

impl TryFrom<OrderFlatRow> for OrderFlatDto {
    type Error = QueryError;

    fn try_from(row: OrderFlatRow) -> Result<Self, Self::Error> {
        Ok(OrderFlatDto {
            order_id: row.order_id,
            member_name: row.member_name,
            order_date: row.order_date,
            status: row.status.parse()?,
            address: row.address,
            item_name: row.item_name,
            order_price: row.order_price,
            count: row.count,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SearchOrderRow {
    order_id: i64,
    order_date: NaiveDateTime,
    status: String,
    member_id: i64,
    member_name: String,
    member_city: String,
    member_street: String,
    member_zipcode: String,
    delivery_id: i64,
    delivery_status: String,
    delivery_city: String,
    delivery_street: String,
    delivery_zipcode: String,
}

impl SearchOrderRow {
    fn into_order(self, order_items: Vec<OrderItem>) -> QueryResult<Order> {
        Ok(Order {
            id: self.order_id,
            member: Member {
                id: self.member_id,
                name: self.member_name,
                address: Address::new(self.member_city, self.member_street, self.member_zipcode),
            },
            order_date: self.order_date,
            status: self.status.parse()?,
            delivery: Delivery {
                id: self.delivery_id,
                address: Address::new(self.delivery_city, self.delivery_street, self.delivery_zipcode),
                status: self.delivery_status.parse()?,
            },
            order_items,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SearchOrderItemRow {
    id: i64,
    order_id: i64,
    order_price: i32,
    count: i32,
    item_id: i64,
    item_name: String,
    item_price: i32,
}

impl From<SearchOrderItemRow> for OrderItem {
    fn from(row: SearchOrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            item: Item {
                id: row.item_id,
                name: row.item_name,
                price: row.item_price,
            },
            order_price: row.order_price,
            count: row.count,
        }
    }
}

/// `%name%` with LIKE metacharacters in `name` matched literally
fn contains_pattern(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 2);
    pattern.push('%');
    for c in name.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Dynamic order search: optional status and member name filters, capped
fn build_search_query(search: &OrderSearch) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(SEARCH_ORDERS_SQL);
    let mut keyword = " WHERE ";

    if let Some(status) = search.order_status {
        builder.push(keyword).push("o.status = ").push_bind(status.as_str());
        keyword = " AND ";
    }

    if let Some(name) = search.member_name_filter() {
        builder
            .push(keyword)
            .push("m.name LIKE ")
            .push_bind(contains_pattern(name))
            .push(" ESCAPE '\\'");
    }

    builder.push(" ORDER BY o.id LIMIT ").push_bind(MAX_SEARCH_RESULTS);
    builder
}

// ============================================================================
// PgOrderStore
// ============================================================================
//
// The pool only hands out read scopes. A PgReadScope is one REPEATABLE READ,
// READ ONLY transaction: every statement issued through it sees the same
// snapshot, so the headers and item lines of a batched load agree.
//
// ============================================================================

const READ_SCOPE_SQL: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
    metrics: Arc<Metrics>,
}

impl PgOrderStore {
    pub fn new(pool: PgPool, metrics: Arc<Metrics>) -> Self {
        Self { pool, metrics }
    }

    /// Open a connection pool and wrap it in a store
    pub async fn connect(config: &DatabaseConfig, metrics: Arc<Metrics>) -> QueryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");

        Ok(Self::new(pool, metrics))
    }

    /// Start a read-only transaction on a pooled connection
    pub async fn begin_read(&self) -> QueryResult<PgReadScope> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(READ_SCOPE_SQL).execute(&mut *tx).await?;

        tracing::debug!("Read scope opened");

        Ok(PgReadScope {
            tx: Mutex::new(tx),
            metrics: self.metrics.clone(),
        })
    }
}

pub struct PgReadScope {
    tx: Mutex<Transaction<'static, Postgres>>,
    metrics: Arc<Metrics>,
}

impl PgReadScope {
    /// Close the transaction and return the connection to the pool
    pub async fn finish(self) -> QueryResult<()> {
        self.tx.into_inner().commit().await?;
        tracing::debug!("Read scope closed");
        Ok(())
    }
}

/// Run one query, recording its count, rows and latency
async fn timed<T, F>(metrics: &Metrics, query: &'static str, fetch: F) -> QueryResult<Vec<T>>
where
    F: Future<Output = Result<Vec<T>, sqlx::Error>>,
{
    let started = Instant::now();
    let result = fetch.await;
    let elapsed = started.elapsed();

    match &result {
        Ok(rows) => {
            metrics.record_query(query, elapsed, Some(rows.len()));
            tracing::debug!(
                query,
                rows = rows.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Query executed"
            );
        }
        Err(e) => {
            metrics.record_query(query, elapsed, None);
            tracing::warn!(query, error = %e, "Query failed");
        }
    }

    Ok(result?)
}

#[async_trait]
impl OrderQueryStore for PgReadScope {
    async fn select_orders(&self) -> QueryResult<Vec<OrderHeader>> {
        let mut tx = self.tx.lock().await;
        let rows = timed(
            &self.metrics,
            SELECT_ORDERS,
            sqlx::query_as::<_, OrderHeaderRow>(SELECT_ORDERS_SQL).fetch_all(&mut **tx),
        )
        .await?;

        rows.into_iter().map(OrderHeader::try_from).collect()
    }

    async fn select_order_items(&self, order_id: i64) -> QueryResult<Vec<OrderItemQueryDto>> {
        let mut tx = self.tx.lock().await;
        let rows = timed(
            &self.metrics,
            SELECT_ORDER_ITEMS,
            sqlx::query_as::<_, OrderItemRow>(SELECT_ORDER_ITEMS_SQL)
                .bind(order_id)
                .fetch_all(&mut **tx),
        )
        .await?;

        Ok(rows.into_iter().map(OrderItemQueryDto::from).collect())
    }

    async fn select_order_items_in(&self, order_ids: &[i64]) -> QueryResult<Vec<OrderItemQueryDto>> {
        let mut tx = self.tx.lock().await;
        let rows = timed(
            &self.metrics,
            SELECT_ORDER_ITEMS_IN,
            sqlx::query_as::<_, OrderItemRow>(SELECT_ORDER_ITEMS_IN_SQL)
                .bind(order_ids)
                .fetch_all(&mut **tx),
        )
        .await?;

        Ok(rows.into_iter().map(OrderItemQueryDto::from).collect())
    }

    async fn select_order_flat(&self) -> QueryResult<Vec<OrderFlatDto>> {
        let mut tx = self.tx.lock().await;
        let rows = timed(
            &self.metrics,
            SELECT_ORDER_FLAT,
            sqlx::query_as::<_, OrderFlatRow>(SELECT_ORDER_FLAT_SQL).fetch_all(&mut **tx),
        )
        .await?;

        rows.into_iter().map(OrderFlatDto::try_from).collect()
    }
}

#[async_trait]
impl OrderRepository for PgReadScope {
    async fn find_all_by_search(&self, search: &OrderSearch) -> QueryResult<Vec<Order>> {
        let mut tx = self.tx.lock().await;

        let mut builder = build_search_query(search);
        let orders = timed(
            &self.metrics,
            SEARCH_ORDERS,
            builder.build_query_as::<SearchOrderRow>().fetch_all(&mut **tx),
        )
        .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i64> = orders.iter().map(|o| o.order_id).collect();
        let lines = timed(
            &self.metrics,
            SEARCH_ORDER_ITEMS,
            sqlx::query_as::<_, SearchOrderItemRow>(SEARCH_ORDER_ITEMS_SQL)
                .bind(&order_ids[..])
                .fetch_all(&mut **tx),
        )
        .await?;

        let mut lines_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for line in lines {
            lines_by_order.entry(line.order_id).or_default().push(line.into());
        }

        orders
            .into_iter()
            .map(|row| {
                let items = lines_by_order.remove(&row.order_id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Statement execution needs a live PostgreSQL instance; these tests cover
// the statement text and the row conversions.
//
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{DeliveryStatus, OrderStatus};
    use chrono::NaiveDate;

    fn order_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_search_without_filters_has_no_where_clause() {
        let builder = build_search_query(&OrderSearch::new());
        let sql = builder.sql();

        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY o.id LIMIT $1"));
    }

    #[test]
    fn test_search_with_status_only() {
        let builder = build_search_query(&OrderSearch::new().with_status(OrderStatus::Order));
        let sql = builder.sql();

        assert!(sql.contains(" WHERE o.status = $1 ORDER BY o.id LIMIT $2"));
        assert!(!sql.contains("LIKE"));
    }

    #[test]
    fn test_search_with_both_filters_joins_with_and() {
        let search = OrderSearch::new()
            .with_status(OrderStatus::Cancel)
            .with_member_name("userA");
        let builder = build_search_query(&search);
        let sql = builder.sql();

        assert!(sql.contains(" WHERE o.status = $1 AND m.name LIKE $2 ESCAPE '\\' ORDER BY o.id LIMIT $3"));
    }

    #[test]
    fn test_search_with_name_only() {
        let builder = build_search_query(&OrderSearch::new().with_member_name("userB"));
        assert!(builder.sql().contains(" WHERE m.name LIKE $1 ESCAPE '\\' ORDER BY"));
    }

    #[test]
    fn test_name_pattern_escapes_like_wildcards() {
        assert_eq!(contains_pattern("userA"), "%userA%");
        assert_eq!(contains_pattern("50%_club"), "%50\\%\\_club%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_nested_item_queries_read_list_price() {
        assert!(SELECT_ORDER_ITEMS_SQL.contains("i.price AS order_price"));
        assert!(SELECT_ORDER_ITEMS_IN_SQL.contains("i.price AS order_price"));
        assert!(SELECT_ORDER_FLAT_SQL.contains("oi.order_price"));
        assert!(!SELECT_ORDER_FLAT_SQL.contains("i.price"));
    }

    #[test]
    fn test_read_scope_is_a_repeatable_read_snapshot() {
        assert!(READ_SCOPE_SQL.contains("REPEATABLE READ"));
        assert!(READ_SCOPE_SQL.contains("READ ONLY"));
    }

    #[test]
    fn test_in_clause_is_a_single_array_parameter() {
        assert!(SELECT_ORDER_ITEMS_IN_SQL.contains("= ANY($1)"));
        assert!(!SELECT_ORDER_ITEMS_IN_SQL.contains("$2"));
    }

    #[test]
    fn test_header_row_conversion() {
        let row = OrderHeaderRow {
            order_id: 4,
            member_name: "userA".to_string(),
            order_date: order_date(),
            status: "CANCEL".to_string(),
            address: Address::new("Seoul", "1", "1111"),
        };

        let header = OrderHeader::try_from(row).unwrap();
        assert_eq!(header.order_id, 4);
        assert_eq!(header.status, OrderStatus::Cancel);
    }

    #[test]
    fn test_unknown_status_becomes_invalid_row() {
        let row = OrderFlatRow {
            order_id: 4,
            member_name: "userA".to_string(),
            order_date: order_date(),
            status: "LOST".to_string(),
            address: Address::new("Seoul", "1", "1111"),
            item_name: "JPA1 BOOK".to_string(),
            order_price: 10000,
            count: 1,
        };

        let err = OrderFlatDto::try_from(row).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRow(_)));
    }

    #[test]
    fn test_search_row_builds_entity_graph() {
        let row = SearchOrderRow {
            order_id: 4,
            order_date: order_date(),
            status: "ORDER".to_string(),
            member_id: 1,
            member_name: "userA".to_string(),
            member_city: "Seoul".to_string(),
            member_street: "1".to_string(),
            member_zipcode: "1111".to_string(),
            delivery_id: 3,
            delivery_status: "READY".to_string(),
            delivery_city: "Seoul".to_string(),
            delivery_street: "1".to_string(),
            delivery_zipcode: "1111".to_string(),
        };
        let line = SearchOrderItemRow {
            id: 5,
            order_id: 4,
            order_price: 10000,
            count: 1,
            item_id: 2,
            item_name: "JPA1 BOOK".to_string(),
            item_price: 12000,
        };

        let order = row.into_order(vec![line.into()]).unwrap();
        assert_eq!(order.member.name, "userA");
        assert_eq!(order.delivery.status, DeliveryStatus::Ready);
        assert_eq!(order.order_items[0].item.price, 12000);
        assert_eq!(order.order_items[0].order_price, 10000);
    }
}
