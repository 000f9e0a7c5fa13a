use serde::{Deserialize, Serialize};

use super::value_objects::OrderStatus;

/// Upper bound on orders returned by a single search
pub const MAX_SEARCH_RESULTS: i64 = 1000;

/// Filter criteria for the primary order search.
///
/// Both fields are optional; an empty search matches every order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSearch {
    /// Substring match against the member name
    pub member_name: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl OrderSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member_name(mut self, name: impl Into<String>) -> Self {
        self.member_name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.order_status = Some(status);
        self
    }

    /// Member name filter, ignoring blank input
    pub fn member_name_filter(&self) -> Option<&str> {
        self.member_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_search_has_no_filters() {
        let search = OrderSearch::new();
        assert!(search.member_name_filter().is_none());
        assert!(search.order_status.is_none());
    }

    #[test]
    fn test_blank_member_name_is_ignored() {
        let search = OrderSearch::new().with_member_name("   ");
        assert!(search.member_name_filter().is_none());
    }

    #[test]
    fn test_builder_sets_filters() {
        let search = OrderSearch::new()
            .with_member_name(" userA ")
            .with_status(OrderStatus::Cancel);

        assert_eq!(search.member_name_filter(), Some("userA"));
        assert_eq!(search.order_status, Some(OrderStatus::Cancel));
    }
}
