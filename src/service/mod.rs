// ============================================================================
// Service Layer
// ============================================================================
//
// Entity-to-view mapping on top of the primary order repository.
//
// ============================================================================

pub mod order_query;

pub use order_query::OrderQueryService;
