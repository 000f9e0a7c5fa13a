// ============================================================================
// Domain Layer - Order Entity Graph
// ============================================================================
//
// Entities and value objects shared by the query repository, the query
// service and the store implementations.
//
// ============================================================================

pub mod order;
