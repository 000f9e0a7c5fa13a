// ============================================================================
// Order Query Side
// ============================================================================
//
// Projection DTOs and the query repository that assembles them.
//
// ============================================================================

mod dto;
mod errors;
mod repository;

pub use dto::{OrderFlatDto, OrderHeader, OrderItemQueryDto};
pub use errors::{QueryError, QueryResult};
pub use repository::{group_flat, OrderQueryRepository};
