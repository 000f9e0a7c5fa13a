// ============================================================================
// Order Domain - Entities and Value Objects
// ============================================================================
//
// This module contains the Order entity graph as it is read from the store:
// - Value objects (Address, OrderStatus, DeliveryStatus)
// - Entities (Order, OrderItem, Member, Delivery, Item)
// - Search criteria (OrderSearch)
// - Errors (OrderError enum)
//
// Nothing here is mutated after loading.
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod search;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use search::*;
