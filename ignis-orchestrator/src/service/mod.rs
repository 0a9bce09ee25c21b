//! Service Layer
//!
//! Business logic for the orchestrator: host allocation, instance spec
//! construction and the queued/completed lifecycle itself.

pub mod allocator;
pub mod bootstrap;
pub mod lifecycle;

pub use allocator::HostAllocator;
pub use lifecycle::{Lifecycle, LifecycleError};
