//! # Domain Layer (Inner Hexagon)
//!
//! Pure diamond logic: routing, governance, pause state, withdrawal budgets.
//! No I/O, no async.
//!
//! - Dependencies point inward only (facets and adapters depend on this).
//! - Every type here is cloneable so a whole call can be rolled back.

pub mod cut;
pub mod governance;
pub mod protocol_state;
pub mod registry;
pub mod services;
pub mod storage;
pub mod value_objects;
pub mod withdrawal;

pub use cut::*;
pub use governance::*;
pub use protocol_state::*;
pub use registry::*;
pub use services::*;
pub use storage::*;
pub use value_objects::*;
pub use withdrawal::*;
