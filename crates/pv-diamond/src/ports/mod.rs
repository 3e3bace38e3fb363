//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the diamond and the outside world.
//!
//! - **Driving Port (Inbound)**: `DiamondApi`
//! - **Driven Port (Outbound)**: `CustodyAccounts`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
