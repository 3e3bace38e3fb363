//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the driven ports.

pub mod custody;

pub use custody::*;
