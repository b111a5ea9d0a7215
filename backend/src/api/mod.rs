//! API handlers.

pub mod blinder;
pub mod sse;
