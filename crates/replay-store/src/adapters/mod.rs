//! Default adapters for the outbound ports.

pub mod lock;
