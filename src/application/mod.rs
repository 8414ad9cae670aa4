//! Application layer: the streaming render adapter and binary-level errors.

pub mod error;
pub mod stream;
