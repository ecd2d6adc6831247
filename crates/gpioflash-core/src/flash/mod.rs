//! Caller-facing flash operations
//!
//! These take a [`crate::Device`] describing the job, a bus, and (for
//! transfers) a byte stream. They reject configurations they cannot run
//! before touching the bus, then drive the 25-series command sequences in
//! [`crate::protocol`].

mod operations;

pub use operations::*;
