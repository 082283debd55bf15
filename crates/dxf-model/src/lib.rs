//! Shared data types of the distributed task execution framework.
//!
//! Everything here is a plain snapshot: the task registry owns the truth,
//! the node-local control plane only reads these values and reacts to them.

mod domain;
pub use domain::*;
