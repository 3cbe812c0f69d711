#![forbid(unsafe_code)]

pub mod access;
pub mod audit;
pub mod common;
pub mod directory;
pub mod query;
pub mod resource;

pub use common::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};
