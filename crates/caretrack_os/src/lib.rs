#![forbid(unsafe_code)]

pub mod audit_writer;
pub mod data_source;
pub mod directory_cache;
pub mod forensics;
pub mod gate;
pub mod list;
pub mod ports;
