#![forbid(unsafe_code)]

pub mod access;
pub mod esc;
pub mod scope;
