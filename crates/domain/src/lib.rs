#![forbid(unsafe_code)]

pub mod catalog;
pub mod common;
pub mod expose;
pub mod mapping;
pub mod snapshot;
pub mod telemetry;
