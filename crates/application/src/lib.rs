#![forbid(unsafe_code)]

pub mod collector;
pub mod registry;
pub mod scheduler;
