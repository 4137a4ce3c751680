pub mod auth;
pub mod client;
mod dto;

pub use client::{KdpApiClient, KdpApiConfig};
