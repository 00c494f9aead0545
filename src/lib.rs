pub mod client;
pub mod core;

pub use client::GmoCoin;
pub use core::config::ExchangeConfig;
pub use core::errors::ExchangeError;
pub use core::types::*;
