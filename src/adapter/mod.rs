//! Venue adapters implementing the runtime's data-client seam.

pub mod binance;
