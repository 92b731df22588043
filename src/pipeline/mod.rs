//! Pipeline entry points for batch runs.
//!
//! - `run_resort_batch`: Scrape conditions and terrain for many resorts
//! - `run_avalanche_batch`: Scrape avalanche forecasts for many mountains

pub mod batch;

pub use batch::{BatchOutcome, run_avalanche_batch, run_resort_batch};
