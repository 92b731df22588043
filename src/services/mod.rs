//! Extraction services.
//!
//! This module contains the extraction logic for:
//! - Selector reads through a session (`FieldExtractor`)
//! - Snow conditions (`ConditionsResolver`)
//! - Lift and run status (`TerrainResolver`)
//! - Avalanche forecasts (`AvalancheResolver`)
//! - Whole runs with browser lifetime and deadline (`ScrapeOrchestrator`)

mod avalanche;
mod conditions;
mod extractor;
mod orchestrator;
mod terrain;

pub use avalanche::{AvalancheResolver, parse_tree_line_data};
pub use conditions::ConditionsResolver;
pub use extractor::FieldExtractor;
pub use orchestrator::ScrapeOrchestrator;
pub use terrain::{TerrainResolver, TerrainStrategy};
