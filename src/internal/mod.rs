pub mod error;
pub mod fixtures;
pub mod harness;
pub mod models;
pub mod snapshot;
pub mod transform;
pub mod ui;
