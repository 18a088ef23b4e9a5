//! Femoral access imaging review
//!
//! Walks the registry's record dashboard, finds each eligible patient's
//! imaging study in the viewer, and writes the coordinator's classification
//! back to the registry.

pub mod cli;
pub mod config;
pub mod error;
pub mod interactive;
pub mod patient;
pub mod registry;
pub mod surface;
pub mod viewer;
pub mod workflow;
