//! Root-cause enrichment for errored robots
//!
//! Runs off the tick path. The LLM client is optional; without it every
//! incident gets the rule-based analysis.

pub mod client;
pub mod context;
pub mod enricher;
pub mod rca;

pub use client::RcaClient;
pub use context::IncidentContext;
pub use enricher::{Enricher, Enrichment};
