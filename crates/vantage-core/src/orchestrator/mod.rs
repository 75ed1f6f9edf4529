//! Query orchestrator (spec §4.1): the node-based workflow that turns one
//! user query into a routed, retrieved-or-attached, confidence-scored
//! answer, streaming progress as [`events::Event`]s.

pub mod breaker;
pub mod classify;
pub mod decompose;
pub mod driver;
pub mod events;
pub mod nodes;

pub use driver::{Driver, Request};
pub use events::{Event, FinalResult};
pub use nodes::NodeDeps;
