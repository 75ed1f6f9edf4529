//! Entity graph: arena+index store and bounded-BFS expansion (spec §4.5,
//! §9 "Cyclic ownership" redesign flag).

pub mod expansion;
pub mod store;

pub use expansion::{expand, ExpansionResult};
pub use store::GraphStore;
