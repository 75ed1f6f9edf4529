//! Core data model (spec §3): documents, entities, relationships, session
//! state, episodic memory, procedural patterns, and the per-request
//! workflow state.

pub mod document;
pub mod entity;
pub mod episode;
pub mod procedural;
pub mod relationship;
pub mod session;
pub mod workflow;

pub use document::{Document, ScoredDocument};
pub use entity::{Entity, EntityType};
pub use episode::{Episode, Feedback};
pub use procedural::ProceduralPattern;
pub use relationship::{Relationship, RelationshipType};
pub use session::{Session, SessionTurn, TurnRole};
pub use workflow::{GraphContext, Intent, StepRecord, UserPreferences, WorkflowState};
