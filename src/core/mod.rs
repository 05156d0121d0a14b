//! Core domain modules
//!
//! Types, collaborator traits and the pure parts of the matching engine
//! (normalization and weighting) shared by the receiver and the teach
//! pipeline.

pub mod errors;
pub mod identity;
pub mod normalizer;
pub mod segment;
pub mod session;
pub mod stamp;
pub mod traits;
pub mod types;
pub mod weighting;

pub use errors::DialogueError;
pub use normalizer::{Normalizer, Question};
pub use session::Session;
pub use types::{Dialogue, DialogueFlags, DialogueId, DialoguePatch, DialogueTest, Flag, ModifyType, UserProfile};
