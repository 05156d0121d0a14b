//! Service layer for ditto
//!
//! Services sit between the teach pipeline and storage: snapshot
//! bookkeeping, history recording and the listing formats.

pub mod dialogue_service;

pub use dialogue_service::format_answer;
