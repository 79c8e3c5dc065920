//! Domain types for the buzz collector

pub mod entity;
pub mod observation;
pub mod window;

pub use entity::Entity;
pub use observation::{Observation, RecordKey};
pub use window::QueryWindow;

/// Entity identifier alias (the catalog's film code)
pub type EntityId = String;
