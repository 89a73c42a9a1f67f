//! Rule-based Arabic furniture assistant.
//!
//! - `normalize`: spelling/diacritic folding
//! - `catalog`: furniture, colour and material tables
//! - `intent`: ordered keyword classification
//! - `memory`: bounded history plus added/removed items
//! - `tracker`: the pending-slot state machine for one conversation
//! - `sessions`: one tracker per session id

pub mod catalog;
pub mod intent;
pub mod memory;
pub mod normalize;
pub mod sessions;
pub mod tracker;

pub use catalog::{Catalog, FurnitureModel};
pub use intent::Intent;
pub use memory::{AddedItem, Memory};
pub use normalize::normalize;
pub use sessions::{DEFAULT_SESSION, SessionRegistry, spawn_expiry_task};
pub use tracker::{DialogueTracker, PendingAction, Turn, TurnAction};
