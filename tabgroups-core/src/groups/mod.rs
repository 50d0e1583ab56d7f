//! Groups: persistence, catch rules and orchestration
//!
//! [`GroupStore`] owns the document, [`GroupManager`] runs the user-facing
//! operations (add, remove, update, move tabs) and keeps toolbar, menus and
//! listeners informed.

mod catch_rules;
mod manager;
mod store;
mod trash;
mod updates;

pub use catch_rules::{CatchRules, check_rule, find_catching_group};
pub use manager::GroupManager;
pub use store::GroupStore;
pub use trash::GroupTrash;
pub use updates::GroupUpdates;
