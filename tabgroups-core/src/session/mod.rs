//! Session state: tab/window/group association, exclusion, history

pub mod cache;
pub mod exclude;
pub mod history;

pub use cache::SessionCache;
pub use exclude::{ExcludeGuard, ExcludeSet};
pub use history::GroupHistory;
