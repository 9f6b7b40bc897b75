//! Application record model
//!
//! - [`ApplicationRecord`]: one discovered application, equal by `id`
//! - [`MissingApplication`]: saved layout entry that no longer exists
//! - [`deduplicate_by_id`]: stable first-wins merge used by the scanner

pub mod missing;
pub mod record;

pub use missing::MissingApplication;
pub use record::{ApplicationRecord, DiscoverySource, IconSlot, deduplicate_by_id};
