//! Layout reconciliation
//!
//! The layout itself is stored by the UI. This module only matches its saved
//! ids against a fresh scan so entries for uninstalled applications can be
//! shown with the missing icon instead of silently disappearing.

use crate::apps::{ApplicationRecord, MissingApplication};
use std::collections::HashMap;

/// One saved layout position after reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSlot {
    /// The saved id matched a scanned record
    Present(ApplicationRecord),
    /// The saved id matched nothing
    Missing(MissingApplication),
}

impl LayoutSlot {
    /// Id of the slot, whichever variant it is
    pub fn id(&self) -> &str {
        match self {
            Self::Present(record) => &record.id,
            Self::Missing(missing) => missing.id(),
        }
    }

    /// True for [`LayoutSlot::Missing`]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

/// Match saved ids against scanned records, keeping the saved order
///
/// Matching is exact string equality on `id`. Records that were scanned but
/// never saved are not included.
pub fn reconcile<S: AsRef<str>>(saved_ids: &[S], records: &[ApplicationRecord]) -> Vec<LayoutSlot> {
    let by_id: HashMap<&str, &ApplicationRecord> =
        records.iter().map(|r| (r.id.as_str(), r)).collect();

    saved_ids
        .iter()
        .map(|saved| {
            let saved = saved.as_ref();
            by_id.get(saved).map_or_else(
                || LayoutSlot::Missing(MissingApplication::new(saved)),
                |record| LayoutSlot::Present((*record).clone()),
            )
        })
        .collect()
}
