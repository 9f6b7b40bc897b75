//! Placeholder for saved layout entries that no longer resolve

use crate::icon::{AppIcon, generated};
use std::hash::{Hash, Hasher};

/// A saved layout entry whose id matched no scanned record
///
/// Only built by [`crate::layout::reconcile`]; the scanner never produces one.
#[derive(Debug, Clone)]
pub struct MissingApplication {
    id: String,
    icon: AppIcon,
}

impl MissingApplication {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            icon: generated::missing_icon(),
        }
    }

    /// Saved id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Generated "missing" icon
    pub fn icon(&self) -> &AppIcon {
        &self.icon
    }
}

impl PartialEq for MissingApplication {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MissingApplication {}

impl Hash for MissingApplication {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::IconOrigin;

    #[test]
    fn test_missing_application_identity() {
        let a = MissingApplication::new("C:\\Gone\\app.exe");
        let b = MissingApplication::new("C:\\Gone\\app.exe");
        assert_eq!(a, b);
        assert_ne!(a, MissingApplication::new("C:\\Other.exe"));
        assert_eq!(a.id(), "C:\\Gone\\app.exe");
        assert_eq!(a.icon().origin(), IconOrigin::Missing);
    }
}
