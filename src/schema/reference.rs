use std::fmt;
use std::sync::Arc;

use crate::schema::EntityType;

/// Foreign-key relationship to another entity type's key.
///
/// At resolve time a reference expands into one synthetic property per
/// component of the referenced key, named `<reference>_<column>`. A live
/// reference additionally participates in the notification protocol when its
/// value changes on an instance.
#[derive(Clone)]
pub struct ReferenceDescriptor {
    pub(crate) name: String,
    pub(crate) target: Arc<EntityType>,
    pub(crate) live: bool,
    /// Slots of the expanded component properties in the owning type.
    pub(crate) slots: Vec<usize>,
}

impl ReferenceDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Arc<EntityType> {
        &self.target
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn slots(&self) -> &[usize] {
        &self.slots
    }
}

impl fmt::Debug for ReferenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceDescriptor")
            .field("name", &self.name)
            .field("target", &self.target.name())
            .field("live", &self.live)
            .field("slots", &self.slots)
            .finish()
    }
}
