//! In-memory attraction names.

use std::collections::HashMap;

use async_trait::async_trait;

use ticketgate_core::result::AppResult;
use ticketgate_core::types::AttractionId;

use crate::store::AttractionDirectory;

/// Fixed [`AttractionDirectory`] built up front.
#[derive(Debug, Clone, Default)]
pub struct MemoryAttractionDirectory {
    names: HashMap<AttractionId, String>,
}

impl MemoryAttractionDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attraction.
    pub fn with_attraction(mut self, id: AttractionId, name: impl Into<String>) -> Self {
        self.names.insert(id, name.into());
        self
    }
}

#[async_trait]
impl AttractionDirectory for MemoryAttractionDirectory {
    async fn names(&self, ids: &[AttractionId]) -> AppResult<HashMap<AttractionId, String>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.names.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
