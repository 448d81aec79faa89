use serde::{Deserialize, Serialize};

use crate::model::ids::ModuleId;

/// A discrete learning unit with textual content and a point reward.
///
/// Read-only from the application's point of view; the catalog is loaded by
/// the store owner (see the `seed` binary in the storage crate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningModule {
    pub id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub points_reward: u32,
    pub order_index: i32,
    pub is_active: bool,
}

impl LearningModule {
    #[must_use]
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        content: impl Into<String>,
        points_reward: u32,
        order_index: i32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            content: content.into(),
            points_reward,
            order_index,
            is_active: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
