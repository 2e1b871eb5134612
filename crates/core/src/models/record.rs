//! Kind-tagged entity record.

use serde::{Deserialize, Serialize};

use super::{EntityKind, Group, Prompt, PromptVersion};

/// Any catalog entity, tagged by kind. Used where a write path handles all
/// three kinds uniformly (optimistic persistence, delta application).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRecord {
    Prompt(Prompt),
    PromptVersion(PromptVersion),
    Group(Group),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Prompt(_) => EntityKind::Prompt,
            EntityRecord::PromptVersion(_) => EntityKind::PromptVersion,
            EntityRecord::Group(_) => EntityKind::Group,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityRecord::Prompt(prompt) => &prompt.id,
            EntityRecord::PromptVersion(version) => &version.id,
            EntityRecord::Group(group) => &group.id,
        }
    }
}

impl From<Prompt> for EntityRecord {
    fn from(value: Prompt) -> Self {
        EntityRecord::Prompt(value)
    }
}

impl From<PromptVersion> for EntityRecord {
    fn from(value: PromptVersion) -> Self {
        EntityRecord::PromptVersion(value)
    }
}

impl From<Group> for EntityRecord {
    fn from(value: Group) -> Self {
        EntityRecord::Group(value)
    }
}
