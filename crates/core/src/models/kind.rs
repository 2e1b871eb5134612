//! Entity kind discriminator shared by the wire protocol and the store.

use serde::{Deserialize, Serialize};

/// The three catalog entity kinds.
///
/// Serialized form is the wire `type` discriminator (`prompt`,
/// `prompt_version`, `group`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Prompt,
    PromptVersion,
    Group,
}

impl EntityKind {
    /// Stable string form, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Prompt => "prompt",
            EntityKind::PromptVersion => "prompt_version",
            EntityKind::Group => "group",
        }
    }

    /// Parse the stable string form back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "prompt" => Some(EntityKind::Prompt),
            "prompt_version" => Some(EntityKind::PromptVersion),
            "group" => Some(EntityKind::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
