use serde_derive::{Deserialize, Serialize};

/// Which output streams a node produces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamMode {
    /// Legacy record files only.
    #[default]
    Records,
    /// Block stream only.
    Blocks,
    /// Both, while the block stream is being validated against records.
    Both,
}

impl StreamMode {
    pub fn produces_records(&self) -> bool {
        matches!(self, Self::Records | Self::Both)
    }

    pub fn produces_blocks(&self) -> bool {
        matches!(self, Self::Blocks | Self::Both)
    }
}
