use serde::{Deserialize, Serialize};

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// State of one track of a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Live,
    Ended,
}

/// One track of a live capture stream (one per physical input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub label: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub state: TrackState,
}

impl TrackInfo {
    pub fn is_live(&self) -> bool {
        self.state == TrackState::Live
    }
}
