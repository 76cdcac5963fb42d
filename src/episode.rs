use crate::EdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a conversation supplies the labels.
///
/// `Experiencer` episodes hold the experiencer's utterances as text and the
/// responder's replies as labels; `Responder` episodes are the reverse.
/// `Both` is only meaningful as a selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    Experiencer,
    Responder,
    Both,
}

impl Perspective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Experiencer => "experiencer",
            Perspective::Responder => "responder",
            Perspective::Both => "both",
        }
    }

    /// Whether episodes of `side` pass this selection policy.
    pub fn admits(&self, side: Perspective) -> bool {
        match self {
            Perspective::Both => true,
            p => *p == side,
        }
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Perspective {
    type Err = EdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "experiencer" => Ok(Perspective::Experiencer),
            "responder" => Ok(Perspective::Responder),
            "both" => Ok(Perspective::Both),
            other => Err(EdError::Config(format!(
                "unknown perspective {other:?} (expected experiencer, responder or both)"
            ))),
        }
    }
}

/// One text/label exchange built from two adjacent rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnRecord {
    pub context: String,
    pub label: String,
    /// Emotion label of the conversation.
    pub prompt: String,
    pub situation: String,
    pub context_embedding: Option<Vec<f32>>,
    pub candidate_embedding: Option<Vec<f32>>,
    pub prepend_context: Option<String>,
    pub prepend_candidate: Option<String>,
    pub inline_label_candidates: Vec<String>,
    pub is_political: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    pub conv_id: String,
    pub perspective: Perspective,
    pub turns: Vec<TurnRecord>,
}

impl Episode {
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn has_political_turn(&self) -> bool {
        self.turns.iter().any(|t| t.is_political)
    }
}
