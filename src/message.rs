use crate::episode::TurnRecord;
use serde::Serialize;

/// One example as handed to a training or evaluation loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub situation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    pub text: String,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepend_ctx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepend_cand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepmoji_ctx: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepmoji_cand: Option<Vec<f32>>,
    pub episode_done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_candidates: Option<Vec<String>>,
}

impl Message {
    /// Full view of a turn with every side channel attached.
    pub fn from_turn(turn: &TurnRecord, episode_done: bool) -> Self {
        Self {
            situation: Some(turn.situation.clone()),
            emotion: Some(turn.prompt.clone()),
            text: turn.context.clone(),
            labels: vec![turn.label.clone()],
            prepend_ctx: turn.prepend_context.clone(),
            prepend_cand: turn.prepend_candidate.clone(),
            deepmoji_ctx: turn.context_embedding.clone(),
            deepmoji_cand: turn.candidate_embedding.clone(),
            episode_done,
            label_candidates: Some(turn.inline_label_candidates.clone()),
        }
    }

    /// Text, label and done flag only.
    pub fn plain(text: String, label: String, episode_done: bool) -> Self {
        Self {
            situation: None,
            emotion: None,
            text,
            labels: vec![label],
            prepend_ctx: None,
            prepend_cand: None,
            deepmoji_ctx: None,
            deepmoji_cand: None,
            episode_done,
            label_candidates: None,
        }
    }

    pub fn label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or("")
    }
}
