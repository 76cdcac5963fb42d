use crate::EdError;
use crate::embeddings::Embeddings;
use crate::episode::{Episode, Perspective, TurnRecord};
use crate::keywords::{TokenModel, prepend_tokens};
use crate::row::{RawRow, unescape};
use std::io::Read;
use std::path::Path;

/// Turns the rows of one split into episodes.
///
/// Adjacent rows with the same conversation id form one turn: the earlier
/// row's utterance is the text, the later row's is the label. Turns whose
/// label row has an even utterance index belong to the experiencer-text side,
/// odd ones to the responder-text side. Each side of a conversation becomes
/// at most one episode.
pub struct EpisodeBuilder<'a> {
    perspective: Perspective,
    remove_political: bool,
    embeddings: Option<&'a Embeddings>,
    token_model: Option<(&'a dyn TokenModel, usize)>,
}

impl<'a> EpisodeBuilder<'a> {
    pub fn new(perspective: Perspective) -> Self {
        Self {
            perspective,
            remove_political: false,
            embeddings: None,
            token_model: None,
        }
    }

    pub fn remove_political(mut self, remove: bool) -> Self {
        self.remove_political = remove;
        self
    }

    pub fn with_embeddings(mut self, embeddings: &'a Embeddings) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Prepend the model's top `k` keyword tokens to every turn. `k == 0` disables.
    pub fn with_token_model(mut self, model: &'a dyn TokenModel, k: usize) -> Self {
        self.token_model = (k > 0).then_some((model, k));
        self
    }

    pub fn build_from_path(&self, path: &Path) -> Result<Vec<Episode>, EdError> {
        let file = std::fs::File::open(path)?;
        self.build_from_reader(std::io::BufReader::new(file))
    }

    /// Parse a split file. The first line is a header.
    pub fn build_from_reader<R: Read>(&self, reader: R) -> Result<Vec<Episode>, EdError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .quoting(false)
            .flexible(true)
            .from_reader(reader);
        let rows = rdr
            .records()
            .map(|r| r.map_err(EdError::from).and_then(|rec| RawRow::from_record(&rec)))
            .collect::<Result<Vec<_>, _>>()?;
        self.build(&rows)
    }

    pub fn build(&self, rows: &[RawRow]) -> Result<Vec<Episode>, EdError> {
        let mut episodes = Vec::new();
        let mut experiencer_side: Vec<TurnRecord> = Vec::new();
        let mut responder_side: Vec<TurnRecord> = Vec::new();
        let mut expected_turn = 1u32;

        for i in 1..rows.len() {
            let prev = &rows[i - 1];
            let cur = &rows[i];

            if prev.conv_id != cur.conv_id {
                expected_turn = 1;
                episodes.extend(self.select(
                    &prev.conv_id,
                    std::mem::take(&mut experiencer_side),
                    std::mem::take(&mut responder_side),
                ));
                continue;
            }

            expected_turn += 1;
            if prev.turn.checked_add(1) != Some(cur.turn) || cur.turn != expected_turn {
                return Err(EdError::Format(format!(
                    "line {}: conversation {} jumps from utterance {} to {} (expected {})",
                    cur.line, cur.conv_id, prev.turn, cur.turn, expected_turn
                )));
            }

            let turn = self.turn_record(prev, cur, i)?;
            if cur.turn % 2 == 0 {
                experiencer_side.push(turn);
            } else {
                responder_side.push(turn);
            }
        }

        if let Some(last) = rows.last() {
            episodes.extend(self.select(&last.conv_id, experiencer_side, responder_side));
        }

        log::info!(
            "built {} episodes ({} turns) from {} rows, perspective {}",
            episodes.len(),
            episodes.iter().map(Episode::len).sum::<usize>(),
            rows.len(),
            self.perspective
        );
        Ok(episodes)
    }

    /// Decide which sides of a finished conversation become episodes.
    pub fn select(
        &self,
        conv_id: &str,
        experiencer_side: Vec<TurnRecord>,
        responder_side: Vec<TurnRecord>,
    ) -> Vec<Episode> {
        if self.remove_political
            && experiencer_side
                .iter()
                .chain(responder_side.iter())
                .any(|t| t.is_political)
        {
            log::debug!("dropping political conversation {conv_id}");
            return Vec::new();
        }

        let mut selected = Vec::with_capacity(2);
        for (side, turns) in [
            (Perspective::Experiencer, experiencer_side),
            (Perspective::Responder, responder_side),
        ] {
            if !turns.is_empty() && self.perspective.admits(side) {
                selected.push(Episode {
                    conv_id: conv_id.to_string(),
                    perspective: side,
                    turns,
                });
            }
        }
        selected
    }

    /// `index` is the data row position of `cur`; `prev` sits at `index - 1`.
    fn turn_record(&self, prev: &RawRow, cur: &RawRow, index: usize) -> Result<TurnRecord, EdError> {
        let context = unescape(&prev.utterance);
        let label = unescape(&cur.utterance);

        let (context_embedding, candidate_embedding) = match self.embeddings {
            Some(emb) => (Some(emb.require_row(index - 1)?), Some(emb.require_row(index)?)),
            None => (None, None),
        };

        let (prepend_context, prepend_candidate) = match self.token_model {
            Some((model, k)) => (
                Some(prepend_tokens(model, &context, k)),
                Some(prepend_tokens(model, &label, k)),
            ),
            None => (None, None),
        };

        Ok(TurnRecord {
            context,
            label,
            prompt: cur.emotion.clone(),
            situation: unescape(&cur.situation),
            context_embedding,
            candidate_embedding,
            prepend_context,
            prepend_candidate,
            inline_label_candidates: cur.inline_candidates(),
            is_political: prev.is_political() || cur.is_political(),
        })
    }
}
