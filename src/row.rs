use crate::EdError;
use csv::StringRecord;

/// Marker in the tags column flagging an utterance as political.
pub const POLITICAL_MARKER: &str = "<POLITICAL>";

const COMMA_TOKEN: &str = "_comma_";
const PIPE_TOKEN: &str = "_pipe_";

/// One data line of a split file, fields still escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub conv_id: String,
    pub turn: u32,
    pub emotion: String,
    pub situation: String,
    pub speaker: String,
    pub utterance: String,
    pub tags: String,
    pub candidates: Option<String>,
    /// 1-based line number in the source file, for error messages.
    pub line: u64,
}

impl RawRow {
    pub fn from_record(record: &StringRecord) -> Result<Self, EdError> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<&str> = record.iter().collect();
        Self::from_fields(&fields, line)
    }

    pub fn from_fields(fields: &[&str], line: u64) -> Result<Self, EdError> {
        if fields.len() != 8 && fields.len() != 9 {
            return Err(EdError::Format(format!(
                "line {line} has {} fields, expected 8 or 9",
                fields.len()
            )));
        }
        let turn = fields[1].trim().parse::<u32>().map_err(|e| {
            EdError::Format(format!(
                "line {line}: bad utterance index {:?}: {e}",
                fields[1]
            ))
        })?;
        Ok(Self {
            conv_id: fields[0].to_string(),
            turn,
            emotion: fields[2].to_string(),
            situation: fields[3].to_string(),
            speaker: fields[4].to_string(),
            utterance: fields[5].to_string(),
            tags: fields[7].to_string(),
            candidates: fields.get(8).map(|s| s.to_string()),
            line,
        })
    }

    pub fn is_political(&self) -> bool {
        self.tags.contains(POLITICAL_MARKER)
    }

    /// Inline label candidates, unescaped. Empty when the column is missing or blank.
    pub fn inline_candidates(&self) -> Vec<String> {
        match self.candidates.as_deref() {
            Some(raw) if !raw.is_empty() => raw.split('|').map(unescape_candidate).collect(),
            _ => Vec::new(),
        }
    }
}

/// Restore literal commas in an utterance or situation field.
pub fn unescape(field: &str) -> String {
    field.replace(COMMA_TOKEN, ",")
}

/// Inverse of [`unescape`].
pub fn escape(text: &str) -> String {
    text.replace(',', COMMA_TOKEN)
}

/// Restore commas and pipes in a single inline candidate.
pub fn unescape_candidate(field: &str) -> String {
    field.replace(COMMA_TOKEN, ",").replace(PIPE_TOKEN, "|")
}

/// Inverse of [`unescape_candidate`].
pub fn escape_candidate(text: &str) -> String {
    text.replace(',', COMMA_TOKEN).replace('|', PIPE_TOKEN)
}
