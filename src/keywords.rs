use crate::EdError;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

const LABEL_PREFIX: &str = "__label__";

/// Anything that can rank keyword labels for a piece of text.
pub trait TokenModel {
    /// Up to `k` labels, most relevant first.
    fn top_k_tokens(&self, text: &str, k: usize) -> Vec<String>;
}

/// Keyword prefix for `text`: each label is cut to the part after its last
/// `_`, then pushed to the front, so the most relevant token comes last.
/// Every token is followed by a single space.
pub fn prepend_tokens(model: &dyn TokenModel, text: &str, k: usize) -> String {
    let mut out = String::new();
    for label in model.top_k_tokens(text, k) {
        let token = label.rsplit('_').next().unwrap_or(label.as_str());
        out = format!("{token} {out}");
    }
    out
}

/// Word-overlap model read from a fastText-style supervised file:
/// one `__label__<name> word word ...` entry per line.
#[derive(Debug, Clone)]
pub struct LexiconModel {
    labels: Vec<(String, HashSet<String>)>,
}

impl LexiconModel {
    pub fn load(path: &Path) -> Result<Self, EdError> {
        if !path.exists() {
            return Err(EdError::Config(format!(
                "token model {} not found",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let model = Self::parse(&content)
            .map_err(|e| EdError::Config(format!("{}: {e}", path.display())))?;
        log::info!("loaded {} keyword labels from {}", model.len(), path.display());
        Ok(model)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut labels = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            if !head.starts_with(LABEL_PREFIX) || head.len() == LABEL_PREFIX.len() {
                return Err(format!("line {}: expected {LABEL_PREFIX}<name>", i + 1));
            }
            let words: HashSet<String> = WORD
                .find_iter(&rest.to_lowercase())
                .map(|m| m.as_str().to_string())
                .collect();
            labels.push((head.to_string(), words));
        }
        if labels.is_empty() {
            return Err("no labels".into());
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl TokenModel for LexiconModel {
    fn top_k_tokens(&self, text: &str, k: usize) -> Vec<String> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut scored: Vec<(usize, usize)> = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, (_, vocab))| (i, words.iter().filter(|w| vocab.contains(**w)).count()))
            .filter(|(_, score)| *score > 0)
            .collect();
        // stable: ties keep file order
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.labels[i].0.clone())
            .collect()
    }
}
