use crate::EdError;
use crate::cli::TeacherArgs;
use crate::episode::Perspective;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_PERSPECTIVE: &str = "train:both,test:experiencer,valid:experiencer";
pub const DEFAULT_DATATYPE: &str = "train";

#[derive(Debug, Deserialize, Default)]
pub struct EdConfig {
    #[serde(default)]
    pub teacher: TeacherConfig,
    #[serde(default)]
    pub features: FeatureConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct TeacherConfig {
    /// `experiencer`, `responder`, `both`, or `split:value` pairs joined by commas.
    pub perspective: Option<String>,
    /// Forces `experiencer` on the train split; overrides `perspective`.
    pub train_experiencer_only: Option<bool>,
    pub remove_political_convos: Option<bool>,
    pub include_emotion: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FeatureConfig {
    pub embedding_file_prefix: Option<String>,
    pub external_token_model_path: Option<PathBuf>,
    pub prepend_count: Option<usize>,
}

/// Perspective selection, either one value for every split or a value per split name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerspectivePolicy {
    Fixed(Perspective),
    PerSplit(HashMap<String, Perspective>),
}

impl Default for PerspectivePolicy {
    fn default() -> Self {
        PerspectivePolicy::PerSplit(HashMap::from([
            ("train".into(), Perspective::Both),
            ("test".into(), Perspective::Experiencer),
            ("valid".into(), Perspective::Experiencer),
        ]))
    }
}

impl FromStr for PerspectivePolicy {
    type Err = EdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(p) = s.parse::<Perspective>() {
            return Ok(PerspectivePolicy::Fixed(p));
        }
        let mut map = HashMap::new();
        for part in s.split(',') {
            let Some((split, value)) = part.split_once(':') else {
                return Err(EdError::Config(format!(
                    "invalid perspective {s:?}: {part:?} is not split:value"
                )));
            };
            let split = split.trim();
            if split.is_empty() {
                return Err(EdError::Config(format!(
                    "invalid perspective {s:?}: empty split name"
                )));
            }
            let value = value
                .trim()
                .parse::<Perspective>()
                .map_err(|e| EdError::Config(format!("invalid perspective {s:?}: {e}")))?;
            map.insert(split.to_string(), value);
        }
        Ok(PerspectivePolicy::PerSplit(map))
    }
}

impl PerspectivePolicy {
    pub fn resolve(&self, split: &str) -> Result<Perspective, EdError> {
        match self {
            PerspectivePolicy::Fixed(p) => Ok(*p),
            PerspectivePolicy::PerSplit(map) => map.get(split).copied().ok_or_else(|| {
                EdError::Config(format!("perspective has no entry for split {split:?}"))
            }),
        }
    }
}

/// Fully resolved options for one teacher instance.
#[derive(Debug, Clone)]
pub struct TeacherOptions {
    /// e.g. `train`, `train:stream`, `valid`
    pub datatype: String,
    pub perspective: PerspectivePolicy,
    pub train_experiencer_only: bool,
    pub remove_political_convos: bool,
    pub include_emotion: bool,
    pub embedding_file_prefix: Option<String>,
    pub external_token_model_path: Option<PathBuf>,
    /// Keyword tokens to prepend; 0 disables.
    pub prepend_count: usize,
}

impl Default for TeacherOptions {
    fn default() -> Self {
        Self {
            datatype: DEFAULT_DATATYPE.into(),
            perspective: PerspectivePolicy::default(),
            train_experiencer_only: false,
            remove_political_convos: false,
            include_emotion: false,
            embedding_file_prefix: None,
            external_token_model_path: None,
            prepend_count: 0,
        }
    }
}

impl TeacherOptions {
    /// Split name: the datatype up to the first `:`.
    pub fn split(&self) -> &str {
        split_of(&self.datatype)
    }

    pub fn resolve_perspective(&self) -> Result<Perspective, EdError> {
        if self.train_experiencer_only && self.split() == "train" {
            return Ok(Perspective::Experiencer);
        }
        self.perspective.resolve(self.split())
    }
}

pub fn split_of(datatype: &str) -> &str {
    datatype.split(':').next().unwrap_or(datatype)
}

/// Load config from EMPATHETIC_CONFIG env var, ~/.empathetic/config.toml, or defaults.
pub fn load_config() -> Result<EdConfig, EdError> {
    match config_path() {
        Some(p) if p.exists() => load_config_from(&p),
        _ => Ok(EdConfig::default()),
    }
}

pub fn load_config_from(path: &Path) -> Result<EdConfig, EdError> {
    let content = std::fs::read_to_string(path)?;
    let config: EdConfig = toml::from_str(&content)
        .map_err(|e| EdError::Config(format!("{}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("EMPATHETIC_CONFIG") {
        return Some(PathBuf::from(p));
    }
    let home = std::env::var("HOME").ok()?;
    Some(Path::new(&home).join(".empathetic").join("config.toml"))
}

fn validate_config(config: &EdConfig) -> Result<(), EdError> {
    if let Some(p) = &config.teacher.perspective {
        p.parse::<PerspectivePolicy>()?;
    }
    if config.features.prepend_count.unwrap_or(0) > 0
        && config.features.external_token_model_path.is_none()
    {
        return Err(EdError::Config(
            "features.prepend_count requires features.external_token_model_path".into(),
        ));
    }
    Ok(())
}

/// Merge the config file with command-line overrides. CLI values win.
pub fn resolve_options(config: &EdConfig, args: &TeacherArgs) -> Result<TeacherOptions, EdError> {
    let perspective = args
        .perspective
        .as_deref()
        .or(config.teacher.perspective.as_deref())
        .unwrap_or(DEFAULT_PERSPECTIVE)
        .parse::<PerspectivePolicy>()?;

    let external_token_model_path = args
        .token_model
        .clone()
        .or_else(|| config.features.external_token_model_path.clone());
    let prepend_count = args
        .prepend
        .or(config.features.prepend_count)
        .unwrap_or(0);
    if prepend_count > 0 && external_token_model_path.is_none() {
        return Err(EdError::Config(
            "--prepend requires --token-model (or features.external_token_model_path)".into(),
        ));
    }

    Ok(TeacherOptions {
        datatype: args.datatype.clone(),
        perspective,
        train_experiencer_only: args
            .train_experiencer_only
            .or(config.teacher.train_experiencer_only)
            .unwrap_or(false),
        remove_political_convos: args
            .remove_political_convos
            .or(config.teacher.remove_political_convos)
            .unwrap_or(false),
        include_emotion: args
            .include_emotion
            .or(config.teacher.include_emotion)
            .unwrap_or(false),
        embedding_file_prefix: args
            .embedding_prefix
            .clone()
            .or_else(|| config.features.embedding_file_prefix.clone()),
        external_token_model_path,
        prepend_count,
    })
}
