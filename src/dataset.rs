use crate::EdError;
use std::path::{Path, PathBuf};

pub const DATASET_DIR: &str = "empatheticdialogues";

/// `<datapath>/empatheticdialogues/empatheticdialogues/<split>.csv`
pub fn split_path(datapath: &Path, split: &str) -> PathBuf {
    datapath
        .join(DATASET_DIR)
        .join(DATASET_DIR)
        .join(format!("{split}.csv"))
}

/// Default data root: ~/.empathetic/data
pub fn default_datapath() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".empathetic").join("data")
}

/// Fail unless the split file is already in place. Fetching the release is
/// left to the caller.
pub fn require_dataset(path: &Path) -> Result<(), EdError> {
    if path.is_file() {
        return Ok(());
    }
    Err(EdError::Config(format!(
        "dataset file {} not found; download and extract the EmpatheticDialogues release under the data path",
        path.display()
    )))
}
