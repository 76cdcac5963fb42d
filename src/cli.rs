use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "empathetic",
    version,
    about = "Load EmpatheticDialogues splits as training episodes"
)]
pub struct Cli {
    /// Data root containing empatheticdialogues/empatheticdialogues/<split>.csv
    #[arg(long, env = "EMPATHETIC_DATAPATH", global = true)]
    pub datapath: Option<PathBuf>,

    /// Config file (default: EMPATHETIC_CONFIG or ~/.empathetic/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub teacher: TeacherArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show episode and example counts for a split
    Stats,
    /// Write every example of a split as JSON lines on stdout
    Dump(DumpArgs),
    /// Write the examples of one episode as JSON lines on stdout
    Show(ShowArgs),
    /// Parse a split and report format errors
    Check,
}

/// Teacher options. Unset values fall back to the config file, then defaults.
#[derive(Args, Debug, Clone)]
pub struct TeacherArgs {
    /// Split and modifiers, e.g. train, valid, test, train:stream
    #[arg(long, default_value = "train", global = true)]
    pub datatype: String,

    /// experiencer, responder, both, or per split: "train:both,test:experiencer,valid:experiencer"
    #[arg(long, global = true)]
    pub perspective: Option<String>,

    /// On the train split, use only experiencer utterances as text (overrides --perspective)
    #[arg(long, global = true)]
    pub train_experiencer_only: Option<bool>,

    /// Drop conversations containing an utterance marked political
    #[arg(long, global = true)]
    pub remove_political_convos: Option<bool>,

    /// Append the emotion to the first turn (experiencer generation only)
    #[arg(long, global = true)]
    pub include_emotion: Option<bool>,

    /// Prefix of per-split .npy embedding files (<prefix><split>.npy)
    #[arg(long, global = true)]
    pub embedding_prefix: Option<String>,

    /// Keyword model file (__label__<name> word ... per line)
    #[arg(long, global = true)]
    pub token_model: Option<PathBuf>,

    /// Number of keyword tokens to prepend (requires --token-model)
    #[arg(long, global = true)]
    pub prepend: Option<usize>,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Experiencer generation view: responder episodes, situation on the first turn
    #[arg(long)]
    pub experiencer: bool,

    /// Stop after this many examples
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Episode index
    pub episode: usize,

    /// Experiencer generation view
    #[arg(long)]
    pub experiencer: bool,
}
