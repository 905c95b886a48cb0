use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nvl",
    about = "Inspect and convert packed name/value lists",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with flags and unpack limits
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Compare keys case-insensitively (ASCII only)
    #[arg(long, global = true)]
    pub ignore_case: bool,

    /// Allow duplicate keys
    #[arg(long, global = true)]
    pub no_unique: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print every entry, nested lists indented
    Dump(InputArgs),
    /// List entry names and types
    Keys(InputArgs),
    /// Print the value of one entry
    Get(GetArgs),
    /// Convert a packed list to JSON
    Json(JsonArgs),
    /// Build a packed list from a JSON object
    Pack(PackArgs),
}

#[derive(Args)]
pub struct InputArgs {
    /// Packed list, `-` for stdin
    pub input: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    /// Packed list, `-` for stdin
    pub input: PathBuf,
    pub key: String,
}

#[derive(Args)]
pub struct JsonArgs {
    /// Packed list, `-` for stdin
    pub input: PathBuf,
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args)]
pub struct PackArgs {
    /// JSON document, `-` for stdin
    pub input: PathBuf,
    /// Output file, stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
