//! Command-line argument definitions.
use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::config::profiles::DEFAULT_PROFILE;

/// Command-line surface of `quack`.
#[derive(Parser, Debug)]
#[command(
    name = "quack",
    about = "Vendor pinned git modules and run task profiles",
    version
)]
pub struct Cli {
    /// Configuration file, relative to the project root
    #[arg(short = 'y', long = "yaml", default_value = DEFAULT_CONFIG_FILE)]
    pub yaml: PathBuf,

    /// Profile to run
    #[arg(
        short,
        long,
        num_args = 0..=1,
        default_value = DEFAULT_PROFILE,
        default_missing_value = DEFAULT_PROFILE
    )]
    pub profile: String,

    /// Project root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Continue with the remaining modules when one fails to clone or check out
    #[arg(long)]
    pub keep_going: bool,

    /// Run nested quack references as separate processes
    #[arg(long)]
    pub isolated: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Nesting level of this process, set by isolated parent runs
    #[arg(long, hide = true, default_value_t = 0)]
    pub depth: usize,
}
