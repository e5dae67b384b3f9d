use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "apigen")]
#[command(about = "Invoke interchangeable code generator backends by name", long_about = None)]
pub struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List known generators
    List,
    /// Resolve a generator by name and report where it came from
    Resolve {
        name: String,

        /// Allow installing the backing package if it is missing
        #[arg(long)]
        install: bool,
    },
    /// Install a generator plugin package
    Install {
        package: String,

        /// Install as a regular dependency instead of a dev dependency
        #[arg(long)]
        no_dev: bool,

        /// Reinstall even if the package already resolves
        #[arg(long)]
        force: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Package manager to use (npm, yarn, pnpm, bun)
        #[arg(long)]
        package_manager: Option<String>,
    },
    /// Run a generator against a specification document
    Generate {
        generator: String,

        /// Input specification document
        #[arg(long)]
        spec: PathBuf,

        /// Output directory
        #[arg(long, default_value = "generated")]
        out: PathBuf,

        /// Generator options as a JSON object
        #[arg(long)]
        options: Option<String>,

        /// Allow installing the backing package if it is missing
        #[arg(long)]
        install: bool,
    },
}
