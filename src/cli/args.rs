//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate a static HTML site from Markdown documents
#[derive(Parser, Debug)]
#[command(name = "mdsite")]
#[command(about = "Generate a static HTML site from Markdown documents")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether verbose logging was requested
    pub fn verbose(&self) -> bool {
        matches!(self.command, Command::Build { verbose: true, .. })
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a directory of Markdown documents into a static site
    Build {
        /// Directory containing the Markdown sources
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Document the root index redirects to
        #[arg(long)]
        home: Option<String>,

        /// Extension of generated pages
        #[arg(long = "ext")]
        page_extension: Option<String>,

        /// Href prefix denoting a site document (can be repeated)
        #[arg(long = "prefix")]
        prefixes: Vec<String>,

        /// Glob patterns to exclude (can be repeated)
        #[arg(long)]
        exclude: Vec<String>,

        /// Worker threads (0 = one per core)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Remove the output directory first
        #[arg(long)]
        clean: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Serve a generated site locally
    Serve {
        /// Path to the generated site
        path: PathBuf,

        /// Port to serve on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Extension of the generated pages, used for directory indexes
        #[arg(long = "ext", default_value = "html")]
        page_extension: String,
    },

    /// Print the navigation resolved for one document as JSON
    Nav {
        /// Document path to resolve the navigation for
        #[arg(long, default_value = "readme")]
        current: String,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}
