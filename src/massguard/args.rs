use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// "0.3.2" for tagged releases, "0.3.2@abc1234 2024-01-15 14:30" otherwise.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "massguard", bin_name = "massguard", version = get_version())]
#[command(about = "Filter nested attribute payloads against named fieldsets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log every dropped key (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter a JSON payload and print what survives
    #[command(alias = "f")]
    #[command(group(ArgGroup::new("whitelist").required(true).args(["fieldset", "literal"])))]
    Filter {
        /// Policy file (JSON)
        #[arg(short, long)]
        policy: PathBuf,

        /// Root entity type of the payload
        #[arg(short, long)]
        entity: String,

        /// Registered fieldset to filter with
        #[arg(short, long)]
        fieldset: Option<String>,

        /// Ad hoc whitelist literal (JSON), e.g. '["name", {"tags_attributes": "all"}]'
        #[arg(short, long)]
        literal: Option<String>,

        /// Payload file (reads stdin when omitted)
        #[arg(required = false)]
        payload: Option<PathBuf>,
    },

    /// List registered fieldsets
    #[command(alias = "ls")]
    Fieldsets {
        /// Policy file (JSON)
        #[arg(short, long)]
        policy: PathBuf,

        /// Only this entity type
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Load and validate a policy file
    Check {
        /// Policy file (JSON)
        #[arg(short, long)]
        policy: PathBuf,
    },
}
