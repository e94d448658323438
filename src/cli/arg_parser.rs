use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const OUTPUT: &'static str = "_output";
    pub const VOICE_CONFIG: &'static str = "cfg/voice.json";
}

/// Long-form text-to-speech synthesis of text chapters.
#[derive(Clone, Debug, Parser)]
#[command(name = "voice-batch")]
#[command(about = "Create text-to-speech synthesis from text chapters using Azure Speech.")]
pub struct Cli {
    /// Input file, or directory of `.txt` files, to synthesize
    #[arg(value_name = "INPUT", required_unless_present = "list_only")]
    pub input: Option<PathBuf>,

    /// Output directory to write to
    #[arg(long, short, default_value = DefaultArgs::OUTPUT)]
    pub output: PathBuf,

    /// Voice configuration JSON forwarded to the service
    #[arg(long, default_value = DefaultArgs::VOICE_CONFIG)]
    pub config: PathBuf,

    /// Azure region, overrides AZURE_REGION
    #[arg(long)]
    pub azure_region: Option<String>,

    /// Azure batch synthesis host, overrides AZURE_ENDPOINT
    #[arg(long)]
    pub azure_endpoint: Option<String>,

    /// Synthesize synchronously, chunk by chunk, instead of submitting batch jobs
    #[arg(long, conflicts_with = "list_only")]
    pub realtime: bool,

    /// List the batch synthesis jobs known to the service and exit
    #[arg(long)]
    pub list_only: bool,

    /// Verbose logging, including per-job status on every poll cycle
    #[arg(long)]
    pub debug: bool,
}
