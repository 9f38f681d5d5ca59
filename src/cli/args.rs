use crate::config::ProcessorConfig;
use crate::models::{ChunkBy, QaCategory};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "swob-qa-processor")]
#[command(about = "Flattens quality-assessed SWOB-ML station observations into chunked JSON batches")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract every eligible file in a folder and persist one batch per chunk
    Process(ProcessArgs),

    /// Compare extracted QA outcomes with each file's declared summary counts
    Check {
        #[arg(help = "Folder of observation XML files")]
        input_dir: PathBuf,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, help = "Process files one at a time")]
        sequential: bool,
    },

    /// Build or load the file to station mapping of a folder
    Stations {
        #[arg(help = "Folder of observation XML files")]
        input_dir: PathBuf,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, help = "Ignore a cached mapping and rebuild it")]
        refresh: bool,
    },

    /// Display information about a persisted batch file
    Info {
        #[arg(help = "Batch JSON file")]
        file: PathBuf,

        #[arg(short, long, default_value = "0", help = "Print the keys of this many records")]
        sample: usize,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProcessArgs {
    #[arg(help = "Folder of observation XML files")]
    pub input_dir: PathBuf,

    #[arg(long, help = "Chunking mode")]
    pub chunk_by: Option<ChunkBy>,

    #[arg(long, help = "Files per chunk [default: files / workers, at most 1000]")]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub max_workers: Option<usize>,

    #[arg(long, help = "Process chunks one at a time")]
    pub sequential: bool,

    #[arg(short, long, help = "Output folder [default: input folder with raw replaced by interim]")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_delimiter = ',', help = "QA categories to extract, comma separated")]
    pub categories: Option<Vec<QaCategory>>,

    #[arg(long, help = "Only extract category summaries, not individual tests")]
    pub no_subtests: bool,

    #[arg(long, help = "Skip native error/suspect/suppressed codes")]
    pub no_native_codes: bool,

    #[arg(long, help = "Check QA counts of every record against the declared summary")]
    pub verify_counts: bool,

    #[arg(long, help = "Abort a chunk on its first failing file")]
    pub fail_fast: bool,
}

impl ProcessArgs {
    /// Overlay the flags that were given on a loaded configuration
    pub fn apply_overrides(&self, config: &mut ProcessorConfig) {
        if let Some(chunk_by) = self.chunk_by {
            config.chunk_by = chunk_by;
        }
        if self.chunk_size.is_some() {
            config.chunk_size = self.chunk_size;
        }
        if let Some(workers) = self.max_workers {
            config.max_workers = workers;
        }
        if self.sequential {
            config.parallel = false;
        }
        if let Some(categories) = &self.categories {
            config.categories = categories.clone();
        }
        if self.no_subtests {
            config.output_subtests = false;
        }
        if self.no_native_codes {
            config.native_codes = false;
        }
        if self.verify_counts {
            config.verify_counts = true;
        }
        if self.fail_fast {
            config.fail_fast = true;
        }
    }
}
