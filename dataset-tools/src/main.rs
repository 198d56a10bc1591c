use clap::{Parser, Subcommand};
use cropdoc_dataset_tools::check::check_images;
use cropdoc_dataset_tools::split::{SplitConfig, split_dataset};
use cropdoc_dataset_tools::subsample::{SubsampleConfig, subsample};
use std::path::PathBuf;
use std::process::ExitCode;

/// Offline dataset preparation for the crop disease classifier
#[derive(Parser, Debug)]
#[command(name = "dataset-prep")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report files that cannot be decoded as images
    Check {
        /// Directories to scan recursively
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
    /// Copy a random subset of each class into a reduced dataset
    Subsample {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        target: PathBuf,
        /// Images to keep per class
        #[arg(long, default_value_t = 38)]
        per_class: usize,
        /// Seed for a reproducible selection
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Split each class into training and validation directories
    Split {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        train: PathBuf,
        #[arg(long)]
        validation: PathBuf,
        /// Fraction of each class used for training
        #[arg(long, default_value_t = 0.8)]
        ratio: f64,
        /// Seed for a reproducible split
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn run(command: Command) -> cropdoc_dataset_tools::Result<bool> {
    match command {
        Command::Check { dirs } => {
            let mut corrupted = Vec::new();
            for dir in &dirs {
                log::info!("Checking {}...", dir.display());
                let report = check_images(dir)?;
                log::info!("Scanned {} files in {}", report.scanned, dir.display());
                corrupted.extend(report.corrupted);
            }

            if corrupted.is_empty() {
                println!("No corrupted or invalid images found.");
                return Ok(true);
            }
            println!("Corrupted or invalid images found:");
            for image in &corrupted {
                println!("{}", image.path.display());
            }
            Ok(false)
        }
        Command::Subsample {
            source,
            target,
            per_class,
            seed,
        } => {
            let report = subsample(&source, &target, &SubsampleConfig { per_class, seed })?;
            for (class, sample) in &report.classes {
                println!("{}: {}/{}", class, sample.copied, sample.available);
            }
            println!(
                "Reduced dataset created with {} images in {} classes.",
                report.total_copied(),
                report.classes.len()
            );
            Ok(true)
        }
        Command::Split {
            source,
            train,
            validation,
            ratio,
            seed,
        } => {
            let report = split_dataset(&source, &train, &validation, &SplitConfig { ratio, seed })?;
            for (class, split) in &report.classes {
                println!("{}: {} train / {} validation", class, split.train, split.validation);
            }
            println!("Dataset split into train and validation sets.");
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(2)
        }
    }
}
