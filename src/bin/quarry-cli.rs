// Command-line entry point for the corpus pipeline: load configuration,
// apply overrides, run the enabled stages, print a summary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use quarry::config::Config;
use quarry::pipeline::{Pipeline, PipelineReport};

#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(version)]
#[command(about = "Build a labeled speech corpus from audio + subtitle pairs", long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "quarry.toml")]
    config: PathBuf,

    /// Input directory (overrides the config file).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory (overrides the config file).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the chunking stage (downstream stages need its output, so this
    /// ends the run after input discovery).
    #[arg(long)]
    skip_chunking: bool,

    /// Skip the merging stage.
    #[arg(long)]
    skip_merging: bool,

    /// Skip the validation stage.
    #[arg(long)]
    skip_validation: bool,
}

fn main() -> ExitCode {
    quarry::logging::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if !args.config.is_file() {
        anyhow::bail!(
            "config file not found: {} (copy quarry.example.toml to get started)",
            args.config.display()
        );
    }

    let mut config = Config::load(&args.config)?.with_env_overrides()?;

    if let Some(input) = args.input {
        config.input_dir = input;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if args.skip_chunking {
        config.steps.chunking = false;
    }
    if args.skip_merging {
        config.steps.merging = false;
    }
    if args.skip_validation {
        config.steps.validation = false;
    }

    let pipeline = Pipeline::new(config).context("failed to initialize pipeline")?;
    let report = pipeline.run().context("pipeline failed")?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("Pipeline summary");
    println!("  pairs found:     {}", report.pairs_found);
    println!(
        "  steps completed: {}",
        if report.steps_completed.is_empty() {
            "none".to_string()
        } else {
            report.steps_completed.join(", ")
        }
    );
    println!("  output dir:      {}", report.output_dir.display());

    if let Some(chunking) = &report.chunking {
        println!(
            "  chunking:        {} records ({} cues, {} skipped)",
            chunking.records, chunking.total_cues, chunking.skipped
        );
    }
    if let Some(merging) = &report.merging {
        println!(
            "  merging:         {} -> {} records",
            merging.input_records, merging.merged_records
        );
    }
    if let Some(validation) = &report.validation {
        println!(
            "  validation:      {} valid, {} flagged, {} dropped",
            validation.valid, validation.flagged, validation.dropped
        );
        println!("  validated index: {}", validation.validated_path.display());
        println!("  flagged file:    {}", validation.flagged_path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_defaults() {
        let args = Args::try_parse_from(["quarry"]).expect("bare invocation parses");
        assert_eq!(args.config, PathBuf::from("quarry.toml"));
        assert!(args.input.is_none());
        assert!(!args.skip_merging);
    }

    #[test]
    fn args_parse_overrides_and_skips() {
        let args = Args::try_parse_from([
            "quarry",
            "--config",
            "custom.toml",
            "-i",
            "in",
            "-o",
            "out",
            "--skip-validation",
        ])
        .expect("full invocation parses");

        assert_eq!(args.config, PathBuf::from("custom.toml"));
        assert_eq!(args.input.as_deref(), Some(std::path::Path::new("in")));
        assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out")));
        assert!(args.skip_validation);
        assert!(!args.skip_chunking);
    }

    #[test]
    fn run_fails_with_hint_when_config_is_missing() {
        let err = run(Args {
            config: PathBuf::from("/no/such/quarry.toml"),
            input: None,
            output: None,
            skip_chunking: false,
            skip_merging: false,
            skip_validation: false,
        })
        .unwrap_err();

        assert!(err.to_string().contains("config file not found"));
    }
}
