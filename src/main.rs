use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rusty_fair::cli::{Cli, Command, PipelineArgs, ReportArgs, ReweighArgs};
use rusty_fair::data::writer::write_file;
use rusty_fair::{Pipeline, PipelineOutput};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Report(args) => run_report(args),
        Command::Reweigh(args) => run_reweigh(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_pipeline(args: &PipelineArgs) -> Result<PipelineOutput> {
    let config = args.resolve().context("resolving pipeline configuration")?;
    let pipeline = Pipeline::from_file(args.data_path(), config)
        .with_context(|| format!("loading {}", args.data_path().display()))?;
    pipeline.run().context("running reweighing pipeline")
}

fn run_report(args: ReportArgs) -> Result<()> {
    let out = run_pipeline(&args.pipeline)?;
    if args.json {
        let text = serde_json::to_string_pretty(&out.report).context("serializing report")?;
        println!("{text}");
    } else {
        println!("{}", out.report);
    }
    Ok(())
}

fn run_reweigh(args: ReweighArgs) -> Result<()> {
    let out = run_pipeline(&args.pipeline)?;
    println!("{}", out.report);

    write_file(&out.train, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    if let Some(path) = &args.test_output {
        write_file(&out.test, path).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
