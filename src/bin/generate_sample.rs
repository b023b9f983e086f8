//! Writes a synthetic credit dataset in which older applicants are approved
//! more often, for trying out `rusty-fair`.
//!
//! ```bash
//! generate_sample [OUTPUT.csv] [ROWS] [--seed 42]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic credit dataset with an age disparity")]
struct Args {
    /// Output CSV file
    #[arg(default_value = "sample_credit.csv")]
    output: PathBuf,

    /// Number of applicants
    #[arg(default_value_t = 1000)]
    rows: usize,

    /// Generator seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Serialize)]
struct Applicant {
    age: u32,
    sex: &'static str,
    duration_months: u32,
    credit_amount: f64,
    /// 1 = good, 2 = bad
    credit: u8,
}

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn applicant(rng: &mut StdRng) -> Applicant {
    let age = gauss(rng, 36.0, 11.0).clamp(19.0, 75.0).round() as u32;
    let duration_months = rng.gen_range(6..=60);
    let credit_amount = gauss(rng, 3300.0, 2800.0).max(250.0).round();

    // Approval odds rise with age and fall with loan size.
    let mut p_good = if age >= 25 { 0.73 } else { 0.58 };
    if credit_amount > 8000.0 {
        p_good -= 0.15;
    }
    let credit = if rng.gen_bool(p_good) { 1 } else { 2 };

    Applicant {
        age,
        sex: if rng.gen_bool(0.69) { "male" } else { "female" },
        duration_months,
        credit_amount,
        credit,
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let rows = args.rows;
    let output_path = args.output.display().to_string();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {output_path}"))?;

    for _ in 0..rows {
        writer
            .serialize(applicant(&mut rng))
            .context("writing applicant row")?;
    }
    writer.flush().context("flushing output")?;

    log::info!("Wrote {rows} applicants to {output_path}");
    println!("Wrote {rows} applicants to {output_path}");
    Ok(())
}
