use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Quarry workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the arena benchmarks with each zeroing strategy
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

/// Criterion baseline name and the cargo features it is built with.
const VARIANTS: &[(&str, &str)] = &[("serial", ""), ("parallel", "parallel")];

const BENCH: &str = "arena_benchmark";

/// Mean time per iteration in nanoseconds, keyed by workload then baseline.
type Results = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Serialize)]
struct Summary<'a> {
    bench: &'a str,
    baselines: Vec<&'a str>,
    results: &'a Results,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Compiling benchmarks...");
    let status = Command::new("cargo")
        .args(["build", "--bench", BENCH, "--release"])
        .status()?;
    if !status.success() {
        anyhow::bail!("Failed to compile benchmarks");
    }

    for (baseline, features) in VARIANTS {
        println!("\n>>> Benchmarking baseline: {baseline}");
        let start = Instant::now();

        let mut cmd = Command::new("cargo");
        cmd.env("CARGO_INCREMENTAL", "0");
        cmd.args(["bench", "--bench", BENCH]);
        if !features.is_empty() {
            cmd.args(["--features", *features]);
        }

        // Args for the test runner (Criterion) go after --
        cmd.arg("--");
        cmd.arg("--save-baseline").arg(baseline);

        if quick {
            cmd.args(["--measurement-time", "0.1", "--noplot", "--sample-size", "10"]);
        }

        let status = cmd
            .status()
            .with_context(|| format!("Failed to run bench for {baseline}"))?;

        if status.success() {
            println!("Finished {baseline} in {:.2?}", start.elapsed());
        } else {
            eprintln!("Warning: Benchmark failed for {baseline}");
        }
    }

    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");

    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = Results::new();
    collect_results(criterion_dir, criterion_dir, &mut results)?;

    let out_dir = Path::new("benchmark_results");
    fs::create_dir_all(out_dir)?;

    let report_path = out_dir.join("report.md");
    let mut file = fs::File::create(&report_path)?;

    writeln!(file, "# Arena Benchmark Report")?;
    writeln!(file)?;

    write!(file, "| Workload |")?;
    for (baseline, _) in VARIANTS {
        write!(file, " {baseline} (mean) |")?;
    }
    writeln!(file, " parallel vs serial |")?;

    write!(file, "|---|")?;
    for _ in VARIANTS {
        write!(file, "---|")?;
    }
    writeln!(file, "---|")?;

    for (workload, times) in &results {
        write!(file, "| {workload} |")?;
        for (baseline, _) in VARIANTS {
            match times.get(*baseline) {
                Some(ns) => write!(file, " {} |", format_time(*ns))?,
                None => write!(file, " N/A |")?,
            }
        }
        match (times.get("serial"), times.get("parallel")) {
            (Some(serial), Some(parallel)) if *parallel > 0.0 => {
                writeln!(file, " **{:.2}x** |", serial / parallel)?;
            }
            _ => writeln!(file, " - |")?,
        }
    }

    let summary = Summary {
        bench: BENCH,
        baselines: VARIANTS.iter().map(|(baseline, _)| *baseline).collect(),
        results: &results,
    };
    let summary_path = out_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    println!("Report written to {}", report_path.display());
    println!("Summary written to {}", summary_path.display());
    Ok(())
}

fn format_time(ns: f64) -> String {
    if ns >= 1_000_000.0 {
        format!("{:.2} ms", ns / 1_000_000.0)
    } else if ns >= 1_000.0 {
        format!("{:.2} µs", ns / 1_000.0)
    } else {
        format!("{ns:.0} ns")
    }
}

/// Walks criterion output laid out as `<workload path>/<baseline>/estimates.json`.
fn collect_results(root: &Path, dir: &Path, results: &mut Results) -> Result<()> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(());
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(root, &path, results)?;
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("estimates.json") {
            continue;
        }

        let Some(baseline_dir) = path.parent() else {
            continue;
        };
        let Some(baseline) = baseline_dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if !VARIANTS.iter().any(|(name, _)| *name == baseline) {
            continue;
        }
        let Some(workload_dir) = baseline_dir.parent() else {
            continue;
        };
        let workload = workload_dir
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", workload_dir.display(), root.display()))?
            .to_string_lossy()
            .into_owned();

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Malformed estimates in {}", path.display()))?;
        if let Some(mean) = json
            .get("mean")
            .and_then(|m| m.get("point_estimate"))
            .and_then(serde_json::Value::as_f64)
        {
            results
                .entry(workload)
                .or_default()
                .insert(baseline.to_owned(), mean);
        }
    }

    Ok(())
}
