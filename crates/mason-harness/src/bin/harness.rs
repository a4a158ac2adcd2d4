//! CLI entrypoint for the mason stress harness.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use mason_harness::{run_jobs_workload, run_tlsf_stress};

/// Stress and verification tooling for the mason allocators.
#[derive(Debug, Parser)]
#[command(name = "mason-harness")]
#[command(about = "Deterministic stress harness for mason-alloc and mason-jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a randomized TLSF allocate/free workload with invariant checks.
    Stress {
        /// RNG seed; identical seeds replay identical workloads.
        #[arg(long, default_value_t = 0x5eed)]
        seed: u64,
        /// Arena capacity in bytes (multiple of 8).
        #[arg(long, default_value_t = 1 << 20)]
        capacity: u64,
        /// Live-allocation cap.
        #[arg(long, default_value_t = 128)]
        max_allocs: u32,
        /// Number of allocate/free operations.
        #[arg(long, default_value_t = 10_000)]
        operations: u64,
    },
    /// Run a job-system throughput workload.
    Jobs {
        /// Worker thread count (1..=64).
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Ring capacity in queued jobs.
        #[arg(long, default_value_t = 256)]
        queue_capacity: usize,
        /// Total jobs to schedule.
        #[arg(long, default_value_t = 100_000)]
        jobs: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Stress { seed, capacity, max_allocs, operations } => {
            match run_tlsf_stress(seed, capacity, max_allocs, operations) {
                Ok(report) => {
                    match serde_json::to_string_pretty(&report) {
                        Ok(json) => println!("{json}"),
                        Err(err) => {
                            eprintln!("report serialization failed: {err}");
                            return ExitCode::FAILURE;
                        }
                    }
                    if report.passed { ExitCode::SUCCESS } else { ExitCode::FAILURE }
                }
                Err(err) => {
                    eprintln!("stress run failed: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Jobs { workers, queue_capacity, jobs } => {
            let report = run_jobs_workload(workers, queue_capacity, jobs);
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("report serialization failed: {err}");
                    return ExitCode::FAILURE;
                }
            }
            if report.passed { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
    }
}
