use clap::Parser;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use systolic_stream::config::SystolicConfig;
use systolic_stream::harness::verify_matmul;

/// Stream a random matrix product through the systolic pipeline model and
/// verify it against the reference.
#[derive(Parser, Debug)]
#[command(name = "systolic-stream", version, about)]
struct Args {
    /// Array dimension N (the grid is N x N)
    #[arg(short = 'n', long, default_value_t = 4)]
    array_size: usize,

    /// Activation and weight width in bits
    #[arg(short = 'd', long, default_value_t = 8)]
    data_width: usize,

    /// Accumulator width in bits
    #[arg(short = 'a', long, default_value_t = 32)]
    acc_width: usize,

    /// Seed for the operand and backpressure generators
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Probability in percent that the egress sink stalls on a given tick
    #[arg(short = 'b', long, default_value_t = 0)]
    backpressure: u8,

    /// Emit the run record as JSON instead of the table
    #[arg(short = 'j', long)]
    json: bool,

    /// Enable debug-level tracing
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    let default_filter = if args.verbose {
        "systolic_stream=debug"
    } else {
        "systolic_stream=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if args.array_size == 0
        || !(1..=64).contains(&args.data_width)
        || !(1..=64).contains(&args.acc_width)
    {
        eprintln!(
            "{} array size must be positive and widths within 1..=64",
            "error:".red().bold()
        );
        std::process::exit(1);
    }

    let config = SystolicConfig::new(args.array_size, args.data_width, args.acc_width);
    let n = config.array_size;
    let (lo, hi) = (config.min_value(), config.max_value());
    let mut rng = StdRng::seed_from_u64(args.seed);
    let a: Vec<Vec<i64>> = (0..n)
        .map(|_| (0..n).map(|_| rng.gen_range(lo..=hi)).collect())
        .collect();
    let b: Vec<Vec<i64>> = (0..n)
        .map(|_| (0..n).map(|_| rng.gen_range(lo..=hi)).collect())
        .collect();

    let stall = f64::from(args.backpressure.min(100)) / 100.0;
    let mut ready_rng = StdRng::seed_from_u64(args.seed.wrapping_add(0x9E37_79B9));
    let mut ready = |_tick: usize| ready_rng.gen::<f64>() >= stall;

    match verify_matmul(&config, &a, &b, &mut ready) {
        Ok(run) => {
            if args.json {
                match serde_json::to_string_pretty(&run) {
                    Ok(text) => println!("{}", text),
                    Err(err) => {
                        eprintln!("{} {}", "error:".red().bold(), err);
                        std::process::exit(1);
                    }
                }
            } else {
                println!(
                    "{} {}x{} product in {} ticks ({}% backpressure)",
                    "verified".green().bold(),
                    n,
                    n,
                    run.ticks,
                    args.backpressure
                );
                for row in &run.product {
                    let cells: Vec<String> = row.iter().map(|v| format!("{:>12}", v)).collect();
                    println!("  {}", cells.join(" "));
                }
            }
        }
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            std::process::exit(1);
        }
    }
}
