use clap::ArgMatches;

use crate::error::CliError;

pub fn maybe_run_bench(args: &ArgMatches) -> Result<Option<i32>, CliError> {
    // Dispatches benchmark sub-modes and returns an exit code if handled.
    if args.get_flag("bench") {
        return run_single_bench(args);
    }
    if args.get_flag("bench-sweep") {
        return run_sweep_bench(args);
    }
    Ok(None)
}

#[cfg(feature = "bench")]
fn parse_arg<T: std::str::FromStr>(args: &ArgMatches, name: &str) -> Result<T, CliError> {
    let raw = args
        .get_one::<String>(name)
        .ok_or_else(|| CliError::Usage(format!("missing --{}", name)))?;
    raw.parse::<T>()
        .map_err(|_| CliError::Usage(format!("invalid value for --{}: {}", name, raw)))
}

fn run_single_bench(_args: &ArgMatches) -> Result<Option<i32>, CliError> {
    #[cfg(not(feature = "bench"))]
    {
        eprintln!("Benchmarking requires the `bench` feature.");
        return Ok(Some(1));
    }
    #[cfg(feature = "bench")]
    {
        use centercut_lib::diagnostics::bench::{bench_center_cut, DspBenchConfig};

        let args = _args;
        let window_size: usize = parse_arg(args, "bench-window")?;
        let input_seconds: f32 = parse_arg(args, "bench-input-seconds")?;
        let iterations: usize = parse_arg(args, "bench-iterations")?;

        let result = bench_center_cut(DspBenchConfig {
            sample_rate: centercut_lib::constants::SAMPLE_RATE,
            input_seconds,
            window_size,
            overlap_count: centercut_lib::constants::OVERLAP_COUNT,
            iterations,
        })?;

        println!(
            "Separator bench (window={} input={}s iters={}): avg {:.2}ms (min {:.2}ms max {:.2}ms), audio {:.2}ms, rt {:.3}x, blocks {}",
            window_size,
            input_seconds,
            iterations,
            result.avg_ms,
            result.min_ms,
            result.max_ms,
            result.audio_time_ms,
            result.rt_factor,
            result.blocks
        );

        return Ok(Some(0));
    }
}

fn run_sweep_bench(_args: &ArgMatches) -> Result<Option<i32>, CliError> {
    // Sweep a fixed window list to compare latency against cost.
    #[cfg(not(feature = "bench"))]
    {
        eprintln!("Benchmarking requires the `bench` feature.");
        return Ok(Some(1));
    }
    #[cfg(feature = "bench")]
    {
        use centercut_lib::diagnostics::bench::{bench_center_cut_sweep, DspBenchConfig};

        let args = _args;
        let window_sizes = [2048, 4096, 8192, 16384, 32768];
        let input_seconds: f32 = parse_arg(args, "bench-input-seconds")?;
        let iterations: usize = parse_arg(args, "bench-iterations")?;

        let base = DspBenchConfig {
            sample_rate: centercut_lib::constants::SAMPLE_RATE,
            input_seconds,
            window_size: window_sizes[0],
            overlap_count: centercut_lib::constants::OVERLAP_COUNT,
            iterations,
        };

        let results = bench_center_cut_sweep(base, &window_sizes)?;
        println!("Separator sweep (input={}s iters={})", input_seconds, iterations);
        println!("window | avg_ms | min_ms | max_ms |  rt_x | blocks");
        for (window_size, result) in results {
            println!(
                "{:>6} | {:>6.2} | {:>6.2} | {:>6.2} | {:>5.3} | {:>6}",
                window_size,
                result.avg_ms,
                result.min_ms,
                result.max_ms,
                result.rt_factor,
                result.blocks
            );
        }

        return Ok(Some(0));
    }
}
