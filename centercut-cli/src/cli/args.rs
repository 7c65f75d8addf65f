//! CLI argument definitions for `centercut`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("centercut")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Adam Howard <adam.thomas.howard@gmail.com>")
        .about("Separate or remove the center channel of stereo WAV files")
        .arg_required_else_help(true)
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Suppress log output unless a command fails"),
        )
        .arg(
            Arg::new("bench")
                .long("bench")
                .action(ArgAction::SetTrue)
                .help("Run a synthetic separator benchmark and exit"),
        )
        .arg(
            Arg::new("bench-sweep")
                .long("bench-sweep")
                .action(ArgAction::SetTrue)
                .help("Run the benchmark over several window sizes and exit"),
        )
        .arg(
            Arg::new("bench-window")
                .long("bench-window")
                .value_name("FRAMES")
                .default_value("8192")
                .help("Window size for the separator benchmark"),
        )
        .arg(
            Arg::new("bench-input-seconds")
                .long("bench-input-seconds")
                .value_name("SECONDS")
                .default_value("10.0")
                .help("Input length in seconds for the separator benchmark"),
        )
        .arg(
            Arg::new("bench-iterations")
                .long("bench-iterations")
                .value_name("COUNT")
                .default_value("5")
                .help("Number of iterations for the separator benchmark"),
        )
        .subcommand(
            Command::new("separate")
                .about("Run the center separator over a stereo WAV file")
                .arg(
                    Arg::new("INPUT")
                        .help("The stereo WAV file to process")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("OUTPUT")
                        .help("Where to write the processed WAV file")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .short('m')
                        .value_name("MODE")
                        .value_parser(["sides", "center", "classic"])
                        .default_value("sides")
                        .help("sides removes the center, center keeps only it, classic subtracts channels"),
                )
                .arg(
                    Arg::new("normalize")
                        .long("normalize")
                        .action(ArgAction::SetTrue)
                        .help("Scale the output so its loudest sample reaches full scale"),
                )
                .arg(
                    Arg::new("bass-to-sides")
                        .long("bass-to-sides")
                        .action(ArgAction::SetTrue)
                        .help("Keep low frequencies out of the center"),
                )
                .arg(
                    Arg::new("bass-cutoff")
                        .long("bass-cutoff")
                        .value_name("HZ")
                        .value_parser(clap::value_parser!(f64))
                        .help("Cutoff frequency used with --bass-to-sides"),
                )
                .arg(
                    Arg::new("settings")
                        .long("settings")
                        .short('S')
                        .value_name("PATH")
                        .help("Path to an EngineSettings JSON file"),
                ),
        )
        .subcommand(
            Command::new("mix")
                .about("Mix WAV files with fade-in and fade-out envelopes")
                .arg(
                    Arg::new("OUTPUT")
                        .help("Where to write the mixed float WAV file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("INPUT")
                        .help("Mono or stereo WAV files to mix")
                        .required(true)
                        .num_args(1..)
                        .index(2),
                )
                .arg(
                    Arg::new("fade-ms")
                        .long("fade-ms")
                        .value_name("MS")
                        .value_parser(clap::value_parser!(f32))
                        .help("Fade-in and fade-out length in milliseconds"),
                )
                .arg(
                    Arg::new("block")
                        .long("block")
                        .value_name("FRAMES")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4096")
                        .help("Frames rendered per mixer pass"),
                )
                .arg(
                    Arg::new("settings")
                        .long("settings")
                        .short('S')
                        .value_name("PATH")
                        .help("Path to an EngineSettings JSON file"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Print levels and dominant frequencies of a WAV file as JSON")
                .arg(
                    Arg::new("INPUT")
                        .help("The mono or stereo WAV file to analyze")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(f64))
                        .help("Start of the analyzed region"),
                )
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(f64))
                        .help("Length of the analyzed region, to the end when omitted"),
                )
                .arg(
                    Arg::new("min-freq")
                        .long("min-freq")
                        .value_name("HZ")
                        .value_parser(clap::value_parser!(f32))
                        .default_value("20")
                        .help("Ignore spectral peaks below this frequency"),
                )
                .arg(
                    Arg::new("peaks")
                        .long("peaks")
                        .value_name("COUNT")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3")
                        .help("Number of dominant frequencies to report"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand(
                    Command::new("settings-json").about("Print the default EngineSettings JSON"),
                ),
        )
}
