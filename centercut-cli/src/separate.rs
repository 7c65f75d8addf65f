//! `centercut separate`: whole-file center removal or extraction.

use std::path::Path;

use centercut_lib::dsp::utility::{classic_karaoke, normalize};
use centercut_lib::{CenterCut, CenterCutError, OutputMode};
use clap::ArgMatches;
use log::info;

use crate::error::CliError;
use crate::runner::load_settings;
use crate::wav::{read_wav, write_wav};

pub fn run(args: &ArgMatches) -> Result<i32, CliError> {
    let input = required_path(args, "INPUT")?;
    let output = required_path(args, "OUTPUT")?;
    let mode = args
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("sides");

    let audio = read_wav(input)?;
    if audio.channels() != 2 {
        return Err(CenterCutError::InvalidFormat(format!(
            "{} has {} channel(s), separation needs stereo",
            input.display(),
            audio.channels()
        ))
        .into());
    }

    let mut samples = audio.samples;
    if mode == "classic" {
        classic_karaoke(&mut samples);
    } else {
        let mut settings = load_settings(args)?.center_cut;
        settings.sample_rate = audio.spec.sample_rate;
        settings.output = if mode == "center" {
            OutputMode::Center
        } else {
            OutputMode::Sides
        };
        if args.get_flag("bass-to-sides") {
            settings.bass_to_sides = true;
        }
        if let Some(&cutoff) = args.get_one::<f64>("bass-cutoff") {
            settings.bass_cutoff_hz = cutoff;
        }
        settings.validate()?;

        let mut separator = CenterCut::new(&settings)?;
        samples = separate_aligned(&mut separator, &samples)?;
    }
    if args.get_flag("normalize") {
        samples = normalize(&samples);
    }

    write_wav(output, audio.spec, &samples)?;
    info!(
        "{} -> {} ({} frames, mode {})",
        input.display(),
        output.display(),
        samples.len() / 2,
        mode
    );
    Ok(0)
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path, CliError> {
    args.get_one::<String>(name)
        .map(Path::new)
        .ok_or_else(|| CliError::Usage(format!("missing {}", name)))
}

/// Run `input` through `separator`, returning exactly as many frames.
///
/// Output frame `k` corresponds to input frame `k`; the tail withheld by the
/// separator's latency is flushed with trailing silence.
pub fn separate_aligned(separator: &mut CenterCut, input: &[f32]) -> Result<Vec<f32>, CliError> {
    let frames = input.len() / 2;
    let hop = separator.hop_size();
    let padded_frames = (frames + separator.latency_frames()).div_ceil(hop) * hop;
    let mut padded = input[..frames * 2].to_vec();
    padded.resize(padded_frames * 2, 0.0);

    let mut output = Vec::with_capacity(padded.len());
    let mut offset = 0;
    loop {
        let result = separator.push_interleaved(&padded[offset..]);
        while let Some(block) = separator.pull_block() {
            output.extend_from_slice(&block);
        }
        match result {
            Ok(_) => break,
            Err(CenterCutError::OutputQueueFull { accepted }) => offset += accepted * 2,
            Err(err) => return Err(err.into()),
        }
    }

    output.truncate(frames * 2);
    Ok(output)
}
