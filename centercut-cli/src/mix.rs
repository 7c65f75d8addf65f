//! `centercut mix`: offline rendering of several files through the mixer.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use centercut_lib::mixer::ChannelKey;
use centercut_lib::{
    CenterCutError, LiveAudioSupplier, Mixer, SourceSettings, StereoSource,
};
use clap::ArgMatches;
use log::{debug, info};

use crate::error::CliError;
use crate::runner::load_settings;
use crate::wav::{float_stereo_spec, read_wav, write_wav, WavAudio};

struct MixInput {
    name: String,
    audio: WavAudio,
    source: Arc<StereoSource>,
    supplier: Arc<dyn LiveAudioSupplier>,
    key: ChannelKey,
    fading_out: bool,
}

impl MixInput {
    /// Push `frames` frames starting at `position`, silence past the end.
    fn feed(&self, position: usize, frames: usize) -> Result<(), CliError> {
        let channels = self.audio.channels();
        let total = self.audio.frames();
        let start = position.min(total);
        let end = (position + frames).min(total);
        let mut block = self.audio.samples[start * channels..end * channels].to_vec();
        block.resize(frames * channels, 0.0);
        self.source.push_interleaved(&block)?;
        Ok(())
    }
}

fn frame_time(frames: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}

pub fn run(args: &ArgMatches) -> Result<i32, CliError> {
    let output = args
        .get_one::<String>("OUTPUT")
        .map(Path::new)
        .ok_or_else(|| CliError::Usage("missing OUTPUT".to_string()))?;
    let paths: Vec<&String> = args
        .get_many::<String>("INPUT")
        .map(|values| values.collect())
        .unwrap_or_default();
    let block = args.get_one::<usize>("block").copied().unwrap_or(4096);
    if block == 0 {
        return Err(CliError::Usage("--block must be non-zero".to_string()));
    }

    let mut settings = load_settings(args)?;
    if let Some(&fade_ms) = args.get_one::<f32>("fade-ms") {
        settings.mixer.fade_in_out_ms = fade_ms;
    }
    if settings.storage.samples_capacity < block {
        return Err(CliError::Usage(format!(
            "--block {} exceeds the sample ring capacity {}",
            block, settings.storage.samples_capacity
        )));
    }

    let mut audio_files = Vec::with_capacity(paths.len());
    for path in &paths {
        audio_files.push((path.to_string(), read_wav(Path::new(path.as_str()))?));
    }
    let sample_rate = match audio_files.first() {
        Some((_, audio)) => audio.spec.sample_rate,
        None => return Err(CliError::Usage("mix needs at least one input".to_string())),
    };
    if let Some((name, audio)) = audio_files
        .iter()
        .find(|(_, audio)| audio.spec.sample_rate != sample_rate)
    {
        return Err(CenterCutError::InvalidFormat(format!(
            "{} is {} Hz, expected {} Hz",
            name, audio.spec.sample_rate, sample_rate
        ))
        .into());
    }

    let mixer = Mixer::new(settings.mixer.clone())?;
    let fade_frames =
        (settings.mixer.fade_duration().as_secs_f64() * sample_rate as f64).round() as usize;

    let mut inputs = Vec::with_capacity(audio_files.len());
    for (name, audio) in audio_files {
        let source = Arc::new(StereoSource::new(&SourceSettings {
            sample_rate,
            channels: audio.spec.channels,
            extract_center: false,
            center_cut: settings.center_cut.clone(),
            storage: settings.storage.clone(),
            ..SourceSettings::default()
        })?);
        source.play();
        let supplier: Arc<dyn LiveAudioSupplier> = source.clone();
        let key = mixer.add_channel_at(Arc::clone(&supplier), Duration::ZERO);
        debug!("{} mixed as channel {}", name, key);
        inputs.push(MixInput {
            name,
            audio,
            source,
            supplier,
            key,
            fading_out: false,
        });
    }

    let total = inputs
        .iter()
        .map(|input| input.audio.frames())
        .max()
        .unwrap_or(0);
    let mut mixed = Vec::with_capacity(total * 2);
    let mut position = 0;
    while position < total {
        let now = frame_time(position, sample_rate);
        let frames = block.min(total - position);

        for input in inputs.iter_mut() {
            if mixer.channel_state(input.key).is_none() {
                continue;
            }
            let remaining = input.audio.frames().saturating_sub(position);
            // Gains change per block, so the fade must start a block early.
            if !input.fading_out && remaining <= fade_frames + frames {
                mixer.remove_channel_at(&input.supplier, now, frame_time(remaining, sample_rate));
                input.fading_out = true;
                debug!("{} fading out at frame {}", input.name, position);
            }
            input.feed(position, frames)?;
        }

        let rendered = match mixer.render(now, frames) {
            Ok(rendered) => rendered,
            Err(CenterCutError::Underrun { available: 0, .. })
                if mixer.active_channel_count() == 0 =>
            {
                vec![0.0; frames * 2]
            }
            Err(err) => return Err(err.into()),
        };
        mixed.extend_from_slice(&rendered);
        position += frames;
    }

    write_wav(output, float_stereo_spec(sample_rate), &mixed)?;
    info!(
        "mixed {} input(s) into {} ({} frames)",
        inputs.len(),
        output.display(),
        total
    );
    Ok(0)
}
