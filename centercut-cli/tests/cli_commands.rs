use std::f32::consts::TAU;
use std::path::Path;

use assert_cmd::Command;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use predicates::prelude::*;

fn centercut() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("centercut"))
}

fn tone(frames: usize, freq: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| 0.5 * (TAU * freq * i as f32 / 44_100.0).sin())
        .collect()
}

fn write_int_stereo(path: &Path, left: &[f32], right: &[f32]) {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).expect("writer");
    for (l, r) in left.iter().zip(right) {
        writer.write_sample((l * 32767.0) as i16).expect("sample");
        writer.write_sample((r * 32767.0) as i16).expect("sample");
    }
    writer.finalize().expect("finalize");
}

#[test]
fn create_settings_json_prints_defaults() {
    centercut()
        .args(["create", "settings-json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"center_cut\""))
        .stdout(predicate::str::contains("\"window_size\": 8192"))
        .stdout(predicate::str::contains("\"fade_in_out_ms\""));
}

#[test]
fn separate_keeps_length_and_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    let frames = 20_000;
    write_int_stereo(&input, &tone(frames, 440.0), &tone(frames, 440.0));

    centercut()
        .arg("separate")
        .arg(&input)
        .arg(&output)
        .arg("--quiet")
        .assert()
        .success();

    let reader = WavReader::open(&output).expect("output wav");
    assert_eq!(reader.spec().sample_format, SampleFormat::Int);
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.duration() as usize, frames);

    // Identical channels are all center, so little survives past warm-up.
    let samples: Vec<i32> = WavReader::open(&output)
        .expect("output wav")
        .samples::<i32>()
        .collect::<Result<_, _>>()
        .expect("samples");
    let peak = samples[8192 * 2..16_384 * 2]
        .iter()
        .map(|s| s.abs())
        .max()
        .unwrap_or(0);
    assert!(peak < 200, "center leaked: {}", peak);
}

#[test]
fn classic_mode_cancels_identical_channels() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_int_stereo(&input, &tone(1000, 220.0), &tone(1000, 220.0));

    centercut()
        .arg("separate")
        .arg(&input)
        .arg(&output)
        .args(["--mode", "classic", "-q"])
        .assert()
        .success();

    let samples: Vec<i32> = WavReader::open(&output)
        .expect("output wav")
        .samples::<i32>()
        .collect::<Result<_, _>>()
        .expect("samples");
    assert_eq!(samples.len(), 2000);
    assert!(samples.iter().all(|&s| s == 0));
}

#[test]
fn separate_rejects_missing_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    centercut()
        .arg("separate")
        .arg(dir.path().join("missing.wav"))
        .arg(dir.path().join("out.wav"))
        .assert()
        .failure();
}

#[test]
fn mix_writes_the_longest_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("a.wav");
    let second = dir.path().join("b.wav");
    let output = dir.path().join("mix.wav");
    write_int_stereo(&first, &tone(10_000, 440.0), &tone(10_000, 440.0));
    write_int_stereo(&second, &tone(6_000, 660.0), &tone(6_000, 660.0));

    centercut()
        .arg("mix")
        .arg(&output)
        .arg(&first)
        .arg(&second)
        .args(["--fade-ms", "10", "--block", "1024", "-q"])
        .assert()
        .success();

    let reader = WavReader::open(&output).expect("output wav");
    assert_eq!(reader.spec().sample_format, SampleFormat::Float);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.duration() as usize, 10_000);

    let samples: Vec<f32> = WavReader::open(&output)
        .expect("output wav")
        .samples::<f32>()
        .collect::<Result<_, _>>()
        .expect("samples");
    // Both inputs start from silence.
    assert!(samples[0].abs() < 1e-6);
    let peak = samples.iter().fold(0.0_f32, |a, s| a.max(s.abs()));
    assert!(peak > 0.4 && peak <= 1.0, "unexpected peak {}", peak);
}

#[test]
fn separate_can_normalize_its_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_int_stereo(&input, &tone(4000, 440.0), &vec![0.0; 4000]);

    centercut()
        .arg("separate")
        .arg(&input)
        .arg(&output)
        .args(["--mode", "classic", "--normalize", "-q"])
        .assert()
        .success();

    let peak = WavReader::open(&output)
        .expect("output wav")
        .samples::<i32>()
        .map(|s| s.expect("sample").abs())
        .max()
        .unwrap_or(0);
    assert!(peak >= 32_700, "peak {} was not normalized", peak);
}

#[test]
fn info_reports_levels_and_dominant_frequency() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.wav");
    write_int_stereo(&input, &tone(22_050, 440.0), &tone(22_050, 440.0));

    let output = centercut()
        .arg("info")
        .arg(&input)
        .args(["--start", "0.1", "--peaks", "1", "-q"])
        .output()
        .expect("run info");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["channels"], 2);
    assert_eq!(report["region"]["frames"], 22_050 - 4_410);
    let dominant = report["dominant_hz"][0].as_f64().expect("frequency");
    assert!((dominant - 440.0).abs() < 22.0, "dominant {}", dominant);
    let side = report["levels_db"]["side"]["rms"].as_f64().expect("side level");
    assert!(side < -100.0, "identical channels left side level {}", side);
    let mid = report["levels_db"]["mid"]["peak"].as_f64().expect("mid peak");
    assert!(mid > -7.0 && mid < -5.0, "mid peak {}", mid);
}
