//! Integration tests for firline-cli.
//!
//! Runs the `firline` binary with the user config directory pointed at a
//! temporary directory so a developer's own config never leaks in.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `firline` binary built by cargo.
fn firline(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_firline"));
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_test_wav(path: &Path, channels: u16, frames: usize) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 48000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for n in 0..frames {
        let low = (std::f32::consts::TAU * 200.0 * n as f32 / 48000.0).sin();
        let high = (std::f32::consts::TAU * 15000.0 * n as f32 / 48000.0).sin();
        let v = (0.4 * (low + high) * 32767.0) as i16;
        for _ in 0..channels {
            writer.write_sample(v).unwrap();
        }
    }
    writer.finalize().unwrap();
}

#[test]
fn design_prints_one_tap_per_line() {
    let home = TempDir::new().unwrap();
    let output = firline(home.path())
        .args(["design", "--rate", "48000", "--cutoff", "1000", "--transition-band", "100"])
        .output()
        .expect("failed to run firline design");

    assert!(output.status.success());
    let text = stdout(&output);
    let taps: Vec<f32> = text.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(taps.len(), 1921);

    let sum: f64 = taps.iter().map(|&t| f64::from(t)).sum();
    assert!((sum - 1.0).abs() < 1e-4, "sum {sum}");
}

#[test]
fn design_json_to_file() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taps.json");

    let output = firline(home.path())
        .args(["design", "--cutoff", "4000", "--transition-band", "2000", "--format", "json", "-o"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("Length:  97 taps"));

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"order\": 96"));
    assert!(json.contains("\"latency_samples\": 48"));
    assert!(json.contains("\"taps\""));
}

#[test]
fn design_rejects_cutoff_above_nyquist() {
    let home = TempDir::new().unwrap();
    let output = firline(home.path())
        .args(["design", "--rate", "8000", "--cutoff", "5000"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cutoff"));
}

#[test]
fn design_reads_config_file() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("filter.toml");
    std::fs::write(
        &config,
        "sample_rate = 48000.0\n[filter]\ncutoff = 4000.0\ntransition_band = 4000.0\n",
    )
    .unwrap();

    let output = firline(home.path())
        .args(["design", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());
    // 48 kHz / 4 kHz band: M = 48
    assert_eq!(stdout(&output).lines().count(), 49);
}

#[test]
fn verify_passes_with_normal_scheduling() {
    let home = TempDir::new().unwrap();
    let output = firline(home.path())
        .args(["verify", "--cutoff", "2000", "--transition-band", "1000", "--block-size", "64"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("OK"));
}

#[test]
fn process_mono_file_to_filtered_stereo() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output_path = dir.path().join("out.wav");
    write_test_wav(&input, 1, 4800);

    let output = firline(home.path())
        .arg("process")
        .arg(&input)
        .arg(&output_path)
        .args(["--cutoff", "1000", "--transition-band", "500", "--block-size", "256"])
        .args(["--scheduling", "normal"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let reader = hound::WavReader::open(&output_path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);

    let samples: Vec<f32> = reader.into_samples::<f32>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 2 * 4800);

    // 15 kHz removed: the settled output is just the 200 Hz tone
    let settled = &samples[2 * 1000..];
    let peak = settled.iter().fold(0.0_f32, |p, &s| p.max(s.abs()));
    assert!(peak < 0.45, "peak {peak}");
    assert!(peak > 0.3, "peak {peak}");
}

#[test]
fn process_with_unavailable_fifo_still_writes_output() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output_path = dir.path().join("out.wav");
    write_test_wav(&input, 2, 1000);

    // FIFO may or may not be permitted here; either way a file comes out
    let output = firline(home.path())
        .arg("process")
        .arg(&input)
        .arg(&output_path)
        .args(["--scheduling", "fifo", "--priority", "1", "--transition-band", "1000"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reader = hound::WavReader::open(&output_path).unwrap();
    assert_eq!(reader.len(), 2000);
}

#[test]
fn process_missing_input_fails() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let output = firline(home.path())
        .arg("process")
        .arg(dir.path().join("missing.wav"))
        .arg(dir.path().join("out.wav"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}
