use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Write a folder of synthetic weld recordings for trying out bead-sentry.
#[derive(Parser)]
struct Args {
    /// Output directory (created if missing)
    #[arg(default_value = "sample_data/batch_01")]
    output: PathBuf,
    /// Number of recordings
    #[arg(long, default_value_t = 20)]
    files: usize,
    /// Beads per recording
    #[arg(long, default_value_t = 4)]
    beads: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const IDLE_SAMPLES: usize = 60;
const BEAD_SAMPLES: usize = 200;

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// One recording: `(power, intensity)` per sample.
fn generate_recording(
    rng: &mut StdRng,
    beads: usize,
    distorted_bead: Option<usize>,
) -> Vec<(f64, f64)> {
    let mut samples = Vec::new();
    let idle = |rng: &mut StdRng, samples: &mut Vec<(f64, f64)>| {
        for _ in 0..IDLE_SAMPLES {
            samples.push((0.0, gauss(rng, 0.0, 0.02)));
        }
    };

    idle(rng, &mut samples);
    for bead in 1..=beads {
        let length = BEAD_SAMPLES + rng.gen_range(0..20);
        let distorted = distorted_bead == Some(bead);
        for i in 0..length {
            let t = i as f64;
            let power = gauss(rng, 1.0, 0.01).max(0.05);
            let mut intensity = 2.0 + 0.4 * (2.0 * std::f64::consts::PI * t / 25.0).sin();
            if distorted {
                // spatter: bursts of high intensity at a faster rhythm
                intensity += 1.5 * (2.0 * std::f64::consts::PI * t / 6.0).sin().max(0.0);
            }
            samples.push((power, intensity + gauss(rng, 0.0, 0.05)));
        }
        idle(rng, &mut samples);
    }
    samples
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let distorted_file = args.files / 2;
    for f in 0..args.files {
        // every fifth recording stops one bead early
        let beads = if f % 5 == 4 { args.beads.saturating_sub(1) } else { args.beads };
        let distorted = (f == distorted_file).then_some(2);
        let samples = generate_recording(&mut rng, beads, distorted);

        let path = args.output.join(format!("weld_{f:03}.csv"));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(["time", "power", "intensity"])?;
        for (i, (power, intensity)) in samples.iter().enumerate() {
            writer.write_record([
                format!("{:.4}", i as f64 * 1e-3),
                format!("{power:.5}"),
                format!("{intensity:.5}"),
            ])?;
        }
        writer.flush()?;
    }

    println!(
        "Wrote {} recordings to {} (bead 2 of weld_{distorted_file:03}.csv is distorted)",
        args.files,
        args.output.display()
    );
    Ok(())
}
