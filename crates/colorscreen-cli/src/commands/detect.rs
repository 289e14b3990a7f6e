use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colorscreen_detect::{detect_regular_screen, ScrDetectParameters};
use colorscreen_progress::ProgressInfo;

use crate::ppm::read_ppm;

#[derive(Args)]
pub struct DetectArgs {
    /// Raw scan, PPM (P6) format
    scan: PathBuf,
    /// Minimum fraction of the candidate bounding box that must be
    /// confirmed for detection to succeed
    #[arg(long, default_value = "0.6")]
    min_coverage: f64,
}

pub fn run(args: DetectArgs) -> Result<()> {
    let file = File::open(&args.scan).with_context(|| format!("opening {}", args.scan.display()))?;
    let scan = read_ppm(BufReader::new(file)).with_context(|| format!("reading {}", args.scan.display()))?;

    let width = scan.width;
    let height = scan.height;
    let sample = move |x: f64, y: f64| -> [f64; 3] {
        let xi = (x.round() as i64).clamp(0, width as i64 - 1) as usize;
        let yi = (y.round() as i64).clamp(0, height as i64 - 1) as usize;
        scan.pixels[yi * width + xi]
    };

    let params = ScrDetectParameters {
        min_coverage: args.min_coverage,
        ..Default::default()
    };
    let progress = ProgressInfo::new();
    let result = detect_regular_screen(width, height, sample, &params, &progress)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("patches: {}", result.patches.len());
    println!("spacing: {:.3}", result.spacing);
    println!("coverage: {:.1}%", result.coverage * 100.0);
    Ok(())
}
