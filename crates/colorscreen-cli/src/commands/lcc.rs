use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colorscreen_params::ParFile;

#[derive(Args)]
pub struct LccArgs {
    /// Capture One LCC file
    input: PathBuf,
    /// `.par` file to write, containing just the backlight correction block
    #[arg(short, long)]
    output: PathBuf,
}

pub fn run(args: LccArgs) -> Result<()> {
    let file = File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let params = colorscreen_correction::import_lcc(BufReader::new(file))
        .with_context(|| format!("importing {}", args.input.display()))?;

    let mut doc = ParFile::new();
    doc.backlight = Some(params);

    let out_file = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    doc.write(BufWriter::new(out_file))?;
    tracing::info!("wrote backlight correction to {}", args.output.display());
    Ok(())
}
