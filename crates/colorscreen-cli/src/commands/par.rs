use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colorscreen_params::ParFile;

#[derive(Args)]
pub struct ParArgs {
    /// Input `.par` file
    input: PathBuf,
    /// Re-write the parsed document to this path instead of just validating
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: ParArgs) -> Result<()> {
    let file = File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let doc = ParFile::parse(BufReader::new(file)).with_context(|| format!("parsing {}", args.input.display()))?;

    println!("scr_type: {:?}", doc.scr_type);
    println!("solver points: {}", doc.solver_points.len());
    println!("backlight correction: {}", doc.backlight.is_some());
    println!("scanner blur correction: {}", doc.scanner_blur.is_some());

    if let Some(output) = &args.output {
        let out_file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
        doc.write(BufWriter::new(out_file))?;
    }
    Ok(())
}
