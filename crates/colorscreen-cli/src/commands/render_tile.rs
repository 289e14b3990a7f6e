use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colorscreen_geometry::{ScrToImg, ScrToImgParams};
use colorscreen_progress::ProgressInfo;
use colorscreen_render::{Renderer, RenderType, TileRequest};
use colorscreen_screen::ScreenTile;

use crate::ppm::{read_ppm, write_ppm, Ppm};

#[derive(Args)]
pub struct RenderTileArgs {
    /// Raw scan, PPM (P6) format
    scan: PathBuf,
    /// `.par` parameter file describing the screen geometry
    #[arg(short, long)]
    par: PathBuf,
    /// Output tile, PPM (P6) format
    #[arg(short, long)]
    output: PathBuf,
    /// Top-left X of the tile in presentation space
    #[arg(long, default_value = "0")]
    x: usize,
    /// Top-left Y of the tile in presentation space
    #[arg(long, default_value = "0")]
    y: usize,
    /// Tile width
    #[arg(short, long)]
    width: usize,
    /// Tile height
    #[arg(short = 'H', long)]
    height: usize,
    /// One of: original, profiled-original, preview-grid, realistic,
    /// interpolated, predictive, combined, fast, scr-nearest,
    /// scr-nearest-scaled, scr-relax, adjusted-color, normalized-color,
    /// pixel-colors, realistic-scr, interpolated-original,
    /// interpolated-profiled-original, interpolated-diff
    #[arg(short = 't', long = "type", default_value = "realistic")]
    render_type: String,
    /// Supersampling factor for antialiasing
    #[arg(short, long, default_value = "2")]
    supersample: usize,
}

pub fn run(args: RenderTileArgs) -> Result<()> {
    let scan_file = File::open(&args.scan).with_context(|| format!("opening {}", args.scan.display()))?;
    let scan = read_ppm(BufReader::new(scan_file)).with_context(|| format!("reading {}", args.scan.display()))?;

    let par_file = File::open(&args.par).with_context(|| format!("opening {}", args.par.display()))?;
    let doc = colorscreen_params::ParFile::parse(BufReader::new(par_file))
        .with_context(|| format!("parsing {}", args.par.display()))?;

    let params = ScrToImgParams {
        origin: doc.center.unwrap_or_default(),
        basis_x: doc.coordinate1.unwrap_or(colorscreen_core::Point::new(1.0, 0.0)),
        basis_y: doc.coordinate2.unwrap_or(colorscreen_core::Point::new(0.0, 1.0)),
        final_rotation: doc.final_rotation.unwrap_or(0.0),
        final_ratio: doc.final_ratio.unwrap_or(1.0),
        ..Default::default()
    };
    let scr_to_img = Arc::new(ScrToImg::new(params));
    let screen_type = doc.scr_type.unwrap_or(colorscreen_core::ScreenType::Random);
    let screen = Arc::new(ScreenTile::initialize(screen_type, 0.5, 0.5));

    let renderer = Renderer::new(scr_to_img, screen);
    let render_type = parse_render_type(&args.render_type)?;

    let request = TileRequest {
        x: args.x,
        y: args.y,
        width: args.width,
        height: args.height,
        render_type,
        supersample: args.supersample,
    };

    let progress = ProgressInfo::new();
    let scan_width = scan.width;
    let scan_height = scan.height;
    let sample = move |p: colorscreen_core::Point| -> [f64; 3] {
        let xi = (p.x.round() as i64).clamp(0, scan_width as i64 - 1) as usize;
        let yi = (p.y.round() as i64).clamp(0, scan_height as i64 - 1) as usize;
        scan.pixels[yi * scan_width + xi]
    };

    let pixels = renderer
        .render_tile(request, &sample, &progress)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let out_file = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    write_ppm(
        BufWriter::new(out_file),
        &Ppm {
            width: args.width,
            height: args.height,
            pixels,
        },
    )?;
    Ok(())
}

fn parse_render_type(name: &str) -> Result<RenderType> {
    Ok(match name {
        "original" => RenderType::Original,
        "profiled-original" => RenderType::ProfiledOriginal,
        "preview-grid" => RenderType::PreviewGrid,
        "realistic" => RenderType::Realistic,
        "interpolated" => RenderType::Interpolated,
        "predictive" => RenderType::Predictive,
        "combined" => RenderType::Combined,
        "fast" => RenderType::Fast,
        "scr-nearest" => RenderType::ScrNearest,
        "scr-nearest-scaled" => RenderType::ScrNearestScaled,
        "scr-relax" => RenderType::ScrRelax,
        "adjusted-color" => RenderType::AdjustedColor,
        "normalized-color" => RenderType::NormalizedColor,
        "pixel-colors" => RenderType::PixelColors,
        "realistic-scr" => RenderType::RealisticScr,
        "interpolated-original" => RenderType::InterpolatedOriginal,
        "interpolated-profiled-original" => RenderType::InterpolatedProfiledOriginal,
        "interpolated-diff" => RenderType::InterpolatedDiff,
        other => anyhow::bail!("unknown render type {other:?}"),
    })
}
