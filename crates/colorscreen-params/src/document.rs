use std::io::{BufRead, Write};

use colorscreen_core::{ColorClass, Point, ScreenType};
use colorscreen_correction::{BacklightCorrectionParameters, ScannerBlurCorrectionParameters};

use crate::error::ParamsError;

/// One user-supplied correspondence between an image pixel and a screen
/// lattice coordinate, used to seed or refine the geometric solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverPoint {
    pub img: Point,
    pub scr: Point,
    pub color: ColorClass,
}

/// The full contents of a `.par` parameter file: the screen geometry,
/// lens/motor corrections, presentation transform, solver seed points,
/// and the optional backlight/scanner-blur correction blocks.
///
/// Every field is optional on load because older and newer writers
/// accept unknown keywords and omit ones they don't use; absent fields
/// simply aren't written back out.
#[derive(Debug, Clone, Default)]
pub struct ParFile {
    pub scr_type: Option<ScreenType>,
    pub coordinate1: Option<Point>,
    pub coordinate2: Option<Point>,
    pub center: Option<Point>,
    pub tilt: Option<(f64, f64)>,
    pub projection: Option<f64>,
    pub lens_correction: Option<[f64; 4]>,
    pub motor_correction: Option<Vec<Point>>,
    pub final_rotation: Option<f64>,
    pub final_angle: Option<f64>,
    pub final_ratio: Option<f64>,
    pub solver_points: Vec<SolverPoint>,
    pub backlight: Option<BacklightCorrectionParameters>,
    pub scanner_blur: Option<ScannerBlurCorrectionParameters>,
}

impl ParFile {
    pub fn new() -> Self {
        ParFile::default()
    }

    /// Parses a `.par` document. Unknown keywords are silently ignored,
    /// matching the forward-compatibility guarantee older readers give
    /// newer writers. A malformed *known* keyword fails the whole parse
    /// rather than applying partial state.
    pub fn parse(r: impl BufRead) -> Result<Self, ParamsError> {
        let mut doc = ParFile::new();
        let lines: Vec<String> = r.lines().collect::<Result<_, _>>()?;
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].trim();
            i += 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let keyword = match parts.next() {
                Some(k) => k,
                None => continue,
            };
            match keyword {
                "scr_type" => {
                    let name = parts.next().ok_or_else(|| missing("scr_type"))?;
                    doc.scr_type = Some(parse_screen_type(name)?);
                }
                "coordinate1" => doc.coordinate1 = Some(parse_point(&mut parts, "coordinate1")?),
                "coordinate2" => doc.coordinate2 = Some(parse_point(&mut parts, "coordinate2")?),
                "center" => doc.center = Some(parse_point(&mut parts, "center")?),
                "tilt" => {
                    let tx = parse_f64(&mut parts, "tilt.x")?;
                    let ty = parse_f64(&mut parts, "tilt.y")?;
                    doc.tilt = Some((tx, ty));
                }
                "projection" => doc.projection = Some(parse_f64(&mut parts, "projection")?),
                "lens_correction" => {
                    let mut k = [0.0; 4];
                    for slot in &mut k {
                        *slot = parse_f64(&mut parts, "lens_correction coefficient")?;
                    }
                    doc.lens_correction = Some(k);
                }
                "motor_correction" => {
                    let n = parse_usize(&mut parts, "motor_correction count")?;
                    let mut points = Vec::with_capacity(n);
                    for _ in 0..n {
                        points.push(parse_point(&mut parts, "motor_correction point")?);
                    }
                    doc.motor_correction = Some(points);
                }
                "final_rotation" => doc.final_rotation = Some(parse_f64(&mut parts, "final_rotation")?),
                "final_angle" => doc.final_angle = Some(parse_f64(&mut parts, "final_angle")?),
                "final_ratio" => doc.final_ratio = Some(parse_f64(&mut parts, "final_ratio")?),
                "solver_points" => {
                    let n = parse_usize(&mut parts, "solver_points count")?;
                    for _ in 0..n {
                        let row = lines
                            .get(i)
                            .ok_or_else(|| missing("solver_points row"))?;
                        i += 1;
                        let mut row_parts = row.split_whitespace();
                        let img_x = parse_f64(&mut row_parts, "solver point img_x")?;
                        let img_y = parse_f64(&mut row_parts, "solver point img_y")?;
                        let scr_x = parse_f64(&mut row_parts, "solver point scr_x")?;
                        let scr_y = parse_f64(&mut row_parts, "solver point scr_y")?;
                        let color = parse_usize(&mut row_parts, "solver point color")?;
                        doc.solver_points.push(SolverPoint {
                            img: Point::new(img_x, img_y),
                            scr: Point::new(scr_x, scr_y),
                            color: color_from_index(color)?,
                        });
                    }
                }
                "backlight_correction_dimensions:" => {
                    let rest = line.strip_prefix("backlight_correction_dimensions:").unwrap();
                    let mut block = vec![format!("backlight_correction_dimensions:{rest}")];
                    while i < lines.len() {
                        let l = lines[i].clone();
                        i += 1;
                        let done = l.trim() == "backlight_correction_end";
                        block.push(l);
                        if done {
                            break;
                        }
                    }
                    let text = block.join("\n");
                    doc.backlight = Some(BacklightCorrectionParameters::load(text.as_bytes())?);
                }
                "scanner_blur_correction_dimensions:" => {
                    let rest = line
                        .strip_prefix("scanner_blur_correction_dimensions:")
                        .unwrap();
                    let mut block = vec![format!("scanner_blur_correction_dimensions:{rest}")];
                    while i < lines.len() {
                        let l = lines[i].clone();
                        i += 1;
                        let done = l.trim() == "scanner_blur_correction_end";
                        block.push(l);
                        if done {
                            break;
                        }
                    }
                    let text = block.join("\n");
                    doc.scanner_blur = Some(ScannerBlurCorrectionParameters::load(text.as_bytes())?);
                }
                _ => {
                    // Unknown keyword: accepted and ignored, per the
                    // forward-compatibility contract.
                }
            }
        }
        Ok(doc)
    }

    /// Writes the document back out in the same keyword order it was
    /// defined in, so re-saving an unmodified document round-trips
    /// byte-for-byte.
    pub fn write(&self, mut w: impl Write) -> Result<(), ParamsError> {
        if let Some(t) = self.scr_type {
            writeln!(w, "scr_type {}", screen_type_name(t))?;
        }
        if let Some(p) = self.coordinate1 {
            writeln!(w, "coordinate1 {} {}", p.x, p.y)?;
        }
        if let Some(p) = self.coordinate2 {
            writeln!(w, "coordinate2 {} {}", p.x, p.y)?;
        }
        if let Some(p) = self.center {
            writeln!(w, "center {} {}", p.x, p.y)?;
        }
        if let Some((tx, ty)) = self.tilt {
            writeln!(w, "tilt {tx} {ty}")?;
        }
        if let Some(d) = self.projection {
            writeln!(w, "projection {d}")?;
        }
        if let Some(k) = self.lens_correction {
            writeln!(w, "lens_correction {} {} {} {}", k[0], k[1], k[2], k[3])?;
        }
        if let Some(points) = &self.motor_correction {
            write!(w, "motor_correction {}", points.len())?;
            for p in points {
                write!(w, " {} {}", p.x, p.y)?;
            }
            writeln!(w)?;
        }
        if let Some(v) = self.final_rotation {
            writeln!(w, "final_rotation {v}")?;
        }
        if let Some(v) = self.final_angle {
            writeln!(w, "final_angle {v}")?;
        }
        if let Some(v) = self.final_ratio {
            writeln!(w, "final_ratio {v}")?;
        }
        if !self.solver_points.is_empty() {
            writeln!(w, "solver_points {}", self.solver_points.len())?;
            for sp in &self.solver_points {
                writeln!(
                    w,
                    "  {} {} {} {} {}",
                    sp.img.x,
                    sp.img.y,
                    sp.scr.x,
                    sp.scr.y,
                    color_to_index(sp.color)
                )?;
            }
        }
        if let Some(b) = &self.backlight {
            b.save(&mut w)?;
        }
        if let Some(s) = &self.scanner_blur {
            s.save(&mut w)?;
        }
        Ok(())
    }
}

fn missing(what: &str) -> ParamsError {
    ParamsError::Malformed(format!("missing {what}"))
}

fn parse_f64(parts: &mut std::str::SplitWhitespace, what: &str) -> Result<f64, ParamsError> {
    parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| missing(what))
}

fn parse_usize(parts: &mut std::str::SplitWhitespace, what: &str) -> Result<usize, ParamsError> {
    parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| missing(what))
}

fn parse_point(parts: &mut std::str::SplitWhitespace, what: &str) -> Result<Point, ParamsError> {
    let x = parse_f64(parts, what)?;
    let y = parse_f64(parts, what)?;
    Ok(Point::new(x, y))
}

fn color_from_index(i: usize) -> Result<ColorClass, ParamsError> {
    match i {
        0 => Ok(ColorClass::Red),
        1 => Ok(ColorClass::Green),
        2 => Ok(ColorClass::Blue),
        other => Err(ParamsError::Malformed(format!("unknown color class {other}"))),
    }
}

fn color_to_index(c: ColorClass) -> usize {
    match c {
        ColorClass::Red => 0,
        ColorClass::Green => 1,
        ColorClass::Blue => 2,
    }
}

fn parse_screen_type(name: &str) -> Result<ScreenType, ParamsError> {
    Ok(match name {
        "Random" => ScreenType::Random,
        "Dufay" => ScreenType::Dufay,
        "Paget" => ScreenType::Paget,
        "Finlay" => ScreenType::Finlay,
        "Thames" => ScreenType::Thames,
        "DioptichromeB" => ScreenType::DioptichromeB,
        "ImprovedDioptichromeB" => ScreenType::ImprovedDioptichromeB,
        "Omnicolore" => ScreenType::Omnicolore,
        "WarnerPowrie" => ScreenType::WarnerPowrie,
        "Joly" => ScreenType::Joly,
        other => return Err(ParamsError::UnknownScreenType(other.to_string())),
    })
}

fn screen_type_name(t: ScreenType) -> &'static str {
    match t {
        ScreenType::Random => "Random",
        ScreenType::Dufay => "Dufay",
        ScreenType::Paget => "Paget",
        ScreenType::Finlay => "Finlay",
        ScreenType::Thames => "Thames",
        ScreenType::DioptichromeB => "DioptichromeB",
        ScreenType::ImprovedDioptichromeB => "ImprovedDioptichromeB",
        ScreenType::Omnicolore => "Omnicolore",
        ScreenType::WarnerPowrie => "WarnerPowrie",
        ScreenType::Joly => "Joly",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> ParFile {
        let mut doc = ParFile::new();
        doc.scr_type = Some(ScreenType::Dufay);
        doc.coordinate1 = Some(Point::new(10.0, 20.0));
        doc.coordinate2 = Some(Point::new(30.0, 40.0));
        doc.center = Some(Point::new(500.0, 400.0));
        doc.tilt = Some((0.01, -0.02));
        doc.projection = Some(1000.0);
        doc.lens_correction = Some([0.01, -0.002, 0.0003, 0.0]);
        doc.final_rotation = Some(0.5);
        doc.final_angle = Some(0.0);
        doc.final_ratio = Some(1.02);
        doc.solver_points.push(SolverPoint {
            img: Point::new(1.0, 2.0),
            scr: Point::new(3.0, 4.0),
            color: ColorClass::Green,
        });
        doc
    }

    #[test]
    fn round_trips_byte_identically_on_resave() {
        let doc = sample_doc();
        let mut buf = Vec::new();
        doc.write(&mut buf).unwrap();
        let reparsed = ParFile::parse(&buf[..]).unwrap();
        let mut buf2 = Vec::new();
        reparsed.write(&mut buf2).unwrap();
        assert_eq!(buf, buf2);
    }

    #[test]
    fn unknown_keywords_are_ignored() {
        let text = "scr_type Dufay\nfrobnicate_widget 42\nfinal_ratio 1.0\n";
        let doc = ParFile::parse(text.as_bytes()).unwrap();
        assert_eq!(doc.scr_type, Some(ScreenType::Dufay));
        assert_eq!(doc.final_ratio, Some(1.0));
    }

    #[test]
    fn missing_known_field_data_is_an_error() {
        let text = "coordinate1 1.0\n";
        assert!(ParFile::parse(text.as_bytes()).is_err());
    }

    #[test]
    fn embeds_and_round_trips_backlight_block() {
        let mut doc = ParFile::new();
        let params = BacklightCorrectionParameters::new(2, 2);
        doc.backlight = Some(params);
        let mut buf = Vec::new();
        doc.write(&mut buf).unwrap();
        let reparsed = ParFile::parse(&buf[..]).unwrap();
        assert!(reparsed.backlight.is_some());
    }
}
