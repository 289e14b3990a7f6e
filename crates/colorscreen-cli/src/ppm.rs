//! Minimal binary PPM (P6) reader/writer, standing in for a full TIFF/NetPBM
//! stack the rest of the pipeline doesn't otherwise need: this crate only
//! has to move pixels in and out of `render_tile`/`detect`, not implement
//! every format the toolkit's image-input surface describes.

use std::io::{BufRead, Read, Write};

pub struct Ppm {
    pub width: usize,
    pub height: usize,
    /// Linear-ish 0..1 RGB, row-major.
    pub pixels: Vec<[f64; 3]>,
}

pub fn read_ppm(mut r: impl BufRead) -> std::io::Result<Ppm> {
    let mut magic = [0u8; 2];
    r.read_exact(&mut magic)?;
    if &magic != b"P6" {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "not a P6 PPM file"));
    }
    let width = read_token(&mut r)?;
    let height = read_token(&mut r)?;
    let maxval = read_token(&mut r)?;
    let mut data = vec![0u8; width * height * 3];
    r.read_exact(&mut data)?;
    let scale = 1.0 / maxval as f64;
    let pixels = data
        .chunks_exact(3)
        .map(|c| [c[0] as f64 * scale, c[1] as f64 * scale, c[2] as f64 * scale])
        .collect();
    Ok(Ppm { width, height, pixels })
}

pub fn write_ppm(mut w: impl Write, ppm: &Ppm) -> std::io::Result<()> {
    writeln!(w, "P6\n{} {}\n255", ppm.width, ppm.height)?;
    let mut data = Vec::with_capacity(ppm.pixels.len() * 3);
    for p in &ppm.pixels {
        for c in p {
            data.push((c.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }
    w.write_all(&data)
}

fn read_token(r: &mut impl BufRead) -> std::io::Result<usize> {
    let mut token = String::new();
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)?;
        let c = byte[0] as char;
        if c.is_whitespace() {
            if token.is_empty() {
                continue;
            }
            break;
        }
        if c == '#' {
            let mut line = String::new();
            r.read_line(&mut line)?;
            continue;
        }
        token.push(c);
    }
    token
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed PPM header"))
}
