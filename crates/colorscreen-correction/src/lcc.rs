use std::io::Read;

use crate::backlight::{BacklightCorrectionParameters, Channel, GRID_H, GRID_W};
use crate::error::CorrectionError;

/// A keyword record is a 1-byte length followed by that many bytes of
/// ASCII text (no terminator), per `parse-captureone-lcc.C`'s
/// `read_string`.
fn read_string(r: &mut impl Read, offset: &mut usize) -> Result<String, CorrectionError> {
    let mut len_buf = [0u8; 1];
    r.read_exact(&mut len_buf).map_err(|_| CorrectionError::TruncatedLcc)?;
    let len = len_buf[0] as usize;
    *offset += 1;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|_| CorrectionError::TruncatedLcc)?;
    *offset += len;
    String::from_utf8(buf)
        .map_err(|_| CorrectionError::MalformedBacklight("keyword is not valid UTF-8".into()))
}

/// Reads and checks one keyword record, failing closed the moment the
/// stream doesn't match what's expected at that position.
fn expect_keyword(r: &mut impl Read, expected: &'static str, offset: &mut usize) -> Result<(), CorrectionError> {
    let found = read_string(r, offset)?;
    if found != expected {
        return Err(CorrectionError::UnexpectedLccKeyword {
            expected,
            found,
            offset: *offset,
        });
    }
    Ok(())
}

fn skip(r: &mut impl Read, len: usize, offset: &mut usize) -> Result<(), CorrectionError> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|_| CorrectionError::TruncatedLcc)?;
    *offset += len;
    Ok(())
}

fn read_u8(r: &mut impl Read, offset: &mut usize) -> Result<u8, CorrectionError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(|_| CorrectionError::TruncatedLcc)?;
    *offset += 1;
    Ok(buf[0])
}

fn read_u16(r: &mut impl Read, offset: &mut usize) -> Result<u16, CorrectionError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf).map_err(|_| CorrectionError::TruncatedLcc)?;
    *offset += 2;
    Ok(u16::from_le_bytes(buf))
}

/// `read_uint32` in the original is two little-endian `uint16` reads
/// combined low-then-high, not a plain 4-byte read.
fn read_u32_pair(r: &mut impl Read, offset: &mut usize) -> Result<u32, CorrectionError> {
    let lo = read_u16(r, offset)? as u32;
    let hi = read_u16(r, offset)? as u32;
    Ok(lo | (hi << 16))
}

/// Parses a Capture One LCC flat-field file and turns its per-cell
/// luminosity grid into backlight correction parameters. Walks the
/// hardwired keyword/field sequence `parse-captureone-lcc.C` reads,
/// skipping the keyword-specific payload bytes interleaved between
/// records, and failing closed the moment any keyword doesn't match
/// what's expected at that position.
pub fn import_lcc(mut r: impl Read) -> Result<BacklightCorrectionParameters, CorrectionError> {
    let r = &mut r;
    let offset = &mut 0usize;

    expect_keyword(r, "XCon", offset)?;
    skip(r, 9, offset)?;

    expect_keyword(r, "TYPE", offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "CaptureOne LCC", offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "VER", offset)?;
    read_u16(r, offset)?;
    read_u16(r, offset)?;
    read_u16(r, offset)?;
    read_u8(r, offset)?;

    expect_keyword(r, "Camera", offset)?;
    read_u16(r, offset)?;
    read_u8(r, offset)?;

    expect_keyword(r, "Make", offset)?;
    read_u16(r, offset)?;
    read_string(r, offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "Model", offset)?;
    read_u16(r, offset)?;
    read_string(r, offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "S/N", offset)?;
    read_u16(r, offset)?;
    read_string(r, offset)?;
    read_u16(r, offset)?;
    skip(r, 5, offset)?;

    expect_keyword(r, "RAW", offset)?;
    skip(r, 20, offset)?;

    expect_keyword(r, "hash", offset)?;
    skip(r, 23, offset)?;

    expect_keyword(r, "Lens", offset)?;
    skip(r, 3, offset)?;

    expect_keyword(r, "Par", offset)?;
    skip(r, 20, offset)?;

    expect_keyword(r, "Shift", offset)?;
    skip(r, 18, offset)?;

    expect_keyword(r, "Chroma", offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "REF", offset)?;
    skip(r, 7, offset)?;

    expect_keyword(r, "Hdr", offset)?;
    skip(r, 20, offset)?;

    expect_keyword(r, "RGBMean", offset)?;
    read_u32_pair(r, offset)?;
    read_u32_pair(r, offset)?;
    read_u32_pair(r, offset)?;

    expect_keyword(r, "RBTable", offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "REF", offset)?;
    skip(r, 11, offset)?;

    expect_keyword(r, "LightFalloff", offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "REF", offset)?;
    skip(r, 9, offset)?;

    expect_keyword(r, "Hdr", offset)?;
    skip(r, 22, offset)?;

    expect_keyword(r, "Model", offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "REF", offset)?;
    skip(r, 13, offset)?;

    expect_keyword(r, "DAT", offset)?;
    read_u16(r, offset)?;
    read_u16(r, offset)?;

    expect_keyword(r, "BIN", offset)?;
    read_u16(r, offset)?;
    read_u16(r, offset)?;
    read_u16(r, offset)?;
    read_u16(r, offset)?;

    // The binary block holds GRID_H rows of GRID_W cells, each cell a
    // pair of little-endian u16 samples; the luminosity is derived from
    // the *second* sample of the pair and stored mirrored, matching the
    // coordinate convention the original importer writes into its
    // `(110-x, 83-y)` grid.
    let mut params = BacklightCorrectionParameters::new(GRID_W, GRID_H);
    for y in 0..GRID_H {
        for x in 0..GRID_W {
            read_u16(r, offset)?;
            let val2 = read_u16(r, offset)?;
            let lum = 1.0 / ((val2 as f64 / 32768.0 - 1.0) * 32.0 + 1.0);
            let mirrored_x = GRID_W - 1 - x;
            let mirrored_y = GRID_H - 1 - y;
            params.set_lum(mirrored_x, mirrored_y, Channel::Red, lum);
            params.set_lum(mirrored_x, mirrored_y, Channel::Green, lum);
            params.set_lum(mirrored_x, mirrored_y, Channel::Blue, lum);
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_keyword(buf: &mut Vec<u8>, s: &str) {
        buf.push(s.len() as u8);
        buf.extend_from_slice(s.as_bytes());
    }

    fn write_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Builds a minimal well-formed LCC byte stream following the exact
    /// keyword/field sequence `import_lcc` expects.
    fn minimal_lcc_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        write_keyword(&mut buf, "XCon");
        buf.extend(std::iter::repeat(0u8).take(9));

        write_keyword(&mut buf, "TYPE");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "CaptureOne LCC");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "VER");
        write_u16(&mut buf, 1);
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);
        buf.push(0);

        write_keyword(&mut buf, "Camera");
        write_u16(&mut buf, 0);
        buf.push(0);

        write_keyword(&mut buf, "Make");
        write_u16(&mut buf, 0);
        write_keyword(&mut buf, "x");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "Model");
        write_u16(&mut buf, 0);
        write_keyword(&mut buf, "x");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "S/N");
        write_u16(&mut buf, 0);
        write_keyword(&mut buf, "x");
        write_u16(&mut buf, 0);
        buf.extend(std::iter::repeat(0u8).take(5));

        write_keyword(&mut buf, "RAW");
        buf.extend(std::iter::repeat(0u8).take(20));

        write_keyword(&mut buf, "hash");
        buf.extend(std::iter::repeat(0u8).take(23));

        write_keyword(&mut buf, "Lens");
        buf.extend(std::iter::repeat(0u8).take(3));

        write_keyword(&mut buf, "Par");
        buf.extend(std::iter::repeat(0u8).take(20));

        write_keyword(&mut buf, "Shift");
        buf.extend(std::iter::repeat(0u8).take(18));

        write_keyword(&mut buf, "Chroma");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "REF");
        buf.extend(std::iter::repeat(0u8).take(7));

        write_keyword(&mut buf, "Hdr");
        buf.extend(std::iter::repeat(0u8).take(20));

        write_keyword(&mut buf, "RGBMean");
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "RBTable");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "REF");
        buf.extend(std::iter::repeat(0u8).take(11));

        write_keyword(&mut buf, "LightFalloff");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "REF");
        buf.extend(std::iter::repeat(0u8).take(9));

        write_keyword(&mut buf, "Hdr");
        buf.extend(std::iter::repeat(0u8).take(22));

        write_keyword(&mut buf, "Model");
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "REF");
        buf.extend(std::iter::repeat(0u8).take(13));

        write_keyword(&mut buf, "DAT");
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);

        write_keyword(&mut buf, "BIN");
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);
        write_u16(&mut buf, 0);

        for _ in 0..(GRID_W * GRID_H) {
            write_u16(&mut buf, 0);
            write_u16(&mut buf, 32768);
        }
        buf
    }

    #[test]
    fn rejects_a_file_with_the_wrong_keyword_sequence() {
        let mut buf = Vec::new();
        write_keyword(&mut buf, "XCon");
        buf.extend(std::iter::repeat(0u8).take(9));
        write_keyword(&mut buf, "NOT-TYPE");
        let err = import_lcc(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CorrectionError::UnexpectedLccKeyword { .. }));
    }

    #[test]
    fn parses_a_well_formed_minimal_file() {
        let buf = minimal_lcc_bytes();
        let params = import_lcc(Cursor::new(buf)).unwrap();
        assert!((params.lum(0, 0, Channel::Red) - 1.0).abs() < 1e-6);
    }
}
