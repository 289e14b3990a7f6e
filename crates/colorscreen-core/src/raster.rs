use crate::error::{CsError, Result};

/// A row-major 2D buffer of `channels`-tuples, generic over the sample
/// type so the same type serves raw scan pixels (`f64`), screen tiles
/// (`f32`) and mesh-of-weights grids (`f64`) alike.
#[derive(Debug, Clone)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Raster<T> {
    /// Allocates a zero-filled raster. Fails rather than panics if the
    /// requested dimensions would overflow a `usize` element count.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        let len = checked_len(width, height, channels)?;
        Ok(Raster {
            width,
            height,
            channels,
            data: vec![T::default(); len],
        })
    }

    pub fn from_data(width: usize, height: usize, channels: usize, data: Vec<T>) -> Result<Self> {
        let len = checked_len(width, height, channels)?;
        if data.len() != len {
            return Err(CsError::RasterBounds(format!(
                "expected {len} samples for {width}x{height}x{channels}, got {}",
                data.len()
            )));
        }
        Ok(Raster {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.channels
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[T] {
        let i = self.index(x, y);
        &self.data[i..i + self.channels]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [T] {
        let i = self.index(x, y);
        &mut self.data[i..i + self.channels]
    }
}

fn checked_len(width: usize, height: usize, channels: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|wh| wh.checked_mul(channels))
        .ok_or_else(|| {
            CsError::RasterBounds(format!(
                "{width}x{height}x{channels} overflows the platform's address space"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_roundtrip() {
        let mut r = Raster::<f64>::new(4, 3, 3).unwrap();
        r.pixel_mut(2, 1).copy_from_slice(&[0.1, 0.2, 0.3]);
        assert_eq!(r.pixel(2, 1), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let r = Raster::<f64>::new(usize::MAX, 2, 4);
        assert!(r.is_err());
    }
}
