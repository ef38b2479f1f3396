use ndarray::ArrayView2;

use crate::shared::geometry::Size;

/// One-channel blend weights: 0 keeps the original pixel, 255 shows the
/// blurred pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct BlurMask {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl BlurMask {
    /// An all-zero (fully sharp) mask.
    pub fn new(size: Size) -> Self {
        Self {
            data: vec![0; size.width as usize * size.height as usize],
            width: size.width,
            height: size.height,
        }
    }

    pub fn from_raw(data: Vec<u8>, size: Size) -> Self {
        assert_eq!(
            data.len(),
            size.width as usize * size.height as usize,
            "mask length must equal width * height"
        );
        Self {
            data,
            width: size.width,
            height: size.height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Unions `value` into the pixel: coverage only ever grows.
    pub fn union_pixel(&mut self, x: u32, y: u32, value: u8) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = self.data[idx].max(value);
    }

    /// Unions `value` over columns `x0..x1` of row `y`.
    pub fn union_span(&mut self, y: u32, x0: u32, x1: u32, value: u8) {
        let row = y as usize * self.width as usize;
        for px in &mut self.data[row + x0 as usize..row + x1 as usize] {
            *px = (*px).max(value);
        }
    }

    /// True when no pixel would be blurred.
    pub fn is_clear(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    pub fn max_value(&self) -> u8 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    pub fn as_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), &self.data)
            .expect("BlurMask data length must match dimensions")
    }
}
