use ndarray::{s, ArrayView3, ArrayViewMut3};

use super::geometry::{PixelRect, Size};

/// Bytes per pixel: RGBA, 8 bits per channel, straight alpha.
pub const CHANNELS: usize = 4;

/// An RGBA image or decoded video frame in row-major order.
///
/// Pixel format conversion happens at I/O boundaries only. `index` is the
/// frame position in its source (0 for stills) so frames processed out of
/// order can be put back in sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl ImageBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        assert!(width > 0 && height > 0, "image dimensions must be non-zero");
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A buffer filled with one RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::new(data, width, height, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
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

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[offset..offset + CHANNELS]);
        px
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("ImageBuffer data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("ImageBuffer data length must match dimensions")
    }

    /// Copies the pixels under `rect` into a new buffer. `rect` must lie
    /// inside the image and be non-empty.
    pub fn crop(&self, rect: PixelRect) -> ImageBuffer {
        let view = self.as_ndarray();
        let roi = view.slice(s![
            rect.y as usize..rect.bottom() as usize,
            rect.x as usize..rect.right() as usize,
            ..
        ]);
        let data: Vec<u8> = roi.iter().copied().collect();
        ImageBuffer::new(data, rect.width, rect.height, self.index)
    }

    /// Writes `patch` back at the top-left corner of `rect`.
    pub fn paste(&mut self, patch: &ImageBuffer, rect: PixelRect) {
        debug_assert_eq!((patch.width, patch.height), (rect.width, rect.height));
        let mut view = self.as_ndarray_mut();
        view.slice_mut(s![
            rect.y as usize..rect.bottom() as usize,
            rect.x as usize..rect.right() as usize,
            ..
        ])
        .assign(&patch.as_ndarray());
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
