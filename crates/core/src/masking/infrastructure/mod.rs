mod scanline;
pub mod shape_mask_rasterizer;
