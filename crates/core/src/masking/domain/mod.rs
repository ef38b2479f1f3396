pub mod blur_mask;
pub mod mask_rasterizer;
pub mod shape;
