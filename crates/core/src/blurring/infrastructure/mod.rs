mod gaussian;
pub mod gaussian_blur_kernel;
