pub mod blur_kernel;
