//! Separable Gaussian blur over interleaved 8-bit pixel data.

/// Kernels wider than this run on a reduced copy of the image.
const DIRECT_KERNEL_LIMIT: usize = 50;

/// Normalized 1D Gaussian weights, odd length, symmetric around the center.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    weights: Vec<f64>,
}

impl GaussianKernel {
    /// Kernel spanning `radius` pixels on each side of the center.
    pub fn for_radius(radius: f64) -> Self {
        Self::with_len(2 * radius.ceil().max(0.0) as usize + 1)
    }

    /// Sigma is a sixth of the length, so the tails hold ~0.3% of the weight.
    pub fn with_len(len: usize) -> Self {
        let len = len.max(1) | 1;
        let sigma = len as f64 / 6.0;
        let center = (len / 2) as f64;
        let raw: Vec<f64> = (0..len)
            .map(|i| {
                let d = i as f64 - center;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let total: f64 = raw.iter().sum();
        Self {
            weights: raw.into_iter().map(|w| w / total).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_identity(&self) -> bool {
        self.weights.len() <= 1
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn reach(&self) -> isize {
        (self.weights.len() / 2) as isize
    }
}

/// Blurs `data` in place. Samples past the border repeat the edge pixel.
pub fn blur_in_place(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &GaussianKernel,
) {
    if kernel.is_identity() || width == 0 || height == 0 {
        return;
    }
    let factor = kernel.len() / DIRECT_KERNEL_LIMIT;
    if factor < 2 || width < factor * 2 || height < factor * 2 {
        convolve(data, width, height, channels, kernel);
        return;
    }

    let reduced_kernel = GaussianKernel::with_len(kernel.len() / factor);
    let (mut small, sw, sh) = reduce(data, width, height, channels, factor);
    convolve(&mut small, sw, sh, channels, &reduced_kernel);
    expand_into(&small, sw, sh, channels, data, width, height);
}

fn convolve(data: &mut [u8], width: usize, height: usize, channels: usize, kernel: &GaussianKernel) {
    let reach = kernel.reach();
    let stride = width * channels;
    let mut rows = vec![0.0f64; data.len()];

    for (src, dst) in data.chunks_exact(stride).zip(rows.chunks_exact_mut(stride)) {
        for x in 0..width {
            for c in 0..channels {
                dst[x * channels + c] = kernel
                    .weights()
                    .iter()
                    .enumerate()
                    .map(|(k, w)| {
                        let sx = clamp_index(x as isize + k as isize - reach, width);
                        src[sx * channels + c] as f64 * w
                    })
                    .sum();
            }
        }
    }

    for y in 0..height {
        for i in 0..stride {
            let value: f64 = kernel
                .weights()
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sy = clamp_index(y as isize + k as isize - reach, height);
                    rows[sy * stride + i] * w
                })
                .sum();
            data[y * stride + i] = to_u8(value);
        }
    }
}

/// Box-averages `factor`×`factor` blocks; trailing partial blocks are dropped.
fn reduce(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    factor: usize,
) -> (Vec<u8>, usize, usize) {
    let (sw, sh) = (width / factor, height / factor);
    let area = (factor * factor) as u32;
    let mut out = Vec::with_capacity(sw * sh * channels);
    for by in 0..sh {
        for bx in 0..sw {
            for c in 0..channels {
                let mut sum = 0u32;
                for y in by * factor..(by + 1) * factor {
                    let row = &data[y * width * channels..];
                    for x in bx * factor..(bx + 1) * factor {
                        sum += row[x * channels + c] as u32;
                    }
                }
                out.push(((sum + area / 2) / area) as u8);
            }
        }
    }
    (out, sw, sh)
}

/// Bilinear resample of `src` into the full-size `dst`, corners aligned.
fn expand_into(
    src: &[u8],
    sw: usize,
    sh: usize,
    channels: usize,
    dst: &mut [u8],
    width: usize,
    height: usize,
) {
    let step_x = (sw - 1) as f64 / (width.max(2) - 1) as f64;
    let step_y = (sh - 1) as f64 / (height.max(2) - 1) as f64;
    let at = |x: usize, y: usize, c: usize| src[(y * sw + x) * channels + c] as f64;

    for y in 0..height {
        let fy = y as f64 * step_y;
        let y0 = (fy as usize).min(sh - 1);
        let y1 = (y0 + 1).min(sh - 1);
        let ty = fy - y0 as f64;
        for x in 0..width {
            let fx = x as f64 * step_x;
            let x0 = (fx as usize).min(sw - 1);
            let x1 = (x0 + 1).min(sw - 1);
            let tx = fx - x0 as f64;
            for c in 0..channels {
                let top = at(x0, y0, c) + (at(x1, y0, c) - at(x0, y0, c)) * tx;
                let bottom = at(x0, y1, c) + (at(x1, y1, c) - at(x0, y1, c)) * tx;
                dst[(y * width + x) * channels + c] = to_u8(top + (bottom - top) * ty);
            }
        }
    }
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
