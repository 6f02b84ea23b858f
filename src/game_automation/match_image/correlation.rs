//! Zero-mean normalized cross-correlation (correlation coefficient form)
//!
//! Every placement of the template inside the search image gets a score in
//! `[-1, 1]`. Channels are correlated jointly: the numerator and both variance
//! terms are summed over every channel, each channel centred on its own mean.
//!
//! The numerator for all placements comes from one frequency-domain product
//! per channel; the window variances come from integral images.

use image::{ImageBuffer, Luma, Pixel};
use imageproc::template_matching::find_extremes;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// One score per top-left placement of the template.
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Variances below this are treated as a flat (constant) patch.
const FLAT_VARIANCE: f64 = 1e-3;

/// Scores are reported at this resolution so an exact copy reads as 1.0.
const SCORE_RESOLUTION: f64 = 1e6;

/// Running sums over the search image so each window's mean and variance cost
/// O(channels) instead of O(window area).
struct Integral {
    stride: usize,
    channels: usize,
    sum: Vec<f64>,
    squares: Vec<f64>,
}

impl Integral {
    fn new(raw: &[u8], width: usize, height: usize, channels: usize) -> Self {
        let stride = width + 1;
        let mut sum = vec![0.0; stride * (height + 1) * channels];
        let mut squares = vec![0.0; stride * (height + 1) * channels];
        let mut row_sum = vec![0.0; channels];
        let mut row_squares = vec![0.0; channels];

        for y in 0..height {
            row_sum.iter_mut().for_each(|v| *v = 0.0);
            row_squares.iter_mut().for_each(|v| *v = 0.0);
            for x in 0..width {
                for c in 0..channels {
                    let value = raw[(y * width + x) * channels + c] as f64;
                    row_sum[c] += value;
                    row_squares[c] += value * value;
                    let below = ((y + 1) * stride + x + 1) * channels + c;
                    let above = (y * stride + x + 1) * channels + c;
                    sum[below] = sum[above] + row_sum[c];
                    squares[below] = squares[above] + row_squares[c];
                }
            }
        }

        Self {
            stride,
            channels,
            sum,
            squares,
        }
    }

    /// `(sum, sum of squares)` of channel `c` over the `w` x `h` window at `(x, y)`.
    fn window(&self, x: usize, y: usize, w: usize, h: usize, c: usize) -> (f64, f64) {
        let at = |col: usize, row: usize| (row * self.stride + col) * self.channels + c;
        let (tl, tr) = (at(x, y), at(x + w, y));
        let (bl, br) = (at(x, y + h), at(x + w, y + h));
        (
            self.sum[br] - self.sum[tr] - self.sum[bl] + self.sum[tl],
            self.squares[br] - self.squares[tr] - self.squares[bl] + self.squares[tl],
        )
    }
}

/// Score every placement of `template` inside `image`.
///
/// Returns `None` when the template is empty or does not fit inside the image.
pub fn score_map<P>(image: &ImageBuffer<P, Vec<u8>>, template: &ImageBuffer<P, Vec<u8>>) -> Option<ScoreMap>
where
    P: Pixel<Subpixel = u8>,
{
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let channels = P::CHANNEL_COUNT as usize;
    let (iw, ih, tw, th) = (iw as usize, ih as usize, tw as usize, th as usize);
    let n = (tw * th) as f64;

    let mut means = vec![0.0; channels];
    for px in template.as_raw().chunks_exact(channels) {
        for (mean, &value) in means.iter_mut().zip(px) {
            *mean += value as f64;
        }
    }
    means.iter_mut().for_each(|m| *m /= n);

    let mut centred = Vec::with_capacity(tw * th * channels);
    for px in template.as_raw().chunks_exact(channels) {
        for (&value, mean) in px.iter().zip(&means) {
            centred.push(value as f64 - mean);
        }
    }
    let template_variance: f64 = centred.iter().map(|v| v * v).sum();
    let template_flat = template_variance <= FLAT_VARIANCE;

    let raw = image.as_raw();
    let integral = Integral::new(raw, iw, ih, channels);
    let numerators = if template_flat {
        Vec::new()
    } else {
        cross_correlate(raw, iw, ih, &centred, tw, th, channels)
    };

    let map = ScoreMap::from_fn((iw - tw + 1) as u32, (ih - th + 1) as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);

        let window_variance: f64 = (0..channels)
            .map(|c| {
                let (s, sq) = integral.window(x, y, tw, th, c);
                (sq - s * s / n).max(0.0)
            })
            .sum();
        let window_flat = window_variance <= FLAT_VARIANCE;

        let score = match (template_flat, window_flat) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.0,
            (false, false) => {
                let numerator = numerators[y * iw + x];
                (numerator / (template_variance * window_variance).sqrt()).clamp(-1.0, 1.0)
            }
        };

        Luma([((score * SCORE_RESOLUTION).round() / SCORE_RESOLUTION) as f32])
    });

    Some(map)
}

/// `sum(image[x + u, y + v] * template[u, v])` for every `(x, y)` of the
/// image, summed over channels, as a row-major `iw * ih` buffer. Only the
/// placements where the template fits are meaningful; the others wrap around.
fn cross_correlate(
    raw: &[u8],
    iw: usize,
    ih: usize,
    template: &[f64],
    tw: usize,
    th: usize,
    channels: usize,
) -> Vec<f64> {
    let mut planner = FftPlanner::<f64>::new();
    let mut product = vec![Complex::new(0.0, 0.0); iw * ih];

    for c in 0..channels {
        let plane: Vec<Complex<f64>> = raw
            .iter()
            .skip(c)
            .step_by(channels)
            .map(|&v| Complex::new(v as f64, 0.0))
            .collect();
        let image_spectrum = forward(&mut planner, plane, iw, ih);

        let mut padded = vec![Complex::new(0.0, 0.0); iw * ih];
        for v in 0..th {
            for u in 0..tw {
                padded[v * iw + u] = Complex::new(template[(v * tw + u) * channels + c], 0.0);
            }
        }
        let template_spectrum = forward(&mut planner, padded, iw, ih);

        for ((acc, i), t) in product.iter_mut().zip(&image_spectrum).zip(&template_spectrum) {
            *acc += *i * t.conj();
        }
    }

    let scale = (iw * ih) as f64;
    inverse(&mut planner, product, iw, ih)
        .into_iter()
        .map(|v| v.re / scale)
        .collect()
}

/// 2-D forward transform of `h` rows of `w`. The spectrum is left transposed
/// (`w` rows of `h`); `inverse` expects that layout.
fn forward(
    planner: &mut FftPlanner<f64>,
    mut rows: Vec<Complex<f64>>,
    w: usize,
    h: usize,
) -> Vec<Complex<f64>> {
    planner.plan_fft_forward(w).process(&mut rows);
    let mut columns = transpose(&rows, w, h);
    planner.plan_fft_forward(h).process(&mut columns);
    columns
}

/// Unnormalized inverse of `forward`, back to `h` rows of `w`.
fn inverse(
    planner: &mut FftPlanner<f64>,
    mut columns: Vec<Complex<f64>>,
    w: usize,
    h: usize,
) -> Vec<Complex<f64>> {
    planner.plan_fft_inverse(h).process(&mut columns);
    let mut rows = transpose(&columns, h, w);
    planner.plan_fft_inverse(w).process(&mut rows);
    rows
}

/// `h` rows of `w` into `w` rows of `h`
fn transpose(data: &[Complex<f64>], w: usize, h: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); w * h];
    for y in 0..h {
        for x in 0..w {
            out[x * h + y] = data[y * w + x];
        }
    }
    out
}

/// Highest score and its placement. The first maximum in row-major order wins
/// ties.
pub fn best_location(map: &ScoreMap) -> (f32, (u32, u32)) {
    let extremes = find_extremes(map);
    (extremes.max_value, extremes.max_value_location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage};

    fn noise(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let h = ((x * 31 + 7) ^ (y * 17 + 3)).wrapping_mul(2_654_435_761);
            Luma([(h >> 24) as u8])
        })
    }

    #[test]
    fn test_exact_copy_scores_one() {
        let image = noise(40, 30);
        let template = image::imageops::crop_imm(&image, 12, 9, 8, 6).to_image();
        let map = score_map(&image, &template).unwrap();
        assert_eq!(map.dimensions(), (33, 25));
        let (score, location) = best_location(&map);
        assert_eq!(score, 1.0);
        assert_eq!(location, (12, 9));
    }

    #[test]
    fn test_brightness_shift_still_scores_one() {
        let template = noise(6, 6);
        let mut image = GrayImage::new(20, 20);
        for (x, y, px) in template.enumerate_pixels() {
            image.put_pixel(x + 5, y + 5, Luma([px[0] / 2 + 40]));
        }
        let (score, location) = best_location(&score_map(&image, &template).unwrap());
        assert!(score > 0.99, "score {score}");
        assert_eq!(location, (5, 5));
    }

    #[test]
    fn test_flat_patches() {
        let flat = GrayImage::from_pixel(4, 4, Luma([90]));
        let other_flat = GrayImage::from_pixel(10, 10, Luma([200]));
        let map = score_map(&other_flat, &flat).unwrap();
        assert!(map.pixels().all(|p| p[0] == 1.0));

        let map = score_map(&noise(10, 10), &flat).unwrap();
        assert!(map.pixels().all(|p| p[0] == 0.0));
    }

    #[test]
    fn test_template_larger_than_image() {
        assert!(score_map(&noise(5, 5), &noise(6, 2)).is_none());
        assert!(score_map(&noise(5, 5), &GrayImage::new(0, 0)).is_none());
    }

    #[test]
    fn test_color_channels_are_correlated_jointly() {
        let template = RgbImage::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });
        let mut image = RgbImage::from_pixel(12, 12, Rgb([0, 0, 0]));
        for (x, y, px) in template.enumerate_pixels() {
            image.put_pixel(x + 6, y + 2, *px);
        }
        let (score, location) = best_location(&score_map(&image, &template).unwrap());
        assert_eq!(score, 1.0);
        assert_eq!(location, (6, 2));
    }
}
