//! Bitmap resampling for scaled displays
//!
//! Separable triangle-filter resize: a horizontal pass into a float buffer,
//! then a vertical pass back to bytes. For destination sample `i` the filter
//! is centred at `(i + 0.5) * ratio - 0.5` in source space (`ratio = 1 /
//! scale`) with a support of `max(ratio, 1)`, so downscales average every
//! covered source pixel and upscales interpolate linearly. Samples outside
//! the source clamp to the nearest edge.
//!
//! Mono input is expanded to 0/255 coverage first and comes out as Gray.
//! BGRA is filtered per channel (it is already premultiplied).

use crate::raster::{BitmapRef, PixelMode};

/// Per-axis filter taps
///
/// Every destination sample has `taps` entries; unused ones carry weight 0.
#[derive(Debug, Default)]
pub(crate) struct Weights {
    pub(crate) taps: usize,
    pub(crate) index: Vec<u32>,
    pub(crate) weight: Vec<f32>,
}

impl Weights {
    fn compute(&mut self, src_len: u32, dst_len: u32, ratio: f32) {
        let support = ratio.max(1.0);
        let taps = 2 * support.ceil() as usize + 1;
        let last = src_len.saturating_sub(1) as i64;

        self.taps = taps;
        self.index.clear();
        self.index.resize(dst_len as usize * taps, 0);
        self.weight.clear();
        self.weight.resize(dst_len as usize * taps, 0.0);

        for i in 0..dst_len as usize {
            let pos = (i as f32 + 0.5) * ratio - 0.5;
            let first = (pos - support).floor() as i64 + 1;
            let base = i * taps;

            let mut sum = 0.0f32;
            for k in 0..taps {
                let j = first + k as i64;
                let w = (1.0 - ((j as f32 - pos) / support).abs()).max(0.0);
                self.index[base + k] = j.clamp(0, last) as u32;
                self.weight[base + k] = w;
                sum += w;
            }
            if sum > 0.0 {
                for w in &mut self.weight[base..base + taps] {
                    *w /= sum;
                }
            }
        }
    }

    #[inline]
    fn taps_of(&self, i: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let base = i * self.taps;
        self.index[base..base + self.taps]
            .iter()
            .zip(&self.weight[base..base + self.taps])
            .map(|(&j, &w)| (j as usize, w))
    }
}

/// Weights for resizing `src_len` samples to `dst_len` at `ratio`
pub(crate) fn compute_weights(src_len: u32, dst_len: u32, ratio: f32) -> Weights {
    let mut w = Weights::default();
    w.compute(src_len, dst_len, ratio);
    w
}

/// Resizer with reusable scratch memory
///
/// Buffers only grow; one instance per face keeps steady-state population
/// allocation-free.
#[derive(Debug, Default)]
pub struct Resampler {
    expanded: Vec<u8>,
    horizontal: Vec<f32>,
    row_acc: Vec<f32>,
    output: Vec<u8>,
    x_weights: Weights,
    y_weights: Weights,
}

impl Resampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize `src` to `dst_w`x`dst_h` by `scale`
    ///
    /// The result borrows the resampler's output buffer and is top-down.
    pub fn resample(
        &mut self,
        src: &BitmapRef<'_>,
        dst_w: u32,
        dst_h: u32,
        scale: f32,
    ) -> BitmapRef<'_> {
        let Self {
            expanded,
            horizontal,
            row_acc,
            output,
            x_weights,
            y_weights,
        } = self;

        let (mode, channels) = match src.mode {
            PixelMode::Mono | PixelMode::Gray => (PixelMode::Gray, 1usize),
            PixelMode::Bgra => (PixelMode::Bgra, 4usize),
        };
        let out_len = dst_w as usize * dst_h as usize * channels;
        output.clear();
        output.resize(out_len, 0);

        if out_len == 0 || src.width == 0 || src.rows == 0 {
            return BitmapRef {
                width: dst_w,
                rows: dst_h,
                pitch: dst_w as usize * channels,
                mode,
                buffer: &output[..],
                bottom_up: false,
            };
        }

        // Byte rows in image order, `channels` bytes per pixel
        let src_w = src.width as usize;
        let src_h = src.rows as usize;
        let src_pitch = src_w * channels;
        expanded.clear();
        expanded.reserve(src_pitch * src_h);
        for y in 0..src.rows {
            let row = src.image_row(y);
            match src.mode {
                PixelMode::Mono => expanded.extend((0..src_w).map(|x| {
                    if (row[x / 8] >> (7 - (x % 8))) & 1 != 0 {
                        255
                    } else {
                        0
                    }
                })),
                _ => expanded.extend_from_slice(&row[..src_pitch]),
            }
        }

        let ratio = 1.0 / scale;
        x_weights.compute(src.width, dst_w, ratio);
        y_weights.compute(src.rows, dst_h, ratio);

        // Horizontal: src_h rows of dst_w pixels
        let mid_pitch = dst_w as usize * channels;
        horizontal.clear();
        horizontal.resize(mid_pitch * src_h, 0.0);
        for y in 0..src_h {
            let row = &expanded[y * src_pitch..(y + 1) * src_pitch];
            let out = &mut horizontal[y * mid_pitch..(y + 1) * mid_pitch];
            for x in 0..dst_w as usize {
                for (j, w) in x_weights.taps_of(x) {
                    for c in 0..channels {
                        out[x * channels + c] += w * row[j * channels + c] as f32;
                    }
                }
            }
        }

        // Vertical: dst_h rows
        row_acc.clear();
        row_acc.resize(mid_pitch, 0.0);
        let acc = row_acc;
        for y in 0..dst_h as usize {
            acc.iter_mut().for_each(|v| *v = 0.0);
            for (j, w) in y_weights.taps_of(y) {
                let row = &horizontal[j * mid_pitch..(j + 1) * mid_pitch];
                for (a, &v) in acc.iter_mut().zip(row) {
                    *a += w * v;
                }
            }
            let out = &mut output[y * mid_pitch..(y + 1) * mid_pitch];
            for (o, &v) in out.iter_mut().zip(acc.iter()) {
                *o = (v + 0.5).clamp(0.0, 255.0) as u8;
            }
        }

        BitmapRef {
            width: dst_w,
            rows: dst_h,
            pitch: mid_pitch,
            mode,
            buffer: &output[..],
            bottom_up: false,
        }
    }
}
