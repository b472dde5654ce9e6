/*!
    Separable resampling filters.

    Each axis gets a table of fixed-point weights, computed once per
    source/destination size pair and reused for every frame.
*/

use crate::video::ScalingAlgorithm;

/// Fixed-point precision of filter weights.
const WEIGHT_BITS: u32 = 14;
const WEIGHT_ONE: i32 = 1 << WEIGHT_BITS;
const ROUNDING: i32 = 1 << (WEIGHT_BITS - 1);

/**
    One axis of a resampling filter.

    Output sample `i` is `sum(weights[i * taps + k] * input[starts[i] + k])`
    over `k < taps`, in units of `1 << WEIGHT_BITS`.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Filter {
    src_len: usize,
    dst_len: usize,
    taps: usize,
    starts: Vec<usize>,
    weights: Vec<i32>,
}

impl Filter {
    pub(crate) fn new(src_len: usize, dst_len: usize, algorithm: ScalingAlgorithm) -> Self {
        let scale = src_len as f64 / dst_len as f64;

        // Per output sample: clamped source index and weight, merged by index
        let contributions: Vec<Vec<(usize, f64)>> = (0..dst_len)
            .map(|i| merge(raw_weights(i, scale, src_len, algorithm), src_len))
            .collect();

        let taps = contributions
            .iter()
            .map(|c| c.last().map_or(0, |l| l.0) - c.first().map_or(0, |f| f.0) + 1)
            .max()
            .unwrap_or(1);

        let mut starts = Vec::with_capacity(dst_len);
        let mut weights = vec![0; dst_len * taps];
        for (i, contribution) in contributions.iter().enumerate() {
            let first = contribution.first().map_or(0, |c| c.0);
            let start = first.min(src_len - taps);
            starts.push(start);
            let row = &mut weights[i * taps..(i + 1) * taps];
            quantize(contribution, start, row);
        }

        Self {
            src_len,
            dst_len,
            taps,
            starts,
            weights,
        }
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.src_len == self.dst_len
            && self.taps == 1
            && self.starts.iter().enumerate().all(|(i, &s)| s == i)
            && self.weights.iter().all(|&w| w == WEIGHT_ONE)
    }

    /**
        Weighted sum for output sample `i`, reading input sample `k` through `sample`.
    */
    #[inline]
    fn apply(&self, i: usize, sample: impl Fn(usize) -> u8) -> u8 {
        let start = self.starts[i];
        let weights = &self.weights[i * self.taps..(i + 1) * self.taps];
        let sum: i32 = weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != 0)
            .map(|(k, w)| w * i32::from(sample(start + k)))
            .sum();
        ((sum + ROUNDING) >> WEIGHT_BITS).clamp(0, 255) as u8
    }
}

/**
    Unnormalized weights of the source samples around output sample `i`.
*/
fn raw_weights(
    i: usize,
    scale: f64,
    src_len: usize,
    algorithm: ScalingAlgorithm,
) -> Vec<(isize, f64)> {
    let center = (i as f64 + 0.5) * scale - 0.5;
    // Downscaling widens the kernel so every source sample contributes
    let stretch = scale.max(1.0);

    match algorithm {
        ScalingAlgorithm::Nearest => {
            let index = (((i as f64 + 0.5) * scale).floor() as isize).min(src_len as isize - 1);
            vec![(index, 1.0)]
        }
        ScalingAlgorithm::Area => {
            // Output sample i covers [i * scale, (i + 1) * scale) of the input
            let lo = i as f64 * scale;
            let hi = lo + scale;
            let mut out = Vec::new();
            let mut j = lo.floor() as isize;
            while (j as f64) < hi {
                let overlap = hi.min(j as f64 + 1.0) - lo.max(j as f64);
                if overlap > 1e-9 {
                    out.push((j, overlap));
                }
                j += 1;
            }
            out
        }
        ScalingAlgorithm::Bilinear => kernel_weights(center, stretch, 1.0, |x| (1.0 - x.abs()).max(0.0)),
        ScalingAlgorithm::Bicubic => kernel_weights(center, stretch, 2.0, cubic),
    }
}

fn kernel_weights(
    center: f64,
    stretch: f64,
    radius: f64,
    kernel: impl Fn(f64) -> f64,
) -> Vec<(isize, f64)> {
    let support = radius * stretch;
    let lo = (center - support).floor() as isize;
    let hi = (center + support).ceil() as isize;
    (lo..=hi)
        .map(|j| (j, kernel((j as f64 - center) / stretch)))
        .filter(|(_, w)| w.abs() > 1e-9)
        .collect()
}

/**
    Keys cubic convolution kernel with `a = -0.5` (Catmull-Rom).
*/
fn cubic(x: f64) -> f64 {
    const A: f64 = -0.5;
    let x = x.abs();
    if x < 1.0 {
        ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((A * x - 5.0 * A) * x + 8.0 * A) * x - 4.0 * A
    } else {
        0.0
    }
}

/**
    Clamp indices into `0..src_len` and merge weights that land on the same sample.
*/
fn merge(raw: Vec<(isize, f64)>, src_len: usize) -> Vec<(usize, f64)> {
    let last = src_len as isize - 1;
    let mut merged: Vec<(usize, f64)> = Vec::with_capacity(raw.len());
    for (index, weight) in raw {
        let index = index.clamp(0, last) as usize;
        match merged.iter_mut().find(|(i, _)| *i == index) {
            Some(entry) => entry.1 += weight,
            None => merged.push((index, weight)),
        }
    }
    merged.sort_by_key(|(i, _)| *i);
    merged
}

/**
    Write normalized fixed-point weights into `row`, which starts at source index `start`.

    The weights of a row always sum to exactly `WEIGHT_ONE`.
*/
fn quantize(contribution: &[(usize, f64)], start: usize, row: &mut [i32]) {
    let total: f64 = contribution.iter().map(|(_, w)| w).sum();
    if contribution.is_empty() || total.abs() < 1e-12 {
        row[0] = WEIGHT_ONE;
        return;
    }

    let mut sum = 0;
    let mut largest = 0;
    for &(index, weight) in contribution {
        let slot = index - start;
        row[slot] = (weight / total * f64::from(WEIGHT_ONE)).round() as i32;
        sum += row[slot];
        if row[slot] > row[largest] {
            largest = slot;
        }
    }
    row[largest] += WEIGHT_ONE - sum;
}

/**
    A tightly packed single-component plane.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ComponentPlane {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) data: Vec<u8>,
}

impl ComponentPlane {
    pub(crate) fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub(crate) fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/**
    Resamples one component plane from a fixed source size to a fixed target size.
*/
#[derive(Clone, Debug)]
pub(crate) struct PlaneScaler {
    src: (usize, usize),
    dst: (usize, usize),
    horizontal: Filter,
    vertical: Filter,
}

impl PlaneScaler {
    pub(crate) fn new(src: (usize, usize), dst: (usize, usize), algorithm: ScalingAlgorithm) -> Self {
        Self {
            src,
            dst,
            horizontal: Filter::new(src.0, dst.0, algorithm),
            vertical: Filter::new(src.1, dst.1, algorithm),
        }
    }

    pub(crate) fn source_size(&self) -> (usize, usize) {
        self.src
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.horizontal.is_identity() && self.vertical.is_identity()
    }

    pub(crate) fn scale(&self, plane: &ComponentPlane) -> ComponentPlane {
        if self.is_identity() {
            return plane.clone();
        }

        let (src_w, src_h) = self.src;
        let (dst_w, dst_h) = self.dst;

        // Horizontal pass: src_h rows of dst_w samples
        let mut wide = ComponentPlane::filled(dst_w, src_h, 0);
        for y in 0..src_h {
            let row = &plane.data[y * src_w..(y + 1) * src_w];
            for x in 0..dst_w {
                wide.data[y * dst_w + x] = self.horizontal.apply(x, |k| row[k]);
            }
        }

        // Vertical pass
        let mut out = ComponentPlane::filled(dst_w, dst_h, 0);
        for y in 0..dst_h {
            for x in 0..dst_w {
                out.data[y * dst_w + x] = self.vertical.apply(y, |k| wide.at(x, k));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALGORITHMS: [ScalingAlgorithm; 4] = [
        ScalingAlgorithm::Nearest,
        ScalingAlgorithm::Bilinear,
        ScalingAlgorithm::Bicubic,
        ScalingAlgorithm::Area,
    ];

    fn row_sums(filter: &Filter) -> Vec<i32> {
        filter.weights.chunks(filter.taps).map(|c| c.iter().sum()).collect()
    }

    #[test]
    fn same_size_filters_are_identity() {
        for algorithm in ALGORITHMS {
            let filter = Filter::new(17, 17, algorithm);
            assert!(filter.is_identity(), "{algorithm:?}");
        }
    }

    #[test]
    fn weights_are_normalized() {
        for algorithm in ALGORITHMS {
            for (src, dst) in [(16, 7), (7, 16), (100, 3), (1, 5), (5, 1)] {
                let filter = Filter::new(src, dst, algorithm);
                assert!(
                    row_sums(&filter).iter().all(|&s| s == WEIGHT_ONE),
                    "{algorithm:?} {src}->{dst}"
                );
                assert!(filter.starts.iter().all(|&s| s + filter.taps <= src));
            }
        }
    }

    #[test]
    fn area_halving_averages_pairs() {
        let filter = Filter::new(4, 2, ScalingAlgorithm::Area);
        let input = [10u8, 20, 100, 200];
        let out: Vec<u8> = (0..2).map(|i| filter.apply(i, |k| input[k])).collect();
        assert_eq!(out, vec![15, 150]);
    }

    #[test]
    fn constant_planes_stay_constant() {
        let plane = ComponentPlane::filled(9, 5, 77);
        for algorithm in ALGORITHMS {
            let scaler = PlaneScaler::new((9, 5), (4, 11), algorithm);
            let out = scaler.scale(&plane);
            assert_eq!(out.width, 4);
            assert_eq!(out.height, 11);
            assert!(out.data.iter().all(|&v| v == 77), "{algorithm:?}");
        }
    }

    #[test]
    fn nearest_upscale_repeats_samples() {
        let filter = Filter::new(2, 4, ScalingAlgorithm::Nearest);
        let input = [1u8, 9];
        let out: Vec<u8> = (0..4).map(|i| filter.apply(i, |k| input[k])).collect();
        assert_eq!(out, vec![1, 1, 9, 9]);
    }

    #[test]
    fn cubic_kernel_interpolates() {
        assert_eq!(cubic(0.0), 1.0);
        assert!(cubic(1.0).abs() < 1e-12);
        assert!(cubic(2.0).abs() < 1e-12);
        assert!(cubic(1.5) < 0.0);
    }
}
