// src/metrics.rs

use crate::decode::GrayFrame;
use crate::error::{Result, VidcmpError};
use crate::pipeline::FramePair;
use serde::Serialize;

/// Fixed dynamic range for 8-bit intensity data. PSNR and the SSIM
/// stabilization constants are normalized against this, not against the
/// observed min/max of a frame.
const DATA_RANGE: f64 = 255.0;

/// Default SSIM window side length (7x7 uniform window).
const SSIM_WINDOW: usize = 7;

// --- Data Structures ---

/// The four scalar metrics computed for one validated frame pair.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct MetricSample {
    pub psnr: f64,
    pub ssim: f64,
    pub entropy_original: f64,
    pub entropy_processed: f64,
}

impl MetricSample {
    /// Computes all metrics for a validated pair. The three computations are
    /// pure and independent; PSNR/SSIM compare the pair, entropy is per frame.
    pub fn measure(pair: &FramePair) -> MetricSample {
        MetricSample {
            psnr: psnr(&pair.original, &pair.processed),
            ssim: ssim(&pair.original, &pair.processed),
            entropy_original: entropy(&pair.original),
            entropy_processed: entropy(&pair.processed),
        }
    }
}

/// One pair's metrics tagged with its ordinal position, kept for the
/// optional JSON dump. Non-finite values serialize as JSON null.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct FrameRecord {
    #[serde(rename = "frameNum")]
    pub frame_num: u64,
    pub metrics: MetricSample,
}

/// Running sums over all processed pairs, finalized once into means.
#[derive(Debug, Clone, Default)]
pub struct RunningAverages {
    psnr_sum: f64,
    ssim_sum: f64,
    entropy_original_sum: f64,
    entropy_processed_sum: f64,
    count: u64,
}

impl RunningAverages {
    pub fn new() -> RunningAverages {
        RunningAverages::default()
    }

    /// Accumulates one sample. O(1), commutative, no failure modes.
    pub fn update(&mut self, sample: &MetricSample) {
        self.psnr_sum += sample.psnr;
        self.ssim_sum += sample.ssim;
        self.entropy_original_sum += sample.entropy_original;
        self.entropy_processed_sum += sample.entropy_processed;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Divides each sum by the pair count. Refuses to produce a NaN report
    /// when nothing was compared.
    pub fn finalize(self) -> Result<ComparisonResult> {
        if self.count == 0 {
            return Err(VidcmpError::NoFramesProcessed);
        }
        let n = self.count as f64;
        Ok(ComparisonResult {
            frames: self.count,
            avg_psnr: self.psnr_sum / n,
            avg_ssim: self.ssim_sum / n,
            avg_entropy_original: self.entropy_original_sum / n,
            avg_entropy_processed: self.entropy_processed_sum / n,
        })
    }
}

/// Finalized averages over all compared pairs; the sole output of the core.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct ComparisonResult {
    pub frames: u64,
    pub avg_psnr: f64,
    pub avg_ssim: f64,
    pub avg_entropy_original: f64,
    pub avg_entropy_processed: f64,
}

// --- Core Functions ---

/// Peak Signal-to-Noise Ratio in dB.
///
/// `10 * log10(255^2 / MSE)`; identical frames yield `f64::INFINITY`, the
/// conventional saturation value for zero MSE.
pub fn psnr(a: &GrayFrame, b: &GrayFrame) -> f64 {
    let sum: u64 = a
        .data()
        .iter()
        .zip(b.data().iter())
        .map(|(&pa, &pb)| {
            let diff = pa as i32 - pb as i32;
            (diff * diff) as u64
        })
        .sum();
    let mse = sum as f64 / a.data().len() as f64;
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (DATA_RANGE * DATA_RANGE / mse).log10()
    }
}

/// Structural Similarity index, averaged over every fully interior window.
///
/// Uses the standard constants C1=(0.01*255)^2 and C2=(0.03*255)^2 with a
/// 7x7 uniform window and sample-normalized (N/(N-1)) variances, matching
/// the scikit-image default. Frames narrower than the window shrink it to
/// the largest odd size that fits.
pub fn ssim(a: &GrayFrame, b: &GrayFrame) -> f64 {
    let c1 = (0.01 * DATA_RANGE) * (0.01 * DATA_RANGE);
    let c2 = (0.03 * DATA_RANGE) * (0.03 * DATA_RANGE);

    let w = a.width() as usize;
    let h = a.height() as usize;
    if w == 0 || h == 0 {
        return f64::NAN;
    }
    let mut win = SSIM_WINDOW.min(w).min(h);
    if win % 2 == 0 {
        win -= 1;
    }

    let np = (win * win) as f64;
    // Sample normalization for variance/covariance; degenerate 1x1 windows
    // carry no structure term at all.
    let cov_norm = if win > 1 { np / (np - 1.0) } else { 0.0 };

    let pa = a.data();
    let pb = b.data();
    let mut total = 0.0;
    let mut windows = 0u64;

    for y in 0..=(h - win) {
        for x in 0..=(w - win) {
            let mut sa = 0.0;
            let mut sb = 0.0;
            let mut saa = 0.0;
            let mut sbb = 0.0;
            let mut sab = 0.0;
            for wy in 0..win {
                let row = (y + wy) * w + x;
                for wx in 0..win {
                    let va = pa[row + wx] as f64;
                    let vb = pb[row + wx] as f64;
                    sa += va;
                    sb += vb;
                    saa += va * va;
                    sbb += vb * vb;
                    sab += va * vb;
                }
            }
            let ua = sa / np;
            let ub = sb / np;
            let var_a = cov_norm * (saa / np - ua * ua);
            let var_b = cov_norm * (sbb / np - ub * ub);
            let cov = cov_norm * (sab / np - ua * ub);

            let s = ((2.0 * ua * ub + c1) * (2.0 * cov + c2))
                / ((ua * ua + ub * ub + c1) * (var_a + var_b + c2));
            total += s;
            windows += 1;
        }
    }

    total / windows as f64
}

/// Shannon entropy of a frame's intensity histogram, in bits.
///
/// 256 bins over [0, 255]; zero-count bins are dropped before taking logs,
/// so a flat frame comes out as exactly 0 bits.
pub fn entropy(frame: &GrayFrame) -> f64 {
    let mut hist = [0u64; 256];
    for &p in frame.data() {
        hist[p as usize] += 1;
    }
    let total = frame.data().len() as f64;
    hist.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}
