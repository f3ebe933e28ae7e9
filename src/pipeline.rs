// src/pipeline.rs

use crate::decode::{FrameRead, GrayFrame};
use crate::error::{Result, VidcmpError};
use crate::metrics::{ComparisonResult, FrameRecord, MetricSample, RunningAverages};
use log::{debug, info, warn};

/// Two frames at the same ordinal position in their respective streams.
#[derive(Debug, Clone)]
pub struct FramePair {
    /// 0-based position of the pair within the iteration.
    pub index: u64,
    pub original: GrayFrame,
    pub processed: GrayFrame,
}

/// Strict lockstep zip over two frame sources.
///
/// Pulls exactly one frame from each source per step. If either source is
/// exhausted the iteration ends immediately and the unmatched frame is
/// discarded; mismatched stream lengths are tolerated by design, only
/// mismatched dimensions within a pair are fatal (see [`validate`]).
/// An optional cap stops iteration after that many pairs even if both
/// streams have more frames. No frame is buffered beyond the current pair.
pub struct FramePairs<'a, A: FrameRead, B: FrameRead> {
    original: &'a mut A,
    processed: &'a mut B,
    index: u64,
    max_frames: Option<u64>,
}

impl<'a, A: FrameRead, B: FrameRead> FramePairs<'a, A, B> {
    pub fn new(
        original: &'a mut A,
        processed: &'a mut B,
        max_frames: Option<u64>,
    ) -> FramePairs<'a, A, B> {
        FramePairs {
            original,
            processed,
            index: 0,
            max_frames,
        }
    }

    /// Advances both sources by one frame. `Ok(None)` means the comparison
    /// is over (either stream ended, or the cap was reached); decode
    /// failures propagate immediately.
    pub fn next_pair(&mut self) -> Result<Option<FramePair>> {
        if let Some(max) = self.max_frames {
            if self.index >= max {
                debug!("Frame cap of {} pairs reached", max);
                return Ok(None);
            }
        }

        match (self.original.read_frame()?, self.processed.read_frame()?) {
            (Some(original), Some(processed)) => {
                let index = self.index;
                self.index += 1;
                Ok(Some(FramePair {
                    index,
                    original,
                    processed,
                }))
            }
            (Some(_), None) => {
                warn!(
                    "Processed stream ended after {} frames; truncating to the shorter stream",
                    self.index
                );
                Ok(None)
            }
            (None, Some(_)) => {
                warn!(
                    "Original stream ended after {} frames; truncating to the shorter stream",
                    self.index
                );
                Ok(None)
            }
            (None, None) => Ok(None),
        }
    }
}

/// Gates a pair before any metric is computed. A dimension mismatch aborts
/// the whole run, it is never a per-frame skip.
pub fn validate(pair: &FramePair) -> Result<()> {
    if pair.original.shape() != pair.processed.shape() {
        return Err(VidcmpError::FrameSizeMismatch {
            index: pair.index,
            original: pair.original.shape(),
            processed: pair.processed.shape(),
        });
    }
    Ok(())
}

/// Drives the whole comparison: pair, validate, measure, accumulate.
///
/// One pair is fully processed before the next is pulled; the only state
/// carried across pairs is the running sums and the per-frame scalar
/// records kept for the optional JSON dump.
pub fn run_comparison<A: FrameRead, B: FrameRead>(
    original: &mut A,
    processed: &mut B,
    max_frames: Option<u64>,
) -> Result<(ComparisonResult, Vec<FrameRecord>)> {
    let mut pairs = FramePairs::new(original, processed, max_frames);
    let mut averages = RunningAverages::new();
    let mut records = Vec::new();

    while let Some(pair) = pairs.next_pair()? {
        validate(&pair)?;
        let sample = MetricSample::measure(&pair);
        debug!(
            "Frame {}: PSNR={:.4} SSIM={:.4} H(orig)={:.4} H(proc)={:.4}",
            pair.index, sample.psnr, sample.ssim, sample.entropy_original, sample.entropy_processed
        );
        records.push(FrameRecord {
            frame_num: pair.index,
            metrics: sample,
        });
        averages.update(&sample);
    }

    info!("Compared {} frame pairs", averages.count());
    let result = averages.finalize()?;
    Ok((result, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory frame source for exercising the pipeline without video files.
    struct VecSource {
        frames: VecDeque<GrayFrame>,
    }

    impl VecSource {
        fn new(frames: Vec<GrayFrame>) -> VecSource {
            VecSource {
                frames: frames.into(),
            }
        }
    }

    impl FrameRead for VecSource {
        fn read_frame(&mut self) -> Result<Option<GrayFrame>> {
            Ok(self.frames.pop_front())
        }
    }

    /// Source that fails with a decode error after yielding some frames.
    struct FailingSource {
        remaining: u64,
    }

    impl FrameRead for FailingSource {
        fn read_frame(&mut self) -> Result<Option<GrayFrame>> {
            if self.remaining == 0 {
                return Err(VidcmpError::Decode("corrupt packet".to_string()));
            }
            self.remaining -= 1;
            Ok(Some(flat(8, 8, 10)))
        }
    }

    fn flat(width: u32, height: u32, value: u8) -> GrayFrame {
        GrayFrame::new(width, height, vec![value; (width * height) as usize])
    }

    fn frames(count: usize) -> Vec<GrayFrame> {
        (0..count).map(|i| flat(8, 8, (i * 10) as u8)).collect()
    }

    #[test]
    fn truncates_to_the_shorter_stream_without_error() {
        let mut a = VecSource::new(frames(10));
        let mut b = VecSource::new(frames(7));
        let (result, records) = run_comparison(&mut a, &mut b, None).unwrap();
        assert_eq!(result.frames, 7);
        assert_eq!(records.len(), 7);
    }

    #[test]
    fn max_frames_caps_the_iteration() {
        let mut a = VecSource::new(frames(20));
        let mut b = VecSource::new(frames(20));
        let (result, _) = run_comparison(&mut a, &mut b, Some(5)).unwrap();
        assert_eq!(result.frames, 5);
    }

    #[test]
    fn comparing_a_stream_against_itself_is_perfect() {
        let mut a = VecSource::new(frames(4));
        let mut b = VecSource::new(frames(4));
        let (result, records) = run_comparison(&mut a, &mut b, None).unwrap();
        assert!(result.avg_psnr.is_infinite());
        assert!((result.avg_ssim - 1.0).abs() < 1e-12);
        for record in &records {
            assert!(record.metrics.psnr.is_infinite());
            assert!((record.metrics.ssim - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn dimension_mismatch_aborts_with_the_failing_index() {
        let mut good = frames(4);
        good.push(flat(8, 9, 0));
        let mut a = VecSource::new(good);
        let mut b = VecSource::new(frames(5));
        let err = run_comparison(&mut a, &mut b, None).unwrap_err();
        match err {
            VidcmpError::FrameSizeMismatch {
                index,
                original,
                processed,
            } => {
                assert_eq!(index, 4);
                assert_eq!(original, (8, 9));
                assert_eq!(processed, (8, 8));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_streams_yield_no_frames_processed() {
        let mut a = VecSource::new(Vec::new());
        let mut b = VecSource::new(Vec::new());
        let err = run_comparison(&mut a, &mut b, None).unwrap_err();
        assert!(matches!(err, VidcmpError::NoFramesProcessed));
    }

    #[test]
    fn decode_failure_propagates_and_discards_partial_results() {
        let mut a = FailingSource { remaining: 3 };
        let mut b = VecSource::new(frames(10));
        let err = run_comparison(&mut a, &mut b, None).unwrap_err();
        assert!(matches!(err, VidcmpError::Decode(_)));
    }

    #[test]
    fn pair_indices_are_zero_based_ordinals() {
        let mut a = VecSource::new(frames(3));
        let mut b = VecSource::new(frames(3));
        let mut pairs = FramePairs::new(&mut a, &mut b, None);
        let mut expected = 0;
        while let Some(pair) = pairs.next_pair().unwrap() {
            assert_eq!(pair.index, expected);
            expected += 1;
        }
        assert_eq!(expected, 3);
    }
}
