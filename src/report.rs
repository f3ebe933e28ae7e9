// src/report.rs

use crate::error::Result;
use crate::metrics::{ComparisonResult, FrameRecord};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Renders the fixed-format summary. Averages are rounded to 4 decimal
/// places; an infinite average PSNR (identical streams) renders as `inf`.
pub fn render_summary(result: &ComparisonResult) -> String {
    format!(
        "Processed {} frames\n\
         Average PSNR: {:.4}\n\
         Average SSIM: {:.4}\n\
         Average Entropy Original: {:.4}\n\
         Average Entropy Processed: {:.4}\n",
        result.frames,
        result.avg_psnr,
        result.avg_ssim,
        result.avg_entropy_original,
        result.avg_entropy_processed,
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    frames: &'a [FrameRecord],
    summary: &'a ComparisonResult,
}

/// Writes the per-frame records plus the summary as pretty-printed JSON.
pub fn write_json(path: &Path, records: &[FrameRecord], result: &ComparisonResult) -> Result<()> {
    let report = JsonReport {
        frames: records,
        summary: result,
    };
    let content = serde_json::to_string_pretty(&report)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ComparisonResult {
        ComparisonResult {
            frames: 7,
            avg_psnr: 38.123456,
            avg_ssim: 0.987654,
            avg_entropy_original: 6.54321,
            avg_entropy_processed: 6.4,
        }
    }

    #[test]
    fn summary_uses_the_fixed_report_format() {
        let text = render_summary(&result());
        assert_eq!(
            text,
            "Processed 7 frames\n\
             Average PSNR: 38.1235\n\
             Average SSIM: 0.9877\n\
             Average Entropy Original: 6.5432\n\
             Average Entropy Processed: 6.4000\n"
        );
    }

    #[test]
    fn summary_reports_the_pair_count_first() {
        let text = render_summary(&result());
        assert!(text.starts_with("Processed 7 frames\n"));
    }

    #[test]
    fn infinite_psnr_renders_as_inf() {
        let mut r = result();
        r.avg_psnr = f64::INFINITY;
        let text = render_summary(&r);
        assert!(text.contains("Average PSNR: inf\n"));
    }
}
