// src/decode.rs

use crate::error::{Result, VidcmpError};
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::codec::threading;
use ffmpeg_next::decoder::Video as VideoDecoder;
use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::media;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use log::{debug, info};
use std::path::Path;

/// A single decoded frame, down-mixed to one grayscale channel.
///
/// Pixels are 8-bit luma samples in row-major order, data range [0, 255].
/// Frames are immutable once produced and are dropped as soon as their
/// metrics have been computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        GrayFrame {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn shape(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Anything that can hand out grayscale frames in display order.
///
/// `Ok(None)` signals end of stream, which is an expected outcome rather
/// than an error; genuine decode failures propagate as `Err`.
pub trait FrameRead {
    fn read_frame(&mut self) -> Result<Option<GrayFrame>>;
}

/// Lazy, forward-only frame producer over one video file.
///
/// Owns the demuxer and decoder exclusively; both are released when the
/// source is dropped, on success and error paths alike.
pub struct FrameSource {
    ictx: format::context::Input,
    decoder: VideoDecoder,
    stream_index: usize,
    scaler: Option<ScalingContext>,
    decoded: VideoFrame,
    gray: VideoFrame,
    eof_sent: bool,
}

impl FrameSource {
    /// Opens a video file and prepares a decoder for its primary video track.
    pub fn open(path: &Path) -> Result<FrameSource> {
        info!("Opening video file: {}", path.display());
        if !path.exists() {
            return Err(VidcmpError::Input(format!(
                "Input video file not found: {}",
                path.display()
            )));
        }

        let ictx = format::input(&path)?;
        let (stream_index, parameters) = {
            let stream = ictx
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| {
                    VidcmpError::Decode(format!("No video stream found in {}", path.display()))
                })?;
            (stream.index(), stream.parameters())
        };

        let mut decoder_ctx = CodecContext::from_parameters(parameters)?;
        let mut thread_config = threading::Config::default();
        thread_config.kind = threading::Type::Frame;
        thread_config.count = num_cpus::get();
        decoder_ctx.set_threading(thread_config);

        let decoder = decoder_ctx.decoder().video()?;
        info!(
            "Opened {}: video stream {} ({}x{})",
            path.display(),
            stream_index,
            decoder.width(),
            decoder.height()
        );

        Ok(FrameSource {
            ictx,
            decoder,
            stream_index,
            scaler: None,
            decoded: VideoFrame::empty(),
            gray: VideoFrame::empty(),
            eof_sent: false,
        })
    }

    /// Reads the next packet belonging to the selected video stream.
    fn read_packet(&mut self) -> Option<ffmpeg_next::Packet> {
        for (stream, packet) in self.ictx.packets() {
            if stream.index() == self.stream_index {
                return Some(packet);
            }
        }
        None
    }

    /// Scales the most recently decoded frame to GRAY8 and copies it out,
    /// honoring the scaled frame's row stride.
    fn convert_decoded(&mut self) -> Result<GrayFrame> {
        let width = self.decoded.width();
        let height = self.decoded.height();
        if width == 0 || height == 0 {
            return Err(VidcmpError::Decode(
                "Decoder produced a frame with zero dimensions".to_string(),
            ));
        }

        // The native pixel format is only known once the first frame is out,
        // so the scaler is created lazily.
        if self.scaler.is_none() {
            debug!(
                "Creating grayscale scaler: {:?} {}x{} -> GRAY8",
                self.decoded.format(),
                width,
                height
            );
            self.scaler = Some(ScalingContext::get(
                self.decoded.format(),
                width,
                height,
                Pixel::GRAY8,
                width,
                height,
                ScalingFlags::BILINEAR,
            )?);
        }
        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| VidcmpError::Decode("Grayscale scaler unavailable".to_string()))?;

        scaler.run(&self.decoded, &mut self.gray)?;

        let stride = self.gray.stride(0);
        let plane = self.gray.data(0);
        let w = width as usize;
        let h = height as usize;
        let mut data = Vec::with_capacity(w * h);
        for row in 0..h {
            let start = row * stride;
            data.extend_from_slice(&plane[start..start + w]);
        }

        Ok(GrayFrame::new(width, height, data))
    }
}

impl FrameRead for FrameSource {
    fn read_frame(&mut self) -> Result<Option<GrayFrame>> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                return Ok(Some(self.convert_decoded()?));
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.read_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_frame_reports_shape_and_data() {
        let frame = GrayFrame::new(3, 2, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(frame.shape(), (3, 2));
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.data(), &[0, 1, 2, 3, 4, 5]);
    }
}
