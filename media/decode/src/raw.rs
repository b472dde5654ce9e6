/*!
    Decoder for uncompressed video.
*/

use std::collections::VecDeque;

use tracing::trace;

use media_types::{
    CodecId, Error, MAX_FRAME_BYTES, MediaKind, Packet, PixelFormat, Result, StreamDescriptor,
};

use crate::backend::{DecodeBackend, Decoded, SendStatus};
use crate::config::DecoderConfig;
use crate::pool::FramePool;
use crate::registry::DecoderFactory;

/**
    Decodes raw video packets: each packet is one tightly packed picture.

    Planes are laid out at an aligned stride, so rows are copied one by
    one. With a non-zero frame delay, frames are held back until enough
    later packets arrive or end of stream is signaled.
*/
#[derive(Debug)]
pub struct RawVideoDecoder {
    width: u32,
    height: u32,
    format: PixelFormat,
    stride_align: usize,
    queue_depth: usize,
    frame_delay: usize,
    queue: VecDeque<Packet>,
    eof: bool,
}

impl RawVideoDecoder {
    pub fn new(stream: &StreamDescriptor, config: &DecoderConfig) -> Result<Self> {
        let (width, height) = stream
            .dimensions()
            .filter(|&(w, h)| w > 0 && h > 0)
            .ok_or_else(|| {
                Error::open_failed(format!("raw video stream {} has no dimensions", stream.index))
            })?;
        let format = stream.pixel_format().ok_or_else(|| {
            Error::open_failed(format!("raw video stream {} has no pixel format", stream.index))
        })?;
        if !format
            .checked_frame_size(width, height)
            .is_some_and(|size| size <= MAX_FRAME_BYTES)
        {
            return Err(Error::open_failed(format!(
                "raw video stream {} pictures of {width}x{height} {format} are too large",
                stream.index
            )));
        }

        Ok(Self {
            width,
            height,
            format,
            stride_align: config.stride_align,
            // A queue shallower than the delay could never release a frame
            queue_depth: config.queue_depth.max(config.frame_delay + 1),
            frame_delay: config.frame_delay,
            queue: VecDeque::new(),
            eof: false,
        })
    }

    fn decode(&self, packet: Packet, pool: &mut FramePool) -> Result<Decoded> {
        let expected = self.format.frame_size(self.width, self.height);
        if packet.data.len() != expected {
            return Err(Error::decode_failed(format!(
                "raw frame is {} bytes, expected {expected}",
                packet.data.len()
            )));
        }

        let mut frame = pool.acquire(self.width, self.height, self.format, self.stride_align);
        let mut offset = 0;
        for plane in 0..self.format.plane_count() {
            let (row_bytes, rows) = self.format.plane_size(plane, self.width, self.height);
            for y in 0..rows {
                frame
                    .row_mut(plane, y)
                    .copy_from_slice(&packet.data[offset..offset + row_bytes]);
                offset += row_bytes;
            }
        }

        trace!(pts = ?packet.pts, "decoded raw frame");
        Ok(Decoded::Frame(
            frame
                .with_pts(packet.pts)
                .with_keyframe(true),
        ))
    }
}

impl DecodeBackend for RawVideoDecoder {
    fn send(&mut self, packet: Packet) -> Result<SendStatus> {
        if self.eof {
            return Err(Error::decode_rejected("packet after end of stream"));
        }
        if self.queue.len() >= self.queue_depth {
            return Ok(SendStatus::Full);
        }
        self.queue.push_back(packet);
        Ok(SendStatus::Accepted)
    }

    fn send_eof(&mut self) -> Result<()> {
        self.eof = true;
        Ok(())
    }

    fn receive(&mut self, pool: &mut FramePool) -> Result<Decoded> {
        if self.queue.len() > self.frame_delay || self.eof {
            if let Some(packet) = self.queue.pop_front() {
                return self.decode(packet, pool);
            }
        }

        if self.eof {
            Ok(Decoded::EndOfStream)
        } else {
            Ok(Decoded::Pending)
        }
    }
}

/**
    Factory for [`RawVideoDecoder`].
*/
#[derive(Clone, Copy, Debug, Default)]
pub struct RawVideoFactory;

impl DecoderFactory for RawVideoFactory {
    fn name(&self) -> &str {
        "rawvideo"
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn create(
        &self,
        stream: &StreamDescriptor,
        config: &DecoderConfig,
    ) -> Result<Box<dyn DecodeBackend>> {
        if stream.codec_id != CodecId::RawVideo {
            return Err(Error::UnsupportedCodec(stream.codec_id.clone()));
        }
        Ok(Box::new(RawVideoDecoder::new(stream, config)?))
    }
}
