/*!
    FFmpeg-backed decoder for compressed video.
*/

use ffmpeg_next::{
    codec::{self, decoder::Video as VideoDecoderFFmpeg},
    ffi,
    format::Pixel,
    software::scaling::{Context as ScalingContext, Flags},
    util::frame::video::Video as VideoFrameFFmpeg,
};
use tracing::debug;

use media_source::convert::{codec_id_to_ffmpeg, pixel_format_from_ffmpeg, rational_to_ffmpeg};
use media_types::{CodecId, Error, MediaKind, Packet, PixelFormat, Result, StreamDescriptor};

use crate::backend::{DecodeBackend, Decoded, SendStatus};
use crate::config::DecoderConfig;
use crate::pool::FramePool;
use crate::registry::DecoderFactory;

/// Decoded formats we cannot carry are converted to this one.
const FALLBACK_FORMAT: PixelFormat = PixelFormat::Yuv420p;

/**
    Video decoder backed by an FFmpeg codec context.

    Frame planes keep FFmpeg's strides.
*/
pub struct FfmpegVideoDecoder {
    decoder: VideoDecoderFFmpeg,
    decoded: VideoFrameFFmpeg,
    /// Scaler for pixel formats outside [`PixelFormat`], keyed by source layout.
    fallback: Option<(ScalerKey, ScalingContext)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct ScalerKey {
    format: Pixel,
    width: u32,
    height: u32,
}

// SAFETY: the codec and scaling contexts are owned exclusively by this decoder
// and only touched through `&mut self`.
unsafe impl Send for FfmpegVideoDecoder {}

impl FfmpegVideoDecoder {
    /**
        Open a decoder for `stream` from its codec id, dimensions and extradata.
    */
    pub fn new(id: codec::Id, stream: &StreamDescriptor, config: &DecoderConfig) -> Result<Self> {
        let mut context = codec::context::Context::new();

        // SAFETY: the context was just allocated and is not shared
        unsafe {
            let ptr = context.as_mut_ptr();
            (*ptr).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
            (*ptr).codec_id = id.into();
            if let Some((width, height)) = stream.dimensions() {
                (*ptr).width = width as i32;
                (*ptr).height = height as i32;
            }
            (*ptr).pkt_timebase = rational_to_ffmpeg(stream.time_base).into();

            // Extradata (SPS/PPS etc.) must live in FFmpeg-allocated, padded memory
            if let Some(extradata) = stream.extradata.as_deref().filter(|e| !e.is_empty()) {
                let padded = extradata.len() + ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
                let buffer = ffi::av_mallocz(padded) as *mut u8;
                if buffer.is_null() {
                    return Err(Error::open_failed("cannot allocate codec extradata"));
                }
                std::ptr::copy_nonoverlapping(extradata.as_ptr(), buffer, extradata.len());
                (*ptr).extradata = buffer;
                (*ptr).extradata_size = extradata.len() as i32;
            }

            if let Some(threads) = config.threads {
                (*ptr).thread_count = threads as i32;
            }
        }

        let decoder = context
            .decoder()
            .video()
            .map_err(|e| Error::open_failed(format!("{}: {e}", stream.codec_id)))?;

        Ok(Self {
            decoder,
            decoded: VideoFrameFFmpeg::empty(),
            fallback: None,
        })
    }

    /**
        Copy the decoded FFmpeg frame into a pooled frame, row by row.
    */
    fn copy_out(&mut self, pool: &mut FramePool) -> Result<Decoded> {
        let width = self.decoded.width();
        let height = self.decoded.height();
        if width == 0 || height == 0 {
            return Err(Error::decode_failed("frame has zero dimensions"));
        }

        let pts = self.decoded.pts();
        let is_keyframe = self.decoded.is_key();

        let source = match pixel_format_from_ffmpeg(self.decoded.format()) {
            Some(format) => Converted::Native(&self.decoded, format),
            None => Converted::Scaled(self.convert_fallback()?, FALLBACK_FORMAT),
        };
        let (ffmpeg_frame, format) = match &source {
            Converted::Native(frame, format) => (*frame, *format),
            Converted::Scaled(frame, format) => (frame, *format),
        };

        let strides: Vec<usize> = (0..format.plane_count())
            .map(|plane| ffmpeg_frame.stride(plane))
            .collect();
        let mut frame = pool.acquire_with_strides(width, height, format, &strides);

        for plane in 0..format.plane_count() {
            let (row_bytes, rows) = format.plane_size(plane, width, height);
            let stride = ffmpeg_frame.stride(plane);
            let data = ffmpeg_frame.data(plane);
            for y in 0..rows {
                let start = y * stride;
                frame
                    .row_mut(plane, y)
                    .copy_from_slice(&data[start..start + row_bytes]);
            }
        }

        Ok(Decoded::Frame(
            frame.with_pts(pts).with_keyframe(is_keyframe),
        ))
    }

    /**
        Convert the decoded frame to the fallback format, reusing the
        scaler while the source layout is unchanged.
    */
    fn convert_fallback(&mut self) -> Result<VideoFrameFFmpeg> {
        let key = ScalerKey {
            format: self.decoded.format(),
            width: self.decoded.width(),
            height: self.decoded.height(),
        };

        let needs_rebuild = self.fallback.as_ref().is_none_or(|(k, _)| *k != key);
        if needs_rebuild {
            debug!(format = ?key.format, "converting unsupported decoder output to yuv420p");
            let scaler = ScalingContext::get(
                key.format,
                key.width,
                key.height,
                Pixel::YUV420P,
                key.width,
                key.height,
                Flags::BICUBIC,
            )
            .map_err(|e| Error::decode_failed(format!("cannot convert {:?}: {e}", key.format)))?;
            self.fallback = Some((key, scaler));
        }

        let mut output = VideoFrameFFmpeg::empty();
        if let Some((_, scaler)) = self.fallback.as_mut() {
            scaler
                .run(&self.decoded, &mut output)
                .map_err(|e| Error::decode_failed(e.to_string()))?;
        }
        Ok(output)
    }
}

enum Converted<'a> {
    Native(&'a VideoFrameFFmpeg, PixelFormat),
    Scaled(VideoFrameFFmpeg, PixelFormat),
}

impl DecodeBackend for FfmpegVideoDecoder {
    fn send(&mut self, packet: Packet) -> Result<SendStatus> {
        let mut ffmpeg_pkt = ffmpeg_next::Packet::copy(&packet.data);
        ffmpeg_pkt.set_pts(packet.pts);
        ffmpeg_pkt.set_dts(packet.dts);
        ffmpeg_pkt.set_duration(packet.duration);

        // EAGAIN means the decoder buffer is full; frames must be received first
        match self.decoder.send_packet(&ffmpeg_pkt) {
            Ok(()) => Ok(SendStatus::Accepted),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                Ok(SendStatus::Full)
            }
            Err(e) => Err(Error::decode_rejected(e.to_string())),
        }
    }

    fn send_eof(&mut self) -> Result<()> {
        match self.decoder.send_eof() {
            // Already at EOF, that's fine
            Ok(()) | Err(ffmpeg_next::Error::Eof) => Ok(()),
            Err(e) => Err(Error::decode_failed(e.to_string())),
        }
    }

    fn receive(&mut self, pool: &mut FramePool) -> Result<Decoded> {
        match self.decoder.receive_frame(&mut self.decoded) {
            Ok(()) => self.copy_out(pool),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                Ok(Decoded::Pending)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(Decoded::EndOfStream),
            Err(e) => Err(Error::decode_failed(e.to_string())),
        }
    }
}

/**
    Factory for [`FfmpegVideoDecoder`] bound to one FFmpeg codec.
*/
pub struct FfmpegVideoFactory {
    id: codec::Id,
    name: String,
}

impl FfmpegVideoFactory {
    /**
        The factory for `codec`, if this FFmpeg build has a video decoder for it.
    */
    pub fn for_codec(codec: &CodecId) -> Option<Self> {
        let id = codec_id_to_ffmpeg(codec)?;
        if id.medium() != ffmpeg_next::media::Type::Video {
            return None;
        }
        let decoder = ffmpeg_next::decoder::find(id)?;
        Some(Self {
            id,
            name: decoder.name().to_string(),
        })
    }
}

impl DecoderFactory for FfmpegVideoFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn create(
        &self,
        stream: &StreamDescriptor,
        config: &DecoderConfig,
    ) -> Result<Box<dyn DecodeBackend>> {
        Ok(Box::new(FfmpegVideoDecoder::new(self.id, stream, config)?))
    }
}
