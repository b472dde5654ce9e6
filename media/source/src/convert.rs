/*!
    Conversion utilities between ffmpeg-next types and media-types.
*/

use media_types::{CodecId, PixelFormat, Rational};

/**
    Convert ffmpeg_next::Rational to our Rational.
*/
pub fn rational_from_ffmpeg(r: ffmpeg_next::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

/**
    Convert our Rational to ffmpeg_next::Rational.
*/
pub fn rational_to_ffmpeg(r: Rational) -> ffmpeg_next::Rational {
    ffmpeg_next::Rational::new(r.num, r.den)
}

/**
    Convert ffmpeg_next pixel format to our PixelFormat.
*/
pub fn pixel_format_from_ffmpeg(format: ffmpeg_next::format::Pixel) -> Option<PixelFormat> {
    use ffmpeg_next::format::Pixel;

    match format {
        Pixel::GRAY8 => Some(PixelFormat::Gray8),
        // Full-range variants share the sample layout
        Pixel::YUV420P | Pixel::YUVJ420P => Some(PixelFormat::Yuv420p),
        Pixel::YUV422P | Pixel::YUVJ422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P | Pixel::YUVJ444P => Some(PixelFormat::Yuv444p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::BGR24 => Some(PixelFormat::Bgr24),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        _ => None,
    }
}

/**
    Convert our PixelFormat to the ffmpeg_next pixel format.
*/
pub fn pixel_format_to_ffmpeg(format: PixelFormat) -> ffmpeg_next::format::Pixel {
    use ffmpeg_next::format::Pixel;

    match format {
        PixelFormat::Gray8 => Pixel::GRAY8,
        PixelFormat::Yuv420p => Pixel::YUV420P,
        PixelFormat::Yuv422p => Pixel::YUV422P,
        PixelFormat::Yuv444p => Pixel::YUV444P,
        PixelFormat::Nv12 => Pixel::NV12,
        PixelFormat::Rgb24 => Pixel::RGB24,
        PixelFormat::Bgr24 => Pixel::BGR24,
        PixelFormat::Rgba => Pixel::RGBA,
        PixelFormat::Bgra => Pixel::BGRA,
        _ => Pixel::None,
    }
}

/**
    Convert ffmpeg_next codec ID to our CodecId.
*/
pub fn codec_id_from_ffmpeg(id: ffmpeg_next::codec::Id) -> CodecId {
    use ffmpeg_next::codec::Id;

    match id {
        // Video
        Id::RAWVIDEO => CodecId::RawVideo,
        Id::H264 => CodecId::H264,
        Id::HEVC => CodecId::Hevc,
        Id::VP8 => CodecId::Vp8,
        Id::VP9 => CodecId::Vp9,
        Id::AV1 => CodecId::Av1,
        Id::MPEG4 => CodecId::Mpeg4,
        Id::MPEG2VIDEO => CodecId::Mpeg2Video,
        Id::MJPEG => CodecId::Mjpeg,
        // Audio
        Id::AAC => CodecId::Aac,
        Id::MP3 => CodecId::Mp3,
        Id::OPUS => CodecId::Opus,
        Id::VORBIS => CodecId::Vorbis,
        Id::FLAC => CodecId::Flac,
        other => CodecId::from_name(&codec_name(other)),
    }
}

/**
    Convert our CodecId to the ffmpeg_next codec ID, if FFmpeg knows it.
*/
pub fn codec_id_to_ffmpeg(id: &CodecId) -> Option<ffmpeg_next::codec::Id> {
    use ffmpeg_next::codec::Id;

    let id = match id {
        CodecId::RawVideo => Id::RAWVIDEO,
        CodecId::H264 => Id::H264,
        CodecId::Hevc => Id::HEVC,
        CodecId::Vp8 => Id::VP8,
        CodecId::Vp9 => Id::VP9,
        CodecId::Av1 => Id::AV1,
        CodecId::Mpeg4 => Id::MPEG4,
        CodecId::Mpeg2Video => Id::MPEG2VIDEO,
        CodecId::Mjpeg => Id::MJPEG,
        CodecId::Aac => Id::AAC,
        CodecId::Mp3 => Id::MP3,
        CodecId::Opus => Id::OPUS,
        CodecId::Vorbis => Id::VORBIS,
        CodecId::Flac => Id::FLAC,
        CodecId::Pcm => Id::PCM_S16LE,
        CodecId::Unknown(name) => {
            return ffmpeg_next::decoder::find_by_name(name).map(|codec| codec.id());
        }
        _ => return None,
    };
    Some(id)
}

/**
    FFmpeg's short name for a codec id.
*/
pub fn codec_name(id: ffmpeg_next::codec::Id) -> String {
    id.name().to_string()
}
