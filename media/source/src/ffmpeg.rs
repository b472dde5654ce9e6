/*!
    FFmpeg-backed demuxer for general containers.
*/

use std::path::Path;
use std::time::Duration;

use ffmpeg_next::{format::context::Input as InputContext, media::Type};
use tracing::debug;

use media_types::{
    Error, MediaKind, Packet, Rational, Result, SourceInfo, StreamDescriptor, StreamParams,
};

use crate::convert::{codec_id_from_ffmpeg, pixel_format_from_ffmpeg, rational_from_ffmpeg};
use crate::source::{Demux, SourceConfig};

/**
    Demuxer for every container FFmpeg can open.
*/
pub struct FfmpegDemuxer {
    input: InputContext,
    format_name: String,
}

impl FfmpegDemuxer {
    /**
        Open `path`, reading at most `config.probe_size` bytes ahead.
    */
    pub fn open(path: &Path, config: &SourceConfig) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::open_failed(e.to_string()))?;

        let mut options = ffmpeg_next::Dictionary::new();
        if let Some(size) = config.probe_size {
            options.set("probesize", &size.to_string());
        }

        let input = ffmpeg_next::format::input_with_dictionary(&path, options)
            .map_err(|e| Error::open_failed(format!("{}: {e}", path.display())))?;
        let format_name = input.format().name().to_string();
        debug!(path = %path.display(), format = %format_name, "opened container");

        Ok(Self { input, format_name })
    }
}

impl Demux for FfmpegDemuxer {
    fn format_name(&self) -> &str {
        &self.format_name
    }

    fn discover(&mut self) -> Result<SourceInfo> {
        let streams: Vec<_> = self
            .input
            .streams()
            .map(|stream| describe_stream(&self.input, &stream))
            .collect();

        let duration = if self.input.duration() > 0 {
            Some(Duration::from_micros(self.input.duration() as u64))
        } else {
            streams.iter().find_map(|s| s.duration)
        };
        // SAFETY: the format context stays valid for the lifetime of `self.input`
        let bit_rate = unsafe { (*self.input.as_ptr()).bit_rate };
        let bitrate = (bit_rate > 0).then_some(bit_rate as u64);

        Ok(SourceInfo::new(self.format_name.clone(), streams)
            .with_duration(duration)
            .with_bitrate(bitrate))
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let Some((stream, ffmpeg_packet)) = self.input.packets().next() else {
            return Ok(None);
        };

        let data = ffmpeg_packet.data().map(|d| d.to_vec()).unwrap_or_default();

        Ok(Some(
            Packet::new(data, stream.index())
                .with_timestamps(ffmpeg_packet.pts(), ffmpeg_packet.dts())
                .with_duration(ffmpeg_packet.duration())
                .with_keyframe(ffmpeg_packet.is_key()),
        ))
    }
}

/**
    Build a descriptor from one stream's codec parameters.
*/
fn describe_stream(input: &InputContext, stream: &ffmpeg_next::Stream) -> StreamDescriptor {
    let time_base = rational_from_ffmpeg(stream.time_base());

    // Get duration from stream or container
    let duration = if stream.duration() > 0 {
        let seconds = stream.duration() as f64 * time_base.to_f64();
        Some(Duration::from_secs_f64(seconds))
    } else if input.duration() > 0 {
        Some(Duration::from_micros(input.duration() as u64))
    } else {
        None
    };

    let frame_rate = if stream.avg_frame_rate().numerator() != 0 {
        Some(rational_from_ffmpeg(stream.avg_frame_rate()))
    } else if stream.rate().numerator() != 0 {
        Some(rational_from_ffmpeg(stream.rate()))
    } else {
        None
    };

    let codec_id = codec_id_from_ffmpeg(stream.parameters().id());

    let (kind, params) = match stream.parameters().medium() {
        Type::Video => (MediaKind::Video, video_params(stream)),
        Type::Audio => (MediaKind::Audio, audio_params(stream)),
        _ => (MediaKind::Other, StreamParams::Other),
    };

    // SAFETY: We're reading from a valid AVCodecParameters pointer that FFmpeg owns
    let (extradata, bitrate) = unsafe {
        let ptr = stream.parameters().as_ptr();

        let extradata = if (*ptr).extradata_size > 0 && !(*ptr).extradata.is_null() {
            let slice =
                std::slice::from_raw_parts((*ptr).extradata, (*ptr).extradata_size as usize);
            Some(slice.to_vec())
        } else {
            None
        };

        let bitrate = ((*ptr).bit_rate > 0).then(|| (*ptr).bit_rate as u64);

        (extradata, bitrate)
    };

    StreamDescriptor {
        index: stream.index(),
        kind,
        codec_id,
        params,
        time_base: if time_base.den == 0 {
            Rational::new(1, 1)
        } else {
            time_base
        },
        frame_rate: frame_rate.filter(|_| kind == MediaKind::Video),
        bitrate,
        duration,
        extradata,
    }
}

fn video_params(stream: &ffmpeg_next::Stream) -> StreamParams {
    let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
        .and_then(|ctx| ctx.decoder().video());

    match decoder {
        Ok(decoder) => StreamParams::Video {
            width: decoder.width(),
            height: decoder.height(),
            pixel_format: pixel_format_from_ffmpeg(decoder.format()),
        },
        Err(e) => {
            debug!(index = stream.index(), error = %e, "no video parameters");
            StreamParams::Video {
                width: 0,
                height: 0,
                pixel_format: None,
            }
        }
    }
}

fn audio_params(stream: &ffmpeg_next::Stream) -> StreamParams {
    let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
        .and_then(|ctx| ctx.decoder().audio());

    match decoder {
        Ok(decoder) => StreamParams::Audio {
            channels: decoder.channels(),
            sample_rate: decoder.rate(),
        },
        Err(e) => {
            debug!(index = stream.index(), error = %e, "no audio parameters");
            StreamParams::Audio {
                channels: 0,
                sample_rate: 0,
            }
        }
    }
}
