/*!
    In-memory demuxer for synthetic sources.
*/

use std::collections::VecDeque;

use media_types::{
    CodecId, Packet, PixelFormat, Rational, Result, SourceInfo, StreamDescriptor,
};

use crate::source::Demux;

/**
    A demuxer that replays a fixed list of packets.

    The stream table is handed out unchanged on discovery, and packets are
    produced in the order they were given.
*/
#[derive(Clone, Debug)]
pub struct MemoryDemuxer {
    info: SourceInfo,
    packets: VecDeque<Packet>,
}

impl MemoryDemuxer {
    pub fn new(info: SourceInfo, packets: Vec<Packet>) -> Self {
        Self {
            info,
            packets: packets.into(),
        }
    }

    /**
        A single raw video stream with `count` frames of a moving gradient.

        Every packet holds one tightly packed `format` picture; packet `i`
        has `pts = dts = i` in a time base of one frame.
    */
    pub fn raw_video(
        width: u32,
        height: u32,
        format: PixelFormat,
        frame_rate: Rational,
        count: usize,
    ) -> Self {
        let stream =
            StreamDescriptor::video(0, CodecId::RawVideo, width, height, Some(format), frame_rate);
        let packets = (0..count)
            .map(|i| {
                Packet::new(gradient(width, height, format, i), 0)
                    .with_timestamps(Some(i as i64), Some(i as i64))
                    .with_duration(1)
                    .with_keyframe(true)
            })
            .collect();

        Self::new(SourceInfo::new("memory", vec![stream]), packets)
    }

    /**
        Append a packet after the current ones.
    */
    pub fn push(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

/**
    A packed picture whose samples vary with position and frame number.
*/
pub fn gradient(width: u32, height: u32, format: PixelFormat, frame: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(format.frame_size(width, height));
    for plane in 0..format.plane_count() {
        let (row_bytes, rows) = format.plane_size(plane, width, height);
        for y in 0..rows {
            data.extend((0..row_bytes).map(|x| (x + 2 * y + 3 * frame + 64 * plane) as u8));
        }
    }
    data
}

impl Demux for MemoryDemuxer {
    fn format_name(&self) -> &str {
        &self.info.format_name
    }

    fn discover(&mut self) -> Result<SourceInfo> {
        Ok(self.info.clone())
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        Ok(self.packets.pop_front())
    }
}
