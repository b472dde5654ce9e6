/*!
    Compressed packets as produced by a demuxer.
*/

/**
    One demultiplexed chunk of encoded data belonging to one stream.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Encoded payload.
    pub data: Vec<u8>,
    /// Index of the owning stream in the source.
    pub stream_index: usize,
    /// Presentation timestamp, in the stream's time base.
    pub pts: Option<i64>,
    /// Decode timestamp, in the stream's time base.
    pub dts: Option<i64>,
    /// Duration in the stream's time base, zero when unknown.
    pub duration: i64,
    pub is_keyframe: bool,
}

impl Packet {
    pub fn new(data: Vec<u8>, stream_index: usize) -> Self {
        Self {
            data,
            stream_index,
            pts: None,
            dts: None,
            duration: 0,
            is_keyframe: false,
        }
    }

    /**
        Set presentation and decode timestamps.
    */
    pub fn with_timestamps(mut self, pts: Option<i64>, dts: Option<i64>) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_keyframe(mut self, is_keyframe: bool) -> Self {
        self.is_keyframe = is_keyframe;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
