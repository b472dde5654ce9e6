/*!
    The interface between the decoder engine and codec implementations.
*/

use media_types::{Packet, Result, VideoFrame};

use crate::pool::FramePool;

/**
    Outcome of one `receive` call.

    `Pending` and `EndOfStream` are protocol states, not errors.
*/
#[derive(Debug)]
pub enum Decoded {
    /// One decoded frame.
    Frame(VideoFrame),
    /// No frame yet; submit more packets first.
    Pending,
    /// Everything has been flushed and the last frame was already returned.
    EndOfStream,
}

impl Decoded {
    pub fn into_frame(self) -> Option<VideoFrame> {
        match self {
            Self::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

/**
    Whether a backend took a packet.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    Accepted,
    /// The input queue is full; the packet was not taken. Receive frames first.
    Full,
}

/**
    A codec implementation driven by [`crate::VideoDecoder`].

    Backends never see packets of other streams and are never called after
    `receive` returned `EndOfStream`.
*/
pub trait DecodeBackend: Send {
    /// Queue one packet for decoding.
    fn send(&mut self, packet: Packet) -> Result<SendStatus>;

    /// Signal that no more packets will follow.
    fn send_eof(&mut self) -> Result<()>;

    /// Produce the next frame, allocating its planes from `pool`.
    fn receive(&mut self, pool: &mut FramePool) -> Result<Decoded>;
}
