/*!
    Video decoder engine.
*/

use std::fmt;

use tracing::{debug, info, trace};

use media_types::{Error, Packet, Result, StreamDescriptor, VideoFrame};

use crate::backend::{DecodeBackend, Decoded, SendStatus};
use crate::config::DecoderConfig;
use crate::pool::FramePool;
use crate::registry::CodecRegistry;

/// Frames kept for reuse after `recycle`.
const POOL_CAPACITY: usize = 4;

/**
    Lifecycle of a [`VideoDecoder`].

    `Idle → Ready → Draining → Closed`. `close` moves any state to `Closed`.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    /// Created, codec not opened yet.
    Idle,
    /// Codec opened; accepts packets.
    Ready,
    /// End of stream signaled; buffered frames are being drained.
    Draining,
    /// Fully drained or torn down.
    Closed,
}

impl fmt::Display for DecoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/**
    Counters kept by a decoder over its lifetime.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Packets handed to the codec.
    pub packets_submitted: u64,
    /// Packets of other streams, discarded without reaching the codec.
    pub packets_ignored: u64,
    /// Frames returned by `receive`.
    pub frames_received: u64,
}

/**
    Video decoder.

    Decodes the packets of one stream into frames using the two-phase
    protocol: after every [`submit`](Self::submit), call
    [`receive`](Self::receive) until it returns [`Decoded::Pending`]; once
    the input is exhausted, call [`flush`](Self::flush) and keep receiving
    until [`Decoded::EndOfStream`].

    Frames carry sequence numbers starting at 1, assigned in the order
    they are received.

    # Example

    ```ignore
    let mut decoder = open_decoder(&Registry::builtin(), stream, DecoderConfig::default())?;
    for packet in source {
        decoder.submit(packet?)?;
        while let Decoded::Frame(frame) = decoder.receive()? {
            handle(&frame);
            decoder.recycle(frame);
        }
    }
    decoder.flush()?;
    while let Decoded::Frame(frame) = decoder.receive()? {
        handle(&frame);
    }
    ```
*/
pub struct VideoDecoder {
    stream: StreamDescriptor,
    config: DecoderConfig,
    state: DecoderState,
    backend: Option<Box<dyn DecodeBackend>>,
    pool: FramePool,
    next_sequence: u64,
    stats: DecoderStats,
}

impl VideoDecoder {
    /**
        Create a decoder for `stream`. The codec is not opened until [`open`](Self::open).
    */
    pub fn new(stream: StreamDescriptor, config: DecoderConfig) -> Self {
        Self {
            stream,
            config,
            state: DecoderState::Idle,
            backend: None,
            pool: FramePool::new(POOL_CAPACITY),
            next_sequence: 1,
            stats: DecoderStats::default(),
        }
    }

    /**
        Look up the codec in `registry` and open it.

        Returns [`Error::UnsupportedCodec`] if the registry has no decoder
        for the stream's codec.
    */
    pub fn open(&mut self, registry: &dyn CodecRegistry) -> Result<()> {
        if self.state != DecoderState::Idle {
            return Err(Error::open_failed(format!(
                "decoder for stream {} is already {}",
                self.stream.index, self.state
            )));
        }

        let factory = registry
            .find_decoder(&self.stream.codec_id)
            .ok_or_else(|| Error::UnsupportedCodec(self.stream.codec_id.clone()))?;
        let backend = factory.create(&self.stream, &self.config)?;

        info!(
            stream = self.stream.index,
            codec = %self.stream.codec_id,
            decoder = factory.name(),
            "opened decoder"
        );

        self.backend = Some(backend);
        self.state = DecoderState::Ready;
        Ok(())
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /**
        Feed one packet to the decoder.

        Packets of other streams are counted and discarded; this is not an
        error. Fails with [`Error::DecodeRejected`] unless the decoder is
        `Ready`, or if the codec cannot take more input before frames are
        received.
    */
    pub fn submit(&mut self, packet: Packet) -> Result<()> {
        if packet.stream_index != self.stream.index {
            trace!(
                stream = packet.stream_index,
                selected = self.stream.index,
                "ignoring packet of another stream"
            );
            self.stats.packets_ignored += 1;
            return Ok(());
        }

        let backend = match (self.state, self.backend.as_mut()) {
            (DecoderState::Ready, Some(backend)) => backend,
            _ => {
                return Err(Error::decode_rejected(format!(
                    "decoder is {}",
                    self.state
                )));
            }
        };

        trace!(pts = ?packet.pts, size = packet.len(), "submitting packet");
        match backend.send(packet)? {
            SendStatus::Accepted => {
                self.stats.packets_submitted += 1;
                Ok(())
            }
            SendStatus::Full => Err(Error::decode_rejected(
                "input queue is full; receive frames before submitting more",
            )),
        }
    }

    /**
        Fetch the next decoded frame.

        Returns [`Decoded::Pending`] when more input is needed and
        [`Decoded::EndOfStream`] once a flushed decoder has returned its
        last frame. After that the decoder is `Closed` and every further
        call returns `EndOfStream` again.
    */
    pub fn receive(&mut self) -> Result<Decoded> {
        let backend = match (self.state, self.backend.as_mut()) {
            (DecoderState::Closed, _) => return Ok(Decoded::EndOfStream),
            (DecoderState::Ready | DecoderState::Draining, Some(backend)) => backend,
            _ => {
                return Err(Error::decode_failed(format!(
                    "decoder is {}",
                    self.state
                )));
            }
        };

        match backend.receive(&mut self.pool)? {
            Decoded::Frame(mut frame) => {
                frame.sequence = self.next_sequence;
                self.next_sequence += 1;
                self.stats.frames_received += 1;
                trace!(sequence = frame.sequence, pts = ?frame.pts, "received frame");
                Ok(Decoded::Frame(frame))
            }
            Decoded::Pending if self.state == DecoderState::Draining => Err(Error::decode_failed(
                "decoder asked for more input after end of stream",
            )),
            Decoded::Pending => Ok(Decoded::Pending),
            Decoded::EndOfStream => {
                debug!(stream = self.stream.index, "decoder drained");
                self.shutdown();
                Ok(Decoded::EndOfStream)
            }
        }
    }

    /**
        Signal end of input so buffered frames are released.

        Keep calling [`receive`](Self::receive) until it returns
        `EndOfStream`. Flushing again while draining, or after the decoder
        closed, does nothing.
    */
    pub fn flush(&mut self) -> Result<()> {
        match (self.state, self.backend.as_mut()) {
            (DecoderState::Ready, Some(backend)) => {
                backend.send_eof()?;
                debug!(stream = self.stream.index, "flushing decoder");
                self.state = DecoderState::Draining;
                Ok(())
            }
            (DecoderState::Draining | DecoderState::Closed, _) => Ok(()),
            _ => Err(Error::decode_rejected(format!(
                "cannot flush a decoder that is {}",
                self.state
            ))),
        }
    }

    /**
        Hand a frame's buffers back for reuse by later frames.
    */
    pub fn recycle(&mut self, frame: VideoFrame) {
        if self.state != DecoderState::Closed {
            self.pool.release(frame);
        }
    }

    /**
        Tear the decoder down. Safe to call in any state, any number of times.
    */
    pub fn close(&mut self) {
        if self.state == DecoderState::Closed && self.backend.is_none() {
            return;
        }
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.backend = None;
        self.pool.clear();
        self.state = DecoderState::Closed;
        info!(
            stream = self.stream.index,
            submitted = self.stats.packets_submitted,
            ignored = self.stats.packets_ignored,
            frames = self.stats.frames_received,
            "closed decoder"
        );
    }
}

impl fmt::Debug for VideoDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("stream", &self.stream.index)
            .field("codec", &self.stream.codec_id)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        self.close();
    }
}

/**
    Create and open a decoder in one step.
*/
pub fn open_decoder(
    registry: &dyn CodecRegistry,
    stream: StreamDescriptor,
    config: DecoderConfig,
) -> Result<VideoDecoder> {
    let mut decoder = VideoDecoder::new(stream, config);
    decoder.open(registry)?;
    Ok(decoder)
}
