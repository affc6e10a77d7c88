use crate::frame::{CallEnvelope, FrameCodec, FrameDecodeError};
use std::collections::VecDeque;

/// Reassembles envelopes from a continuous byte stream.
///
/// Bytes may arrive split at any boundary; each call to [`read_bytes`]
/// appends to an internal buffer and yields every frame that became complete.
///
/// Any decode error poisons the decoder. The failing call yields that error,
/// buffered bytes are discarded, and every later call yields
/// [`FrameDecodeError::ReadAfterCorruption`]. Once framing is lost there is no
/// reliable way to find the next frame boundary, so the connection owning this
/// decoder should be closed.
///
/// [`read_bytes`]: EnvelopeStreamDecoder::read_bytes
#[derive(Default)]
pub struct EnvelopeStreamDecoder {
    buffer: Vec<u8>,
    is_corrupted: bool,
}

pub struct EnvelopeDecoderIterator {
    queue: VecDeque<Result<CallEnvelope, FrameDecodeError>>,
}

impl Iterator for EnvelopeDecoderIterator {
    type Item = Result<CallEnvelope, FrameDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_front()
    }
}

impl EnvelopeStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_corrupted(&self) -> bool {
        self.is_corrupted
    }

    /// Number of bytes held back waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn read_bytes(&mut self, data: &[u8]) -> EnvelopeDecoderIterator {
        let mut queue = VecDeque::new();

        if self.is_corrupted {
            queue.push_back(Err(FrameDecodeError::ReadAfterCorruption));
            return EnvelopeDecoderIterator { queue };
        }

        self.buffer.extend_from_slice(data);

        while !self.buffer.is_empty() {
            let total = match FrameCodec::frame_length(&self.buffer) {
                Ok(Some(total)) => total,
                Ok(None) => break,
                Err(e) => {
                    self.corrupt();
                    queue.push_back(Err(e));
                    break;
                }
            };

            if self.buffer.len() < total {
                break;
            }

            match FrameCodec::decode(&self.buffer[..total]) {
                Ok(envelope) => {
                    self.buffer.drain(..total);
                    queue.push_back(Ok(envelope));
                }
                Err(e) => {
                    self.corrupt();
                    queue.push_back(Err(e));
                    break;
                }
            }
        }

        EnvelopeDecoderIterator { queue }
    }

    fn corrupt(&mut self) {
        self.is_corrupted = true;
        self.buffer.clear();
    }
}
