//! Byte supply for the decoder element
//!
//! A [`TrackStream`] owns the stream cursor of one track selection. Selecting
//! a track builds a fresh stream (cursor at zero) and hands it to the
//! pipeline, so the cursor has exactly one owner: the callback the engine
//! invokes.

use super::tracks::TrackDescriptor;
use crate::pipeline::{ByteSource, ReadOutcome};
use tracing::{debug, trace};

/// Read position inside one track
///
/// Always within `[0, len]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamCursor {
    pos: usize,
}

impl StreamCursor {
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Track-streaming callback over one [`TrackDescriptor`]
#[derive(Debug)]
pub struct TrackStream {
    track: TrackDescriptor,
    cursor: StreamCursor,
    done_reported: bool,
}

impl TrackStream {
    pub fn new(track: TrackDescriptor) -> Self {
        Self {
            track,
            cursor: StreamCursor::default(),
            done_reported: false,
        }
    }

    pub fn cursor(&self) -> StreamCursor {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.track.len() - self.cursor.pos
    }

    /// Copy the next chunk into `buf` and advance the cursor
    ///
    /// Returns `Done` once every byte has been delivered. A zero-length
    /// buffer yields `Data(0)` and leaves the cursor alone.
    pub fn next_chunk(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let remaining = self.remaining();
        if remaining == 0 {
            if !self.done_reported {
                debug!("End of {} track at {} bytes", self.track.tier, self.cursor.pos);
                self.done_reported = true;
            }
            return ReadOutcome::Done;
        }

        let n = remaining.min(buf.len());
        let start = self.cursor.pos;
        buf[..n].copy_from_slice(&self.track.bytes[start..start + n]);
        self.cursor.pos += n;
        trace!("Supplied {} bytes, cursor {}", n, self.cursor.pos);
        ReadOutcome::Data(n)
    }
}

impl ByteSource for TrackStream {
    fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        self.next_chunk(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::tracks::RateTier;

    static T1: [u8; 50] = [7; 50];

    fn stream() -> TrackStream {
        TrackStream::new(TrackDescriptor::new(RateTier::Medium, &T1))
    }

    #[test]
    fn test_never_returns_more_than_requested() {
        let mut stream = stream();
        let mut buf = [0u8; 16];

        let mut total = 0;
        let mut chunks = Vec::new();
        while let ReadOutcome::Data(n) = stream.next_chunk(&mut buf) {
            assert!(n <= buf.len());
            assert!(stream.cursor().position() <= 50);
            total += n;
            chunks.push(n);
        }
        assert_eq!(total, 50);
        assert_eq!(chunks, vec![16, 16, 16, 2]);
    }

    #[test]
    fn test_done_only_after_all_bytes() {
        let mut stream = stream();
        let mut buf = [0u8; 50];

        assert_eq!(stream.next_chunk(&mut buf), ReadOutcome::Data(50));
        assert_eq!(buf, T1);
        assert_eq!(stream.remaining(), 0);
        assert_eq!(stream.next_chunk(&mut buf), ReadOutcome::Done);
        assert_eq!(stream.next_chunk(&mut buf), ReadOutcome::Done);
        assert_eq!(stream.cursor().position(), 50);
    }

    #[test]
    fn test_empty_buffer_does_not_advance() {
        let mut stream = stream();
        assert_eq!(stream.next_chunk(&mut []), ReadOutcome::Data(0));
        assert_eq!(stream.cursor().position(), 0);
    }

    #[test]
    fn test_empty_track_is_done_immediately() {
        static EMPTY: [u8; 0] = [];
        let mut stream = TrackStream::new(TrackDescriptor::new(RateTier::Low, &EMPTY));
        let mut buf = [0u8; 8];
        assert_eq!(stream.next_chunk(&mut buf), ReadOutcome::Done);
    }
}
