//! Validating decoder for the fanotify record stream.
//!
//! A single read from the notification descriptor returns a buffer of
//! fixed-header, self-describing records. Each carries a version tag, its
//! total length, an object descriptor (or the kernel's "no fd" sentinel),
//! an event mask and the originating pid. No field is interpreted before
//! the version and length have been checked.

use std::os::fd::{FromRawFd, OwnedFd};

use nix::libc;
use nix::sys::fanotify::MaskFlags;

use super::RawEvent;

/// Record header size; every record is at least this long.
const HEADER_LEN: usize = std::mem::size_of::<libc::fanotify_event_metadata>();

/// A record that could not be decoded. The rest of the buffer it arrived in
/// is abandoned; the next wait cycle starts clean.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(
        "fanotify metadata version mismatch (got {got}, expected {})",
        libc::FANOTIFY_METADATA_VERSION
    )]
    VersionMismatch { got: u8 },

    #[error("fanotify record reports length {len} but only {remaining} bytes remain")]
    TruncatedRecord { len: usize, remaining: usize },
}

/// The outcome of decoding one buffer: every record successfully decoded
/// before the first bad one, plus the error if there was one.
#[derive(Debug, Default)]
pub struct Batch {
    pub events: Vec<RawEvent>,
    pub error: Option<DecodeError>,
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_ne_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u64(b: &[u8]) -> u64 {
    u64::from_ne_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

fn read_i32(b: &[u8]) -> i32 {
    i32::from_ne_bytes([b[0], b[1], b[2], b[3]])
}

/// Decode every record in `buf`.
///
/// Advances by each record's reported length. A zero length ends the batch;
/// a version mismatch or a length that lies outside the buffer stops
/// decoding immediately, keeping the records already decoded.
pub fn decode_batch(buf: &[u8]) -> Batch {
    let mut batch = Batch::default();
    let mut offset = 0;

    while buf.len() - offset >= HEADER_LEN {
        let record = &buf[offset..];
        let event_len = read_u32(&record[0..4]) as usize;
        let version = record[4];

        if version != libc::FANOTIFY_METADATA_VERSION {
            batch.error = Some(DecodeError::VersionMismatch { got: version });
            return batch;
        }
        if event_len == 0 {
            // End-of-batch sentinel.
            return batch;
        }
        if event_len < HEADER_LEN || event_len > buf.len() - offset {
            batch.error = Some(DecodeError::TruncatedRecord {
                len: event_len,
                remaining: buf.len() - offset,
            });
            return batch;
        }

        let mask = read_u64(&record[8..16]);
        let fd = read_i32(&record[16..20]);
        let pid = read_i32(&record[20..24]);

        // SAFETY: the kernel hands out a fresh descriptor per content-class
        // event; taking ownership here is what guarantees it is closed
        // exactly once.
        let handle = (fd >= 0).then(|| unsafe { OwnedFd::from_raw_fd(fd) });

        batch
            .events
            .push(RawEvent::new(MaskFlags::from_bits_truncate(mask), pid, handle));

        offset += event_len;
    }

    batch
}
