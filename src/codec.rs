//! # Track Codec
//!
//! Binary encoding of [`AudioTrack`] handles so they can outlive the process
//! (durable cache entries, session snapshots).
//!
//! Nothing here returns an error. A handle that cannot be represented encodes
//! to `None`, bytes that cannot be read decode to `None`, and the batch
//! helpers drop those entries and keep going so one bad track never blocks
//! the rest.
//!
//! ## Layout
//!
//! ```text
//! u8   version (1)
//! u8   flags (bit 0: stream, bit 1: uri present)
//! str  title
//! str  author
//! u64  length in ms
//! str  identifier
//! str  uri            (only with flag bit 1)
//! str  source name
//! ```
//!
//! `str` is a big-endian `u16` byte length followed by UTF-8.

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use crate::sources::{registry, AudioTrack, TrackInfo};

const VERSION: u8 = 1;
const FLAG_STREAM: u8 = 0b01;
const FLAG_URI: u8 = 0b10;
const KNOWN_FLAGS: u8 = FLAG_STREAM | FLAG_URI;

/// Encodes one track, or `None` when it cannot be represented.
pub fn encode(track: &AudioTrack) -> Option<Vec<u8>> {
    let info = track.info();

    if registry::by_name(&info.source).is_none() {
        debug!("🚫 Track con fuente no registrada '{}', no se codifica", info.source);
        return None;
    }

    let mut flags = 0;
    if info.is_stream {
        flags |= FLAG_STREAM;
    }
    if info.uri.is_some() {
        flags |= FLAG_URI;
    }

    let mut buf = BytesMut::with_capacity(64 + info.title.len() + info.identifier.len());
    buf.put_u8(VERSION);
    buf.put_u8(flags);
    put_str(&mut buf, &info.title)?;
    put_str(&mut buf, &info.author)?;
    buf.put_u64(info.length_ms);
    put_str(&mut buf, &info.identifier)?;
    if let Some(uri) = &info.uri {
        put_str(&mut buf, uri)?;
    }
    put_str(&mut buf, &info.source)?;

    Some(buf.to_vec())
}

/// Encodes every track independently, dropping the ones that fail.
///
/// Returns `None` only for an empty input.
pub fn encode_all(tracks: &[AudioTrack]) -> Option<Vec<Vec<u8>>> {
    if tracks.is_empty() {
        return None;
    }
    Some(tracks.iter().filter_map(encode).collect())
}

/// Decodes one track, or `None` when the bytes are not a valid handle.
pub fn decode(bytes: &[u8]) -> Option<AudioTrack> {
    let mut buf = bytes;

    if buf.remaining() < 2 {
        return None;
    }
    if buf.get_u8() != VERSION {
        return None;
    }
    let flags = buf.get_u8();
    if flags & !KNOWN_FLAGS != 0 {
        return None;
    }

    let title = get_str(&mut buf)?;
    let author = get_str(&mut buf)?;
    if buf.remaining() < 8 {
        return None;
    }
    let length_ms = buf.get_u64();
    let identifier = get_str(&mut buf)?;
    let uri = if flags & FLAG_URI != 0 {
        Some(get_str(&mut buf)?)
    } else {
        None
    };
    let source = get_str(&mut buf)?;

    if buf.has_remaining() || registry::by_name(&source).is_none() {
        return None;
    }

    Some(AudioTrack::new(TrackInfo {
        title,
        author,
        length_ms,
        identifier,
        is_stream: flags & FLAG_STREAM != 0,
        uri,
        source,
    }))
}

/// Decodes every blob independently, dropping the ones that fail.
///
/// Returns `None` only for an empty input.
pub fn decode_all<B: AsRef<[u8]>>(blobs: &[B]) -> Option<Vec<AudioTrack>> {
    if blobs.is_empty() {
        return None;
    }
    Some(blobs.iter().filter_map(|blob| decode(blob.as_ref())).collect())
}

fn put_str(buf: &mut BytesMut, value: &str) -> Option<()> {
    let len = u16::try_from(value.len()).ok()?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Some(())
}

fn get_str(buf: &mut &[u8]) -> Option<String> {
    if buf.remaining() < 2 {
        return None;
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return None;
    }
    let value = std::str::from_utf8(&buf[..len]).ok()?.to_string();
    buf.advance(len);
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support::track;
    use pretty_assertions::assert_eq;

    fn local_file_track() -> AudioTrack {
        let mut info = track("youtube", "x", "Local").info().clone();
        info.source = "local".to_string();
        AudioTrack::new(info)
    }

    #[test]
    fn test_decode_restores_the_same_handle() {
        let original = track("youtube", "dQw4w9WgXcQ", "Never Gonna Give You Up");
        let bytes = encode(&original).expect("representable");
        assert_eq!(decode(&bytes), Some(original));
    }

    #[test]
    fn test_stream_without_uri() {
        let mut info = track("twitch", "someone", "Live").info().clone();
        info.is_stream = true;
        info.uri = None;
        let original = AudioTrack::new(info);

        let decoded = decode(&encode(&original).expect("representable")).expect("decodable");
        assert!(decoded.info().is_stream);
        assert_eq!(decoded.info().uri, None);
    }

    #[test]
    fn test_unregistered_source_is_unrepresentable() {
        assert_eq!(encode(&local_file_track()), None);
    }

    #[test]
    fn test_oversized_string_is_unrepresentable() {
        let mut info = track("youtube", "x", "t").info().clone();
        info.title = "a".repeat(u16::MAX as usize + 1);
        assert_eq!(encode(&AudioTrack::new(info)), None);
    }

    #[test]
    fn test_encode_all_drops_failures() {
        let tracks = vec![
            track("youtube", "a", "A"),
            local_file_track(),
            track("soundcloud", "b", "B"),
        ];
        let encoded = encode_all(&tracks).expect("non-empty input");
        assert_eq!(encoded.len(), 2);

        let decoded = decode_all(&encoded).expect("non-empty input");
        assert_eq!(decoded, vec![tracks[0].clone(), tracks[2].clone()]);
    }

    #[test]
    fn test_empty_batches_yield_nothing() {
        assert_eq!(encode_all(&[]), None);
        assert_eq!(decode_all::<Vec<u8>>(&[]), None);
        assert_eq!(encode_all(&[local_file_track()]), Some(Vec::new()));
    }

    #[test]
    fn test_corrupt_bytes_are_rejected() {
        let bytes = encode(&track("youtube", "a", "A")).expect("representable");

        // truncated
        assert_eq!(decode(&bytes[..bytes.len() - 1]), None);
        // trailing garbage
        let mut longer = bytes.clone();
        longer.push(0);
        assert_eq!(decode(&longer), None);
        // unknown version
        let mut versioned = bytes.clone();
        versioned[0] = 9;
        assert_eq!(decode(&versioned), None);
        // unknown flag
        let mut flagged = bytes.clone();
        flagged[1] |= 0b100;
        assert_eq!(decode(&flagged), None);

        assert_eq!(decode(&[]), None);
        let decoded = decode_all(&[bytes, vec![1, 2, 3]]).expect("non-empty input");
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(VERSION);
        buf.put_u8(0);
        buf.put_u16(2);
        buf.put_slice(&[0xff, 0xfe]);
        assert_eq!(decode(&buf), None);
    }
}
