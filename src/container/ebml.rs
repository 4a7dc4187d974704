//! EBML primitives
//!
//! Variable-length integers, element headers and a tiny element writer for the
//! subset of Matroska/WebM that the duration repair needs.
//!
//! Layout of an element:
//!
//! ```text
//! +-------------+----------------+------------------+
//! | ID (1-4 B)  | size vint 1-8 B| payload (size B) |
//! +-------------+----------------+------------------+
//! ```
//!
//! The number of leading zero bits in the first byte of a vint gives its
//! width. A size whose value bits are all ones means "unknown size", which
//! streaming muxers use for `Segment` and `Cluster`.

use super::ContainerError;

/// EBML header
pub const EBML_HEADER: u32 = 0x1A45_DFA3;
/// Top-level Segment
pub const SEGMENT: u32 = 0x1853_8067;
/// Segment/SeekHead
pub const SEEK_HEAD: u32 = 0x114D_9B74;
/// SeekHead/Seek
pub const SEEK: u32 = 0x4DBB;
/// Seek/SeekID
pub const SEEK_ID: u32 = 0x53AB;
/// Seek/SeekPosition
pub const SEEK_POSITION: u32 = 0x53AC;
/// Segment/Info
pub const INFO: u32 = 0x1549_A966;
/// Info/TimecodeScale
pub const TIMECODE_SCALE: u32 = 0x2A_D7B1;
/// Info/Duration
pub const DURATION: u32 = 0x4489;
/// Info/MuxingApp
pub const MUXING_APP: u32 = 0x4D80;
/// Info/WritingApp
pub const WRITING_APP: u32 = 0x5741;
/// Segment/Tracks
pub const TRACKS: u32 = 0x1654_AE6B;
/// Tracks/TrackEntry
pub const TRACK_ENTRY: u32 = 0xAE;
/// TrackEntry/TrackNumber
pub const TRACK_NUMBER: u32 = 0xD7;
/// TrackEntry/TrackType
pub const TRACK_TYPE: u32 = 0x83;
/// TrackEntry/CodecID
pub const CODEC_ID: u32 = 0x86;
/// Segment/Cluster
pub const CLUSTER: u32 = 0x1F43_B675;
/// Cluster/Timecode
pub const CLUSTER_TIMECODE: u32 = 0xE7;
/// Cluster/SimpleBlock
pub const SIMPLE_BLOCK: u32 = 0xA3;
/// Segment/Cues
pub const CUES: u32 = 0x1C53_BB6B;
/// Cues/CuePoint
pub const CUE_POINT: u32 = 0xBB;
/// CuePoint/CueTrackPositions
pub const CUE_TRACK_POSITIONS: u32 = 0xB7;
/// CueTrackPositions/CueClusterPosition
pub const CUE_CLUSTER_POSITION: u32 = 0xF1;

/// Default TimecodeScale in nanoseconds when the element is absent
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Parsed element header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    /// Element ID including its length marker bits
    pub id: u32,

    /// Offset of the first ID byte
    pub offset: usize,

    /// Offset of the size vint
    pub size_offset: usize,

    /// Width of the size vint in bytes
    pub size_len: usize,

    /// Payload size, `None` when the size is unknown
    pub size: Option<u64>,

    /// Offset of the first payload byte
    pub data_offset: usize,
}

impl ElementHeader {
    /// End of the payload, or `None` for unknown-size elements
    pub fn data_end(&self) -> Option<usize> {
        self.size.map(|s| self.data_offset + s as usize)
    }

    /// Payload end clamped to the buffer length
    pub fn data_end_within(&self, len: usize) -> usize {
        self.data_end().map_or(len, |end| end.min(len))
    }
}

/// Width of a vint from its first byte, 0 if the byte is not a valid start
fn vint_width(first: u8) -> usize {
    if first == 0 {
        0
    } else {
        first.leading_zeros() as usize + 1
    }
}

/// Read an element ID at `pos`. Returns the ID and its width.
pub fn read_id(buf: &[u8], pos: usize) -> Result<(u32, usize), ContainerError> {
    let first = *buf.get(pos).ok_or(ContainerError::Truncated { offset: pos })?;
    let width = vint_width(first);
    if width == 0 || width > 4 {
        return Err(ContainerError::InvalidVint { offset: pos });
    }

    let bytes = buf
        .get(pos..pos + width)
        .ok_or(ContainerError::Truncated { offset: pos })?;
    let id = bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
    Ok((id, width))
}

/// Read a size vint at `pos`. Returns `(value, width)`, value `None` when unknown.
pub fn read_size(buf: &[u8], pos: usize) -> Result<(Option<u64>, usize), ContainerError> {
    let first = *buf.get(pos).ok_or(ContainerError::Truncated { offset: pos })?;
    let width = vint_width(first);
    if width == 0 || width > 8 {
        return Err(ContainerError::InvalidVint { offset: pos });
    }

    let bytes = buf
        .get(pos..pos + width)
        .ok_or(ContainerError::Truncated { offset: pos })?;

    let marker_mask = if width == 8 { 0 } else { 0xFFu8 >> width };
    let mut value = u64::from(bytes[0] & marker_mask);
    for b in &bytes[1..] {
        value = (value << 8) | u64::from(*b);
    }

    let all_ones = (1u64 << (7 * width)) - 1;
    if value == all_ones {
        Ok((None, width))
    } else {
        Ok((Some(value), width))
    }
}

/// Parse the element header starting at `pos`
pub fn read_header(buf: &[u8], pos: usize) -> Result<ElementHeader, ContainerError> {
    let (id, id_len) = read_id(buf, pos)?;
    let size_offset = pos + id_len;
    let (size, size_len) = read_size(buf, size_offset)?;
    Ok(ElementHeader {
        id,
        offset: pos,
        size_offset,
        size_len,
        size,
        data_offset: size_offset + size_len,
    })
}

/// Iterate the direct children of the payload range `[start, end)`.
///
/// Stops at the first child that cannot be parsed or whose size is unknown
/// (the unknown-size child is still yielded).
pub fn children(buf: &[u8], start: usize, end: usize) -> Children<'_> {
    Children {
        buf,
        pos: start,
        end: end.min(buf.len()),
        done: false,
    }
}

pub struct Children<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
    done: bool,
}

impl Iterator for Children<'_> {
    type Item = ElementHeader;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.end {
            return None;
        }
        let header = match read_header(self.buf, self.pos) {
            Ok(header) => header,
            Err(_) => {
                self.done = true;
                return None;
            }
        };
        match header.data_end() {
            Some(end) => self.pos = end,
            None => self.done = true,
        }
        Some(header)
    }
}

/// Read an unsigned integer payload (0-8 bytes, big-endian)
pub fn read_uint(buf: &[u8], header: &ElementHeader) -> Result<u64, ContainerError> {
    let size = header.size.ok_or(ContainerError::UnknownSize("uint"))? as usize;
    if size > 8 {
        return Err(ContainerError::InvalidPayload {
            offset: header.offset,
            reason: "unsigned integer wider than 8 bytes",
        });
    }
    let bytes = buf
        .get(header.data_offset..header.data_offset + size)
        .ok_or(ContainerError::Truncated { offset: header.data_offset })?;
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Read a float payload (0, 4 or 8 bytes, big-endian)
pub fn read_float(buf: &[u8], header: &ElementHeader) -> Result<f64, ContainerError> {
    let start = header.data_offset;
    match header.size {
        Some(0) => Ok(0.0),
        Some(4) => {
            let bytes: [u8; 4] = buf
                .get(start..start + 4)
                .and_then(|b| b.try_into().ok())
                .ok_or(ContainerError::Truncated { offset: start })?;
            Ok(f64::from(f32::from_be_bytes(bytes)))
        }
        Some(8) => {
            let bytes: [u8; 8] = buf
                .get(start..start + 8)
                .and_then(|b| b.try_into().ok())
                .ok_or(ContainerError::Truncated { offset: start })?;
            Ok(f64::from_be_bytes(bytes))
        }
        Some(other) => Err(ContainerError::UnsupportedFloatWidth(other)),
        None => Err(ContainerError::UnknownSize("float")),
    }
}

/// Append an element ID
pub fn write_id(out: &mut Vec<u8>, id: u32) {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(3);
    out.extend_from_slice(&bytes[skip..]);
}

/// Encode `value` as a size vint of exactly `width` bytes.
///
/// Returns `None` when the value does not fit (the all-ones pattern is
/// reserved for unknown sizes).
pub fn encode_size(value: u64, width: usize) -> Option<Vec<u8>> {
    if width == 0 || width > 8 {
        return None;
    }
    let max = (1u64 << (7 * width)) - 2;
    if value > max {
        return None;
    }
    let marked = value | (1u64 << (7 * width));
    Some(marked.to_be_bytes()[8 - width..].to_vec())
}

/// Smallest width that can carry `value` as a known size
pub fn minimal_size_width(value: u64) -> usize {
    (1..=8)
        .find(|w| value <= (1u64 << (7 * w)) - 2)
        .unwrap_or(8)
}

/// Encode `value` as a big-endian uint in exactly `width` bytes, if it fits
pub fn encode_uint(value: u64, width: usize) -> Option<Vec<u8>> {
    if width == 0 || width > 8 {
        return None;
    }
    if width < 8 && value >> (8 * width) != 0 {
        return None;
    }
    Some(value.to_be_bytes()[8 - width..].to_vec())
}

/// Build a complete element with a minimal-width size
pub fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 12);
    write_id(&mut out, id);
    let width = minimal_size_width(payload.len() as u64);
    if let Some(size) = encode_size(payload.len() as u64, width) {
        out.extend_from_slice(&size);
    }
    out.extend_from_slice(payload);
    out
}

/// Build an element holding an unsigned integer in its minimal width
pub fn uint_element(id: u32, value: u64) -> Vec<u8> {
    let width = (1..=8)
        .find(|w| *w == 8 || value >> (8 * w) == 0)
        .unwrap_or(8);
    let payload = value.to_be_bytes()[8 - width..].to_vec();
    element(id, &payload)
}

/// Build an 8-byte float element
pub fn float_element(id: u32, value: f64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

/// Header of an element whose size is unknown (8-byte all-ones size)
pub fn unknown_size_header(id: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    write_id(&mut out, id);
    out.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    out
}

/// Find `needle` in `buf` at or after `from`
pub fn find_marker(buf: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Marker bytes of an element ID
pub fn id_bytes(id: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    write_id(&mut out, id);
    out
}
