//! Duration repair for EBML containers
//!
//! Offsets used by the patch, all relative to the start of the buffer:
//!
//! - `Segment` (ID `18 53 80 67`) follows the EBML header. Its size is
//!   usually unknown for streamed output.
//! - `Info` (ID `15 49 A9 66`) is a direct child of `Segment`, normally the
//!   first or second one. It is located by walking the segment's children and,
//!   failing that, by scanning for its ID bytes.
//! - `TimecodeScale` (ID `2A D7 B1`) inside `Info` gives nanoseconds per tick,
//!   1 000 000 when absent. `Duration` (ID `44 89`) is a float in ticks.
//!
//! An existing `Duration` is overwritten in place. A missing one is appended
//! to `Info` as an 11-byte element (`44 89 88` + big-endian f64); the sizes of
//! `Info` and a known-size `Segment` are rewritten in their existing widths and
//! segment-relative positions in `SeekHead` and `Cues` are shifted.

use super::ebml::{
    children, encode_size, encode_uint, find_marker, float_element, id_bytes, read_float,
    read_header, read_uint, ElementHeader, CLUSTER, CUES, CUE_CLUSTER_POSITION, CUE_POINT,
    CUE_TRACK_POSITIONS, DEFAULT_TIMECODE_SCALE, DURATION, EBML_HEADER, INFO, SEEK, SEEK_HEAD,
    SEEK_ID, SEEK_POSITION, SEGMENT, TIMECODE_SCALE,
};
use super::ContainerError;
use std::time::Duration;

/// How a repair changed the buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationPatch {
    /// An existing Duration payload at `offset` was overwritten
    Overwritten { offset: usize },
    /// A Duration element was inserted at `offset`
    Inserted { offset: usize },
}

struct InfoFields {
    timecode_scale: u64,
    duration: Option<ElementHeader>,
}

/// A pending in-place rewrite of an unsigned integer payload
struct UintEdit {
    offset: usize,
    width: usize,
    value: u64,
    name: &'static str,
}

/// Write `duration` into the container's `Info/Duration` field.
///
/// Returns the patched copy. Applying it to its own output yields identical bytes.
pub fn repair_duration(buf: &[u8], duration: Duration) -> Result<Vec<u8>, ContainerError> {
    let mut out = buf.to_vec();
    let patch = repair_duration_in(&mut out, duration)?;
    tracing::debug!("Container duration patched: {:?}", patch);
    Ok(out)
}

/// In-place variant of [`repair_duration`]
pub fn repair_duration_in(
    buf: &mut Vec<u8>,
    duration: Duration,
) -> Result<DurationPatch, ContainerError> {
    let segment = locate_segment(buf)?;
    let info = locate_info(buf, &segment)?;
    let fields = read_info(buf, &info)?;
    let value = to_ticks(duration, fields.timecode_scale);

    if let Some(existing) = fields.duration {
        let start = existing.data_offset;
        let bytes = match existing.size {
            Some(8) => value.to_be_bytes().to_vec(),
            Some(4) => (value as f32).to_be_bytes().to_vec(),
            Some(other) => return Err(ContainerError::UnsupportedFloatWidth(other)),
            None => return Err(ContainerError::UnknownSize("Duration")),
        };
        // The payload must lie inside Info and inside the buffer
        let info_end = info.data_end_within(buf.len());
        let end = start + bytes.len();
        if end > info_end {
            return Err(ContainerError::Truncated { offset: start });
        }
        buf[start..end].copy_from_slice(&bytes);
        return Ok(DurationPatch::Overwritten { offset: start });
    }

    let info_size = info.size.ok_or(ContainerError::UnknownSize("Info"))?;
    let insert_at = info.data_offset + info_size as usize;
    let element = float_element(DURATION, value);
    let grow = element.len() as u64;

    let info_size_bytes = encode_size(info_size + grow, info.size_len)
        .ok_or(ContainerError::SizeOverflow("Info"))?;
    let segment_size_bytes = match segment.size {
        Some(size) => Some(
            encode_size(size + grow, segment.size_len)
                .ok_or(ContainerError::SizeOverflow("Segment"))?,
        ),
        None => None,
    };

    let insert_rel = (insert_at - segment.data_offset) as u64;
    let edits = position_edits(buf, &segment, insert_rel, grow)?;

    // All validation is done; nothing below can fail halfway.
    for edit in &edits {
        let bytes = encode_uint(edit.value, edit.width).ok_or(ContainerError::SizeOverflow(edit.name))?;
        buf[edit.offset..edit.offset + edit.width].copy_from_slice(&bytes);
    }
    buf[info.size_offset..info.size_offset + info.size_len].copy_from_slice(&info_size_bytes);
    if let Some(bytes) = segment_size_bytes {
        buf[segment.size_offset..segment.size_offset + segment.size_len].copy_from_slice(&bytes);
    }
    buf.splice(insert_at..insert_at, element);

    Ok(DurationPatch::Inserted { offset: insert_at })
}

/// Read back the container's Duration, `None` if the field is absent
pub fn probe_duration(buf: &[u8]) -> Result<Option<Duration>, ContainerError> {
    let segment = locate_segment(buf)?;
    let info = locate_info(buf, &segment)?;
    let fields = read_info(buf, &info)?;

    match fields.duration {
        Some(header) => {
            let ticks = read_float(buf, &header)?;
            let nanos = (ticks * fields.timecode_scale as f64).round().max(0.0);
            Ok(Some(Duration::from_nanos(nanos as u64)))
        }
        None => Ok(None),
    }
}

fn to_ticks(duration: Duration, timecode_scale: u64) -> f64 {
    duration.as_nanos() as f64 / timecode_scale as f64
}

fn locate_segment(buf: &[u8]) -> Result<ElementHeader, ContainerError> {
    let mut pos = 0;
    if let Ok(header) = read_header(buf, 0) {
        if header.id == EBML_HEADER {
            pos = header.data_end().unwrap_or(0);
        }
    }
    if let Ok(header) = read_header(buf, pos) {
        if header.id == SEGMENT {
            return Ok(header);
        }
    }

    let at = find_marker(buf, &id_bytes(SEGMENT), 0)
        .ok_or(ContainerError::MarkerNotFound("Segment"))?;
    read_header(buf, at)
}

fn locate_info(buf: &[u8], segment: &ElementHeader) -> Result<ElementHeader, ContainerError> {
    let end = segment.data_end_within(buf.len());
    for child in children(buf, segment.data_offset, end) {
        if child.id == INFO {
            return Ok(child);
        }
        if child.id == CLUSTER {
            break;
        }
    }

    let marker = id_bytes(INFO);
    let mut from = segment.data_offset;
    while let Some(at) = find_marker(buf, &marker, from) {
        if at >= end {
            break;
        }
        if let Ok(header) = read_header(buf, at) {
            if header.data_end().is_some_and(|e| e <= buf.len()) {
                return Ok(header);
            }
        }
        from = at + 1;
    }
    Err(ContainerError::MarkerNotFound("Info"))
}

fn read_info(buf: &[u8], info: &ElementHeader) -> Result<InfoFields, ContainerError> {
    let end = info.data_end().ok_or(ContainerError::UnknownSize("Info"))?;
    if end > buf.len() {
        return Err(ContainerError::Truncated { offset: buf.len() });
    }

    let mut fields = InfoFields {
        timecode_scale: DEFAULT_TIMECODE_SCALE,
        duration: None,
    };
    for child in children(buf, info.data_offset, end) {
        match child.id {
            TIMECODE_SCALE => {
                let scale = read_uint(buf, &child)?;
                if scale > 0 {
                    fields.timecode_scale = scale;
                }
            }
            DURATION => fields.duration = Some(child),
            _ => {}
        }
    }
    Ok(fields)
}

/// Collect rewrites for SeekHead and Cues positions at or past `insert_rel`
fn position_edits(
    buf: &[u8],
    segment: &ElementHeader,
    insert_rel: u64,
    grow: u64,
) -> Result<Vec<UintEdit>, ContainerError> {
    let end = segment.data_end_within(buf.len());
    let mut edits = Vec::new();
    let mut cues_offsets = Vec::new();

    for child in children(buf, segment.data_offset, end) {
        match child.id {
            SEEK_HEAD => {
                let seek_end = child.data_end_within(buf.len());
                for seek in children(buf, child.data_offset, seek_end).filter(|h| h.id == SEEK) {
                    let mut target = None;
                    let mut position = None;
                    for field in children(buf, seek.data_offset, seek.data_end_within(buf.len())) {
                        match field.id {
                            SEEK_ID => target = Some(read_uint(buf, &field)? as u32),
                            SEEK_POSITION => position = Some((field, read_uint(buf, &field)?)),
                            _ => {}
                        }
                    }
                    if let Some((field, value)) = position {
                        if target == Some(CUES) {
                            match usize::try_from(value)
                                .ok()
                                .and_then(|v| segment.data_offset.checked_add(v))
                            {
                                Some(offset) => cues_offsets.push(offset),
                                None => tracing::warn!("Ignoring out-of-range Cues position {}", value),
                            }
                        }
                        if value >= insert_rel {
                            edits.push(UintEdit {
                                offset: field.data_offset,
                                width: field.size.unwrap_or(0) as usize,
                                value: value
                                    .checked_add(grow)
                                    .ok_or(ContainerError::SizeOverflow("SeekPosition"))?,
                                name: "SeekPosition",
                            });
                        }
                    }
                }
            }
            CUES => cues_offsets.push(child.offset),
            _ => {}
        }
    }

    cues_offsets.sort_unstable();
    cues_offsets.dedup();
    for offset in cues_offsets {
        let Ok(cues) = read_header(buf, offset) else {
            tracing::warn!("SeekHead points at unreadable Cues at offset {}", offset);
            continue;
        };
        if cues.id != CUES {
            continue;
        }
        let cues_end = cues.data_end_within(buf.len());
        for point in children(buf, cues.data_offset, cues_end).filter(|h| h.id == CUE_POINT) {
            let point_end = point.data_end_within(buf.len());
            for track in children(buf, point.data_offset, point_end).filter(|h| h.id == CUE_TRACK_POSITIONS) {
                let track_end = track.data_end_within(buf.len());
                for field in children(buf, track.data_offset, track_end).filter(|h| h.id == CUE_CLUSTER_POSITION) {
                    let value = read_uint(buf, &field)?;
                    if value >= insert_rel {
                        edits.push(UintEdit {
                            offset: field.data_offset,
                            width: field.size.unwrap_or(0) as usize,
                            value: value
                                .checked_add(grow)
                                .ok_or(ContainerError::SizeOverflow("CueClusterPosition"))?,
                            name: "CueClusterPosition",
                        });
                    }
                }
            }
        }
    }

    // Reject edits that would not fit before anything is written.
    for edit in &edits {
        if encode_uint(edit.value, edit.width).is_none() {
            return Err(ContainerError::SizeOverflow(edit.name));
        }
    }
    Ok(edits)
}
