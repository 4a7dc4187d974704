//! Test host: scripted devices, encoder, browser APIs and message peers

use crate::capture::{CaptureSource, MediaConstraints, MediaDevices, MediaStream, MediaTrack, TrackKind};
use crate::messaging::{
    BrowserHost, DesktopMediaChoice, Message, MessageHandler, MessageResponse, TabInfo,
};
use crate::recorder::{EncoderEvent, EncoderEventSender, EncoderFactory, EncoderOptions, MediaEncoder};
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Minimal WebM writer shaped like chunked encoder output
pub mod webm {
    use crate::container::ebml::{
        children, element, read_header, read_uint, uint_element, unknown_size_header, CLUSTER,
        CLUSTER_TIMECODE, CODEC_ID, EBML_HEADER, INFO, MUXING_APP, SEGMENT, SIMPLE_BLOCK,
        TIMECODE_SCALE, TRACKS, TRACK_ENTRY, TRACK_NUMBER, TRACK_TYPE, WRITING_APP,
    };

    pub const VIDEO: u64 = 1;
    pub const AUDIO: u64 = 2;

    pub fn ebml_header() -> Vec<u8> {
        let mut body = uint_element(0x4286, 1); // EBMLVersion
        body.extend(uint_element(0x42F7, 1)); // EBMLReadVersion
        body.extend(uint_element(0x42F2, 4)); // EBMLMaxIDLength
        body.extend(uint_element(0x42F3, 8)); // EBMLMaxSizeLength
        body.extend(element(0x4282, b"webm")); // DocType
        body.extend(uint_element(0x4287, 4)); // DocTypeVersion
        body.extend(uint_element(0x4285, 2)); // DocTypeReadVersion
        element(EBML_HEADER, &body)
    }

    pub fn tracks(types: &[u64]) -> Vec<u8> {
        let mut body = Vec::new();
        for (i, kind) in types.iter().enumerate() {
            let codec: &[u8] = if *kind == VIDEO { b"V_VP8" } else { b"A_OPUS" };
            let mut entry = uint_element(TRACK_NUMBER, i as u64 + 1);
            entry.extend(uint_element(TRACK_TYPE, *kind));
            entry.extend(element(CODEC_ID, codec));
            body.extend(element(TRACK_ENTRY, &entry));
        }
        element(TRACKS, &body)
    }

    /// First chunk: EBML header, open-ended Segment, Info without Duration, Tracks
    pub fn header_chunk(types: &[u64]) -> Vec<u8> {
        let mut info = uint_element(TIMECODE_SCALE, 1_000_000);
        info.extend(element(MUXING_APP, b"snappy-test"));
        info.extend(element(WRITING_APP, b"snappy-test"));

        let mut out = ebml_header();
        out.extend(unknown_size_header(SEGMENT));
        out.extend(element(INFO, &info));
        out.extend(tracks(types));
        out
    }

    /// An open-ended Cluster with one SimpleBlock
    pub fn cluster(timecode_ms: u64, track: u8, frame: &[u8]) -> Vec<u8> {
        let mut block = vec![0x80 | track, 0x00, 0x00, 0x80];
        block.extend_from_slice(frame);

        let mut out = unknown_size_header(CLUSTER);
        out.extend(uint_element(CLUSTER_TIMECODE, timecode_ms));
        out.extend(element(SIMPLE_BLOCK, &block));
        out
    }

    /// TrackType of every TrackEntry, in order
    pub fn track_types(buf: &[u8]) -> Vec<u64> {
        let Some(at) = crate::container::ebml::find_marker(buf, &[0x16, 0x54, 0xAE, 0x6B], 0) else {
            return Vec::new();
        };
        let Ok(tracks) = read_header(buf, at) else {
            return Vec::new();
        };
        let end = tracks.data_end_within(buf.len());
        children(buf, tracks.data_offset, end)
            .filter(|h| h.id == TRACK_ENTRY)
            .filter_map(|entry| {
                children(buf, entry.data_offset, entry.data_end_within(buf.len()))
                    .find(|h| h.id == TRACK_TYPE)
                    .and_then(|h| read_uint(buf, &h).ok())
            })
            .collect()
    }
}

/// Devices that hand out synthetic streams and remember them
#[derive(Default)]
pub struct FakeDevices {
    deny: bool,
    issued: Mutex<Vec<MediaStream>>,
    user_media_calls: Mutex<usize>,
}

impl FakeDevices {
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub fn user_media_calls(&self) -> usize {
        *self.user_media_calls.lock()
    }

    /// True when every stream handed out has been stopped
    pub fn all_released(&self) -> bool {
        self.issued.lock().iter().all(|s| !s.is_active())
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn get_user_media(&self, constraints: &MediaConstraints) -> AppResult<MediaStream> {
        *self.user_media_calls.lock() += 1;
        if self.deny {
            return Err(AppError::PermissionDenied("camera and microphone".to_string()));
        }

        let mut tracks = Vec::new();
        if constraints.video.is_some() {
            tracks.push(MediaTrack::new(TrackKind::Video, "FaceTime HD Camera"));
        }
        if constraints.audio.is_some() {
            tracks.push(MediaTrack::new(TrackKind::Audio, "Built-in Microphone"));
        }
        let stream = MediaStream::new(tracks);
        self.issued.lock().push(stream.clone());
        Ok(stream)
    }

    async fn get_desktop_media(&self, stream_id: &str) -> AppResult<MediaStream> {
        if self.deny {
            return Err(AppError::PermissionDenied("screen capture".to_string()));
        }
        let stream = MediaStream::new(vec![MediaTrack::new(TrackKind::Video, stream_id)]);
        self.issued.lock().push(stream.clone());
        Ok(stream)
    }
}

/// Encoder factory producing [`FakeEncoder`]s
pub struct FakeEncoderFactory {
    supported: Vec<String>,
    never_stop: bool,
    created: Mutex<Vec<MediaStream>>,
    leaked_senders: Mutex<Vec<EncoderEventSender>>,
}

impl FakeEncoderFactory {
    pub fn supporting(types: &[&str]) -> Self {
        Self {
            supported: types.iter().map(|s| s.to_string()).collect(),
            never_stop: false,
            created: Mutex::new(Vec::new()),
            leaked_senders: Mutex::new(Vec::new()),
        }
    }

    /// Encoders that never emit `Stopped` and keep their channel open
    pub fn never_stopping(mut self) -> Self {
        self.never_stop = true;
        self
    }

    pub fn created_streams(&self) -> Vec<MediaStream> {
        self.created.lock().clone()
    }
}

impl EncoderFactory for FakeEncoderFactory {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|s| s == mime_type)
    }

    fn create(
        &self,
        stream: MediaStream,
        options: EncoderOptions,
        events: EncoderEventSender,
    ) -> AppResult<Box<dyn MediaEncoder>> {
        if !self.is_type_supported(&options.mime_type) {
            return Err(AppError::UnsupportedCodec);
        }
        if self.never_stop {
            self.leaked_senders.lock().push(events.clone());
        }
        self.created.lock().push(stream.clone());

        let track_types = stream
            .tracks()
            .iter()
            .map(|t| match t.kind() {
                TrackKind::Video => webm::VIDEO,
                TrackKind::Audio => webm::AUDIO,
            })
            .collect();
        Ok(Box::new(FakeEncoder {
            track_types,
            timeslice_ms: options.timeslice.as_millis() as u64,
            events,
            flushed: 0,
            never_stop: self.never_stop,
        }))
    }
}

/// Emits a WebM header on start and one cluster per flush
pub struct FakeEncoder {
    track_types: Vec<u64>,
    timeslice_ms: u64,
    events: EncoderEventSender,
    flushed: u64,
    never_stop: bool,
}

impl FakeEncoder {
    fn send(&self, event: EncoderEvent) -> AppResult<()> {
        self.events
            .send(event)
            .map_err(|_| AppError::Runtime("encoder channel closed".to_string()))
    }
}

#[async_trait]
impl MediaEncoder for FakeEncoder {
    async fn start(&mut self) -> AppResult<()> {
        self.send(EncoderEvent::Started)?;
        self.send(EncoderEvent::Data(webm::header_chunk(&self.track_types)))
    }

    async fn pause(&mut self) -> AppResult<()> {
        self.send(EncoderEvent::Paused)
    }

    async fn resume(&mut self) -> AppResult<()> {
        self.send(EncoderEvent::Resumed)
    }

    async fn request_data(&mut self) -> AppResult<()> {
        let timecode = self.flushed * self.timeslice_ms;
        self.flushed += 1;
        self.send(EncoderEvent::Data(webm::cluster(timecode, 1, b"frame")))
    }

    async fn stop(&mut self) -> AppResult<()> {
        if self.never_stop {
            return Ok(());
        }
        self.send(EncoderEvent::Stopped)
    }
}

/// Browser host with a scripted source picker that records side effects
pub struct FakeBrowserHost {
    choice: Option<String>,
    failing_badge: bool,
    picker_calls: Mutex<Vec<Vec<CaptureSource>>>,
    opened_tabs: Mutex<Vec<String>>,
    badge: Mutex<(String, [u8; 4])>,
}

impl FakeBrowserHost {
    pub fn choosing(stream_id: &str) -> Self {
        Self {
            choice: Some(stream_id.to_string()),
            failing_badge: false,
            picker_calls: Mutex::new(Vec::new()),
            opened_tabs: Mutex::new(Vec::new()),
            badge: Mutex::new((String::new(), [0; 4])),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            choice: None,
            ..Self::choosing("")
        }
    }

    pub fn with_failing_badge(mut self) -> Self {
        self.failing_badge = true;
        self
    }

    pub fn picker_calls(&self) -> Vec<Vec<CaptureSource>> {
        self.picker_calls.lock().clone()
    }

    pub fn opened_tabs(&self) -> Vec<String> {
        self.opened_tabs.lock().clone()
    }

    pub fn badge(&self) -> (String, [u8; 4]) {
        self.badge.lock().clone()
    }
}

#[async_trait]
impl BrowserHost for FakeBrowserHost {
    async fn active_tab(&self) -> AppResult<Option<TabInfo>> {
        Ok(Some(TabInfo {
            id: 1,
            url: Some("https://example.com".to_string()),
        }))
    }

    async fn choose_desktop_media(
        &self,
        sources: &[CaptureSource],
        _tab: &TabInfo,
    ) -> AppResult<Option<DesktopMediaChoice>> {
        self.picker_calls.lock().push(sources.to_vec());
        Ok(self.choice.clone().map(|stream_id| DesktopMediaChoice {
            stream_id,
            options: None,
        }))
    }

    async fn create_tab(&self, url: &str) -> AppResult<TabInfo> {
        let mut tabs = self.opened_tabs.lock();
        tabs.push(url.to_string());
        Ok(TabInfo {
            id: 100 + tabs.len() as u32,
            url: Some(url.to_string()),
        })
    }

    async fn set_badge_text(&self, text: &str) -> AppResult<()> {
        if self.failing_badge {
            return Err(AppError::Runtime("action API unavailable".to_string()));
        }
        self.badge.lock().0 = text.to_string();
        Ok(())
    }

    async fn set_badge_background_color(&self, color: [u8; 4]) -> AppResult<()> {
        if self.failing_badge {
            return Err(AppError::Runtime("action API unavailable".to_string()));
        }
        self.badge.lock().1 = color;
        Ok(())
    }
}

/// Page stand-in that records messages and answers with a fixed response
pub struct ScriptedPage {
    response: MessageResponse,
    received: Mutex<Vec<Message>>,
}

impl ScriptedPage {
    pub fn accepting() -> Self {
        Self {
            response: MessageResponse::success("Recording started"),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            response: MessageResponse::error(message),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl MessageHandler for ScriptedPage {
    async fn handle(&self, message: Message) -> MessageResponse {
        self.received.lock().push(message);
        self.response.clone()
    }
}

/// Background stand-in that records messages and succeeds unless told otherwise
#[derive(Default)]
pub struct RecordingBackground {
    received: Mutex<Vec<Message>>,
    fail_next: Mutex<Option<String>>,
}

impl RecordingBackground {
    pub fn received(&self) -> Vec<Message> {
        self.received.lock().clone()
    }

    /// Answer the next message with a failure carrying `message`
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }
}

#[async_trait]
impl MessageHandler for RecordingBackground {
    async fn handle(&self, message: Message) -> MessageResponse {
        if let Some(failure) = self.fail_next.lock().take() {
            return MessageResponse::error(failure);
        }
        self.received.lock().push(message);
        MessageResponse::success("ok")
    }
}
