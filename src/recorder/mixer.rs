//! Audio routing graph
//!
//! Routes the audio tracks of one or more source streams into a single
//! destination track, which is then recorded alongside the desktop tracks.
//! The host encoder renders the destination from the connected sources.

use crate::capture::{MediaStream, MediaTrack, TrackKind};

/// A source stream connected to the graph
#[derive(Debug, Clone)]
pub struct SourceNode {
    /// Id of the stream the tracks came from
    pub stream_id: String,

    /// Audio tracks feeding the destination
    pub tracks: Vec<MediaTrack>,
}

/// Audio mixing graph with one destination
#[derive(Debug)]
pub struct AudioGraph {
    sources: Vec<SourceNode>,
    destination: MediaTrack,
}

impl AudioGraph {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            destination: MediaTrack::new(TrackKind::Audio, "Mixed audio"),
        }
    }

    /// Route the audio tracks of `stream` into the destination.
    ///
    /// Returns false if the stream has no audio or is already connected.
    pub fn connect(&mut self, stream: &MediaStream) -> bool {
        if self.sources.iter().any(|s| s.stream_id == stream.id()) {
            tracing::debug!("Stream {} already connected to the audio graph", stream.id());
            return false;
        }

        let tracks: Vec<MediaTrack> = stream.audio_tracks().cloned().collect();
        if tracks.is_empty() {
            return false;
        }

        tracing::debug!("Connected {} audio track(s) from stream {}", tracks.len(), stream.id());
        self.sources.push(SourceNode {
            stream_id: stream.id().to_string(),
            tracks,
        });
        true
    }

    pub fn sources(&self) -> &[SourceNode] {
        &self.sources
    }

    pub fn is_connected(&self) -> bool {
        !self.sources.is_empty()
    }

    /// The mixed output track
    pub fn destination(&self) -> &MediaTrack {
        &self.destination
    }

    /// Tear the graph down, ending the destination track.
    ///
    /// Source tracks belong to their streams and are left alone.
    pub fn close(&mut self) {
        self.destination.stop();
        self.sources.clear();
    }
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Join the desktop tracks with the graph's mixed audio into one stream
pub fn combine_streams(desktop: &MediaStream, graph: Option<&AudioGraph>) -> MediaStream {
    let mut tracks: Vec<MediaTrack> = desktop.tracks().to_vec();
    if let Some(graph) = graph.filter(|g| g.is_connected()) {
        tracks.push(graph.destination().clone());
    }
    MediaStream::new(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_stream() -> MediaStream {
        MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "Camera"),
            MediaTrack::new(TrackKind::Audio, "Microphone"),
        ])
    }

    #[test]
    fn test_each_stream_connects_once() {
        let local = local_stream();
        let mut graph = AudioGraph::new();

        assert!(graph.connect(&local));
        assert!(!graph.connect(&local));
        assert_eq!(graph.sources().len(), 1);
        assert_eq!(graph.sources()[0].tracks.len(), 1);
    }

    #[test]
    fn test_video_only_stream_is_not_connected() {
        let camera = MediaStream::new(vec![MediaTrack::new(TrackKind::Video, "Camera")]);
        let mut graph = AudioGraph::new();

        assert!(!graph.connect(&camera));
        assert!(!graph.is_connected());
    }

    #[test]
    fn test_combined_stream_has_desktop_tracks_plus_mix() {
        let desktop = MediaStream::new(vec![MediaTrack::new(TrackKind::Video, "Screen")]);
        let mut graph = AudioGraph::new();
        graph.connect(&local_stream());

        let combined = combine_streams(&desktop, Some(&graph));

        assert_eq!(combined.tracks().len(), 2);
        assert_eq!(combined.tracks()[0], desktop.tracks()[0]);
        assert_eq!(&combined.tracks()[1], graph.destination());
        assert_eq!(combine_streams(&desktop, None).tracks().len(), 1);
    }

    #[test]
    fn test_close_ends_destination_only() {
        let local = local_stream();
        let mut graph = AudioGraph::new();
        graph.connect(&local);

        graph.close();

        assert!(!graph.destination().is_live());
        assert!(local.is_active());
    }
}
