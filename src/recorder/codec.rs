//! Output type selection

use super::encoder::EncoderFactory;

/// First entry of `preferences` the factory can encode
pub fn select_mime_type(preferences: &[String], factory: &dyn EncoderFactory) -> Option<String> {
    let selected = preferences
        .iter()
        .find(|mime| factory.is_type_supported(mime))
        .cloned();

    match &selected {
        Some(mime) => tracing::debug!("Selected output type {}", mime),
        None => tracing::warn!("No supported type found among {} candidates", preferences.len()),
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::state::DEFAULT_MIME_TYPES;
    use crate::testing::FakeEncoderFactory;

    fn preferences() -> Vec<String> {
        DEFAULT_MIME_TYPES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_picks_first_supported_in_preference_order() {
        let factory = FakeEncoderFactory::supporting(&["video/webm;codecs=vp8", "video/webm"]);
        assert_eq!(
            select_mime_type(&preferences(), &factory).as_deref(),
            Some("video/webm")
        );
    }

    #[test]
    fn test_none_when_nothing_supported() {
        let factory = FakeEncoderFactory::supporting(&[]);
        assert_eq!(select_mime_type(&preferences(), &factory), None);
    }
}
