//! Track classification.
//!
//! Decides from a track's declared format kind whether it is transcoded,
//! copied as is, or skipped. Kinds are the strings the media library reports,
//! e.g. "Purchased AAC audio file".

use mixburn_common::TrackAction;

/// Kinds decoded with the AAC decoder and re-encoded to MP3.
const TRANSCODABLE_KINDS: &[&str] = &["aac audio file", "purchased aac audio file"];

/// Kinds already in the delivery format.
const VERBATIM_KINDS: &[&str] = &["mpeg audio file"];

/// Classify a format kind. Matching ignores case and surrounding whitespace.
pub fn classify(kind: &str) -> TrackAction {
    let kind = kind.trim().to_lowercase();

    if TRANSCODABLE_KINDS.contains(&kind.as_str()) {
        TrackAction::Transcode
    } else if VERBATIM_KINDS.contains(&kind.as_str()) {
        TrackAction::CopyVerbatim
    } else {
        TrackAction::Unsupported
    }
}
