//! Path utilities for naming staged output.
//!
//! Every staged track is named `"<artist> - <title> - <track number>.mp3"`.
//! The name is a pure function of the descriptor metadata, so the same track
//! always lands on the same path and distinct tracks in a collection land on
//! distinct paths.

use crate::TrackDescriptor;

/// Extension of every staged file.
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Characters that cannot appear inside a single path component.
const FORBIDDEN: &[char] = &['/', '\\', '\0'];

/// Replace characters that would split a name into several path components.
///
/// # Examples
///
/// ```
/// use mixburn_common::paths::sanitize_component;
///
/// assert_eq!(sanitize_component("AC/DC"), "AC_DC");
/// assert_eq!(sanitize_component("Road Trip"), "Road Trip");
/// ```
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();

    // "." and ".." would resolve outside the component
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

/// Output file name for a track.
///
/// # Examples
///
/// ```
/// use mixburn_common::TrackDescriptor;
/// use mixburn_common::paths::track_file_name;
///
/// let t = TrackDescriptor::new("Intro", "Band", 1, "/m/intro.m4a", "AAC audio file", 0);
/// assert_eq!(track_file_name(&t), "Band - Intro - 1.mp3");
/// ```
pub fn track_file_name(track: &TrackDescriptor) -> String {
    format!(
        "{} - {} - {}.{}",
        sanitize_component(&track.artist),
        sanitize_component(&track.title),
        track.track_number,
        OUTPUT_EXTENSION
    )
}
