use crate::catalog::TrackRef;

/// Tracks whose title contains `query`, ignoring case. Order is preserved.
///
/// A blank query returns the input unchanged.
pub fn filter(tracks: &[TrackRef], query: &str) -> Vec<TrackRef> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tracks.to_vec();
    }

    tracks
        .iter()
        .filter(|track| track.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
