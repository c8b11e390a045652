use crate::types::{ClipId, TimeUs, TimelineClip};

/// Half-open interval test: `[s1, e1)` and `[s2, e2)` intersect.
/// Clips that only share a boundary do not overlap.
pub fn intervals_overlap(s1: TimeUs, e1: TimeUs, s2: TimeUs, e2: TimeUs) -> bool {
    s1 < e2 && s2 < e1
}

/// The first clip (other than `exclude_id`) that a candidate interval would overlap.
pub fn first_conflict(
    clips: &[TimelineClip],
    exclude_id: Option<ClipId>,
    candidate_start: TimeUs,
    candidate_end: TimeUs,
) -> Option<&TimelineClip> {
    clips.iter().find(|clip| {
        Some(clip.id()) != exclude_id
            && intervals_overlap(
                clip.start_time(),
                clip.end_time(),
                candidate_start,
                candidate_end,
            )
    })
}

/// Does the candidate interval overlap any clip on the track besides `exclude_id`?
pub fn overlaps(
    clips: &[TimelineClip],
    exclude_id: Option<ClipId>,
    candidate_start: TimeUs,
    candidate_end: TimeUs,
) -> bool {
    first_conflict(clips, exclude_id, candidate_start, candidate_end).is_some()
}
