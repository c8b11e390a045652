use crate::types::*;

/// Find the nearest snap point within the threshold.
/// Returns the snapped position if within threshold, otherwise the original position.
pub fn find_snap_point(position: TimeUs, snap_points: &[TimeUs], threshold: TimeUs) -> TimeUs {
    let mut best = position;
    let mut best_dist = threshold.0.saturating_add(1); // start beyond threshold

    for &point in snap_points {
        let dist = (position - point).abs().0;
        if dist < best_dist {
            best = point;
            best_dist = dist;
        }
    }

    if best_dist <= threshold.0 {
        best
    } else {
        position
    }
}

/// Collect snap anchors: the playhead and every clip edge.
pub fn collect_snap_points(
    clips: &[TimelineClip],
    playhead: TimeUs,
    exclude_clip_id: Option<ClipId>,
) -> Vec<TimeUs> {
    let mut points = Vec::with_capacity(clips.len() * 2 + 1);
    points.push(playhead);

    for clip in clips {
        if Some(clip.id()) == exclude_clip_id {
            continue;
        }
        points.push(clip.start_time());
        points.push(clip.end_time());
    }

    points.sort();
    points.dedup();
    points
}
