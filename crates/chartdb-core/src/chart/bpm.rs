//! BPM summary derived from timing points.

use serde::Serialize;

use super::difficulty::TimingPoint;

/// BPM values are clamped to this to keep absurd beat lengths in range.
const MAX_BPM: f64 = 9001.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BpmInfo {
    pub min: i32,
    pub max: i32,
    pub most_common: i32,
}

fn beat_length_to_bpm(beat_length: f64) -> f64 {
    (60000.0 / beat_length).min(MAX_BPM)
}

impl BpmInfo {
    /// Builds the summary from the uninherited points.
    ///
    /// The most common BPM is the beat length covering the most time. Each
    /// point lasts until the next one (the first point is treated as starting
    /// at 0, the last runs until `end_time`). Durations of identical beat
    /// lengths are summed; ties prefer the faster beat length, then the one
    /// that appeared first.
    pub fn from_timing_points(points: &[TimingPoint], end_time: f64) -> Self {
        let uninherited: Vec<&TimingPoint> = points
            .iter()
            .filter(|p| p.uninherited && p.beat_length > 0.0 && p.beat_length.is_finite())
            .collect();

        if uninherited.is_empty() {
            return Self::default();
        }

        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for point in &uninherited {
            let bpm = beat_length_to_bpm(point.beat_length);
            min = min.min(bpm);
            max = max.max(bpm);
        }

        // (beat length, summed duration) in order of first appearance
        let mut totals: Vec<(f64, f64)> = Vec::new();
        for (i, point) in uninherited.iter().enumerate() {
            let start = if i == 0 { 0.0 } else { point.offset };
            let end = match uninherited.get(i + 1) {
                Some(next) => next.offset,
                None => end_time.max(point.offset),
            };
            let duration = (end - start).max(0.0);

            match totals.iter_mut().find(|(len, _)| *len == point.beat_length) {
                Some((_, total)) => *total += duration,
                None => totals.push((point.beat_length, duration)),
            }
        }

        let mut best = totals[0];
        for &candidate in &totals[1..] {
            let longer = candidate.1 > best.1;
            let faster_tie = candidate.1 == best.1 && candidate.0 < best.0;
            if longer || faster_tie {
                best = candidate;
            }
        }

        Self {
            min: min.round() as i32,
            max: max.round() as i32,
            most_common: beat_length_to_bpm(best.0).round() as i32,
        }
    }
}
