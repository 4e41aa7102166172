//! Places a GPS fix on the stop-to-stop segment it is travelling along.

use yus_transit::{Stop, distance_meters};

use crate::codec::GpsFix;
use crate::config::TrackingConfig;

/// Position of the bus along the ordered stops.
///
/// `segment_index` is the stop the bus last left, so it travels from
/// `stops[segment_index]` towards `stops[segment_index + 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SegmentPosition {
    pub segment_index: usize,
    /// Fraction of the segment covered, within [0, 1]
    pub progress: f64,
}

impl SegmentPosition {
    pub fn at_stop(index: usize) -> Self {
        Self {
            segment_index: index,
            progress: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SegmentLocator {
    snap_radius_m: f64,
    boundary_margin: f64,
}

struct Candidate {
    index: usize,
    nearest: f64,
    to_start: f64,
    to_end: f64,
}

impl SegmentLocator {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            snap_radius_m: config.snap_radius_m,
            boundary_margin: config.boundary_margin,
        }
    }

    /// Finds the segment closest to `fix`, never searching behind `last_confirmed`.
    ///
    /// Segments are ranked by the distance to their nearer endpoint; the first
    /// strictly closer one wins. Stops without coordinates disqualify both
    /// segments touching them. When nothing qualifies, `previous` is kept.
    pub fn locate(
        &self,
        fix: &GpsFix,
        stops: &[Stop],
        last_confirmed: usize,
        previous: SegmentPosition,
    ) -> SegmentPosition {
        if stops.len() < 2 || !fix.is_valid() {
            return previous;
        }

        let first = last_confirmed.min(stops.len() - 2);
        let mut best: Option<Candidate> = None;

        for (offset, pair) in stops[first..].windows(2).enumerate() {
            let to_start = distance_meters(fix.lat, fix.lon, pair[0].lat, pair[0].lon);
            let to_end = distance_meters(fix.lat, fix.lon, pair[1].lat, pair[1].lon);
            if to_start.is_nan() || to_end.is_nan() {
                continue;
            }

            let nearest = to_start.min(to_end);
            if best.as_ref().is_none_or(|b| nearest < b.nearest) {
                best = Some(Candidate {
                    index: first + offset,
                    nearest,
                    to_start,
                    to_end,
                });
            }
        }

        match best {
            Some(c) => SegmentPosition {
                segment_index: c.index,
                progress: self.progress(c.to_start, c.to_end),
            },
            None => previous,
        }
    }

    /// Share of the segment covered, held off the exact ends near a stop
    pub fn progress(&self, to_start: f64, to_end: f64) -> f64 {
        let total = to_start + to_end;
        let mut progress = if total > 0.0 {
            (1.0 - to_end / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if to_start <= self.snap_radius_m {
            progress = progress.max(self.boundary_margin);
        }
        if to_end <= self.snap_radius_m {
            progress = progress.min(1.0 - self.boundary_margin);
        }
        progress
    }
}

impl Default for SegmentLocator {
    fn default() -> Self {
        Self::new(&TrackingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Utc;

    // ~1.1 km apart along a meridian
    fn line(n: usize) -> Vec<Stop> {
        (0..n)
            .map(|i| Stop::new(i, format!("S{i}"), 9.40 + i as f64 * 0.01, 77.80))
            .collect()
    }

    fn fix(lat: f64, lon: f64) -> GpsFix {
        GpsFix::new(lat, lon, 0.0, Utc::now())
    }

    #[test]
    fn test_midpoint_of_first_segment() {
        let locator = SegmentLocator::default();
        let pos = locator.locate(&fix(9.405, 77.80), &line(3), 0, SegmentPosition::default());
        assert_eq!(pos.segment_index, 0);
        assert_relative_eq!(pos.progress, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_progress_held_off_boundaries() {
        let locator = SegmentLocator::default();
        assert_relative_eq!(locator.progress(0.0, 1000.0), 0.05);
        assert_relative_eq!(locator.progress(1000.0, 10.0), 0.95);
        assert_relative_eq!(locator.progress(500.0, 500.0), 0.5);
        assert_eq!(locator.progress(0.0, 0.0), 0.05);
    }

    #[test]
    fn test_never_searches_behind_watermark() {
        let locator = SegmentLocator::default();
        // sitting on stop 0 but stop 2 is already confirmed
        let pos = locator.locate(&fix(9.40, 77.80), &line(5), 2, SegmentPosition::default());
        assert_eq!(pos.segment_index, 2);
        assert_relative_eq!(pos.progress, 0.4, epsilon = 1e-3);
    }

    #[test]
    fn test_watermark_on_last_stop_uses_last_segment() {
        let locator = SegmentLocator::default();
        let pos = locator.locate(&fix(9.435, 77.80), &line(4), 3, SegmentPosition::default());
        assert_eq!(pos.segment_index, 2);
        assert_relative_eq!(pos.progress, 0.75, epsilon = 1e-3);
    }

    #[test]
    fn test_stop_without_coordinates_is_skipped() {
        let locator = SegmentLocator::default();
        let mut stops = line(4);
        stops[1].lat = f64::NAN;
        // segments 0 and 1 both touch stop 1
        let pos = locator.locate(&fix(9.41, 77.80), &stops, 0, SegmentPosition::default());
        assert_eq!(pos.segment_index, 2);
    }

    #[test]
    fn test_falls_back_to_previous() {
        let locator = SegmentLocator::default();
        let previous = SegmentPosition {
            segment_index: 1,
            progress: 0.4,
        };

        let mut stops = line(3);
        stops[1].lon = f64::NAN;
        assert_eq!(locator.locate(&fix(9.41, 77.80), &stops, 0, previous), previous);
        assert_eq!(locator.locate(&fix(9.41, 77.80), &line(1), 0, previous), previous);
        assert_eq!(locator.locate(&fix(f64::NAN, 77.80), &line(3), 0, previous), previous);
    }

    #[test]
    fn test_ties_keep_the_earlier_segment() {
        let locator = SegmentLocator::default();
        // exactly on stop 1, equally near segments 0 and 1
        let pos = locator.locate(&fix(9.41, 77.80), &line(3), 0, SegmentPosition::default());
        assert_eq!(pos.segment_index, 0);
        assert_relative_eq!(pos.progress, 0.95);
    }
}
