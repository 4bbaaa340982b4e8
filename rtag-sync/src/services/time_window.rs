//! Tag and playback window arithmetic

use chrono::{Duration, NaiveDateTime};

/// Absolute `[start, end]` window around a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// `[tag - before, tag + after]`
///
/// Offsets may be negative and are not validated here; run configuration
/// rejects windows whose length is not positive.
pub fn tag_window(tag: NaiveDateTime, before: i64, after: i64) -> TagWindow {
    TagWindow {
        start: tag - Duration::seconds(before),
        end: tag + Duration::seconds(after),
    }
}

/// How the durations of several fragments combine into one timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Consecutive fragments of one partition: durations add up
    Sequential,
    /// Synchronized fragments of several partitions: the longest wins
    Simultaneous,
}

/// One fragment's place on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSegment {
    pub begin: NaiveDateTime,
    /// Whole seconds
    pub duration: i64,
}

/// Resolved playback range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackWindow {
    /// Timeline origin (earliest fragment begin)
    pub origin: NaiveDateTime,
    pub total: i64,
    /// Seconds from origin
    pub start_sec: i64,
    /// Seconds from origin
    pub end_sec: i64,
    /// The requested range was empty and the full range is used instead
    pub reset: bool,
}

impl PlaybackWindow {
    pub fn abs_start(&self) -> NaiveDateTime {
        self.origin + Duration::seconds(self.start_sec)
    }

    pub fn abs_end(&self) -> NaiveDateTime {
        self.origin + Duration::seconds(self.end_sec)
    }
}

/// Resolve a relative playback request against a set of fragments
///
/// `0` means "natural boundary" for both ends. An empty range after clamping
/// falls back to the full range with a warning. Returns `None` only for an
/// empty fragment list.
pub fn playback_window(
    segments: &[TimelineSegment],
    start_sec: i64,
    end_sec: i64,
    mode: PlaybackMode,
) -> Option<PlaybackWindow> {
    let origin = segments.iter().map(|s| s.begin).min()?;
    let durations = segments.iter().map(|s| s.duration.max(0));
    let total: i64 = match mode {
        PlaybackMode::Sequential => durations.sum(),
        PlaybackMode::Simultaneous => durations.max().unwrap_or(0),
    };

    let final_start = start_sec.max(0);
    let final_end = if end_sec > 0 && end_sec <= total {
        end_sec
    } else {
        total
    };

    if final_start >= final_end {
        tracing::warn!(
            requested_start = start_sec,
            requested_end = end_sec,
            total,
            "Empty playback range, playing the full range instead"
        );
        return Some(PlaybackWindow {
            origin,
            total,
            start_sec: 0,
            end_sec: total,
            reset: true,
        });
    }

    Some(PlaybackWindow {
        origin,
        total,
        start_sec: final_start,
        end_sec: final_end,
        reset: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtag_common::time::{format_record_time, parse_record_time};

    fn t(s: &str) -> NaiveDateTime {
        parse_record_time(s).unwrap()
    }

    #[test]
    fn test_tag_window_scenario() {
        let window = tag_window(t("2025-12-27 16:28:10"), 5, 10);
        assert_eq!(format_record_time(&window.start), "2025-12-27 16:28:05");
        assert_eq!(format_record_time(&window.end), "2025-12-27 16:28:20");
    }

    #[test]
    fn test_tag_window_negative_offsets() {
        let window = tag_window(t("2025-12-27 16:28:10"), -2, 10);
        assert_eq!(format_record_time(&window.start), "2025-12-27 16:28:12");
        // Nonsensical input still produces a value
        let inverted = tag_window(t("2025-12-27 16:28:10"), -20, 5);
        assert!(inverted.start > inverted.end);
    }

    fn segments() -> Vec<TimelineSegment> {
        vec![
            TimelineSegment {
                begin: t("2025-12-27 16:28:05"),
                duration: 15,
            },
            TimelineSegment {
                begin: t("2025-12-27 16:28:05"),
                duration: 12,
            },
        ]
    }

    #[test]
    fn test_simultaneous_takes_max() {
        let w = playback_window(&segments(), 0, 0, PlaybackMode::Simultaneous).unwrap();
        assert_eq!(w.total, 15);
        assert_eq!((w.start_sec, w.end_sec), (0, 15));
        assert_eq!(format_record_time(&w.abs_end()), "2025-12-27 16:28:20");
    }

    #[test]
    fn test_sequential_sums() {
        let w = playback_window(&segments(), 3, 20, PlaybackMode::Sequential).unwrap();
        assert_eq!(w.total, 27);
        assert_eq!((w.start_sec, w.end_sec), (3, 20));
        assert!(!w.reset);
        assert_eq!(format_record_time(&w.abs_start()), "2025-12-27 16:28:08");
    }

    #[test]
    fn test_end_beyond_total_clamps() {
        let w = playback_window(&segments(), 0, 100, PlaybackMode::Simultaneous).unwrap();
        assert_eq!(w.end_sec, 15);
    }

    #[test]
    fn test_empty_range_resets_to_full() {
        let w = playback_window(&segments(), 12, 5, PlaybackMode::Simultaneous).unwrap();
        assert!(w.reset);
        assert_eq!((w.start_sec, w.end_sec), (0, 15));

        let beyond = playback_window(&segments(), 40, 0, PlaybackMode::Simultaneous).unwrap();
        assert!(beyond.reset);
        assert_eq!((beyond.start_sec, beyond.end_sec), (0, 15));
    }

    #[test]
    fn test_negative_start_clamps_to_zero() {
        let w = playback_window(&segments(), -5, 10, PlaybackMode::Simultaneous).unwrap();
        assert_eq!((w.start_sec, w.end_sec), (0, 10));
    }

    #[test]
    fn test_no_segments() {
        assert!(playback_window(&[], 0, 0, PlaybackMode::Sequential).is_none());
    }
}
