//! Bar / beat / time conversion
//!
//! Levels are authored in bars and beats, while the checker works in
//! seconds. Two piecewise-linear tables bridge the three coordinate systems:
//!
//! - the bar table maps 0-based bars to beats (rate: crotchets per bar)
//! - the tempo table maps 0-based beats to seconds (rate: seconds per beat)
//!
//! Lookups are an upper-bound binary search for the last breakpoint at or
//! before the query, followed by linear interpolation at that breakpoint's
//! rate.

use crate::tolerance::almost_equal;
use tracing::warn;

/// Crotchets per bar until the level says otherwise
pub const DEFAULT_CROTCHETS_PER_BAR: f64 = 8.0;

/// Tempo used when the level has no `PlaySong` event
pub const DEFAULT_BPM: f64 = 100.0;

/// A point where the rate of a table changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Input coordinate where this segment begins
    pub key: f64,
    /// Output coordinate accumulated up to `key`
    pub value: f64,
    /// Output units per input unit from `key` on
    pub rate: f64,
}

/// Sorted breakpoint table, strictly monotone in both key and value.
///
/// Always holds at least the implicit `{0, 0, default}` breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoints {
    points: Vec<Breakpoint>,
}

impl Breakpoints {
    /// Build a table from `(key, rate)` changes.
    ///
    /// Later changes at the same key win, consecutive equal rates collapse,
    /// and rates that are not positive and finite are dropped.
    pub fn from_changes(default_rate: f64, changes: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut ordered: Vec<(f64, f64)> = std::iter::once((0.0, default_rate))
            .chain(changes)
            .filter(|&(key, rate)| {
                let usable = key.is_finite() && rate.is_finite() && rate > 0.0;
                if !usable {
                    warn!(key, rate, "ignoring unusable rate change");
                }
                usable
            })
            .collect();
        // Stable, so same-key changes stay in authoring order
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut points: Vec<Breakpoint> = Vec::with_capacity(ordered.len());
        for (i, &(key, rate)) in ordered.iter().enumerate() {
            if ordered.get(i + 1).is_some_and(|next| next.0 == key) {
                continue;
            }
            match points.last() {
                Some(last) if almost_equal(last.rate, rate) => continue,
                Some(last) => points.push(Breakpoint {
                    key,
                    value: last.value + (key - last.key) * last.rate,
                    rate,
                }),
                None => points.push(Breakpoint { key, value: 0.0, rate }),
            }
        }
        if points.is_empty() {
            points.push(Breakpoint {
                key: 0.0,
                value: 0.0,
                rate: 1.0,
            });
        }
        Self { points }
    }

    /// All breakpoints in key order
    pub fn points(&self) -> &[Breakpoint] {
        &self.points
    }

    fn segment_for_key(&self, key: f64) -> &Breakpoint {
        let idx = self.points.partition_point(|p| p.key <= key);
        &self.points[idx.saturating_sub(1)]
    }

    fn segment_for_value(&self, value: f64) -> &Breakpoint {
        let idx = self.points.partition_point(|p| p.value <= value);
        &self.points[idx.saturating_sub(1)]
    }

    /// Map a key to its value
    pub fn forward(&self, key: f64) -> f64 {
        let p = self.segment_for_key(key);
        p.value + (key - p.key) * p.rate
    }

    /// Map a value back to its key
    pub fn inverse(&self, value: f64) -> f64 {
        let p = self.segment_for_value(value);
        p.key + (value - p.value) / p.rate
    }

    /// Rate in effect at `key`
    pub fn rate_at(&self, key: f64) -> f64 {
        self.segment_for_key(key).rate
    }
}

/// The pair of tables a level is timed by
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndex {
    bars: Breakpoints,
    tempo: Breakpoints,
}

impl Default for TimeIndex {
    fn default() -> Self {
        Self {
            bars: Breakpoints::from_changes(DEFAULT_CROTCHETS_PER_BAR, []),
            tempo: Breakpoints::from_changes(60.0 / DEFAULT_BPM, []),
        }
    }
}

impl TimeIndex {
    pub fn new(bars: Breakpoints, tempo: Breakpoints) -> Self {
        Self { bars, tempo }
    }

    pub fn bars(&self) -> &Breakpoints {
        &self.bars
    }

    pub fn tempo(&self) -> &Breakpoints {
        &self.tempo
    }

    /// Beat at the start of a 0-based (possibly fractional) bar
    pub fn bar_to_beat(&self, bar: f64) -> f64 {
        self.bars.forward(bar)
    }

    /// Split a beat into a whole 0-based bar and the beat within that bar
    pub fn beat_to_bar(&self, beat: f64) -> (f64, f64) {
        let p = self.bars.segment_for_value(beat);
        let offset = beat - p.value;
        let within = offset % p.rate;
        (p.key + (offset - within) / p.rate, within)
    }

    /// Seconds at a 0-based beat
    pub fn beat_to_time(&self, beat: f64) -> f64 {
        self.tempo.forward(beat)
    }

    /// 0-based beat at a time in seconds
    pub fn time_to_beat(&self, time: f64) -> f64 {
        self.tempo.inverse(time)
    }

    pub fn crotchets_per_bar(&self, bar: f64) -> f64 {
        self.bars.rate_at(bar)
    }

    pub fn seconds_per_beat(&self, beat: f64) -> f64 {
        self.tempo.rate_at(beat)
    }

    /// Human-readable position of a time, e.g. `"3-2.5"` (1-based bar and beat)
    pub fn format_time(&self, time: f64) -> String {
        let (bar, beat) = self.beat_to_bar(self.time_to_beat(time));
        format_time(bar, beat)
    }
}

/// Format a 0-based bar/beat pair as `"<bar+1>-<beat+1>"`, beat rounded to
/// three decimals.
pub fn format_time(bar: f64, beat: f64) -> String {
    let beat = ((beat + 1.0) * 1000.0).round() / 1000.0;
    format!("{}-{}", bar + 1.0, beat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> TimeIndex {
        // 8/bar, then 4/bar from bar 2, then 7/bar from bar 5
        let bars = Breakpoints::from_changes(8.0, [(2.0, 4.0), (5.0, 7.0)]);
        // 100 bpm, then 120 bpm from beat 10, then 60 bpm from beat 30
        let tempo = Breakpoints::from_changes(0.6, [(10.0, 0.5), (30.0, 1.0)]);
        TimeIndex::new(bars, tempo)
    }

    #[test]
    fn test_breakpoints_accumulate() {
        let index = index();
        let bars = index.bars().points();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1], Breakpoint { key: 2.0, value: 16.0, rate: 4.0 });
        assert_eq!(bars[2], Breakpoint { key: 5.0, value: 28.0, rate: 7.0 });

        let tempo = index.tempo().points();
        assert!(almost_equal(tempo[1].value, 6.0));
        assert!(almost_equal(tempo[2].value, 16.0));
    }

    #[test]
    fn test_duplicate_rates_collapse() {
        let table = Breakpoints::from_changes(8.0, [(1.0, 8.0), (3.0, 4.0), (4.0, 4.0)]);
        assert_eq!(table.points().len(), 2);
        assert_eq!(table.points()[1].key, 3.0);
    }

    #[test]
    fn test_later_change_at_same_key_wins() {
        let table = Breakpoints::from_changes(8.0, [(0.0, 3.0), (2.0, 5.0), (2.0, 6.0)]);
        assert_eq!(table.points()[0].rate, 3.0);
        assert_eq!(table.rate_at(2.5), 6.0);
    }

    #[test]
    fn test_unusable_rates_are_ignored() {
        let table = Breakpoints::from_changes(8.0, [(1.0, 0.0), (2.0, f64::NAN), (3.0, -4.0)]);
        assert_eq!(table.points().len(), 1);
    }

    #[test]
    fn test_bar_to_beat() {
        let index = index();
        assert_eq!(index.bar_to_beat(0.0), 0.0);
        assert_eq!(index.bar_to_beat(1.0), 8.0);
        assert_eq!(index.bar_to_beat(3.0), 20.0);
        assert_eq!(index.bar_to_beat(6.0), 35.0);
    }

    #[test]
    fn test_beat_to_bar() {
        let index = index();
        assert_eq!(index.beat_to_bar(0.0), (0.0, 0.0));
        assert_eq!(index.beat_to_bar(9.5), (1.0, 1.5));
        assert_eq!(index.beat_to_bar(17.0), (2.0, 1.0));
        assert_eq!(index.beat_to_bar(30.0), (5.0, 2.0));
    }

    #[test]
    fn test_query_before_first_breakpoint() {
        let index = TimeIndex::default();
        assert!(almost_equal(index.beat_to_time(-1.0), -0.6));
        assert!(almost_equal(index.time_to_beat(-0.6), -1.0));
    }

    #[test]
    fn test_bar_round_trip() {
        let index = index();
        for bar in 0..12 {
            let bar = bar as f64;
            let (back, within) = index.beat_to_bar(index.bar_to_beat(bar));
            assert!(almost_equal(back, bar), "bar {bar} came back as {back}");
            assert_eq!(within, 0.0);
        }
    }

    #[test]
    fn test_time_round_trip() {
        let index = index();
        for step in 0..200 {
            let beat = step as f64 * 0.25;
            let back = index.time_to_beat(index.beat_to_time(beat));
            assert!(almost_equal(back, beat), "beat {beat} came back as {back}");
        }
    }

    #[test]
    fn test_rates() {
        let index = index();
        assert_eq!(index.crotchets_per_bar(4.0), 4.0);
        assert_eq!(index.seconds_per_beat(12.0), 0.5);
        assert_eq!(index.seconds_per_beat(5.0), 0.6);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0, 0.0), "1-1");
        assert_eq!(format_time(2.0, 1.5), "3-2.5");
        assert_eq!(format_time(4.0, 1.0 / 3.0), "5-1.333");
    }

    #[test]
    fn test_format_time_from_seconds() {
        let index = TimeIndex::default();
        // 100 bpm, 8 beats per bar: 4.8s is bar 1, beat 0
        assert_eq!(index.format_time(4.8), "2-1");
        assert_eq!(index.format_time(0.9), "1-2.5");
    }
}
