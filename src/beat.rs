//! Beat and hold diffing
//!
//! Compares the reconstructed [`ExpectedBeat`]s against the oneshot beats a
//! level actually places, and checks holds against literal hits.

use crate::cue::ExpectedBeat;
use crate::report::{CheckResult, ErrorKind};
use crate::tolerance::{almost_equal, contains_sorted, matching_range, unique};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Delay carried by a freezeshot or burnshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BeatOffset {
    /// Lands `delay` after the instant it matches
    Freezeshot { interval: f64, delay: f64 },
    /// Lands `delay` before the instant it matches
    Burnshot { interval: f64, delay: f64 },
}

impl BeatOffset {
    /// Signed distance from the matched instant to the landing
    pub fn shift(self) -> f64 {
        match self {
            BeatOffset::Freezeshot { delay, .. } => delay,
            BeatOffset::Burnshot { delay, .. } => -delay,
        }
    }

    /// Distance from the launching cue to the landing
    pub fn interval(self) -> f64 {
        match self {
            BeatOffset::Freezeshot { interval, .. } | BeatOffset::Burnshot { interval, .. } => interval,
        }
    }
}

/// A oneshot beat as placed in the level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OneshotBeat {
    /// Instant this beat must match in the expected sequence
    pub time: f64,
    pub skipshot: bool,
    pub offset: Option<BeatOffset>,
}

impl OneshotBeat {
    pub fn new(time: f64) -> Self {
        Self {
            time,
            skipshot: false,
            offset: None,
        }
    }

    pub fn skipshot(time: f64) -> Self {
        Self {
            skipshot: true,
            ..Self::new(time)
        }
    }

    pub fn with_offset(time: f64, offset: BeatOffset) -> Self {
        Self {
            offset: Some(offset),
            ..Self::new(time)
        }
    }

    pub fn shift(&self) -> f64 {
        self.offset.map_or(0.0, BeatOffset::shift)
    }

    /// When the player actually hits
    pub fn landing(&self) -> f64 {
        self.time + self.shift()
    }

    /// Instant that launched a freezeshot or burnshot
    pub fn cue_time(&self) -> Option<f64> {
        self.offset.map(|offset| self.landing() - offset.interval())
    }

    pub fn is_burnshot(&self) -> bool {
        matches!(self.offset, Some(BeatOffset::Burnshot { .. }))
    }
}

/// Sort beats by time, skipshot flag, cue time, then shift
pub fn sort_beats(beats: &mut [OneshotBeat]) {
    beats.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| a.skipshot.cmp(&b.skipshot))
            .then_with(|| {
                let a_cue = a.cue_time().unwrap_or(f64::NEG_INFINITY);
                let b_cue = b.cue_time().unwrap_or(f64::NEG_INFINITY);
                a_cue.total_cmp(&b_cue)
            })
            .then_with(|| a.shift().total_cmp(&b.shift()))
    });
}

/// A sustained input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hold {
    pub hit: f64,
    pub release: f64,
}

impl Hold {
    pub fn new(hit: f64, release: f64) -> Self {
        Self { hit, release }
    }
}

/// Sort holds by hit, then release
pub fn sort_holds(holds: &mut [Hold]) {
    holds.sort_by(|a, b| a.hit.total_cmp(&b.hit).then(a.release.total_cmp(&b.release)));
}

/// Classification of one oneshot beat
#[derive(Debug, Clone, Copy, PartialEq)]
enum BeatResult {
    Cued {
        time: f64,
        shift: f64,
        offset: Option<BeatOffset>,
        skips: Option<f64>,
    },
    Uncued {
        time: f64,
    },
    UnexpectedFreezeshot {
        time: f64,
    },
    UnexpectedBurnshot {
        time: f64,
    },
    UnexpectedSkipshot {
        time: f64,
    },
    OverlappingSkipshot {
        time: f64,
    },
}

fn add_beat(beat: &OneshotBeat, expected: &[ExpectedBeat]) -> BeatResult {
    let time = beat.time;
    let matches = &expected[matching_range(expected, |e| e.time, time)];
    if matches.is_empty() {
        return BeatResult::Uncued { time };
    }

    if let Some(offset) = beat.offset {
        let cue_time = beat.landing() - offset.interval();
        let launched = matches
            .iter()
            .filter_map(|m| m.prev)
            .any(|prev| almost_equal(prev, cue_time));
        if !launched {
            return match offset {
                BeatOffset::Freezeshot { .. } => BeatResult::UnexpectedFreezeshot { time },
                BeatOffset::Burnshot { .. } => BeatResult::UnexpectedBurnshot { time },
            };
        }
    }

    let skips = if beat.skipshot {
        let mut next = matches.iter().filter_map(|m| m.next);
        let Some(first) = next.next() else {
            return BeatResult::UnexpectedSkipshot { time };
        };
        if !next.all(|x| almost_equal(first, x)) {
            return BeatResult::OverlappingSkipshot { time };
        }
        Some(first)
    } else {
        None
    };

    BeatResult::Cued {
        time,
        shift: beat.shift(),
        offset: beat.offset,
        skips,
    }
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    time: f64,
    shift: f64,
    offset: Option<BeatOffset>,
}

fn overlap_kind(hit: &Hit, other: &Hit) -> ErrorKind {
    match hit.offset.or(other.offset) {
        Some(BeatOffset::Burnshot { .. }) => ErrorKind::OverlappingBurnshot,
        Some(BeatOffset::Freezeshot { .. }) | None => ErrorKind::OverlappingFreezeshot,
    }
}

/// Diff oneshot beats against the expected instants.
///
/// `expected` must be sorted by time, as produced by
/// [`crate::cue::play_cues`].
pub fn check_oneshot_beats(beats: &[OneshotBeat], expected: &[ExpectedBeat]) -> CheckResult {
    debug_assert!(expected.windows(2).all(|w| w[0].time <= w[1].time));

    let mut result = CheckResult {
        has_burnshot: beats.iter().any(OneshotBeat::is_burnshot),
        ..Default::default()
    };
    let mut hits: Vec<Hit> = Vec::new();
    let mut skipped: Vec<f64> = Vec::new();
    let mut uncued: Vec<f64> = Vec::new();

    for beat in beats {
        let outcome = add_beat(beat, expected);
        trace!(time = beat.time, ?outcome, "beat classified");
        match outcome {
            BeatResult::Cued {
                time,
                shift,
                offset,
                skips,
            } => {
                hits.push(Hit { time, shift, offset });
                skipped.extend(skips);
            }
            BeatResult::Uncued { time } => uncued.push(time),
            BeatResult::UnexpectedFreezeshot { time } => result.push(ErrorKind::UnexpectedFreezeshot, time),
            BeatResult::UnexpectedBurnshot { time } => result.push(ErrorKind::UnexpectedBurnshot, time),
            BeatResult::UnexpectedSkipshot { time } => result.push(ErrorKind::UnexpectedSkipshot, time),
            BeatResult::OverlappingSkipshot { time } => result.push(ErrorKind::OverlappingSkipshot, time),
        }
    }

    hits.sort_by(|a, b| a.time.total_cmp(&b.time));
    for hit in &hits {
        for other in &hits[matching_range(&hits, |h| h.time, hit.time)] {
            if !almost_equal(other.shift, hit.shift) {
                result.push(overlap_kind(hit, other), hit.time);
            }
        }
    }

    // An uncued beat may be where a freezeshot or burnshot lands
    let mut landings: Vec<f64> = hits.iter().map(|h| h.time + h.shift).collect();
    unique(&mut landings);
    for time in uncued {
        if !contains_sorted(&landings, time) {
            result.push(ErrorKind::UncuedHit, time);
        }
    }

    let hit_times: Vec<f64> = hits.iter().map(|h| h.time).collect();
    unique(&mut skipped);
    for beat in expected {
        let is_hit = contains_sorted(&hit_times, beat.time);
        let is_skipped = contains_sorted(&skipped, beat.time);
        match (is_hit, is_skipped) {
            (true, true) => result.push(ErrorKind::SkippedHit, beat.time),
            (false, false) => result.push(ErrorKind::MissingHit, beat.time),
            (true, false) | (false, true) => {}
        }
    }

    result.normalize();
    result
}

/// Check literal hits and holds against each other.
///
/// A hit on any hold's release is reported at the hit; a hold touching or
/// overlapping a later one is reported at its own hit.
pub fn check_holds(hits: &[f64], holds: &[Hold]) -> CheckResult {
    let mut result = CheckResult::default();

    let mut releases: Vec<f64> = holds.iter().map(|h| h.release).collect();
    releases.sort_by(f64::total_cmp);
    for &hit in hits {
        if contains_sorted(&releases, hit) {
            result.push(ErrorKind::HitOnHoldRelease, hit);
        }
    }

    let mut sorted = holds.to_vec();
    sort_holds(&mut sorted);
    for (i, hold) in sorted.iter().enumerate() {
        let overlaps = sorted[i + 1..]
            .iter()
            .take_while(|later| later.hit < hold.release || almost_equal(later.hit, hold.release))
            .next()
            .is_some();
        if overlaps {
            result.push(ErrorKind::OverlappingHold, hold.hit);
        }
    }

    result.normalize();
    result
}
