//! Oneshot cue reconstruction
//!
//! Each voice source runs a small state machine over its cues:
//!
//! - `get` / `set` markers pile up as *pending*
//! - `go` closes the pending group into a repeating pattern and starts
//!   playing it
//! - `stop` ends the running pattern
//! - counted cues (`1`..`5`) close the pending group into a squareshot and
//!   emit that many discrete beats
//!
//! A running pattern is projected lazily with [`Projection`]; nothing is
//! materialized beyond the instant where the run is flushed.

use crate::config::CheckOptions;
use crate::tolerance::{almost_equal, unique};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Voice that speaks a cue. Each voice keeps its own pattern state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CueSource {
    Nurse,
    Ian,
}

impl CueSource {
    pub const ALL: [CueSource; 2] = [CueSource::Nurse, CueSource::Ian];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Get,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueKind {
    Marker(Marker),
    Go,
    Stop,
    /// Counted cue: emits this many squareshot beats
    Pulse(u32),
}

impl CueKind {
    pub const GET: CueKind = CueKind::Marker(Marker::Get);
    pub const SET: CueKind = CueKind::Marker(Marker::Set);

    /// Ordering among cues at the same instant: counts, go, stop, get, set
    fn rank(self) -> (u8, u32) {
        match self {
            CueKind::Pulse(count) => (0, count),
            CueKind::Go => (1, 0),
            CueKind::Stop => (2, 0),
            CueKind::Marker(Marker::Get) => (3, 0),
            CueKind::Marker(Marker::Set) => (4, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub time: f64,
    pub kind: CueKind,
    pub source: CueSource,
}

impl Cue {
    pub fn new(time: f64, kind: CueKind, source: CueSource) -> Self {
        Self { time, kind, source }
    }
}

/// Sort cues by time, then kind rank, then source
pub fn sort_cues(cues: &mut [Cue]) {
    cues.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
            .then_with(|| a.source.cmp(&b.source))
    });
}

/// A marker waiting for its group to be closed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingMarker {
    pub time: f64,
    pub marker: Marker,
}

/// Repeating beat layout: `offsets` within every `interval`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    pub interval: f64,
    pub offsets: Vec<f64>,
    /// Every repetition is announced by its own `get`
    pub squareshot: bool,
}

impl Pattern {
    /// Square pattern of one `get`/`set` pair, `tick` apart
    pub fn square(tick: f64) -> Self {
        Self {
            interval: 2.0 * tick,
            offsets: vec![tick],
            squareshot: true,
        }
    }

    /// Whether projecting this pattern yields any beats
    pub fn is_playable(&self) -> bool {
        self.interval > 0.0 && !self.offsets.is_empty()
    }

    pub fn is_square(&self) -> bool {
        self.squareshot && self.is_playable()
    }

    /// Spacing of squareshot beats: the `get` to `set` distance
    pub fn tick(&self) -> Option<f64> {
        if self.is_square() {
            self.offsets.first().copied()
        } else {
            None
        }
    }
}

/// A pattern being played since `start_time`
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub start_time: f64,
    pub pattern: Pattern,
}

/// Per-voice state for one reconstruction pass
#[derive(Debug, Clone, Default)]
pub struct Source {
    /// Running pattern; `None` while inactive
    pub active: Option<Run>,
    /// When the current pattern was last confirmed
    pub cue_time: Option<f64>,
    /// Last confirmed pattern
    pub pattern: Pattern,
    pub pending: Vec<PendingMarker>,
}

impl Source {
    pub fn start_time(&self) -> Option<f64> {
        self.active.as_ref().map(|run| run.start_time)
    }

    fn confirm(&mut self, time: f64, pattern: Pattern) {
        debug!(time, interval = pattern.interval, offsets = ?pattern.offsets, squareshot = pattern.squareshot, "pattern confirmed");
        self.cue_time = Some(time);
        self.pattern = pattern;
    }

    /// Project the running pattern up to `end_time` and deactivate
    fn stop(&mut self, end_time: f64, expected: &mut Vec<ExpectedBeat>) {
        if let Some(run) = self.active.take() {
            let before = expected.len();
            expected.extend(play_normal(&run, end_time));
            trace!(start = run.start_time, end = end_time, beats = expected.len() - before, "run flushed");
        }
    }
}

/// Outcome of closing a pending marker group
#[derive(Debug, Clone, PartialEq)]
pub enum CueResult {
    Replace(Pattern),
    /// Nothing pending; the previous pattern stays
    Keep,
    Error,
}

/// Close a pending marker group at `time`.
///
/// The group must start with a `get`, or consist of a single `set`. The
/// pattern interval is the minimal period of the `set` markers: for each
/// divisor `k` of the set count, smallest first, the sets are checked to
/// repeat every `k` markers at `len / (count / k)`.
pub fn check_cue(pending: &[PendingMarker], time: f64) -> CueResult {
    let Some(first) = pending.first() else {
        return CueResult::Keep;
    };

    if let [only] = pending {
        if only.marker == Marker::Set {
            let tick = time - only.time;
            if tick > 0.0 && !almost_equal(only.time, time) {
                return CueResult::Replace(Pattern::square(tick));
            }
            return CueResult::Error;
        }
    }

    if first.marker != Marker::Get {
        return CueResult::Error;
    }
    let start = first.time;
    let len = time - start;
    if !(len > 0.0) || almost_equal(start, time) {
        return CueResult::Error;
    }

    let mut gets = Vec::new();
    let mut sets = Vec::new();
    for marker in pending {
        match marker.marker {
            Marker::Get => gets.push(marker.time),
            Marker::Set if almost_equal(marker.time, start) => return CueResult::Error,
            Marker::Set => sets.push(marker.time),
        }
    }

    if sets.is_empty() {
        return CueResult::Replace(Pattern {
            interval: len,
            offsets: Vec::new(),
            squareshot: false,
        });
    }

    let count = sets.len();
    let (period, reps) = (1..=count)
        .filter(|k| count % k == 0)
        .map(|k| (k, count / k))
        .find(|&(k, reps)| {
            let interval = len / reps as f64;
            (k..count).all(|i| almost_equal(sets[i], sets[i - k] + interval))
        })
        .unwrap_or((count, 1));

    let interval = len / reps as f64;
    let squareshot = gets.len() == count
        && reps == count
        && gets
            .iter()
            .enumerate()
            .all(|(i, &get)| almost_equal(get, start + i as f64 * interval));

    CueResult::Replace(Pattern {
        interval,
        offsets: sets[..period].iter().map(|&set| set - start).collect(),
        squareshot,
    })
}

/// An instant a correct player is prompted for.
///
/// `prev` and `next` are the neighbouring instants of the same run; both are
/// `None` for squareshot beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedBeat {
    pub time: f64,
    pub prev: Option<f64>,
    pub next: Option<f64>,
}

impl ExpectedBeat {
    pub fn new(time: f64, prev: Option<f64>, next: Option<f64>) -> Self {
        Self { time, prev, next }
    }

    /// A beat with no neighbours
    pub fn single(time: f64) -> Self {
        Self::new(time, None, None)
    }
}

fn option_key(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NEG_INFINITY)
}

fn option_equal(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => almost_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Sort by time, then `next`, then `prev` (`None` first), and drop
/// tolerance-equal repeats.
pub fn sort_expected(expected: &mut Vec<ExpectedBeat>) {
    expected.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| option_key(a.next).total_cmp(&option_key(b.next)))
            .then_with(|| option_key(a.prev).total_cmp(&option_key(b.prev)))
    });
    expected.dedup_by(|b, a| {
        almost_equal(a.time, b.time) && option_equal(a.prev, b.prev) && option_equal(a.next, b.next)
    });
}

/// Lazy projection of a run: `start + group * interval + offset` for every
/// group and offset, offsets first.
///
/// Terms are produced while they are before `end_time` or tolerance-equal
/// to it.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    start_time: f64,
    interval: f64,
    offsets: &'a [f64],
    end_time: f64,
    group: u64,
    index: usize,
    prev: Option<f64>,
    done: bool,
}

impl<'a> Projection<'a> {
    pub fn new(start_time: f64, pattern: &'a Pattern, end_time: f64) -> Self {
        Self {
            start_time,
            interval: pattern.interval,
            offsets: &pattern.offsets,
            end_time,
            group: 0,
            index: 0,
            prev: None,
            done: !pattern.is_playable(),
        }
    }

    fn term(&self) -> f64 {
        self.start_time + self.group as f64 * self.interval + self.offsets[self.index]
    }

    fn advance(&mut self) {
        self.index += 1;
        if self.index == self.offsets.len() {
            self.index = 0;
            self.group += 1;
        }
    }
}

impl Iterator for Projection<'_> {
    type Item = ExpectedBeat;

    fn next(&mut self) -> Option<ExpectedBeat> {
        if self.done {
            return None;
        }
        let time = self.term();
        if !(time < self.end_time || almost_equal(time, self.end_time)) {
            self.done = true;
            return None;
        }
        self.advance();
        let beat = ExpectedBeat::new(time, self.prev, Some(self.term()));
        self.prev = Some(time);
        Some(beat)
    }
}

/// Project a run up to `end_time`
pub fn play_normal(run: &Run, end_time: f64) -> Projection<'_> {
    Projection::new(run.start_time, &run.pattern, end_time)
}

/// Squareshot beats for a counted cue at `start_time`.
///
/// Normally `count` beats one `tick` apart after the cue. Triangleshots
/// (multi-count cues only) squeeze the beats into the second tick after
/// the cue: `1.5 + i / count` ticks.
pub fn play_subdiv(
    start_time: f64,
    tick: f64,
    count: u32,
    triangleshot: bool,
) -> impl Iterator<Item = ExpectedBeat> {
    let triangle = triangleshot && count > 1;
    let total = count as f64;
    (0..count).map(move |i| {
        let i = i as f64;
        let ticks = if triangle { 1.5 + i / total } else { i + 1.0 };
        ExpectedBeat::single(start_time + tick * ticks)
    })
}

/// Reconstruction output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayCuesResult {
    /// Sorted and unique, see [`sort_expected`]
    pub expected: Vec<ExpectedBeat>,
    /// Sorted and unique
    pub invalid_cues: Vec<f64>,
}

/// Replay every cue and collect the beats a correct player is prompted for.
///
/// Cues are processed in the order given; callers decoding a level should
/// run [`sort_cues`] first. A `Go` with nothing pending and no earlier
/// playable pattern is an invalid cue.
pub fn play_cues(cues: &[Cue], options: &CheckOptions) -> PlayCuesResult {
    let mut expected = Vec::new();
    let mut invalid_cues = Vec::new();
    let mut sources: BTreeMap<CueSource, Source> = BTreeMap::new();

    for cue in cues {
        let id = if options.ignore_voice_source {
            CueSource::Nurse
        } else {
            cue.source
        };
        let source = sources.entry(id).or_default();
        let time = cue.time;

        match cue.kind {
            CueKind::Marker(marker) => source.pending.push(PendingMarker { time, marker }),
            CueKind::Go => {
                source.stop(time, &mut expected);
                let pending = std::mem::take(&mut source.pending);
                let started = match check_cue(&pending, time) {
                    CueResult::Replace(pattern) => {
                        source.confirm(time, pattern);
                        true
                    }
                    CueResult::Keep => source.pattern.interval > 0.0,
                    CueResult::Error => false,
                };
                if started {
                    source.active = Some(Run {
                        start_time: time,
                        pattern: source.pattern.clone(),
                    });
                } else {
                    debug!(time, source = ?id, "invalid cue at go");
                    invalid_cues.push(time);
                }
            }
            CueKind::Stop => source.stop(time, &mut expected),
            CueKind::Pulse(count) => {
                if options.interruptible_pattern {
                    source.stop(time, &mut expected);
                }
                let pending = std::mem::take(&mut source.pending);
                let square = match check_cue(&pending, time) {
                    CueResult::Replace(pattern) if pattern.is_square() => {
                        source.confirm(time, pattern);
                        true
                    }
                    CueResult::Keep => source.pattern.is_square(),
                    CueResult::Replace(_) | CueResult::Error => false,
                };
                match source.pattern.tick() {
                    Some(tick) if square => {
                        expected.extend(play_subdiv(time, tick, count, options.triangleshot));
                    }
                    _ => {
                        debug!(time, source = ?id, count, "invalid cue at count");
                        invalid_cues.push(time);
                    }
                }
            }
        }
    }

    sort_expected(&mut expected);
    unique(&mut invalid_cues);
    PlayCuesResult {
        expected,
        invalid_cues,
    }
}
