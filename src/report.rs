//! Finding taxonomy and result ordering
//!
//! Findings are semantic observations about a level, never failures. Each
//! one is a kind plus the time (in seconds) it was found at. Kinds have a
//! fixed priority that decides presentation order.

use crate::time_index::TimeIndex;
use crate::tolerance::{almost_equal, unique};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of finding, in presentation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A pending marker group does not form a recognizable pattern
    InvalidCue,
    UnexpectedSkipshot,
    OverlappingSkipshot,
    UnexpectedFreezeshot,
    OverlappingFreezeshot,
    UnexpectedBurnshot,
    OverlappingBurnshot,
    /// A beat with no corresponding expected instant
    UncuedHit,
    /// An expected instant that is both hit and skipped
    SkippedHit,
    /// An expected instant that is neither hit nor skipped
    MissingHit,
    HitOnHoldRelease,
    OverlappingHold,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::InvalidCue,
        ErrorKind::UnexpectedSkipshot,
        ErrorKind::OverlappingSkipshot,
        ErrorKind::UnexpectedFreezeshot,
        ErrorKind::OverlappingFreezeshot,
        ErrorKind::UnexpectedBurnshot,
        ErrorKind::OverlappingBurnshot,
        ErrorKind::UncuedHit,
        ErrorKind::SkippedHit,
        ErrorKind::MissingHit,
        ErrorKind::HitOnHoldRelease,
        ErrorKind::OverlappingHold,
    ];

    /// Machine-readable name
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidCue => "invalid_cue",
            ErrorKind::UnexpectedSkipshot => "unexpected_skipshot",
            ErrorKind::OverlappingSkipshot => "overlapping_skipshot",
            ErrorKind::UnexpectedFreezeshot => "unexpected_freezeshot",
            ErrorKind::OverlappingFreezeshot => "overlapping_freezeshot",
            ErrorKind::UnexpectedBurnshot => "unexpected_burnshot",
            ErrorKind::OverlappingBurnshot => "overlapping_burnshot",
            ErrorKind::UncuedHit => "uncued_hit",
            ErrorKind::SkippedHit => "skipped_hit",
            ErrorKind::MissingHit => "missing_hit",
            ErrorKind::HitOnHoldRelease => "hit_on_hold_release",
            ErrorKind::OverlappingHold => "overlapping_hold",
        }
    }

    /// Label used by the command-line report
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::InvalidCue => "Invalid cue",
            ErrorKind::UnexpectedSkipshot => "Unexpected skipshot",
            ErrorKind::OverlappingSkipshot => "Overlapping skipshots",
            ErrorKind::UnexpectedFreezeshot => "Unexpected freezeshot",
            ErrorKind::OverlappingFreezeshot => "Overlapping freezeshots",
            ErrorKind::UnexpectedBurnshot => "Unexpected burnshot",
            ErrorKind::OverlappingBurnshot => "Overlapping burnshots",
            ErrorKind::UncuedHit => "Uncued hit",
            ErrorKind::SkippedHit => "Skipped hit",
            ErrorKind::MissingHit => "Missing hit",
            ErrorKind::HitOnHoldRelease => "Hit on hold release",
            ErrorKind::OverlappingHold => "Overlapping holds",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: ErrorKind,
    pub time: f64,
}

/// Sort by kind priority then time, and drop tolerance-equal repeats.
pub fn sort_findings(findings: &mut Vec<Finding>) {
    findings.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.time.total_cmp(&b.time)));
    findings.dedup_by(|b, a| a.kind == b.kind && almost_equal(a.time, b.time));
}

/// Everything a check found, one sorted list per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub invalid_cues: Vec<f64>,
    pub unexpected_skipshots: Vec<f64>,
    pub overlapping_skipshots: Vec<f64>,
    pub unexpected_freezeshots: Vec<f64>,
    pub overlapping_freezeshots: Vec<f64>,
    pub unexpected_burnshots: Vec<f64>,
    pub overlapping_burnshots: Vec<f64>,
    pub uncued_hits: Vec<f64>,
    pub skipped_hits: Vec<f64>,
    pub missing_hits: Vec<f64>,
    pub hit_on_hold_release: Vec<f64>,
    pub overlapping_holds: Vec<f64>,
    /// Burnshot support is approximate, so callers may want to warn
    pub has_burnshot: bool,
}

impl CheckResult {
    pub fn times(&self, kind: ErrorKind) -> &[f64] {
        match kind {
            ErrorKind::InvalidCue => &self.invalid_cues,
            ErrorKind::UnexpectedSkipshot => &self.unexpected_skipshots,
            ErrorKind::OverlappingSkipshot => &self.overlapping_skipshots,
            ErrorKind::UnexpectedFreezeshot => &self.unexpected_freezeshots,
            ErrorKind::OverlappingFreezeshot => &self.overlapping_freezeshots,
            ErrorKind::UnexpectedBurnshot => &self.unexpected_burnshots,
            ErrorKind::OverlappingBurnshot => &self.overlapping_burnshots,
            ErrorKind::UncuedHit => &self.uncued_hits,
            ErrorKind::SkippedHit => &self.skipped_hits,
            ErrorKind::MissingHit => &self.missing_hits,
            ErrorKind::HitOnHoldRelease => &self.hit_on_hold_release,
            ErrorKind::OverlappingHold => &self.overlapping_holds,
        }
    }

    pub fn times_mut(&mut self, kind: ErrorKind) -> &mut Vec<f64> {
        match kind {
            ErrorKind::InvalidCue => &mut self.invalid_cues,
            ErrorKind::UnexpectedSkipshot => &mut self.unexpected_skipshots,
            ErrorKind::OverlappingSkipshot => &mut self.overlapping_skipshots,
            ErrorKind::UnexpectedFreezeshot => &mut self.unexpected_freezeshots,
            ErrorKind::OverlappingFreezeshot => &mut self.overlapping_freezeshots,
            ErrorKind::UnexpectedBurnshot => &mut self.unexpected_burnshots,
            ErrorKind::OverlappingBurnshot => &mut self.overlapping_burnshots,
            ErrorKind::UncuedHit => &mut self.uncued_hits,
            ErrorKind::SkippedHit => &mut self.skipped_hits,
            ErrorKind::MissingHit => &mut self.missing_hits,
            ErrorKind::HitOnHoldRelease => &mut self.hit_on_hold_release,
            ErrorKind::OverlappingHold => &mut self.overlapping_holds,
        }
    }

    /// Record a finding. Call [`CheckResult::normalize`] once done.
    pub fn push(&mut self, kind: ErrorKind, time: f64) {
        self.times_mut(kind).push(time);
    }

    /// Sort every list and drop tolerance-equal repeats
    pub fn normalize(&mut self) {
        for kind in ErrorKind::ALL {
            unique(self.times_mut(kind));
        }
    }

    /// Fold another partial result into this one
    pub fn merge(&mut self, other: CheckResult) {
        for kind in ErrorKind::ALL {
            self.times_mut(kind).extend_from_slice(other.times(kind));
        }
        self.has_burnshot |= other.has_burnshot;
        self.normalize();
    }

    /// Flat view ordered by kind priority then time
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings: Vec<Finding> = ErrorKind::ALL
            .iter()
            .flat_map(|&kind| self.times(kind).iter().map(move |&time| Finding { kind, time }))
            .collect();
        sort_findings(&mut findings);
        findings
    }

    pub fn len(&self) -> usize {
        ErrorKind::ALL.iter().map(|&kind| self.times(kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One `"<Description>: <bar>-<beat>, ..."` line per non-empty kind
    pub fn to_text(&self, time_index: &TimeIndex) -> String {
        let mut text = String::new();
        for kind in ErrorKind::ALL {
            let times = self.times(kind);
            if times.is_empty() {
                continue;
            }
            let positions: Vec<String> = times.iter().map(|&time| time_index.format_time(time)).collect();
            text.push_str(kind.description());
            text.push_str(": ");
            text.push_str(&positions.join(", "));
            text.push('\n');
        }
        text
    }
}
