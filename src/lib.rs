//! # rd-nurse - Oneshot Level Checker
//!
//! rd-nurse checks Rhythm Doctor levels for oneshot mistakes. It replays the
//! nurse's (and Ian's) voice cues to work out every instant a player is
//! prompted to hit, then compares that against the oneshot beats the level
//! actually places.
//!
//! ## Core Features
//!
//! - **Cue Reconstruction**: `get`/`set`/`go`/`stop` and counted cues per voice
//! - **Beat Diffing**: uncued, missing and skipped hits
//! - **Skipshots, Freezeshots, Burnshots**: continuity checks against the cue
//!   pattern
//! - **Holds**: hits on hold releases and overlapping holds
//! - **Lenient Level Reader**: accepts the almost-JSON `.rdlevel` format
//!
//! ## Quick Start
//!
//! ### Checking a Level File
//!
//! ```no_run
//! use rd_nurse::{check_level, parse_level, CheckOptions};
//!
//! let text = std::fs::read_to_string("level.rdlevel").unwrap();
//! let level = parse_level(&text).unwrap();
//! let result = check_level(&level, &CheckOptions::default());
//!
//! for finding in result.findings() {
//!     println!("{}: {}", finding.kind.description(), level.time_index.format_time(finding.time));
//! }
//! ```
//!
//! ### Checking Hand-Built Cues
//!
//! ```rust
//! use rd_nurse::{check_level, CheckOptions, Cue, CueKind, CueSource, Level, OneshotBeat};
//!
//! let nurse = CueSource::Nurse;
//! let cues = vec![
//!     Cue::new(0.0, CueKind::GET, nurse),
//!     Cue::new(1.0, CueKind::SET, nurse),
//!     Cue::new(2.0, CueKind::Go, nurse),
//!     Cue::new(6.0, CueKind::Stop, nurse),
//! ];
//! // The pattern repeats every 2 seconds, one second after each get
//! let beats = vec![OneshotBeat::new(3.0), OneshotBeat::new(5.0)];
//!
//! let level = Level::from_parts(cues, beats, Vec::new());
//! assert!(check_level(&level, &CheckOptions::default()).is_empty());
//! ```
//!
//! ## Times
//!
//! All times are seconds from the start of the level. Comparisons go through
//! [`tolerance::almost_equal`], so values that differ only by floating point
//! noise are the same instant.

pub mod beat;
pub mod config;
pub mod cue;
pub mod error;
pub mod level;
pub mod rd_json;
pub mod report;
pub mod time_index;
pub mod tolerance;

pub use beat::{check_holds, check_oneshot_beats, BeatOffset, Hold, OneshotBeat};
pub use config::CheckOptions;
pub use cue::{play_cues, Cue, CueKind, CueSource, ExpectedBeat, PlayCuesResult};
pub use error::{LevelError, LevelResult};
pub use level::{parse_level, Level};
pub use report::{CheckResult, ErrorKind, Finding};
pub use time_index::TimeIndex;

use tracing::info;

/// Run every check on a decoded level
pub fn check_level(level: &Level, options: &CheckOptions) -> CheckResult {
    let played = play_cues(&level.cues, options);

    let mut result = check_oneshot_beats(&level.beats, &played.expected);
    result.merge(check_holds(&level.hits, &level.holds));
    result.invalid_cues = played.invalid_cues;
    result.normalize();

    info!(
        expected = played.expected.len(),
        findings = result.len(),
        has_burnshot = result.has_burnshot,
        "level checked"
    );
    result
}
