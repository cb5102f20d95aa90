//! Cue replay against hand-checked expectations

use rd_nurse::tolerance::almost_equal;
use rd_nurse::{play_cues, CheckOptions, Cue, CueKind, CueSource, ExpectedBeat};

const NURSE: CueSource = CueSource::Nurse;
const IAN: CueSource = CueSource::Ian;

fn cue(time: f64, kind: CueKind, source: CueSource) -> Cue {
    Cue::new(time, kind, source)
}

fn get(time: f64) -> Cue {
    cue(time, CueKind::GET, NURSE)
}

fn set(time: f64) -> Cue {
    cue(time, CueKind::SET, NURSE)
}

fn go(time: f64) -> Cue {
    cue(time, CueKind::Go, NURSE)
}

fn stop(time: f64) -> Cue {
    cue(time, CueKind::Stop, NURSE)
}

fn count(time: f64, n: u32) -> Cue {
    cue(time, CueKind::Pulse(n), NURSE)
}

fn beat(time: f64, prev: Option<f64>, next: Option<f64>) -> ExpectedBeat {
    ExpectedBeat::new(time, prev, next)
}

fn same(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => almost_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn assert_expected(actual: &[ExpectedBeat], expected: &[ExpectedBeat]) {
    assert_eq!(actual.len(), expected.len(), "\nactual:   {actual:?}\nexpected: {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            almost_equal(a.time, e.time) && same(a.prev, e.prev) && same(a.next, e.next),
            "{a:?} != {e:?}\nactual:   {actual:?}"
        );
    }
}

#[test]
fn test_correct_cues() {
    let cues = vec![
        stop(1.0),
        get(2.0),
        set(3.0),
        go(4.0),
        stop(7.0),
        set(11.0),
        go(12.0),
        get(14.0),
        set(15.5),
        go(16.0),
        get(18.0),
        set(18.5),
        get(19.0),
        set(19.5),
        go(20.0),
        get(22.0),
        set(22.5),
        get(22.75),
        set(23.25),
        set(23.5),
        go(24.0),
        get(26.0),
        set(27.0),
        go(28.0),
        count(32.0, 1),
        count(33.5, 2),
        stop(39.0),
    ];
    let options = CheckOptions {
        triangleshot: true,
        ..Default::default()
    };
    let result = play_cues(&cues, &options);

    assert!(result.invalid_cues.is_empty(), "{:?}", result.invalid_cues);
    assert_expected(
        &result.expected,
        &[
            beat(5.0, None, Some(7.0)),
            beat(7.0, Some(5.0), Some(9.0)),
            beat(13.0, None, Some(15.0)),
            beat(15.0, Some(13.0), Some(17.0)),
            beat(17.5, None, Some(19.5)),
            beat(19.5, Some(17.5), Some(21.5)),
            beat(20.5, None, Some(21.5)),
            beat(21.5, Some(20.5), Some(22.5)),
            beat(22.5, Some(21.5), Some(23.5)),
            beat(23.5, Some(22.5), Some(24.5)),
            beat(24.5, None, Some(25.25)),
            beat(25.25, Some(24.5), Some(25.5)),
            beat(25.5, Some(25.25), Some(26.5)),
            beat(26.5, Some(25.5), Some(27.25)),
            beat(27.25, Some(26.5), Some(27.5)),
            beat(27.5, Some(27.25), Some(28.5)),
            beat(29.0, None, Some(31.0)),
            beat(31.0, Some(29.0), Some(33.0)),
            beat(33.0, None, None),
            beat(33.0, Some(31.0), Some(35.0)),
            beat(35.0, None, None),
            beat(35.0, Some(33.0), Some(37.0)),
            beat(35.5, None, None),
            beat(37.0, Some(35.0), Some(39.0)),
            beat(39.0, Some(37.0), Some(41.0)),
        ],
    );
}

#[test]
fn test_incorrect_cues() {
    let cues = vec![
        go(0.0),
        count(1.0, 1),
        set(2.0),
        set(3.0),
        go(4.0),
        get(5.0),
        go(6.0),
        stop(7.0),
        get(8.0),
        set(9.0),
        get(9.5),
        set(10.5),
        count(12.0, 1),
        get(14.0),
        set(14.0),
        count(16.0, 1),
    ];
    let result = play_cues(&cues, &CheckOptions::default());

    assert!(result.expected.is_empty(), "{:?}", result.expected);
    assert_eq!(result.invalid_cues, vec![0.0, 1.0, 4.0, 12.0, 16.0]);
}

#[test]
fn test_sources_are_separate() {
    let cues = vec![
        get(2.0),
        cue(3.0, CueKind::SET, IAN),
        count(4.0, 1),
        cue(6.0, CueKind::Pulse(1), IAN),
    ];
    let result = play_cues(&cues, &CheckOptions::default());

    // Nurse has a lone get; Ian's lone set is a square pattern with tick 3
    assert_eq!(result.invalid_cues, vec![4.0]);
    assert_expected(&result.expected, &[beat(9.0, None, None)]);
}

#[test]
fn test_ignore_voice_source() {
    let cues = vec![
        get(2.0),
        cue(3.0, CueKind::SET, IAN),
        count(4.0, 1),
        cue(6.0, CueKind::Pulse(1), IAN),
    ];
    let options = CheckOptions {
        ignore_voice_source: true,
        ..Default::default()
    };
    let result = play_cues(&cues, &options);

    assert!(result.invalid_cues.is_empty());
    assert_expected(&result.expected, &[beat(5.0, None, None), beat(7.0, None, None)]);
}

#[test]
fn test_counted_cue_keeps_pattern_running() {
    let cues = vec![get(2.0), set(3.0), go(4.0), count(8.0, 1), stop(11.0)];
    let result = play_cues(&cues, &CheckOptions::default());

    assert!(result.invalid_cues.is_empty());
    assert_expected(
        &result.expected,
        &[
            beat(5.0, None, Some(7.0)),
            beat(7.0, Some(5.0), Some(9.0)),
            beat(9.0, None, None),
            beat(9.0, Some(7.0), Some(11.0)),
            beat(11.0, Some(9.0), Some(13.0)),
        ],
    );
}

#[test]
fn test_interruptible_pattern() {
    let cues = vec![get(2.0), set(3.0), go(4.0), count(8.0, 1), stop(11.0)];
    let options = CheckOptions {
        interruptible_pattern: true,
        ..Default::default()
    };
    let result = play_cues(&cues, &options);

    assert!(result.invalid_cues.is_empty());
    assert_expected(
        &result.expected,
        &[
            beat(5.0, None, Some(7.0)),
            beat(7.0, Some(5.0), Some(9.0)),
            beat(9.0, None, None),
        ],
    );
}

#[test]
fn test_triangleshot() {
    let cues = vec![get(2.0), set(3.0), count(4.0, 1), count(5.5, 2)];

    let options = CheckOptions {
        triangleshot: true,
        ..Default::default()
    };
    let result = play_cues(&cues, &options);
    assert!(result.invalid_cues.is_empty());
    assert_expected(
        &result.expected,
        &[beat(5.0, None, None), beat(7.0, None, None), beat(7.5, None, None)],
    );

    let result = play_cues(&cues, &CheckOptions::default());
    assert!(result.invalid_cues.is_empty());
    assert_expected(
        &result.expected,
        &[beat(5.0, None, None), beat(6.5, None, None), beat(7.5, None, None)],
    );
}

#[test]
fn test_go_without_any_pattern_then_stop() {
    let result = play_cues(&[go(3.0), stop(3.0)], &CheckOptions::default());
    assert!(result.expected.is_empty());
    assert_eq!(result.invalid_cues, vec![3.0]);
}

#[test]
fn test_bare_go_restarts_previous_pattern() {
    let cues = vec![get(2.0), set(3.0), go(4.0), stop(6.0), go(10.0), stop(13.0)];
    let result = play_cues(&cues, &CheckOptions::default());

    assert!(result.invalid_cues.is_empty());
    assert_expected(
        &result.expected,
        &[
            beat(5.0, None, Some(7.0)),
            beat(11.0, None, Some(13.0)),
            beat(13.0, Some(11.0), Some(15.0)),
        ],
    );
}

#[test]
fn test_restarting_go_flushes_previous_run() {
    let cues = vec![get(0.0), set(1.0), go(2.0), get(4.0), set(4.5), go(5.0), stop(7.0)];
    let result = play_cues(&cues, &CheckOptions::default());

    assert!(result.invalid_cues.is_empty());
    assert_expected(
        &result.expected,
        &[
            beat(3.0, None, Some(5.0)),
            beat(5.0, Some(3.0), Some(7.0)),
            beat(5.5, None, Some(6.5)),
            beat(6.5, Some(5.5), Some(7.5)),
        ],
    );
}

#[test]
fn test_count_closing_extra_sets_is_invalid() {
    let cues = vec![get(0.0), set(0.5), set(1.0), count(2.0, 1)];
    let result = play_cues(&cues, &CheckOptions::default());

    assert!(result.expected.is_empty());
    assert_eq!(result.invalid_cues, vec![2.0]);
}
