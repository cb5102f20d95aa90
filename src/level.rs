//! Level decoding
//!
//! Turns `.rdlevel` text into the timed cues, oneshot beats, literal hits and
//! holds the checker works on. Only the events that affect oneshot timing
//! are decoded; everything else is ignored.

use crate::beat::{sort_beats, sort_holds, BeatOffset, Hold, OneshotBeat};
use crate::cue::{sort_cues, Cue, CueKind, CueSource};
use crate::error::{LevelError, LevelResult};
use crate::rd_json::parse_rd_json;
use crate::time_index::{Breakpoints, TimeIndex, DEFAULT_BPM, DEFAULT_CROTCHETS_PER_BAR};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Everything the checker needs from a level, in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Level {
    pub time_index: TimeIndex,
    /// Sorted with [`sort_cues`]
    pub cues: Vec<Cue>,
    /// Sorted with [`sort_beats`]
    pub beats: Vec<OneshotBeat>,
    /// Every literal hit, ascending
    pub hits: Vec<f64>,
    /// Sorted with [`sort_holds`]
    pub holds: Vec<Hold>,
}

impl Level {
    /// Build a level at the default tempo from already decoded parts.
    ///
    /// The literal hits are the landing times of `beats`.
    pub fn from_parts(mut cues: Vec<Cue>, mut beats: Vec<OneshotBeat>, mut holds: Vec<Hold>) -> Self {
        sort_cues(&mut cues);
        sort_beats(&mut beats);
        sort_holds(&mut holds);
        let mut hits: Vec<f64> = beats.iter().map(OneshotBeat::landing).collect();
        hits.sort_by(f64::total_cmp);
        Self {
            time_index: TimeIndex::default(),
            cues,
            beats,
            hits,
            holds,
        }
    }
}

/// JavaScript-style truthiness, as the game applies it to level fields
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRow {
    row: i64,
    #[serde(default)]
    mute_beats: Value,
}

/// Fields shared by every event
#[derive(Debug, Deserialize)]
struct EventHeader {
    #[serde(default = "first")]
    bar: f64,
    #[serde(default = "first")]
    beat: f64,
    #[serde(default)]
    row: Option<i64>,
    #[serde(default, rename = "if")]
    condition: Value,
    #[serde(default)]
    tag: Value,
    #[serde(default)]
    active: Value,
}

impl EventHeader {
    fn is_active(&self) -> bool {
        self.active != Value::Bool(false)
    }

    fn is_conditional(&self) -> bool {
        truthy(&self.condition) || truthy(&self.tag)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetCrotchetsPerBar {
    crotchets_per_bar: f64,
}

#[derive(Debug, Deserialize)]
struct PlaySong {
    bpm: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetBeatsPerMinute {
    beats_per_minute: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SayReadyGetSetGo {
    tick: f64,
    #[serde(default)]
    phrase_to_say: Option<String>,
    #[serde(default)]
    voice_source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddOneshotBeat {
    tick: f64,
    #[serde(default)]
    loops: u32,
    #[serde(default)]
    interval: f64,
    #[serde(default)]
    delay: f64,
    #[serde(default)]
    skipshot: bool,
    #[serde(default)]
    freeze_burn_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddClassicBeat {
    tick: f64,
    #[serde(default)]
    hold: f64,
}

#[derive(Debug, Deserialize)]
struct AddFreeTimeBeat {
    pulse: i64,
    #[serde(default)]
    hold: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
enum PulseAction {
    Decrement,
    Custom,
    Remove,
    #[default]
    #[serde(other)]
    Increment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PulseFreeTimeBeat {
    #[serde(default)]
    action: PulseAction,
    #[serde(default)]
    custom_pulse: i64,
    #[serde(default)]
    hold: f64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum EventBody {
    SetCrotchetsPerBar(SetCrotchetsPerBar),
    PlaySong(PlaySong),
    SetBeatsPerMinute(SetBeatsPerMinute),
    SayReadyGetSetGo(SayReadyGetSetGo),
    AddOneshotBeat(AddOneshotBeat),
    AddClassicBeat(AddClassicBeat),
    AddFreeTimeBeat(AddFreeTimeBeat),
    PulseFreeTimeBeat(PulseFreeTimeBeat),
    FinishLevel,
    #[serde(other)]
    Other,
}

#[derive(Debug)]
struct Event {
    header: EventHeader,
    body: EventBody,
}

fn decode_event(index: usize, value: Value) -> Option<Event> {
    let header = match EventHeader::deserialize(&value) {
        Ok(header) => header,
        Err(e) => {
            warn!(index, error = %e, "skipping event with unreadable position");
            return None;
        }
    };
    match EventBody::deserialize(&value) {
        Ok(body) => Some(Event { header, body }),
        Err(e) => {
            warn!(index, bar = header.bar, error = %e, "skipping undecodable event");
            None
        }
    }
}

/// Cues spoken by a `SayReadyGetSetGo` phrase, one per tick; `None` is a
/// syllable that is not a cue
fn phrase_cues(phrase: &str) -> &'static [Option<CueKind>] {
    const GET: Option<CueKind> = Some(CueKind::GET);
    const SET: Option<CueKind> = Some(CueKind::SET);
    const GO: Option<CueKind> = Some(CueKind::Go);
    const STOP: Option<CueKind> = Some(CueKind::Stop);
    const ONE: Option<CueKind> = Some(CueKind::Pulse(1));
    match phrase {
        "SayReaDyGetSetGoNew" => &[GET, SET, GET, SET, GO],
        "SayGetSetGo" => &[GET, SET, GO],
        "SayReaDyGetSetOne" => &[GET, SET, GET, SET, ONE],
        "SayGetSetOne" => &[GET, SET, ONE],
        "JustSayRea" | "JustSayGet" => &[GET],
        "JustSayDy" | "JustSaySet" => &[SET],
        "JustSayGo" => &[GO],
        "JustSayStop" | "JustSayAndStop" => &[STOP],
        "Count1" => &[ONE],
        "Count2" => &[Some(CueKind::Pulse(2))],
        "Count3" => &[Some(CueKind::Pulse(3))],
        "Count4" => &[Some(CueKind::Pulse(4))],
        "Count5" => &[Some(CueKind::Pulse(5))],
        "SayReadyGetSetGo" => &[None, None, GET, SET, GO],
        _ => &[],
    }
}

fn voice_source(voice: &str) -> CueSource {
    match voice {
        "IanExcited" | "IanCalm" | "IanSlow" => CueSource::Ian,
        _ => CueSource::Nurse,
    }
}

/// A free-time beat waiting for its pulses
#[derive(Debug, Clone, Copy)]
struct Freetime {
    /// Beat offset from the naive `bar * cpb + beat` position
    offset: f64,
    crotchets_per_bar: f64,
    beat: f64,
    pulse: i64,
}

#[derive(Default)]
struct LevelBuilder {
    time_index: TimeIndex,
    enabled_rows: HashSet<i64>,
    cues: Vec<Cue>,
    beats: Vec<OneshotBeat>,
    hits: Vec<f64>,
    holds: Vec<Hold>,
    freetimes: Vec<Freetime>,
}

impl LevelBuilder {
    fn row_enabled(&self, header: &EventHeader) -> bool {
        header.row.is_some_and(|row| self.enabled_rows.contains(&row))
    }

    fn add_classic_beat(&mut self, beat: f64, hold: f64) {
        let hit = self.time_index.beat_to_time(beat);
        if hold != 0.0 {
            let release = self.time_index.beat_to_time(beat + hold);
            self.holds.push(Hold { hit, release });
        } else {
            self.hits.push(hit);
        }
    }

    fn say(&mut self, beat: f64, event: &SayReadyGetSetGo) {
        let time = self.time_index.beat_to_time(beat);
        let spb = self.time_index.seconds_per_beat(beat);
        let phrase = event.phrase_to_say.as_deref().unwrap_or("SayReadyGetSetGo");
        let source = voice_source(event.voice_source.as_deref().unwrap_or("Nurse"));
        for (pos, kind) in phrase_cues(phrase).iter().enumerate() {
            if let Some(kind) = *kind {
                self.cues.push(Cue::new(time + event.tick * pos as f64 * spb, kind, source));
            }
        }
    }

    fn add_oneshot_beat(&mut self, beat: f64, event: &AddOneshotBeat) {
        let time = self.time_index.beat_to_time(beat);
        let spb = self.time_index.seconds_per_beat(beat);
        for pos in 0..=event.loops {
            let start = time + event.interval * pos as f64 * spb;
            let interval = event.interval * spb;
            let delay = event.delay * spb;
            let offset = match event.freeze_burn_mode.as_deref() {
                _ if event.delay == 0.0 => None,
                Some("Burnshot") => Some(BeatOffset::Burnshot { interval, delay }),
                Some("Freezeshot") | None => Some(BeatOffset::Freezeshot { interval, delay }),
                Some(_) => None,
            };
            let matched = match offset {
                Some(offset) => start + interval - offset.shift(),
                None => start + event.tick * spb,
            };
            let beat = OneshotBeat {
                time: matched,
                skipshot: event.skipshot && pos == event.loops,
                offset,
            };
            self.hits.push(beat.landing());
            self.beats.push(beat);
        }
    }

    fn add_free_time_beat(&mut self, header: &EventHeader, beat: f64, event: &AddFreeTimeBeat) {
        if event.pulse == 6 {
            self.add_classic_beat(beat, event.hold);
            return;
        }
        let crotchets_per_bar = self.time_index.crotchets_per_bar(header.bar - 1.0);
        self.freetimes.push(Freetime {
            offset: beat - (header.bar * crotchets_per_bar + header.beat),
            crotchets_per_bar,
            beat,
            pulse: event.pulse,
        });
    }

    fn pulse_free_time_beats(&mut self, header: &EventHeader, event: &PulseFreeTimeBeat) {
        let mut waiting = Vec::with_capacity(self.freetimes.len());
        for mut freetime in std::mem::take(&mut self.freetimes) {
            let beat = freetime.offset + header.bar * freetime.crotchets_per_bar + header.beat;
            if beat > freetime.beat {
                match event.action {
                    PulseAction::Increment => freetime.pulse += 1,
                    PulseAction::Decrement if freetime.pulse != 0 => freetime.pulse -= 1,
                    PulseAction::Decrement => {}
                    PulseAction::Custom => freetime.pulse = event.custom_pulse,
                    PulseAction::Remove => continue,
                }
                if freetime.pulse == 6 {
                    self.add_classic_beat(beat, event.hold);
                    continue;
                }
            }
            waiting.push(freetime);
        }
        self.freetimes = waiting;
    }

    fn finish(&mut self, beat: f64) {
        let time = self.time_index.beat_to_time(beat);
        self.cues
            .extend(CueSource::ALL.iter().map(|&source| Cue::new(time, CueKind::Stop, source)));
    }

    fn apply(&mut self, event: &Event) {
        let header = &event.header;
        let beat = self.time_index.bar_to_beat(header.bar - 1.0) + (header.beat - 1.0);
        match &event.body {
            EventBody::SayReadyGetSetGo(say) => self.say(beat, say),
            EventBody::AddOneshotBeat(oneshot) if self.row_enabled(header) => {
                self.add_oneshot_beat(beat, oneshot)
            }
            EventBody::AddClassicBeat(classic) if self.row_enabled(header) => {
                self.add_classic_beat(beat + classic.tick * 6.0, classic.hold)
            }
            EventBody::AddFreeTimeBeat(free) if self.row_enabled(header) => {
                self.add_free_time_beat(header, beat, free)
            }
            EventBody::PulseFreeTimeBeat(pulse) if self.row_enabled(header) => {
                self.pulse_free_time_beats(header, pulse)
            }
            EventBody::FinishLevel => self.finish(beat),
            EventBody::AddOneshotBeat(_)
            | EventBody::AddClassicBeat(_)
            | EventBody::AddFreeTimeBeat(_)
            | EventBody::PulseFreeTimeBeat(_)
            | EventBody::SetCrotchetsPerBar(_)
            | EventBody::PlaySong(_)
            | EventBody::SetBeatsPerMinute(_)
            | EventBody::Other => {}
        }
    }

    fn build(mut self) -> Level {
        sort_cues(&mut self.cues);
        sort_beats(&mut self.beats);
        self.hits.sort_by(f64::total_cmp);
        sort_holds(&mut self.holds);
        Level {
            time_index: self.time_index,
            cues: self.cues,
            beats: self.beats,
            hits: self.hits,
            holds: self.holds,
        }
    }
}

fn build_time_index(events: &[Event]) -> TimeIndex {
    let timed = || events.iter().filter(|e| !e.header.is_conditional());

    let bars = Breakpoints::from_changes(
        DEFAULT_CROTCHETS_PER_BAR,
        timed().filter_map(|e| match &e.body {
            EventBody::SetCrotchetsPerBar(set) => Some((e.header.bar - 1.0, set.crotchets_per_bar)),
            _ => None,
        }),
    );

    let bpm = events
        .iter()
        .find_map(|e| match &e.body {
            EventBody::PlaySong(song) => Some(song.bpm),
            _ => None,
        })
        .unwrap_or(DEFAULT_BPM);
    let tempo = Breakpoints::from_changes(
        60.0 / bpm,
        timed().filter_map(|e| {
            let bpm = match &e.body {
                EventBody::PlaySong(song) => song.bpm,
                EventBody::SetBeatsPerMinute(set) => set.beats_per_minute,
                _ => return None,
            };
            let beat = bars.forward(e.header.bar - 1.0) + (e.header.beat - 1.0);
            Some((beat, 60.0 / bpm))
        }),
    );

    TimeIndex::new(bars, tempo)
}

/// Decode level text.
///
/// Malformed text is an error; individual events that cannot be decoded are
/// skipped with a warning.
pub fn parse_level(text: &str) -> LevelResult<Level> {
    let mut root = parse_rd_json(text)?;
    let Some(Value::Array(raw_events)) = root.get_mut("events").map(Value::take) else {
        return Err(LevelError::MissingEvents);
    };

    let mut builder = LevelBuilder::default();
    if let Some(Value::Array(rows)) = root.get("rows") {
        for (index, row) in rows.iter().enumerate() {
            match RawRow::deserialize(row) {
                Ok(row) if !truthy(&row.mute_beats) => {
                    builder.enabled_rows.insert(row.row);
                }
                Ok(_) => {}
                Err(e) => warn!(index, error = %e, "skipping undecodable row"),
            }
        }
    }

    let mut events: Vec<Event> = raw_events
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| decode_event(index, value))
        .filter(|e| e.header.is_active())
        .collect();
    events.sort_by(|a, b| a.header.bar.total_cmp(&b.header.bar));

    builder.time_index = build_time_index(&events);
    for event in events.iter().filter(|e| !e.header.is_conditional()) {
        builder.apply(event);
    }

    let level = builder.build();
    debug!(
        cues = level.cues.len(),
        beats = level.beats.len(),
        hits = level.hits.len(),
        holds = level.holds.len(),
        "level decoded"
    );
    Ok(level)
}
