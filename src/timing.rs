use crate::model::piece::sanitize_denominator;
use log::debug;

pub const DEFAULT_MPQN: u32 = 500_000;
pub const DEFAULT_TIME_SIGNATURE: (u8, u8) = (4, 4);
const MICROSECONDS_PER_SECOND: f64 = 1_000_000.0;
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// Tick positions this close below a whole tick are float noise, not a
/// fraction of a tick.
const TICK_EPSILON: f64 = 1e-6;

/// Duration in seconds of `delta_ticks` at the given resolution and tempo (us/qn).
pub fn ticks_to_seconds(delta_ticks: u64, ticks_per_beat: u16, mpqn: u32) -> f64 {
    delta_ticks as f64 * mpqn as f64 / (ticks_per_beat as f64 * MICROSECONDS_PER_SECOND)
}

/// Inverse of [`ticks_to_seconds`], truncated toward zero. Negative or
/// non-finite durations give 0.
pub fn seconds_to_ticks(seconds: f64, ticks_per_beat: u16, mpqn: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }

    let ticks = seconds * ticks_per_beat as f64 * MICROSECONDS_PER_SECOND / mpqn as f64;
    let nearest = ticks.round();
    if (nearest - ticks).abs() < TICK_EPSILON {
        nearest as u64
    } else {
        ticks as u64
    }
}

pub fn mpqn_to_bpm(mpqn: u32) -> f64 {
    MICROSECONDS_PER_MINUTE / mpqn as f64
}

/// `floor(60_000_000 / bpm)`, or `None` when the bpm can't describe a tempo.
pub fn bpm_to_mpqn(bpm: f64) -> Option<u32> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return None;
    }

    Some((MICROSECONDS_PER_MINUTE / bpm).floor().min(u32::MAX as f64) as u32)
}

/// A tempo change and where on the track it happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPoint {
    pub mpqn: u32,
    pub start_tick: u64,
    pub seconds_at_start: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSignaturePoint {
    pub numerator: u8,
    pub denominator: u8,
    pub start_tick: u64,
    pub seconds_at_start: f64,
}

/// Where one event landed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub relative_seconds: f64,
    pub absolute_seconds: f64,
    pub delta_ticks: u64,
    pub absolute_ticks: u64,
}

/// Per-track running tempo and meter state.
///
/// Positions are measured from the latest tempo change in both directions,
/// so a track walked by tick deltas and the same track walked by absolute
/// seconds arrive at identical tick counts. Tick counts saturate at
/// `u64::MAX`.
#[derive(Debug, Clone)]
pub struct TempoTracker {
    ticks_per_beat: u16,
    seconds: f64,
    ticks: u64,
    tempo_map: Vec<TempoPoint>,
    meter_map: Vec<TimeSignaturePoint>,
}

impl TempoTracker {
    pub fn new(ticks_per_beat: u16) -> Self {
        Self {
            ticks_per_beat: ticks_per_beat.max(1),
            seconds: 0.0,
            ticks: 0,
            tempo_map: vec![TempoPoint {
                mpqn: DEFAULT_MPQN,
                start_tick: 0,
                seconds_at_start: 0.0,
            }],
            meter_map: vec![TimeSignaturePoint {
                numerator: DEFAULT_TIME_SIGNATURE.0,
                denominator: DEFAULT_TIME_SIGNATURE.1,
                start_tick: 0,
                seconds_at_start: 0.0,
            }],
        }
    }

    fn segment(&self) -> TempoPoint {
        // the map is seeded with the default tempo and never shrinks
        self.tempo_map[self.tempo_map.len() - 1]
    }

    pub fn mpqn(&self) -> u32 {
        self.segment().mpqn
    }

    pub fn time_signature(&self) -> (u8, u8) {
        let point = self.meter_map[self.meter_map.len() - 1];
        (point.numerator, point.denominator)
    }

    /// The latest time signature declared on this track, if any was.
    pub fn observed_time_signature(&self) -> Option<(u8, u8)> {
        (self.meter_map.len() > 1).then(|| self.time_signature())
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[cfg(test)]
    pub(crate) fn tempo_map(&self) -> &[TempoPoint] {
        &self.tempo_map
    }

    #[cfg(test)]
    pub(crate) fn meter_map(&self) -> &[TimeSignaturePoint] {
        &self.meter_map
    }

    /// Switches tempo from the current position onwards.
    pub fn observe_tempo_change(&mut self, mpqn: u32) {
        let mpqn = mpqn.max(1);
        debug!(
            "Tempo change at tick {} ({:.6}s) -> {} us/qn",
            self.ticks, self.seconds, mpqn
        );

        self.tempo_map.push(TempoPoint {
            mpqn,
            start_tick: self.ticks,
            seconds_at_start: self.seconds,
        });
    }

    pub fn observe_time_signature_change(&mut self, numerator: u8, denominator: u8) {
        self.meter_map.push(TimeSignaturePoint {
            numerator,
            denominator: sanitize_denominator(denominator as i64),
            start_tick: self.ticks,
            seconds_at_start: self.seconds,
        });
    }

    /// Moves forward by a tick delta at the current tempo. The new position
    /// is measured from the start of the tempo segment, not accumulated.
    pub fn advance_ticks(&mut self, delta_ticks: u64) -> Step {
        let segment = self.segment();
        let absolute_ticks = self.ticks.saturating_add(delta_ticks);
        let (previous_ticks, previous_seconds) = (self.ticks, self.seconds);

        self.seconds = segment.seconds_at_start
            + ticks_to_seconds(
                absolute_ticks - segment.start_tick,
                self.ticks_per_beat,
                segment.mpqn,
            );
        self.ticks = absolute_ticks;

        Step {
            relative_seconds: self.seconds - previous_seconds,
            absolute_seconds: self.seconds,
            delta_ticks: absolute_ticks - previous_ticks,
            absolute_ticks,
        }
    }

    /// Moves to an absolute time. Times earlier than the current position
    /// leave the position unchanged and produce a zero delta.
    pub fn advance_to(&mut self, absolute_seconds: f64) -> Step {
        let mut relative_seconds = absolute_seconds - self.seconds;
        if relative_seconds.is_nan() || relative_seconds < 0.0 {
            debug!(
                "Absolute time {}s precedes the current position {}s, clamping delta to zero",
                absolute_seconds, self.seconds
            );
            relative_seconds = 0.0;
        } else {
            self.seconds = absolute_seconds;
        }

        self.settle(relative_seconds)
    }

    fn settle(&mut self, relative_seconds: f64) -> Step {
        let segment = self.segment();
        let absolute_ticks = segment.start_tick.saturating_add(seconds_to_ticks(
            self.seconds - segment.seconds_at_start,
            self.ticks_per_beat,
            segment.mpqn,
        ));
        let absolute_ticks = absolute_ticks.max(self.ticks);
        let delta_ticks = absolute_ticks - self.ticks;
        self.ticks = absolute_ticks;

        Step {
            relative_seconds,
            absolute_seconds: self.seconds,
            delta_ticks,
            absolute_ticks,
        }
    }
}
