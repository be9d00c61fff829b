use serde::{Deserialize, Serialize};

pub const DEFAULT_RESOLUTION: u16 = 96;
pub const DEFAULT_FORMAT: u8 = 1;
pub const MAX_RESOLUTION: u16 = 0x7FFF;
pub const MAX_DELTA_TICKS: u32 = 0x0FFF_FFFF;

/// Highest tempo (us/qn) a set_tempo meta event can carry.
pub const MAX_TEMPO: u32 = 0x00FF_FFFF;

pub const VALID_DENOMINATORS: [u8; 5] = [1, 2, 4, 8, 16];

/// One MIDI occurrence, minus its timing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    SetTempo { tempo: u32 },
    TimeSignature { numerator: u8, denominator: u8 },
    EndOfTrack,
    TrackName { name: String },

    /// Anything outside the fixed vocabulary, kept only by its raw type tag.
    Other { tag: String },
}

impl EventKind {
    /// The event's type tag, e.g. `note_on` or `pitchwheel`.
    pub fn tag(&self) -> &str {
        match self {
            EventKind::NoteOn { .. } => "note_on",
            EventKind::NoteOff { .. } => "note_off",
            EventKind::SetTempo { .. } => "set_tempo",
            EventKind::TimeSignature { .. } => "time_signature",
            EventKind::EndOfTrack => "end_of_track",
            EventKind::TrackName { .. } => "track_name",
            EventKind::Other { tag } => tag,
        }
    }

    pub fn other(tag: impl Into<String>) -> Self {
        EventKind::Other { tag: tag.into() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Ticks since the previous event in the same track.
    pub delta_ticks: u32,
    pub kind: EventKind,
}

impl Event {
    pub fn new(delta_ticks: u32, kind: EventKind) -> Self {
        Self { delta_ticks, kind }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub events: Vec<Event>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    /// Ticks per quarter note.
    pub resolution: u16,
    /// SMF format class: 0 single track, 1 parallel, 2 sequential.
    pub format: u8,
    pub tracks: Vec<Track>,
}

impl Piece {
    pub fn new(resolution: u16, format: u8) -> Self {
        Self {
            resolution,
            format,
            tracks: Vec::new(),
        }
    }
}

impl Default for Piece {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION, DEFAULT_FORMAT)
    }
}

/// Snaps a time signature denominator onto the supported set, falling back to 4.
pub fn sanitize_denominator(denominator: i64) -> u8 {
    VALID_DENOMINATORS
        .iter()
        .copied()
        .find(|valid| *valid as i64 == denominator)
        .unwrap_or(4)
}

pub fn clamp_channel(channel: i64) -> u8 {
    channel.clamp(0, 15) as u8
}

pub fn clamp_data_byte(value: i64) -> u8 {
    value.clamp(0, 127) as u8
}
