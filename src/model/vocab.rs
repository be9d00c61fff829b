use crate::model::statement::Term;

pub const MID_NS: &str = "http://purl.org/midi-ld/midi#";
pub const MID_NOTE_NS: &str = "http://purl.org/midi-ld/notes/";
pub const PIECE_NS: &str = "http://purl.org/midi-ld/piece/";
pub const FILE_NS: &str = "http://purl.org/midi-ld/file/";
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// Classes and predicates of the MIDI vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mid {
    Piece,
    Track,
    MidiFile,
    Path,
    Resolution,
    Format,
    HasTrack,
    HasEvent,
    RelativeTime,
    DeltaTime,
    AbsoluteTime,
    Note,
    Velocity,
    Channel,
    Tempo,
    /// Older name for `tempo` still found in some graphs.
    Mpqn,
    Bpm,
    Numerator,
    Denominator,
    TimeSignature,
}

impl Mid {
    pub fn local_name(self) -> &'static str {
        match self {
            Mid::Piece => "Piece",
            Mid::Track => "Track",
            Mid::MidiFile => "MIDIFile",
            Mid::Path => "path",
            Mid::Resolution => "resolution",
            Mid::Format => "format",
            Mid::HasTrack => "hasTrack",
            Mid::HasEvent => "hasEvent",
            Mid::RelativeTime => "relativeTime",
            Mid::DeltaTime => "deltaTime",
            Mid::AbsoluteTime => "absoluteTime",
            Mid::Note => "note",
            Mid::Velocity => "velocity",
            Mid::Channel => "channel",
            Mid::Tempo => "tempo",
            Mid::Mpqn => "mpqn",
            Mid::Bpm => "bpm",
            Mid::Numerator => "numerator",
            Mid::Denominator => "denominator",
            Mid::TimeSignature => "time_signature",
        }
    }

    pub fn iri(self) -> String {
        format!("{}{}", MID_NS, self.local_name())
    }
}

impl From<Mid> for Term {
    fn from(value: Mid) -> Self {
        Term::Iri(value.iri())
    }
}

/// W3C PROV-O classes and predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prov {
    Agent,
    Entity,
    Activity,
    WasGeneratedBy,
    WasAttributedTo,
    WasDerivedFrom,
    WasAssociatedWith,
    Used,
    StartedAtTime,
    EndedAtTime,
    GeneratedAtTime,
}

impl Prov {
    pub fn local_name(self) -> &'static str {
        match self {
            Prov::Agent => "Agent",
            Prov::Entity => "Entity",
            Prov::Activity => "Activity",
            Prov::WasGeneratedBy => "wasGeneratedBy",
            Prov::WasAttributedTo => "wasAttributedTo",
            Prov::WasDerivedFrom => "wasDerivedFrom",
            Prov::WasAssociatedWith => "wasAssociatedWith",
            Prov::Used => "used",
            Prov::StartedAtTime => "startedAtTime",
            Prov::EndedAtTime => "endedAtTime",
            Prov::GeneratedAtTime => "generatedAtTime",
        }
    }
}

impl From<Prov> for Term {
    fn from(value: Prov) -> Self {
        Term::Iri(format!("{}{}", PROV_NS, value.local_name()))
    }
}

pub fn rdf_type() -> Term {
    Term::iri(RDF_TYPE)
}

pub fn rdfs_label() -> Term {
    Term::iri(RDFS_LABEL)
}

/// `mid:<tag>`, the class of an event with the given raw type tag.
pub fn event_class(tag: &str) -> Term {
    Term::Iri(format!("{}{}", MID_NS, tag))
}

pub fn note_ref(note: u8) -> Term {
    Term::Iri(format!("{}{}", MID_NOTE_NS, note))
}

/// Event classes the decoder knows how to turn back into MIDI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTag {
    NoteOn,
    NoteOff,
    SetTempo,
    TimeSignature,
    EndOfTrack,
    TrackName,
    Unrecognized(String),
}

impl EventTag {
    pub fn from_class(class: &Term) -> Self {
        let Some(iri) = class.as_iri() else {
            return EventTag::Unrecognized(class.to_string());
        };

        match iri.strip_prefix(MID_NS) {
            Some("note_on") => EventTag::NoteOn,
            Some("note_off") => EventTag::NoteOff,
            Some("set_tempo") => EventTag::SetTempo,
            Some("time_signature") => EventTag::TimeSignature,
            Some("end_of_track") => EventTag::EndOfTrack,
            Some("track_name") => EventTag::TrackName,
            _ => EventTag::Unrecognized(iri.to_string()),
        }
    }
}

pub fn piece_iri(id: &str) -> String {
    format!("{}{}", PIECE_NS, id)
}

pub fn track_iri(piece_iri: &str, index: usize) -> String {
    format!("{}/track{:02}", piece_iri, index)
}

pub fn event_iri(track_iri: &str, index: usize) -> String {
    format!("{}/event{:04}", track_iri, index)
}

/// Reads the positional index out of the last path segment of a track or
/// event IRI, e.g. `.../track03/event0120` with `"event"` gives 120.
pub fn positional_index(iri: &str, segment: &str) -> Option<u64> {
    iri.rsplit('/')
        .next()
        .and_then(|last| last.strip_prefix(segment))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
}
