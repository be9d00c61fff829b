use crate::error::{CodecError, Result};
use crate::model::piece::{
    DEFAULT_FORMAT, DEFAULT_RESOLUTION, Event, EventKind, MAX_DELTA_TICKS, MAX_RESOLUTION,
    MAX_TEMPO, Piece, Track, clamp_channel, clamp_data_byte, sanitize_denominator,
};
use crate::model::statement::Term;
use crate::model::vocab::{EventTag, Mid, positional_index, rdf_type, rdfs_label};
use crate::store::StatementStore;
use crate::timing::{TempoTracker, bpm_to_mpqn};
use crate::util::ascii_text;
use log::{debug, info, warn};

const DEFAULT_CHANNEL: i64 = 0;
const DEFAULT_VELOCITY: i64 = 64;
const DEFAULT_NOTE: i64 = 60;
const DEFAULT_NUMERATOR: i64 = 4;
const DEFAULT_DENOMINATOR: i64 = 4;
const UNNAMED_TRACK: &str = "Unnamed Track";

/// An event left out of the decoded piece because its type isn't one the
/// decoder can rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    pub track: String,
    pub event: String,
    pub event_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub piece: Piece,
    pub skipped: Vec<SkippedEvent>,
}

/// Sort key for track and event subjects: subjects carrying a positional
/// index order numerically, anything else after them by its text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SubjectKey<'a> {
    unindexed: bool,
    index: u64,
    text: String,
    term: &'a Term,
}

impl<'a> SubjectKey<'a> {
    fn new(term: &'a Term, segment: &str) -> Self {
        let text = match term {
            Term::Iri(iri) | Term::Blank(iri) => iri.clone(),
            other => other.to_string(),
        };
        let index = term.as_iri().and_then(|iri| positional_index(iri, segment));

        Self {
            unindexed: index.is_none(),
            index: index.unwrap_or(0),
            text,
            term,
        }
    }
}

fn sorted_subjects<'a>(terms: impl Iterator<Item = &'a Term>, segment: &str) -> Vec<&'a Term> {
    let mut keys: Vec<SubjectKey<'a>> = terms.map(|term| SubjectKey::new(term, segment)).collect();
    keys.sort();
    keys.dedup_by(|a, b| a.term == b.term);
    keys.into_iter().map(|key| key.term).collect()
}

fn name_of(term: &Term) -> String {
    match term {
        Term::Iri(iri) => iri.clone(),
        other => other.to_string(),
    }
}

fn integer_field(store: &StatementStore, subject: &Term, predicate: Mid) -> Result<Option<i64>> {
    let predicate_term = predicate.into();
    let Some(value) = store.object(subject, &predicate_term) else {
        return Ok(None);
    };

    value
        .as_integer()
        .map(Some)
        .ok_or_else(|| CodecError::InvalidNumber {
            subject: name_of(subject),
            predicate: predicate.iri(),
            value: value.to_string(),
        })
}

fn float_field(store: &StatementStore, subject: &Term, predicate: Mid) -> Result<Option<f64>> {
    let predicate_term = predicate.into();
    let Some(value) = store.object(subject, &predicate_term) else {
        return Ok(None);
    };

    value
        .as_float()
        .map(Some)
        .ok_or_else(|| CodecError::InvalidNumber {
            subject: name_of(subject),
            predicate: predicate.iri(),
            value: value.to_string(),
        })
}

/// First piece-level value of `predicate`, wherever it hangs.
fn piece_field(store: &StatementStore, predicate: Mid) -> Result<Option<i64>> {
    let predicate_term: Term = predicate.into();
    let Some(statement) = store.matching(None, Some(&predicate_term), None).next() else {
        return Ok(None);
    };

    integer_field(store, &statement.subject, predicate)
}

fn event_tag(store: &StatementStore, event: &Term) -> EventTag {
    let rdf_type = rdf_type();
    let classes: Vec<&Term> = store.objects(event, &rdf_type).collect();

    classes
        .iter()
        .map(|class| EventTag::from_class(class))
        .find(|tag| !matches!(tag, EventTag::Unrecognized(_)))
        .or_else(|| classes.first().map(|class| EventTag::from_class(class)))
        .unwrap_or_else(|| EventTag::Unrecognized("<untyped>".into()))
}

/// Rebuilds a piece from its statements.
///
/// Unrecognized event types are logged, recorded in [`Decoded::skipped`] and
/// left out; malformed numbers on fields that are present fail the run.
pub fn decode_store(store: &StatementStore) -> Result<Decoded> {
    let resolution = match piece_field(store, Mid::Resolution)? {
        None => DEFAULT_RESOLUTION,
        Some(value) if (1..=MAX_RESOLUTION as i64).contains(&value) => value as u16,
        Some(value) => {
            return Err(CodecError::InvalidValue {
                field: "resolution",
                value,
                reason: "ticks per beat must be within 1..=32767",
            });
        }
    };

    let format = match piece_field(store, Mid::Format)? {
        None => DEFAULT_FORMAT,
        Some(value) if (0..=2).contains(&value) => value as u8,
        Some(value) => {
            return Err(CodecError::InvalidValue {
                field: "format",
                value,
                reason: "MIDI format must be 0, 1 or 2",
            });
        }
    };

    debug!("Decoding with resolution {} and format {}", resolution, format);

    let mut piece = Piece::new(resolution, format);
    let mut skipped = Vec::new();

    let rdf_type = rdf_type();
    let track_class: Term = Mid::Track.into();
    let tracks = sorted_subjects(store.subjects(&rdf_type, &track_class), "track");

    for track in tracks {
        piece
            .tracks
            .push(decode_track(store, track, resolution, &mut skipped)?);
    }

    info!(
        "Decoded {} track(s), skipped {} unrecognized event(s)",
        piece.tracks.len(),
        skipped.len()
    );

    Ok(Decoded { piece, skipped })
}

/// Decodes one track with a fresh tempo tracker.
pub fn decode_track(
    store: &StatementStore,
    track: &Term,
    resolution: u16,
    skipped: &mut Vec<SkippedEvent>,
) -> Result<Track> {
    let has_event: Term = Mid::HasEvent.into();
    let subjects = sorted_subjects(store.objects(track, &has_event), "event");

    let mut tracker = TempoTracker::new(resolution);
    let mut events = Vec::with_capacity(subjects.len());

    for event in subjects {
        let kind = match event_tag(store, event) {
            EventTag::Unrecognized(raw) => {
                warn!("Unrecognized event type: {} on {}", raw, name_of(event));
                skipped.push(SkippedEvent {
                    track: name_of(track),
                    event: name_of(event),
                    event_type: raw,
                });
                continue;
            }
            EventTag::NoteOn => {
                let (channel, note, velocity) = note_fields(store, event)?;
                EventKind::NoteOn {
                    channel,
                    note,
                    velocity,
                }
            }
            EventTag::NoteOff => {
                let (channel, note, velocity) = note_fields(store, event)?;
                EventKind::NoteOff {
                    channel,
                    note,
                    velocity,
                }
            }
            EventTag::SetTempo => match tempo_field(store, event)? {
                Some(tempo) => {
                    tracker.observe_tempo_change(tempo);
                    EventKind::SetTempo { tempo }
                }
                None => {
                    debug!("Dropping set_tempo {} with neither tempo nor bpm", name_of(event));
                    continue;
                }
            },
            EventTag::TimeSignature => {
                let numerator = integer_field(store, event, Mid::Numerator)?
                    .unwrap_or(DEFAULT_NUMERATOR)
                    .clamp(1, u8::MAX as i64) as u8;
                let denominator = sanitize_denominator(
                    integer_field(store, event, Mid::Denominator)?.unwrap_or(DEFAULT_DENOMINATOR),
                );
                tracker.observe_time_signature_change(numerator, denominator);
                EventKind::TimeSignature {
                    numerator,
                    denominator,
                }
            }
            EventTag::EndOfTrack => EventKind::EndOfTrack,
            EventTag::TrackName => {
                let name = store
                    .object(event, &rdfs_label())
                    .and_then(Term::as_text)
                    .map(|text| ascii_text(&text))
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| UNNAMED_TRACK.to_string());
                EventKind::TrackName { name }
            }
        };

        let absolute_seconds =
            float_field(store, event, Mid::AbsoluteTime)?.ok_or_else(|| CodecError::MissingField {
                subject: name_of(event),
                predicate: Mid::AbsoluteTime.iri(),
            })?;

        let step = tracker.advance_to(absolute_seconds);
        let delta_ticks = step.delta_ticks.min(MAX_DELTA_TICKS as u64) as u32;
        events.push(Event::new(delta_ticks, kind));
    }

    Ok(Track { events })
}

fn note_fields(store: &StatementStore, event: &Term) -> Result<(u8, u8, u8)> {
    let channel = integer_field(store, event, Mid::Channel)?.unwrap_or(DEFAULT_CHANNEL);
    let note = integer_field(store, event, Mid::Note)?.unwrap_or(DEFAULT_NOTE);
    let velocity = integer_field(store, event, Mid::Velocity)?.unwrap_or(DEFAULT_VELOCITY);

    Ok((
        clamp_channel(channel),
        clamp_data_byte(note),
        clamp_data_byte(velocity),
    ))
}

/// Explicit tempo first, then the legacy `mpqn`, then `floor(60e6 / bpm)`.
fn tempo_field(store: &StatementStore, event: &Term) -> Result<Option<u32>> {
    let explicit = match integer_field(store, event, Mid::Tempo)? {
        Some(tempo) => Some(tempo),
        None => integer_field(store, event, Mid::Mpqn)?,
    };

    let tempo = match explicit {
        Some(tempo) => Some(tempo),
        None => match float_field(store, event, Mid::Bpm)? {
            Some(bpm) => Some(bpm_to_mpqn(bpm).ok_or(CodecError::InvalidValue {
                field: "bpm",
                value: bpm as i64,
                reason: "beats per minute must be positive",
            })? as i64),
            None => None,
        },
    };

    Ok(tempo.map(|tempo| tempo.clamp(1, MAX_TEMPO as i64) as u32))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoder::encode_piece;
    use crate::model::vocab::{event_class, event_iri, piece_iri, track_iri};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6
    }

    struct Builder {
        store: StatementStore,
        piece: String,
    }

    impl Builder {
        fn new() -> Self {
            Self {
                store: StatementStore::new(),
                piece: piece_iri("fixture"),
            }
        }

        fn track(&mut self, idx: usize) -> String {
            let track = track_iri(&self.piece, idx);
            self.store.insert(Term::iri(self.piece.as_str()), Mid::HasTrack, Term::iri(track.as_str()));
            self.store.insert(Term::iri(track.as_str()), rdf_type(), Mid::Track);
            track
        }

        fn event(&mut self, track: &str, idx: usize, tag: &str, absolute: f64) -> Term {
            let event = Term::iri(event_iri(track, idx));
            self.store.insert(Term::iri(track), Mid::HasEvent, event.clone());
            self.store.insert(event.clone(), rdf_type(), event_class(tag));
            self.store.insert(event.clone(), Mid::AbsoluteTime, Term::float(absolute));
            event
        }
    }

    fn scenario() -> Piece {
        let mut piece = Piece::new(480, 1);
        piece.tracks.push(Track {
            events: vec![
                Event::new(0, EventKind::SetTempo { tempo: 500_000 }),
                Event::new(
                    0,
                    EventKind::NoteOn {
                        channel: 0,
                        note: 60,
                        velocity: 100,
                    },
                ),
                Event::new(
                    480,
                    EventKind::NoteOff {
                        channel: 0,
                        note: 60,
                        velocity: 0,
                    },
                ),
            ],
        });
        piece
    }

    #[test]
    fn single_track_scenario_round_trip() {
        env_logger::try_init().unwrap_or(());

        let store = encode_piece(&scenario(), &piece_iri("scenario"));
        let decoded = decode_store(&store).unwrap();

        assert!(decoded.skipped.is_empty());
        assert_eq!(decoded.piece.resolution, 480);
        assert_eq!(decoded.piece.format, 1);

        let events = &decoded.piece.tracks[0].events;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::SetTempo { tempo: 500_000 });
        assert_eq!(events[1].delta_ticks, 0);
        assert_eq!(events[2].delta_ticks, 480);
        assert_eq!(decoded.piece, scenario());
    }

    #[test]
    fn note_pairs_survive_round_trip() {
        env_logger::try_init().unwrap_or(());

        let mut piece = Piece::new(96, 0);
        let mut events = Vec::new();
        for i in 0..24u8 {
            let channel = i % 16;
            let note = 36 + i * 3;
            events.push(Event::new(
                (i as u32) * 7,
                EventKind::NoteOn {
                    channel,
                    note,
                    velocity: 40 + i,
                },
            ));
            events.push(Event::new(
                13 + i as u32,
                EventKind::NoteOff {
                    channel,
                    note,
                    velocity: i,
                },
            ));
        }
        piece.tracks.push(Track { events });

        let store = encode_piece(&piece, &piece_iri("pairs"));
        let decoded = decode_store(&store).unwrap().piece;
        let original = &piece.tracks[0].events;
        let rebuilt = &decoded.tracks[0].events;

        assert_eq!(original.len(), rebuilt.len());
        for (a, b) in original.iter().zip(rebuilt.iter()) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.delta_ticks, b.delta_ticks);
        }

        // absolute times re-encode to the same values
        let again = encode_piece(&decoded, &piece_iri("pairs"));
        let track = track_iri(&piece_iri("pairs"), 0);
        for idx in 0..original.len() {
            let subject = Term::iri(event_iri(&track, idx));
            let first = store.object(&subject, &Mid::AbsoluteTime.into()).unwrap().as_float().unwrap();
            let second = again.object(&subject, &Mid::AbsoluteTime.into()).unwrap().as_float().unwrap();
            assert!(approx_eq(first, second));
        }
    }

    #[test]
    fn huge_absolute_times_saturate() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        builder.event(&track, 0, "note_on", 1e20);
        let tempo = builder.event(&track, 1, "set_tempo", 1e20);
        builder.store.insert(tempo, Mid::Tempo, Term::integer(400_000));
        builder.event(&track, 2, "note_on", 2e20);

        let decoded = decode_store(&builder.store).unwrap();
        let events = &decoded.piece.tracks[0].events;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].delta_ticks, MAX_DELTA_TICKS);
        assert_eq!(events[1].kind, EventKind::SetTempo { tempo: 400_000 });
        assert_eq!(events[1].delta_ticks, 0);
        assert_eq!(events[2].delta_ticks, 0);
    }

    #[test]
    fn decoding_is_deterministic() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        for t in [2usize, 0, 1] {
            let track = builder.track(t);
            for e in [3usize, 1, 2, 0] {
                let event = builder.event(&track, e, "note_on", e as f64 * 0.25);
                builder.store.insert(event, Mid::Note, Term::integer((t * 10 + e) as i64));
            }
        }

        let first = decode_store(&builder.store).unwrap();
        let second = decode_store(&builder.store).unwrap();
        assert_eq!(first, second);

        let notes: Vec<Vec<u8>> = first
            .piece
            .tracks
            .iter()
            .map(|track| {
                track
                    .events
                    .iter()
                    .map(|event| match event.kind {
                        EventKind::NoteOn { note, .. } => note,
                        _ => panic!("unexpected {:?}", event.kind),
                    })
                    .collect()
            })
            .collect();
        assert_eq!(notes, vec![vec![0, 1, 2, 3], vec![10, 11, 12, 13], vec![20, 21, 22, 23]]);
    }

    #[test]
    fn indices_order_numerically_past_padding_width() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        let late = builder.event(&track, 10_000, "note_on", 2.0);
        builder.store.insert(late, Mid::Note, Term::integer(2));
        let early = builder.event(&track, 9_999, "note_on", 1.0);
        builder.store.insert(early, Mid::Note, Term::integer(1));

        let piece = decode_store(&builder.store).unwrap().piece;
        let events = &piece.tracks[0].events;
        assert!(matches!(events[0].kind, EventKind::NoteOn { note: 1, .. }));
        assert!(matches!(events[1].kind, EventKind::NoteOn { note: 2, .. }));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        let event = builder.event(&track, 0, "note_on", 0.0);
        builder.store.insert(event.clone(), Mid::Velocity, Term::integer(200));
        builder.store.insert(event.clone(), Mid::Channel, Term::integer(-1));
        builder.store.insert(event, Mid::Note, Term::integer(300));

        let piece = decode_store(&builder.store).unwrap().piece;
        assert_eq!(
            piece.tracks[0].events[0].kind,
            EventKind::NoteOn {
                channel: 0,
                note: 127,
                velocity: 127
            }
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        builder.event(&track, 0, "note_off", 0.0);
        builder.event(&track, 1, "time_signature", 0.0);
        builder.event(&track, 2, "track_name", 0.0);
        builder.event(&track, 3, "end_of_track", 0.0);

        let decoded = decode_store(&builder.store).unwrap();
        assert_eq!(decoded.piece.resolution, DEFAULT_RESOLUTION);
        assert_eq!(decoded.piece.format, DEFAULT_FORMAT);

        let kinds: Vec<_> = decoded.piece.tracks[0]
            .events
            .iter()
            .map(|event| event.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::NoteOff {
                    channel: 0,
                    note: 60,
                    velocity: 64
                },
                EventKind::TimeSignature {
                    numerator: 4,
                    denominator: 4
                },
                EventKind::TrackName {
                    name: "Unnamed Track".into()
                },
                EventKind::EndOfTrack,
            ]
        );
    }

    #[test]
    fn invalid_denominator_falls_back() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        let event = builder.event(&track, 0, "time_signature", 0.0);
        builder.store.insert(event.clone(), Mid::Numerator, Term::integer(5));
        builder.store.insert(event, Mid::Denominator, Term::integer(3));

        let piece = decode_store(&builder.store).unwrap().piece;
        assert_eq!(
            piece.tracks[0].events[0].kind,
            EventKind::TimeSignature {
                numerator: 5,
                denominator: 4
            }
        );
    }

    #[test]
    fn unrecognized_events_are_skipped() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        builder.store.insert(Term::iri(builder.piece.as_str()), Mid::Resolution, Term::integer(480));
        let track = builder.track(0);
        builder.event(&track, 0, "note_on", 0.0);
        builder.event(&track, 1, "pitchwheel", 0.25);
        builder.event(&track, 2, "note_off", 0.5);

        let decoded = decode_store(&builder.store).unwrap();
        assert_eq!(decoded.skipped.len(), 1);
        assert!(decoded.skipped[0].event_type.ends_with("#pitchwheel"));

        let events = &decoded.piece.tracks[0].events;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1].kind, EventKind::NoteOff { .. }));
        assert_eq!(events[1].delta_ticks, 480);
    }

    #[test]
    fn tempo_from_bpm_or_dropped() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        builder.store.insert(Term::iri(builder.piece.as_str()), Mid::Resolution, Term::integer(100));
        let track = builder.track(0);
        let by_bpm = builder.event(&track, 0, "set_tempo", 0.0);
        builder.store.insert(by_bpm, Mid::Bpm, Term::float(90.0));
        builder.event(&track, 1, "set_tempo", 0.5);
        builder.event(&track, 2, "end_of_track", 1.0);

        let piece = decode_store(&builder.store).unwrap().piece;
        let events = &piece.tracks[0].events;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::SetTempo { tempo: 666_666 });
        // one second at 666666 us/qn and 100 tpb
        assert_eq!(events[1].delta_ticks, 150);
    }

    #[test]
    fn track_names_are_transliterated() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        let event = builder.event(&track, 0, "track_name", 0.0);
        builder.store.insert(event, rdfs_label(), Term::string("Café Größe"));

        let piece = decode_store(&builder.store).unwrap().piece;
        assert_eq!(
            piece.tracks[0].events[0].kind,
            EventKind::TrackName {
                name: "Cafe Grosse".into()
            }
        );
    }

    #[test]
    fn malformed_numbers_fail_the_run() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        let event = builder.event(&track, 0, "note_on", 0.0);
        builder.store.insert(event, Mid::Velocity, Term::string("loud"));

        let err = decode_store(&builder.store).unwrap_err();
        assert!(matches!(err, CodecError::InvalidNumber { .. }));

        let mut builder = Builder::new();
        builder.store.insert(Term::iri(builder.piece.as_str()), Mid::Resolution, Term::string("high"));
        assert!(matches!(
            decode_store(&builder.store),
            Err(CodecError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn missing_absolute_time_fails_the_run() {
        env_logger::try_init().unwrap_or(());

        let mut builder = Builder::new();
        let track = builder.track(0);
        let event = Term::iri(event_iri(&track, 0));
        builder.store.insert(Term::iri(track.as_str()), Mid::HasEvent, event.clone());
        builder.store.insert(event, rdf_type(), event_class("end_of_track"));

        assert!(matches!(
            decode_store(&builder.store),
            Err(CodecError::MissingField { .. })
        ));
    }

    #[test]
    fn resolution_must_be_positive() {
        let mut builder = Builder::new();
        builder.store.insert(Term::iri(builder.piece.as_str()), Mid::Resolution, Term::integer(0));

        assert!(matches!(
            decode_store(&builder.store),
            Err(CodecError::InvalidValue { field: "resolution", .. })
        ));
    }
}
