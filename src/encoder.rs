use crate::model::piece::{EventKind, Piece, Track, sanitize_denominator};
use crate::model::statement::Term;
use crate::model::vocab::{Mid, event_class, event_iri, note_ref, rdf_type, rdfs_label, track_iri};
use crate::store::StatementStore;
use crate::timing::{TempoTracker, mpqn_to_bpm};
use log::debug;

/// Encodes a whole piece under `piece_iri`: piece framing, every track in
/// index order, and the time signature summary when any track declared one.
pub fn encode_piece(piece: &Piece, piece_iri: &str) -> StatementStore {
    let mut store = StatementStore::new();
    let piece_term = Term::iri(piece_iri);

    store.insert(piece_term.clone(), rdf_type(), Mid::Piece);
    store.insert(piece_term.clone(), Mid::Resolution, Term::integer(piece.resolution));
    store.insert(piece_term.clone(), Mid::Format, Term::integer(piece.format));

    let mut last_time_signature = None;
    for (idx, track) in piece.tracks.iter().enumerate() {
        if let Some(signature) = encode_track(&mut store, piece_iri, idx, track, piece.resolution) {
            last_time_signature = Some(signature);
        }
    }

    if let Some((numerator, denominator)) = last_time_signature {
        let summary = Term::blank("time_signature");
        store.insert(piece_term, Mid::TimeSignature, summary.clone());
        store.insert(summary.clone(), Mid::Numerator, Term::integer(numerator));
        store.insert(summary, Mid::Denominator, Term::integer(denominator));
    }

    debug!(
        "Encoded {} track(s) into {} statements",
        piece.tracks.len(),
        store.len()
    );

    store
}

/// Emits one track and its events. Returns the last time signature the
/// track declared, if any.
pub fn encode_track(
    store: &mut StatementStore,
    piece_iri: &str,
    track_idx: usize,
    track: &Track,
    resolution: u16,
) -> Option<(u8, u8)> {
    let track_iri = track_iri(piece_iri, track_idx);
    let track_term = Term::iri(track_iri.as_str());

    store.insert(Term::iri(piece_iri), Mid::HasTrack, track_term.clone());
    store.insert(track_term.clone(), rdf_type(), Mid::Track);

    let mut tracker = TempoTracker::new(resolution);

    for (event_idx, event) in track.events.iter().enumerate() {
        let event_term = Term::iri(event_iri(&track_iri, event_idx));
        store.insert(track_term.clone(), Mid::HasEvent, event_term.clone());
        store.insert(event_term.clone(), rdf_type(), event_class(event.kind.tag()));

        match &event.kind {
            EventKind::SetTempo { tempo } => {
                tracker.observe_tempo_change(*tempo);
                store.insert(event_term.clone(), Mid::Tempo, Term::integer(*tempo));
                store.insert(event_term.clone(), Mid::Bpm, Term::float(mpqn_to_bpm((*tempo).max(1))));
            }
            EventKind::TimeSignature {
                numerator,
                denominator,
            } => {
                let denominator = sanitize_denominator(*denominator as i64);
                tracker.observe_time_signature_change(*numerator, denominator);
                store.insert(event_term.clone(), Mid::Numerator, Term::integer(*numerator));
                store.insert(event_term.clone(), Mid::Denominator, Term::integer(denominator));
            }
            _ => {}
        }

        let step = tracker.advance_ticks(event.delta_ticks as u64);
        if step.delta_ticks != event.delta_ticks as u64 {
            debug!(
                "Track {} event {}: delta {} re-derived as {}",
                track_idx, event_idx, event.delta_ticks, step.delta_ticks
            );
        }

        store.insert(event_term.clone(), Mid::RelativeTime, Term::float(step.relative_seconds));
        store.insert(event_term.clone(), Mid::DeltaTime, Term::integer(step.delta_ticks as i64));
        store.insert(event_term.clone(), Mid::AbsoluteTime, Term::float(step.absolute_seconds));

        match &event.kind {
            EventKind::NoteOn {
                channel,
                note,
                velocity,
            }
            | EventKind::NoteOff {
                channel,
                note,
                velocity,
            } => {
                store.insert(event_term.clone(), Mid::Note, note_ref((*note).min(127)));
                store.insert(event_term.clone(), Mid::Velocity, Term::integer((*velocity).min(127)));
                store.insert(event_term, Mid::Channel, Term::integer((*channel).min(15)));
            }
            EventKind::TrackName { name } => {
                store.insert(event_term, rdfs_label(), Term::string(name.as_str()));
            }
            _ => {}
        }
    }

    tracker.observed_time_signature()
}
