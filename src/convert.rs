use crate::decoder::{Decoded, decode_store};
use crate::encoder::encode_piece;
use crate::midi_io::{midi_bytes_to_piece, piece_to_midi_bytes};
use crate::model::piece::Piece;
use crate::provenance::{PieceId, Provenance};
use crate::store::StatementStore;
use anyhow::Result;
use chrono::Utc;
use log::{debug, info};

/// MIDI bytes -> statement graph, with identity and provenance attached.
pub fn midi_to_graph(bytes: &[u8], source_path: &str) -> Result<StatementStore> {
    let piece = midi_bytes_to_piece(bytes)?;
    Ok(piece_to_graph(&piece, bytes, source_path))
}

/// Encodes an already imported piece. `source_bytes` are the bytes it was
/// read from and only feed the piece identifier.
pub fn piece_to_graph(piece: &Piece, source_bytes: &[u8], source_path: &str) -> StatementStore {
    let started = Utc::now();
    let id = PieceId::from_bytes(source_bytes);
    debug!("Piece id: {}", id);

    let mut store = encode_piece(piece, &id.piece_iri());

    Provenance {
        id: &id,
        source_path,
        started,
        ended: Utc::now(),
    }
    .annotate(&mut store);

    info!(
        "Encoded {} track(s) into {} statements..!",
        piece.tracks.len(),
        store.len()
    );

    store
}

/// Statement graph -> MIDI bytes, alongside the decoder's skip report.
pub fn graph_to_midi(store: &StatementStore) -> Result<(Vec<u8>, Decoded)> {
    let decoded = decode_store(store)?;
    let bytes = piece_to_midi_bytes(&decoded.piece)?;
    Ok((bytes, decoded))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph_io::{GraphFormat, read_graph, write_graph};
    use crate::model::piece::{Event, EventKind, Track};
    use crate::model::statement::Term;
    use crate::model::vocab::{Mid, Prov};

    fn fixture() -> Piece {
        let mut piece = Piece::new(480, 1);
        piece.tracks.push(Track {
            events: vec![
                Event::new(0, EventKind::TrackName { name: "Tempo".into() }),
                Event::new(0, EventKind::SetTempo { tempo: 500_000 }),
                Event::new(
                    0,
                    EventKind::TimeSignature {
                        numerator: 3,
                        denominator: 4,
                    },
                ),
                Event::new(1920, EventKind::SetTempo { tempo: 400_000 }),
                Event::new(0, EventKind::EndOfTrack),
            ],
        });
        piece.tracks.push(Track {
            events: vec![
                Event::new(
                    0,
                    EventKind::NoteOn {
                        channel: 1,
                        note: 67,
                        velocity: 80,
                    },
                ),
                Event::new(
                    240,
                    EventKind::NoteOff {
                        channel: 1,
                        note: 67,
                        velocity: 0,
                    },
                ),
                Event::new(
                    0,
                    EventKind::NoteOn {
                        channel: 1,
                        note: 69,
                        velocity: 81,
                    },
                ),
                Event::new(
                    720,
                    EventKind::NoteOff {
                        channel: 1,
                        note: 69,
                        velocity: 0,
                    },
                ),
                Event::new(0, EventKind::EndOfTrack),
            ],
        });
        piece
    }

    #[test]
    fn midi_graph_midi() {
        env_logger::try_init().unwrap_or(());

        let bytes = piece_to_midi_bytes(&fixture()).unwrap();
        let store = midi_to_graph(&bytes, "fixture.mid").unwrap();

        let id = PieceId::from_bytes(&bytes);
        let piece = Term::iri(id.piece_iri());
        assert!(store.object(&piece, &Prov::WasGeneratedBy.into()).is_some());
        assert!(store.object(&piece, &Mid::TimeSignature.into()).is_some());

        let (rebuilt, decoded) = graph_to_midi(&store).unwrap();
        assert!(decoded.skipped.is_empty());
        assert_eq!(decoded.piece, fixture());
        assert_eq!(midi_bytes_to_piece(&rebuilt).unwrap(), fixture());
    }

    #[test]
    fn midi_graph_midi_through_rdf_text() {
        env_logger::try_init().unwrap_or(());

        let bytes = piece_to_midi_bytes(&fixture()).unwrap();
        let store = midi_to_graph(&bytes, "fixture.mid").unwrap();

        for format in [GraphFormat::NTriples, GraphFormat::Turtle, GraphFormat::RdfXml] {
            let mut text = Vec::new();
            write_graph(&store, format, &mut text).unwrap();
            let parsed = read_graph(&text, format).unwrap();
            assert_eq!(parsed.len(), store.len(), "{:?}", format);

            let (rebuilt, decoded) = graph_to_midi(&parsed).unwrap();
            assert!(decoded.skipped.is_empty());
            assert_eq!(decoded.piece, fixture(), "{:?}", format);
            assert_eq!(midi_bytes_to_piece(&rebuilt).unwrap(), fixture());
        }
    }

    #[test]
    fn same_bytes_same_piece_subject() {
        env_logger::try_init().unwrap_or(());

        let bytes = piece_to_midi_bytes(&fixture()).unwrap();
        let a = midi_to_graph(&bytes, "a.mid").unwrap();
        let b = midi_to_graph(&bytes, "b.mid").unwrap();

        let pieces = |store: &StatementStore| -> Vec<Term> {
            store
                .subjects(&crate::model::vocab::rdf_type(), &Mid::Piece.into())
                .cloned()
                .collect()
        };
        assert_eq!(pieces(&a), pieces(&b));
    }
}
