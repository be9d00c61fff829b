use crate::model::statement::Term;
use crate::model::vocab::{FILE_NS, Mid, Prov, piece_iri, rdf_type};
use crate::store::StatementStore;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

pub const AGENT_IRI: &str = "https://github.com/midi-ld/midi2rdf";

/// Stable identifier of a piece, derived from the bytes it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PieceId(String);

impl PieceId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        PieceId(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn piece_iri(&self) -> String {
        piece_iri(&self.0)
    }

    pub fn file_iri(&self) -> String {
        format!("{}{}", FILE_NS, self.0)
    }

    pub fn activity_iri(&self) -> String {
        format!("{}-activity", self.piece_iri())
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who produced a piece's graph, from which file, and when.
#[derive(Debug, Clone)]
pub struct Provenance<'a> {
    pub id: &'a PieceId,
    pub source_path: &'a str,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
}

impl Provenance<'_> {
    pub fn annotate(&self, store: &mut StatementStore) {
        let agent = Term::iri(AGENT_IRI);
        let piece = Term::iri(self.id.piece_iri());
        let file = Term::iri(self.id.file_iri());
        let activity = Term::iri(self.id.activity_iri());

        store.insert(agent.clone(), rdf_type(), Prov::Agent);
        store.insert(piece.clone(), rdf_type(), Prov::Entity);
        store.insert(file.clone(), rdf_type(), Prov::Entity);
        store.insert(file.clone(), rdf_type(), Mid::MidiFile);
        store.insert(file.clone(), Mid::Path, Term::string(self.source_path));
        store.insert(activity.clone(), rdf_type(), Prov::Activity);

        store.insert(piece.clone(), Prov::WasGeneratedBy, activity.clone());
        store.insert(piece.clone(), Prov::WasAttributedTo, agent.clone());
        store.insert(piece.clone(), Prov::WasDerivedFrom, file.clone());
        store.insert(activity.clone(), Prov::WasAssociatedWith, agent);
        store.insert(activity.clone(), Prov::Used, file);

        store.insert(activity.clone(), Prov::StartedAtTime, Term::timestamp(self.started));
        store.insert(activity, Prov::EndedAtTime, Term::timestamp(self.ended));
        store.insert(piece, Prov::GeneratedAtTime, Term::timestamp(self.ended));
    }
}
