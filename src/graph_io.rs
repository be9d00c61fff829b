use crate::model::statement::{Literal, Statement, Term};
use crate::model::vocab::{MID_NOTE_NS, MID_NS, PIECE_NS, PROV_NS, XSD_NS};
use crate::store::StatementStore;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use log::debug;
use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, NamedNode, Quad, Subject, Triple};
use oxrdfio::{RdfFormat, RdfParser, RdfSerializer};
use std::borrow::Cow;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const PREFIXES: [(&str, &str); 6] = [
    ("mid", MID_NS),
    ("note", MID_NOTE_NS),
    ("piece", PIECE_NS),
    ("prov", PROV_NS),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", XSD_NS),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphFormat {
    #[default]
    Turtle,
    NTriples,
    NQuads,
    TriG,
    RdfXml,
    /// The store's own serde form, a JSON array of statements.
    Json,
}

impl GraphFormat {
    fn rdf_format(self) -> Option<RdfFormat> {
        match self {
            GraphFormat::Turtle => Some(RdfFormat::Turtle),
            GraphFormat::NTriples => Some(RdfFormat::NTriples),
            GraphFormat::NQuads => Some(RdfFormat::NQuads),
            GraphFormat::TriG => Some(RdfFormat::TriG),
            GraphFormat::RdfXml => Some(RdfFormat::RdfXml),
            GraphFormat::Json => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "ttl" => Some(GraphFormat::Turtle),
            "nt" => Some(GraphFormat::NTriples),
            "nq" => Some(GraphFormat::NQuads),
            "trig" => Some(GraphFormat::TriG),
            "rdf" | "xml" | "owl" => Some(GraphFormat::RdfXml),
            "json" => Some(GraphFormat::Json),
            _ => None,
        }
    }

    /// Guesses the format from a file name, looking through a `.gz` suffix.
    /// Unknown extensions give Turtle.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);

        name.rsplit_once('.')
            .and_then(|(_, extension)| Self::from_extension(extension))
            .unwrap_or_default()
    }
}

/// Serializes the store in sorted statement order.
pub fn write_graph<W: Write>(store: &StatementStore, format: GraphFormat, out: &mut W) -> Result<()> {
    let Some(rdf_format) = format.rdf_format() else {
        serde_json::to_writer_pretty(&mut *out, store).context("Failed to serialize graph")?;
        writeln!(out)?;
        return Ok(());
    };

    let mut serializer = RdfSerializer::from_format(rdf_format);
    for (prefix, iri) in PREFIXES {
        serializer = serializer.with_prefix(prefix, iri)?;
    }

    let mut writer = serializer.for_writer(out);
    for statement in store.sorted() {
        writer.serialize_triple(&to_rdf_triple(statement)?)?;
    }
    writer.finish()?;

    Ok(())
}

/// [`write_graph`], optionally gzip-compressed, flushing `out` when done.
pub fn write_graph_to<W: Write>(
    store: &StatementStore,
    format: GraphFormat,
    mut out: W,
    gz: bool,
) -> Result<()> {
    if gz {
        let mut encoder = GzEncoder::new(out, Compression::default());
        write_graph(store, format, &mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        write_graph(store, format, &mut out)?;
        out.flush()?;
    }

    Ok(())
}

/// Parses a graph. Gzip-compressed input is detected and inflated first.
pub fn read_graph(bytes: &[u8], format: GraphFormat) -> Result<StatementStore> {
    let bytes = if bytes.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        MultiGzDecoder::new(bytes)
            .read_to_end(&mut inflated)
            .context("Failed to decompress graph")?;
        Cow::Owned(inflated)
    } else {
        Cow::Borrowed(bytes)
    };

    let Some(rdf_format) = format.rdf_format() else {
        return serde_json::from_slice(&bytes).context("Failed to parse JSON graph");
    };

    let mut store = StatementStore::new();
    for quad in RdfParser::from_format(rdf_format).for_reader(&bytes[..]) {
        store.push(from_rdf_quad(quad?));
    }
    debug!("Parsed {} statements as {:?}", store.len(), format);

    Ok(store)
}

/// Reads a graph file, guessing the format from its name when none is given.
pub fn read_graph_file<P: AsRef<Path>>(path: P, format: Option<GraphFormat>) -> Result<StatementStore> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read graph file {}", path.display()))?;
    let format = format.unwrap_or_else(|| GraphFormat::from_path(path));

    read_graph(&bytes, format)
        .with_context(|| format!("Failed to parse graph file {}", path.display()))
}

fn to_rdf_triple(statement: &Statement) -> Result<Triple> {
    let subject: Subject = match &statement.subject {
        Term::Iri(iri) => NamedNode::new(iri.as_str())?.into(),
        Term::Blank(id) => BlankNode::new(id.as_str())?.into(),
        Term::Literal(literal) => bail!("Literal {} can't be a subject", literal),
    };

    let predicate = match &statement.predicate {
        Term::Iri(iri) => NamedNode::new(iri.as_str())?,
        other => bail!("{} can't be a predicate", other),
    };

    let object: oxrdf::Term = match &statement.object {
        Term::Iri(iri) => NamedNode::new(iri.as_str())?.into(),
        Term::Blank(id) => BlankNode::new(id.as_str())?.into(),
        Term::Literal(literal) => to_rdf_literal(literal).into(),
    };

    Ok(Triple::new(subject, predicate, object))
}

fn to_rdf_literal(literal: &Literal) -> oxrdf::Literal {
    match literal {
        Literal::Integer(v) => oxrdf::Literal::new_typed_literal(v.to_string(), xsd::INTEGER),
        Literal::Float(v) => oxrdf::Literal::new_typed_literal(double_lexical(*v), xsd::DOUBLE),
        Literal::String(s) => oxrdf::Literal::new_simple_literal(s.as_str()),
        Literal::Timestamp(ts) => oxrdf::Literal::new_typed_literal(
            ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            xsd::DATE_TIME,
        ),
    }
}

fn double_lexical(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let sign = if v < 0.0 { "-" } else { "" };
        format!("{}INF", sign)
    } else {
        format!("{:?}", v)
    }
}

fn from_rdf_quad(quad: Quad) -> Statement {
    let subject = match quad.subject {
        Subject::NamedNode(node) => Term::Iri(node.into_string()),
        Subject::BlankNode(node) => Term::Blank(node.into_string()),
    };

    let object = match quad.object {
        oxrdf::Term::NamedNode(node) => Term::Iri(node.into_string()),
        oxrdf::Term::BlankNode(node) => Term::Blank(node.into_string()),
        oxrdf::Term::Literal(literal) => Term::Literal(from_rdf_literal(&literal)),
    };

    Statement {
        subject,
        predicate: Term::Iri(quad.predicate.into_string()),
        object,
    }
}

/// Typed literals map onto the matching [`Literal`] variant. Values that
/// don't parse, and every other datatype, stay strings.
fn from_rdf_literal(literal: &oxrdf::Literal) -> Literal {
    let value = literal.value();
    let text = || Literal::String(value.to_string());

    match literal.datatype().as_str().strip_prefix(XSD_NS) {
        Some(
            "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
            | "unsignedInt" | "unsignedShort" | "unsignedByte",
        ) => value.trim().parse().map(Literal::Integer).unwrap_or_else(|_| text()),
        Some("double" | "float" | "decimal") => match value.trim() {
            "INF" => Literal::Float(f64::INFINITY),
            "-INF" => Literal::Float(f64::NEG_INFINITY),
            other => other.parse().map(Literal::Float).unwrap_or_else(|_| text()),
        },
        Some("dateTime") => DateTime::parse_from_rfc3339(value.trim())
            .map(|ts| Literal::Timestamp(ts.with_timezone(&Utc)))
            .unwrap_or_else(|_| text()),
        _ => text(),
    }
}
