use crate::graph_io::GraphFormat;
use log::info;

pub fn parse_graph_format(s: &str) -> GraphFormat {
    match s.to_lowercase().as_str() {
        "ttl" | "turtle" => GraphFormat::Turtle,
        // turtle is valid n3
        "n3" => GraphFormat::Turtle,
        "nt" | "ntriples" | "n-triples" => GraphFormat::NTriples,
        "nq" | "nquads" => GraphFormat::NQuads,
        "trig" => GraphFormat::TriG,
        "xml" | "rdf" | "rdfxml" | "pretty-xml" => GraphFormat::RdfXml,
        "j" | "json" => GraphFormat::Json,
        other => {
            info!("Unknown graph format '{}', defaulting to `turtle`..!", other);
            GraphFormat::Turtle
        }
    }
}

/// Closest plain-ASCII rendering of `text`, for MIDI text meta events.
pub fn ascii_text(text: &str) -> String {
    deunicode::deunicode(text).trim().to_string()
}
