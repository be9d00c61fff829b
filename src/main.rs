use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use midi_ld::{
    Args, Command, decode_store, export_midi_file, import_midi_file, parse_graph_format,
    piece_to_graph, read_graph_file, write_graph_to,
};
use std::fs;
use std::io::{self, BufWriter};

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Encode {
            midi,
            output,
            format,
            gz,
        } => {
            let format = parse_graph_format(&format);

            info!("Encoding MIDI file: '{}'...", midi.display());
            let (piece, bytes) = import_midi_file(&midi)?;
            let store = piece_to_graph(&piece, &bytes, &midi.display().to_string());

            match output {
                Some(path) => {
                    let file = fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_graph_to(&store, format, BufWriter::new(file), gz)?;
                    info!("Graph saved to {}..!", path.display());
                }
                None => write_graph_to(&store, format, io::stdout().lock(), gz)?,
            }
        }
        Command::Decode {
            graph,
            output,
            format,
        } => {
            info!("Decoding graph: '{}'...", graph.display());
            let store = read_graph_file(&graph, format.as_deref().map(parse_graph_format))?;
            let decoded = decode_store(&store)?;

            if !decoded.skipped.is_empty() {
                warn!(
                    "Skipped {} event(s) with unrecognized types..!",
                    decoded.skipped.len()
                );
            }

            export_midi_file(&decoded.piece, &output)?;
            info!("MIDI saved to {}..!", output.display());
        }
    }

    Ok(())
}
