use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "midi-ld",
    about = "Convert MIDI files to linked-data statement graphs and back!"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a MIDI file into a statement graph.
    Encode {
        /// Path to the source MIDI file.
        midi: PathBuf,

        /// Output graph file (if omitted the graph is printed to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Graph serialization format: turtle|nt|nquads|trig|xml|json.
        #[arg(short, long, default_value = "turtle")]
        format: String,

        /// Gzip the serialized graph.
        #[arg(short = 'z', long)]
        gz: bool,
    },

    /// Rebuild a MIDI file from a statement graph.
    Decode {
        /// Path to the graph, optionally gzipped.
        graph: PathBuf,

        /// Path of the MIDI file to write.
        output: PathBuf,

        /// Graph serialization format (guessed from the file name if omitted).
        #[arg(short, long)]
        format: Option<String>,
    },
}
