use crate::model::piece::*;
use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::fs;
use std::path::Path;

const CLOCKS_PER_CLICK: u8 = 24;
const NOTATED_32NDS_PER_QUARTER: u8 = 8;

/// Reads a Standard MIDI File into a [`Piece`], returning the raw bytes too
/// so callers can derive an identifier from them.
pub fn import_midi_file<P: AsRef<Path>>(path: P) -> Result<(Piece, Vec<u8>)> {
    let bytes = fs::read(path.as_ref()).map_err(|e| {
        anyhow!(
            "Failed to read MIDI file {}: {}",
            path.as_ref().display(),
            e
        )
    })?;

    let piece = midi_bytes_to_piece(&bytes)?;
    Ok((piece, bytes))
}

pub fn midi_bytes_to_piece(bytes: &[u8]) -> Result<Piece> {
    let smf = Smf::parse(bytes).map_err(|e| anyhow!("Failed to parse MIDI: {:?}", e))?;

    let resolution = match smf.header.timing {
        Timing::Metrical(t) => t.as_int(),
        Timing::Timecode(_fps, _subframe) => {
            return Err(anyhow!(
                "SMPTE timecode midi timing is not currently supported..!"
            ));
        }
    };

    let format = match smf.header.format {
        Format::SingleTrack => 0,
        Format::Parallel => 1,
        Format::Sequential => 2,
    };

    debug!("Ticks per quarter note: {}", resolution);
    debug!(
        "MIDI format: {:?}, tracks: {}",
        smf.header.format,
        smf.tracks.len()
    );

    let mut piece = Piece::new(resolution, format);
    for track in smf.tracks.iter() {
        piece.tracks.push(Track {
            events: track.iter().map(event_from_midly).collect(),
        });
    }

    Ok(piece)
}

fn event_from_midly(event: &TrackEvent<'_>) -> Event {
    let kind = match &event.kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } => EventKind::NoteOn {
                    channel,
                    note: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::NoteOff { key, vel } => EventKind::NoteOff {
                    channel,
                    note: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::Aftertouch { .. } => EventKind::other("polytouch"),
                MidiMessage::Controller { .. } => EventKind::other("control_change"),
                MidiMessage::ProgramChange { .. } => EventKind::other("program_change"),
                MidiMessage::ChannelAftertouch { .. } => EventKind::other("aftertouch"),
                MidiMessage::PitchBend { .. } => EventKind::other("pitchwheel"),
            }
        }
        TrackEventKind::SysEx(_) => EventKind::other("sysex"),
        TrackEventKind::Escape(_) => EventKind::other("escape"),
        TrackEventKind::Meta(meta) => match meta {
            MetaMessage::Tempo(mpqn) => EventKind::SetTempo {
                tempo: mpqn.as_int(),
            },
            MetaMessage::TimeSignature(numerator, denominator_pow, _, _) => {
                let denominator = 1i64
                    .checked_shl(*denominator_pow as u32)
                    .unwrap_or(0);
                EventKind::TimeSignature {
                    numerator: *numerator,
                    denominator: sanitize_denominator(denominator),
                }
            }
            MetaMessage::TrackName(bytes) => EventKind::TrackName {
                name: String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .to_string(),
            },
            MetaMessage::EndOfTrack => EventKind::EndOfTrack,
            MetaMessage::TrackNumber(_) => EventKind::other("sequence_number"),
            MetaMessage::Text(_) => EventKind::other("text"),
            MetaMessage::Copyright(_) => EventKind::other("copyright"),
            MetaMessage::InstrumentName(_) => EventKind::other("instrument_name"),
            MetaMessage::Lyric(_) => EventKind::other("lyrics"),
            MetaMessage::Marker(_) => EventKind::other("marker"),
            MetaMessage::CuePoint(_) => EventKind::other("cue_marker"),
            MetaMessage::ProgramName(_) => EventKind::other("program_name"),
            MetaMessage::DeviceName(_) => EventKind::other("device_name"),
            MetaMessage::MidiChannel(_) => EventKind::other("channel_prefix"),
            MetaMessage::MidiPort(_) => EventKind::other("midi_port"),
            MetaMessage::SmpteOffset(_) => EventKind::other("smpte_offset"),
            MetaMessage::KeySignature(_, _) => EventKind::other("key_signature"),
            MetaMessage::SequencerSpecific(_) => EventKind::other("sequencer_specific"),
            MetaMessage::Unknown(_, _) => EventKind::other("unknown_meta"),
        },
    };

    Event::new(event.delta.as_int(), kind)
}

/// Builds an SMF borrowing text from `piece`.
///
/// Pass-through events can't be written back, so their delta is carried into
/// the next written event. Every track ends with an end_of_track.
pub fn piece_to_smf(piece: &Piece) -> Result<Smf<'_>> {
    if piece.resolution == 0 || piece.resolution > MAX_RESOLUTION {
        bail!(
            "Resolution {} is outside 1..={}..!",
            piece.resolution,
            MAX_RESOLUTION
        );
    }

    let format = match piece.format {
        0 => Format::SingleTrack,
        2 => Format::Sequential,
        _ => Format::Parallel,
    };

    let mut smf = Smf::new(Header::new(
        format,
        Timing::Metrical(u15::new(piece.resolution)),
    ));

    for (track_idx, track) in piece.tracks.iter().enumerate() {
        let mut out: Vec<TrackEvent<'_>> = Vec::with_capacity(track.events.len() + 1);
        let mut carried: u32 = 0;

        for event in track.events.iter() {
            let delta = carried.saturating_add(event.delta_ticks).min(MAX_DELTA_TICKS);
            let Some(kind) = event_to_midly(&event.kind) else {
                debug!(
                    "Track {}: carrying {} ticks past unwritable '{}' event",
                    track_idx,
                    event.delta_ticks,
                    event.kind.tag()
                );
                carried = delta;
                continue;
            };

            carried = 0;
            out.push(TrackEvent {
                delta: u28::new(delta),
                kind,
            });
        }

        let ends_cleanly = matches!(
            out.last(),
            Some(TrackEvent {
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
                ..
            })
        );
        if !ends_cleanly || carried > 0 {
            out.push(TrackEvent {
                delta: u28::new(carried),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            });
        }

        smf.tracks.push(out);
    }

    Ok(smf)
}

fn event_to_midly(kind: &EventKind) -> Option<TrackEventKind<'_>> {
    let event = match kind {
        EventKind::NoteOn {
            channel,
            note,
            velocity,
        } => TrackEventKind::Midi {
            channel: u4::new((*channel).min(15)),
            message: MidiMessage::NoteOn {
                key: u7::new((*note).min(127)),
                vel: u7::new((*velocity).min(127)),
            },
        },
        EventKind::NoteOff {
            channel,
            note,
            velocity,
        } => TrackEventKind::Midi {
            channel: u4::new((*channel).min(15)),
            message: MidiMessage::NoteOff {
                key: u7::new((*note).min(127)),
                vel: u7::new((*velocity).min(127)),
            },
        },
        EventKind::SetTempo { tempo } => {
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new((*tempo).clamp(1, MAX_TEMPO))))
        }
        EventKind::TimeSignature {
            numerator,
            denominator,
        } => TrackEventKind::Meta(MetaMessage::TimeSignature(
            *numerator,
            sanitize_denominator(*denominator as i64).trailing_zeros() as u8,
            CLOCKS_PER_CLICK,
            NOTATED_32NDS_PER_QUARTER,
        )),
        EventKind::EndOfTrack => TrackEventKind::Meta(MetaMessage::EndOfTrack),
        EventKind::TrackName { name } => TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        EventKind::Other { .. } => return None,
    };

    Some(event)
}

pub fn piece_to_midi_bytes(piece: &Piece) -> Result<Vec<u8>> {
    let smf = piece_to_smf(piece)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)
        .map_err(|e| anyhow!("Failed to write MIDI: {}", e))?;
    Ok(buf)
}

pub fn export_midi_file<P: AsRef<Path>>(piece: &Piece, path: P) -> Result<()> {
    let bytes = piece_to_midi_bytes(piece)?;
    fs::write(path.as_ref(), bytes)
        .with_context(|| format!("Failed to write MIDI file {}", path.as_ref().display()))
}
