//! Scripted control session.
//!
//! A script holds one JSON control message per line; blank lines and lines
//! starting with `#` are skipped. Each message is queued and followed by a
//! number of processed blocks, and every notification is printed as a JSON
//! line on stdout.
//!
//! An `INIT_PROCESSOR` in the script may change the sample rate and channel
//! ceiling; the recording follows the processor's settings.

use super::common::SettingsArgs;
use crate::wav::write_planar;
use clap::Args;
use recirc_control::{EngineHandle, Notification, Processor, channel};
use std::path::PathBuf;

#[derive(Args)]
pub struct ReplayArgs {
    /// Script of JSON control messages, one per line
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Blocks to process after each message
    #[arg(long, default_value = "1")]
    blocks: usize,

    /// Extra seconds to process after the last message
    #[arg(long, default_value = "0.0")]
    tail: f32,

    /// Record the processed audio to a WAV file
    #[arg(short, long, value_name = "WAV")]
    output: Option<PathBuf>,

    /// Continue after a line that fails to decode
    #[arg(long)]
    keep_going: bool,

    #[command(flatten)]
    settings: SettingsArgs,
}

struct Session {
    handle: EngineHandle,
    processor: Processor,
    block: Vec<Vec<f32>>,
    recording: Option<Vec<Vec<f32>>>,
}

impl Session {
    fn process(&mut self, blocks: usize) -> anyhow::Result<()> {
        for _ in 0..blocks {
            let block_size = self.processor.settings().block_size;
            let channels = self.processor.settings().max_channels;
            self.block.resize(channels, vec![0.0; block_size]);

            let mut outputs: Vec<&mut [f32]> = self.block.iter_mut().map(Vec::as_mut_slice).collect();
            self.processor.process_block(&[], &mut outputs);

            if let Some(recording) = &mut self.recording {
                // Tracks only grow; a channel that went away records silence.
                let frames = recording.first().map_or(0, Vec::len);
                if recording.len() < channels {
                    recording.resize(channels, vec![0.0; frames]);
                }
                for (i, track) in recording.iter_mut().enumerate() {
                    match self.block.get(i) {
                        Some(block) => track.extend_from_slice(block),
                        None => track.resize(frames + block_size, 0.0),
                    }
                }
            }
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        for notification in self.handle.drain() {
            match &notification {
                Notification::DataAvailable { data_type, data } => {
                    let frames = data.channels.first().map_or(0, Vec::len);
                    println!(
                        "{}",
                        serde_json::json!({
                            "type": "DATA_AVAILABLE",
                            "payload": {
                                "dataType": data_type,
                                "sampleRate": data.sample_rate,
                                "channels": data.channels.len(),
                                "frames": frames,
                            }
                        })
                    );
                }
                other => println!("{}", other.to_json()?),
            }
        }
        Ok(())
    }
}

pub fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let settings = args.settings.load()?;
    let script = std::fs::read_to_string(&args.script)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", args.script.display()))?;

    let (handle, processor) = channel(settings);
    let mut session = Session {
        handle,
        processor,
        block: vec![vec![0.0; settings.block_size]; settings.max_channels],
        recording: args.output.as_ref().map(|_| Vec::new()),
    };

    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(err) = session.handle.send_json(line) {
            if !args.keep_going {
                anyhow::bail!("{}:{}: {err}", args.script.display(), number + 1);
            }
            eprintln!("{}:{}: {err}", args.script.display(), number + 1);
            continue;
        }
        session.process(args.blocks.max(1))?;
    }

    let active = *session.processor.settings();
    let tail_blocks = (args.tail.max(0.0) * active.sample_rate / active.block_size as f32).ceil() as usize;
    session.process(tail_blocks)?;

    if let (Some(path), Some(recording)) = (&args.output, &session.recording) {
        write_planar(path, recording, active.sample_rate.round() as u32, 32)?;
        tracing::info!(
            path = %path.display(),
            sample_rate = active.sample_rate,
            channels = recording.len(),
            "wrote recording"
        );
    }

    if session.processor.dropped_notifications() > 0 {
        eprintln!(
            "warning: {} notification(s) dropped",
            session.processor.dropped_notifications()
        );
    }
    Ok(())
}
