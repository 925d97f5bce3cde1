//! Offline rendering of a graph document to WAV.

use super::common::{SettingsArgs, fit_channels, load_graph};
use crate::wav::write_planar;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use recirc_control::render_graph;
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Graph document (JSON)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Length in seconds
    #[arg(short, long, default_value = "5.0")]
    duration: f32,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    settings: SettingsArgs,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.graph)?;
    let settings = fit_channels(args.settings.load()?, &graph);

    if !args.quiet {
        println!(
            "Rendering {} node(s), {} channel(s), {:.2}s at {} Hz...",
            graph.nodes.len(),
            graph.output_channels,
            args.duration,
            settings.sample_rate
        );
    }

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let render = render_graph(&graph, &settings, args.duration, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    write_planar(
        &args.output,
        &render.channels,
        render.sample_rate as u32,
        args.bit_depth,
    )?;

    if !args.quiet {
        let peak = render
            .channels
            .iter()
            .flatten()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        println!("Wrote {} (peak {:.3})", args.output.display(), peak);
    }
    Ok(())
}
