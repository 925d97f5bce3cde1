//! Graph document validation command.

use super::common::{SettingsArgs, fit_channels, load_graph};
use clap::Args;
use recirc_control::build_engine;
use recirc_core::NodeKind;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Graph document (JSON)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// List every non-zero routing weight
    #[arg(short, long)]
    routes: bool,

    #[command(flatten)]
    settings: SettingsArgs,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let doc = load_graph(&args.graph)?;
    let settings = fit_channels(args.settings.load()?, &doc);
    let (engine, ids) = build_engine(&doc, &settings)?;
    let graph = engine.graph();

    println!(
        "{}: {} node(s), {} channel(s), master gain {}",
        args.graph.display(),
        graph.len(),
        graph.output_channels(),
        graph.master_gain()
    );

    let nodes = graph.nodes();
    for (i, node) in nodes.iter().enumerate() {
        let type_name = ids.type_name(node.id, node.kind);
        if type_name == node.kind.as_str() {
            println!("  [{i}] {:12} {type_name}", ids.label(node.id));
        } else {
            println!("  [{i}] {:12} {type_name} (unrecognized, runs as {})", ids.label(node.id), node.kind);
        }
    }

    let matrix = graph.matrix();
    let mut feedback = 0;
    for c in 0..matrix.channels() {
        for src in 0..nodes.len() {
            for dst in 0..nodes.len() {
                let w = matrix.weight(c, src, dst);
                if w == 0.0 {
                    continue;
                }
                if dst <= src {
                    feedback += 1;
                }
                if args.routes {
                    println!(
                        "  ch{c}: {} -> {} ({w})",
                        ids.label(nodes[src].id),
                        ids.label(nodes[dst].id)
                    );
                }
            }
        }
    }
    if feedback > 0 {
        println!("  {feedback} route(s) feed back to the same or an earlier node");
    }

    let mixers = nodes.iter().filter(|n| n.kind == NodeKind::OutputMixer).count();
    if mixers == 0 && nodes.len() > 1 {
        println!("  warning: no output_mixer node, the graph renders silence");
    }

    println!("OK");
    Ok(())
}
