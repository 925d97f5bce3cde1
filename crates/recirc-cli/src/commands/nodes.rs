//! Node type listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use recirc_core::{NodeKind, ParamDescriptor, ParamKind};

#[derive(Args)]
pub struct NodesArgs {
    /// Show details for a specific node type
    #[arg(value_name = "TYPE")]
    kind: Option<String>,
}

fn range(desc: &ParamDescriptor) -> String {
    match desc.kind {
        ParamKind::Enum(options) => options.join(" | "),
        ParamKind::Bool => "on | off".to_string(),
        ParamKind::Float | ParamKind::Int => format!("{} to {}", desc.min, desc.max),
    }
}

fn default_value(desc: &ParamDescriptor) -> String {
    match desc.kind {
        ParamKind::Enum(_) => desc.option_name(desc.default).unwrap_or("?").to_string(),
        ParamKind::Bool => (if desc.default >= 0.5 { "on" } else { "off" }).to_string(),
        ParamKind::Float | ParamKind::Int => format!("{}", desc.default),
    }
}

pub fn run(args: NodesArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.kind {
        let Ok(kind) = name.parse::<NodeKind>() else {
            let fallback = NodeKind::from_name_or_passthrough(name);
            println!("{name}");
            println!("{}", "=".repeat(name.len()));
            println!();
            println!("Not a built-in type. Nodes of this type run as '{fallback}' (output = input).");
            println!();
            println!("No parameters.");
            return Ok(());
        };

        println!("{kind}");
        println!("{}", "=".repeat(kind.as_str().len()));
        println!();
        println!("{}", kind.description());
        println!();

        if kind.params().is_empty() {
            println!("No parameters.");
            return Ok(());
        }

        println!("Parameters:");
        println!();
        println!("  {:12}  {:14}  {:10}  {}", "Id", "Name", "Default", "Range");
        println!("  {:12}  {:14}  {:10}  {}", "--", "----", "-------", "-----");
        for desc in kind.params() {
            println!(
                "  {:12}  {:14}  {:10}  {}",
                desc.string_id,
                desc.name,
                default_value(desc),
                range(desc)
            );
        }
    } else {
        println!("Node Types");
        println!("==========");
        println!();
        for kind in NodeKind::ALL {
            println!("  {:14} - {}", kind.as_str(), kind.description());
        }
        println!();
        println!("Use 'recirc nodes <type>' for parameter details.");
    }

    Ok(())
}
