//! Control plane for the recirc feedback graph engine.
//!
//! The engine in `recirc-core` only knows numeric node ids and parameter
//! slots. This crate puts a message protocol in front of it:
//!
//! - **Wire types**: JSON graph documents with string node ids and named
//!   parameters ([`GraphDef`], [`NodeDef`])
//! - **Messages**: `{"type": ..., "payload": ...}` commands and
//!   notifications ([`ControlMessage`], [`Notification`])
//! - **Queues**: bounded lock-free channels between a control thread and the
//!   audio thread ([`EngineHandle`], [`Processor`])
//! - **Settings**: engine settings stored as TOML in the user config
//!   directory ([`EngineSettings`])
//!
//! # Example
//!
//! ```rust
//! use recirc_control::{EngineSettings, Notification, channel};
//!
//! let (handle, mut processor) = channel(EngineSettings::default());
//! handle
//!     .send_json(r#"{"type":"INIT_PROCESSOR","payload":{"graph":{"nodes":[
//!         {"id":"osc","type":"oscillator","parameters":{"frequency":220.0}}
//!     ]}}}"#)
//!     .unwrap();
//!
//! // Messages are applied at the next block boundary.
//! let mut left = vec![0.0f32; 128];
//! let mut right = vec![0.0f32; 128];
//! processor.process_block(&[], &mut [&mut left[..], &mut right[..]]);
//!
//! assert_eq!(handle.try_recv(), Some(Notification::ProcessorReady {}));
//! ```

mod error;
mod ids;
mod message;
mod processor;
mod queue;
mod render;
mod wire;

/// Settings file and platform paths.
pub mod config;

pub use config::{EngineSettings, default_path, user_config_dir};
pub use error::ControlError;
pub use ids::IdMap;
pub use message::{ControlMessage, Notification, OFFLINE_RENDER, RenderData};
pub use processor::Processor;
pub use queue::{EngineHandle, Outbound, channel, channel_with_kernels};
pub use render::{build_engine, render_graph};
pub use wire::{EnvelopeDef, GraphDef, LfoDef, ModSlotDef, ModulationDef, NodeDef, ParamValue};

/// Re-export of the engine crate.
pub use recirc_core;
