//! Recirc Core - real-time multichannel feedback graph engine
//!
//! This crate holds everything that runs on the audio thread: the graph
//! model, the DSP kernels, the modulation system and the block pipeline
//! that ties them together. Control-side concerns (wire formats, queues,
//! configuration files) live in `recirc-control`.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`AudioGraph`] - Node list, `[channel][source][dest]` routing matrix,
//!   master gain and global modulation settings
//! - [`NodeKind`] - The closed set of node types and their parameter schemas
//! - [`NodeId`] - Stable node identifier
//!
//! ## Engine
//!
//! - [`Engine`] - Block-synchronous processor with one-block feedback delay
//! - [`KernelTable`] - Function-pointer dispatch from node type to kernel
//! - [`OutputStage`] - Final mix with RMS overload guard
//!
//! ## DSP Primitives
//!
//! - [`Biquad`] - Second-order IIR filter with RBJ cookbook coefficients
//! - [`DelayLine`] - Integer-sample ring buffer
//! - [`Lfo`] - Low-frequency oscillator (5 waveforms)
//! - [`EnvelopeFollower`] - Peak follower with attack/release smoothing
//! - [`XorShift32`] - Deterministic noise source
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`foldback`], [`rms`], etc.
//!
//! # no_std Support
//!
//! The audio path only needs `alloc`. Disable the default `std` feature in
//! your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! recirc-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use recirc_core::{Engine, EngineConfig, KernelTable, NodeKind};
//!
//! let mut engine = Engine::new(EngineConfig::default(), KernelTable::standard());
//! let osc = engine.add_node(NodeKind::Oscillator);
//! let out = engine.add_node(NodeKind::OutputMixer);
//! engine.set_matrix_weight(0, osc, out, 1.0).unwrap();
//! engine.set_matrix_weight(1, osc, out, 1.0).unwrap();
//!
//! let render = engine.render_offline(0.1).unwrap();
//! assert_eq!(render.channels.len(), 2);
//! assert_eq!(render.channels[0].len(), 4800);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations, locks or panics in `process_block`
//! - **Closed node set**: Kernels are plain functions, state is an enum
//! - **Fault isolation**: A misbehaving node is silenced, not the session

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod buffer;
pub mod delay;
pub mod engine;
pub mod envelope;
pub mod graph;
pub mod kernels;
pub mod lfo;
pub mod math;
pub mod modulation;
pub mod node_kind;
pub mod param_info;
pub mod rng;

// Re-export main types at crate root
pub use biquad::{Biquad, BiquadCoefficients, FilterType};
pub use buffer::ChannelBuffer;
pub use delay::DelayLine;
pub use engine::{
    DEFAULT_RMS_THRESHOLD, Engine, EngineConfig, EngineEvent, EngineStatus, EventLog,
    MAX_OFFLINE_SECONDS, OfflineJob, OfflineRender, OutputStage,
};
pub use envelope::EnvelopeFollower;
pub use graph::{AudioGraph, GraphError, NodeId, NodeInstance, RoutingMatrix};
pub use kernels::{Kernel, KernelContext, KernelFault, KernelTable, NodeState};
pub use lfo::{Lfo, LfoWaveform};
pub use math::{
    all_finite, db_to_linear, flush_denormal, foldback, hard_clip, linear_to_db, rms, wet_dry_mix,
};
pub use modulation::{
    EnvelopeSettings, GlobalModulation, LfoSettings, ModSlot, ModSource, ModulationBank,
    ParamModulation,
};
pub use node_kind::{NodeKind, UnknownNodeKind};
pub use param_info::{MAX_PARAMS, ParamDescriptor, ParamKind, ParamScale, Params};
pub use rng::XorShift32;
