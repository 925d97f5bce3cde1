//! Block-synchronous feedback engine.
//!
//! [`Engine`] owns the [`AudioGraph`], one [`NodeState`] per node, and two
//! sets of per-node output buffers: the previous block's and the current
//! block's. Every call to [`process_block`](Engine::process_block):
//!
//! 1. samples the global modulation generators once for the block
//! 2. builds each node's input as `Σ prev[source] * weight[c][source][dest]`,
//!    adding the host input for `input_mixer` nodes
//! 3. runs each node's kernel, in node order, into the current buffers
//! 4. mixes `output_mixer` outputs to the host through the [`OutputStage`]
//! 5. swaps the buffer sets
//!
//! Because inputs only ever read the previous block, any cycle in the
//! routing matrix is a one-block delay and no topological ordering is
//! needed.
//!
//! # Real-time contract
//!
//! `process_block` never allocates, locks or fails. Kernel faults zero the
//! node's output for the block and are recorded in a bounded event log that
//! the control side drains with [`drain_events`](Engine::drain_events).
//! Allocation happens only in the mutation methods, which reconcile state
//! and buffers with the graph and must be called between blocks.
//!
//! # Example
//!
//! ```rust
//! use recirc_core::{Engine, EngineConfig, KernelTable, NodeKind};
//!
//! let config = EngineConfig { block_size: 64, max_channels: 1, ..EngineConfig::default() };
//! let mut engine = Engine::new(config, KernelTable::standard());
//! let gain = engine.add_node(NodeKind::Gain);
//! engine.update_parameter_by_name(gain, "gain", 0.5).unwrap();
//!
//! let mut input = [0.0f32; 64];
//! input[0] = 1.0;
//! let mut output = [0.0f32; 64];
//! // A lone gain node has no routed input; nothing reaches it.
//! engine.process_block(&[&input[..]], &mut [&mut output[..]]);
//! assert!(output.iter().all(|s| *s == 0.0));
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

pub mod events;
pub mod output;

pub use events::{EngineEvent, EventLog};
pub use output::{DEFAULT_RMS_THRESHOLD, OutputStage};

use crate::buffer::ChannelBuffer;
use crate::graph::{AudioGraph, GraphError, NodeId, NodeInstance};
use crate::kernels::{KernelContext, KernelFault, KernelTable, NodeState, StateConfig};
use crate::math::all_finite;
use crate::modulation::{EnvelopeSettings, LfoSettings, ModSlot, ModSource, ModulationBank};
use crate::node_kind::NodeKind;
use crate::rng::XorShift32;

/// Session constants fixed at engine construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Frames per block.
    pub block_size: usize,
    /// Largest channel count the graph may use.
    pub max_channels: usize,
    /// Longest delay a delay node can hold, in seconds.
    pub max_delay_seconds: f32,
    /// RMS ceiling of the output guard.
    pub rms_threshold: f32,
    /// Waveshaper transfer-curve length.
    pub waveshaper_curve_size: usize,
    /// Events held between drains.
    pub event_capacity: usize,
    /// Seed for noise, held-random LFOs and chaos.
    pub seed: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 128,
            max_channels: 2,
            max_delay_seconds: 5.0,
            rms_threshold: DEFAULT_RMS_THRESHOLD,
            waveshaper_curve_size: 8192,
            event_capacity: 64,
            seed: XorShift32::DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    /// Replaces unusable values with defaults and enforces minimum sizes.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            sample_rate: if self.sample_rate.is_finite() && self.sample_rate > 0.0 {
                self.sample_rate
            } else {
                defaults.sample_rate
            },
            block_size: self.block_size.max(1),
            max_channels: self.max_channels.max(1),
            max_delay_seconds: if self.max_delay_seconds.is_finite() && self.max_delay_seconds > 0.0 {
                self.max_delay_seconds
            } else {
                defaults.max_delay_seconds
            },
            rms_threshold: OutputStage::new(self.rms_threshold).threshold(),
            waveshaper_curve_size: self.waveshaper_curve_size.max(2),
            event_capacity: self.event_capacity,
            seed: self.seed,
        }
    }
}

/// Snapshot of engine counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    /// Nodes in the graph.
    pub node_count: usize,
    /// Active channel count.
    pub output_channels: usize,
    /// Blocks processed since construction.
    pub blocks_processed: u64,
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Frames per block.
    pub block_size: usize,
    /// Events lost to a full log.
    pub dropped_events: u64,
}

/// Result of an offline render: one `Vec` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineRender {
    /// Sample rate of the audio.
    pub sample_rate: f32,
    /// Per-channel samples.
    pub channels: Vec<Vec<f32>>,
}

/// Longest offline render accepted, in seconds.
pub const MAX_OFFLINE_SECONDS: f32 = 600.0;

/// The feedback graph engine.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    kernels: KernelTable,
    graph: AudioGraph,
    ids: Vec<NodeId>,
    states: Vec<NodeState>,
    prev: Vec<ChannelBuffer>,
    current: Vec<ChannelBuffer>,
    scratch: ChannelBuffer,
    modulation: ModulationBank,
    output: OutputStage,
    events: EventLog,
    limited: u64,
    blocks_processed: u64,
    next_seed: u32,
}

impl Engine {
    /// Engine with an empty graph using `max_channels` channels.
    pub fn new(config: EngineConfig, kernels: KernelTable) -> Self {
        let config = config.sanitized();
        let graph = AudioGraph::new(config.max_channels);
        let mut engine = Self {
            config,
            kernels,
            scratch: ChannelBuffer::new(graph.output_channels(), config.block_size),
            graph,
            ids: Vec::new(),
            states: Vec::new(),
            prev: Vec::new(),
            current: Vec::new(),
            modulation: ModulationBank::new(config.sample_rate, config.seed),
            output: OutputStage::new(config.rms_threshold),
            events: EventLog::new(config.event_capacity),
            limited: 0,
            blocks_processed: 0,
            next_seed: config.seed,
        };
        engine.reconcile();
        engine
    }

    /// Engine running `graph`.
    pub fn with_graph(config: EngineConfig, kernels: KernelTable, graph: AudioGraph) -> Result<Self, GraphError> {
        let mut engine = Self::new(config, kernels);
        engine.replace_graph(graph)?;
        Ok(engine)
    }

    /// Session constants.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The graph being processed.
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    /// Per-node state, parallel to the node list.
    pub fn states(&self) -> &[NodeState] {
        &self.states
    }

    /// Output of node `index` from the last processed block.
    pub fn node_output(&self, index: usize) -> Option<&ChannelBuffer> {
        self.prev.get(index)
    }

    /// Counters for status reporting.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            node_count: self.graph.len(),
            output_channels: self.graph.output_channels(),
            blocks_processed: self.blocks_processed,
            sample_rate: self.config.sample_rate,
            block_size: self.config.block_size,
            dropped_events: self.events.dropped(),
        }
    }

    /// Removes and yields events recorded since the last drain.
    pub fn drain_events(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.events.drain()
    }

    // ========================================================================
    // Mutation (between blocks only)
    // ========================================================================

    /// Replaces the whole graph. State is kept for nodes whose id and type
    /// survive; everything else starts fresh. On error the old graph stays.
    pub fn replace_graph(&mut self, graph: AudioGraph) -> Result<(), GraphError> {
        graph.validate()?;
        self.check_channels(graph.output_channels())?;
        self.graph = graph;
        self.reconcile();
        Ok(())
    }

    /// Adds a node with default parameters.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.graph.add_node(kind);
        self.reconcile();
        id
    }

    /// Adds a node carrying its own id.
    pub fn insert_node(&mut self, instance: NodeInstance) -> Result<NodeId, GraphError> {
        let id = instance.id;
        self.graph.insert_node(instance)?;
        self.reconcile();
        Ok(id)
    }

    /// Removes a node, shifting higher indices down.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.graph.remove_node(id)?;
        self.reconcile();
        Ok(())
    }

    /// Sets a parameter by slot. Returns the stored value.
    pub fn update_parameter(&mut self, id: NodeId, index: usize, value: f32) -> Result<f32, GraphError> {
        self.graph.update_parameter(id, index, value)
    }

    /// Sets a parameter by wire id. Returns `(slot, stored value)`.
    pub fn update_parameter_by_name(
        &mut self,
        id: NodeId,
        parameter: &str,
        value: f32,
    ) -> Result<(usize, f32), GraphError> {
        self.graph.update_parameter_by_name(id, parameter, value)
    }

    /// Edits one modulation slot.
    pub fn set_modulation(
        &mut self,
        id: NodeId,
        parameter: &str,
        source: ModSource,
        slot: ModSlot,
    ) -> Result<usize, GraphError> {
        self.graph.set_modulation(id, parameter, source, slot)
    }

    /// Sets one routing weight. Returns the stored weight.
    pub fn set_matrix_weight(
        &mut self,
        channel: usize,
        source: NodeId,
        dest: NodeId,
        weight: f32,
    ) -> Result<f32, GraphError> {
        self.graph.set_matrix_weight(channel, source, dest, weight)
    }

    /// Changes the channel count within `1..=max_channels`.
    pub fn set_output_channels(&mut self, channels: usize) -> Result<(), GraphError> {
        self.check_channels(channels)?;
        self.graph.set_output_channels(channels)?;
        self.reconcile();
        Ok(())
    }

    /// Sets the master gain.
    pub fn set_master_gain(&mut self, gain: f32) -> Result<(), GraphError> {
        self.graph.set_master_gain(gain)
    }

    /// Sets the chaos level.
    pub fn set_chaos_level(&mut self, level: f32) -> Result<(), GraphError> {
        self.graph.set_chaos_level(level)
    }

    /// Replaces LFO settings.
    pub fn set_lfo(&mut self, index: usize, settings: LfoSettings) -> Result<(), GraphError> {
        self.graph.set_lfo(index, settings)
    }

    /// Replaces envelope follower settings.
    pub fn set_envelope(&mut self, index: usize, settings: EnvelopeSettings) -> Result<(), GraphError> {
        self.graph.set_envelope(index, settings)
    }

    fn check_channels(&self, channels: usize) -> Result<(), GraphError> {
        if channels == 0 || channels > self.config.max_channels {
            return Err(GraphError::InvalidChannelCount {
                requested: channels,
                max: self.config.max_channels,
            });
        }
        Ok(())
    }

    /// Rebuilds state and buffer tables to match the graph. Surviving
    /// nodes (same id and type) keep their state and last output.
    fn reconcile(&mut self) {
        let channels = self.graph.output_channels();
        let block = self.config.block_size;

        let mut old: Vec<Option<(NodeId, NodeState, ChannelBuffer)>> = self
            .ids
            .drain(..)
            .zip(self.states.drain(..))
            .zip(self.prev.drain(..))
            .map(|((id, state), buf)| Some((id, state, buf)))
            .collect();

        for node in self.graph.nodes() {
            let reused = old
                .iter_mut()
                .find(|entry| matches!(entry, Some((id, state, _)) if *id == node.id && state.matches(node.kind)))
                .and_then(Option::take);

            let (mut state, mut buffer) = match reused {
                Some((_, state, buffer)) => (state, buffer),
                None => {
                    let seed = self.next_seed;
                    self.next_seed = self.next_seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    let config = StateConfig {
                        sample_rate: self.config.sample_rate,
                        channels,
                        max_delay_seconds: self.config.max_delay_seconds,
                        curve_size: self.config.waveshaper_curve_size,
                        seed,
                    };
                    (NodeState::new(node.kind, &config), ChannelBuffer::new(channels, block))
                }
            };
            state.set_channels(channels);
            buffer.set_channels(channels);
            self.ids.push(node.id);
            self.states.push(state);
            self.prev.push(buffer);
        }

        self.current = (0..self.ids.len()).map(|_| ChannelBuffer::new(channels, block)).collect();
        self.scratch.set_channels(channels);
        self.limited = 0;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "engine_reconcile: {} nodes, {} channels",
            self.ids.len(),
            channels
        );
    }

    // ========================================================================
    // Audio path
    // ========================================================================

    /// Processes one block.
    ///
    /// `input` and `output` hold one slice per host channel. Missing input
    /// channels read as silence; output channels beyond the graph's channel
    /// count are zeroed. Slices shorter than the block are filled as far as
    /// they go.
    pub fn process_block(&mut self, input: &[&[f32]], output: &mut [&mut [f32]]) {
        let channels = self.graph.output_channels();
        let ctx = KernelContext {
            sample_rate: self.config.sample_rate,
            block_size: self.config.block_size,
            channels,
        };

        let settings = *self.graph.modulation();
        let env_inputs = settings
            .envelopes
            .map(|env| env.source.and_then(|id| self.graph.index_of(id)).map(|i| &self.prev[i]));
        self.modulation.begin_block(&settings, env_inputs, ctx.block_size);

        let nodes = self.graph.nodes();
        let matrix = self.graph.matrix();

        for (dest, node) in nodes.iter().enumerate() {
            self.scratch.clear();
            if !node.kind.is_generator() {
                for c in 0..channels {
                    let routed = self.scratch.channel_mut(c);
                    for (source, prev) in self.prev.iter().enumerate() {
                        let weight = matrix.weight(c, source, dest);
                        if weight == 0.0 {
                            continue;
                        }
                        for (y, &x) in routed.iter_mut().zip(prev.channel(c)) {
                            *y += x * weight;
                        }
                    }
                    if node.kind == NodeKind::InputMixer {
                        if let Some(host) = input.get(c) {
                            for (y, &x) in routed.iter_mut().zip(host.iter()) {
                                *y += x;
                            }
                        }
                    }
                }
            }

            let params = self.modulation.resolve_params(
                node.kind.params(),
                &node.params,
                &node.modulation,
                settings.chaos_level,
            );
            let kernel = self.kernels.get(node.kind);
            let out = &mut self.current[dest];
            let result = kernel(&self.scratch, out, &params, &mut self.states[dest], &ctx);

            let fault = match result {
                Ok(()) => first_non_finite(out).map(|channel| KernelFault::NonFiniteOutput { channel }),
                Err(fault) => Some(fault),
            };
            if let Some(fault) = fault {
                if !fault.output_is_usable() || !all_finite(out.as_slice()) {
                    out.clear();
                }
                self.events.push(EngineEvent::NodeFault { node: node.id, fault });
            }
        }

        let events = &mut self.events;
        let limited = &mut self.limited;
        let mut now_limited = 0u64;
        self.output.render(&self.graph, &self.current, output, |channel, rms| {
            let bit = 1u64 << (channel % 64);
            now_limited |= bit;
            if *limited & bit == 0 {
                events.push(EngineEvent::OverloadGuard { channel, rms });
            }
        });
        *limited = now_limited;

        core::mem::swap(&mut self.prev, &mut self.current);
        self.blocks_processed += 1;
    }

    // ========================================================================
    // Offline rendering
    // ========================================================================

    /// Renders `duration_seconds` of the current graph with silent input.
    ///
    /// Runs on a fresh copy of the graph so this engine's state is untouched.
    pub fn render_offline(&self, duration_seconds: f32) -> Result<OfflineRender, GraphError> {
        self.render_offline_with(duration_seconds, |_, _| {})
    }

    /// [`render_offline`](Self::render_offline) with a progress callback
    /// receiving `(frames_done, frames_total)` after each block.
    pub fn render_offline_with(
        &self,
        duration_seconds: f32,
        progress: impl FnMut(usize, usize),
    ) -> Result<OfflineRender, GraphError> {
        self.offline_job(duration_seconds)?.run_with(progress)
    }

    /// Snapshot of the graph and session constants for a render that runs
    /// elsewhere. Validates the duration; renders nothing.
    pub fn offline_job(&self, duration_seconds: f32) -> Result<OfflineJob, GraphError> {
        if !duration_seconds.is_finite() || !(0.0..=MAX_OFFLINE_SECONDS).contains(&duration_seconds) {
            return Err(GraphError::InvalidValue {
                what: "render duration",
                value: duration_seconds,
            });
        }
        Ok(OfflineJob {
            config: self.config,
            kernels: self.kernels,
            graph: self.graph.clone(),
            duration_seconds,
        })
    }
}

/// A pending offline render, detached from the engine it was taken from.
///
/// Produced by [`Engine::offline_job`] between blocks; [`run`](Self::run)
/// does the rendering and may take as long as the duration demands.
#[derive(Debug, Clone)]
pub struct OfflineJob {
    config: EngineConfig,
    kernels: KernelTable,
    graph: AudioGraph,
    duration_seconds: f32,
}

impl OfflineJob {
    /// Requested length in seconds.
    pub fn duration_seconds(&self) -> f32 {
        self.duration_seconds
    }

    /// Frames the render will produce.
    pub fn total_frames(&self) -> usize {
        libm::roundf(self.duration_seconds * self.config.sample_rate) as usize
    }

    /// The graph being rendered.
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    /// Renders on a fresh engine.
    pub fn run(&self) -> Result<OfflineRender, GraphError> {
        self.run_with(|_, _| {})
    }

    /// [`run`](Self::run) with a progress callback receiving
    /// `(frames_done, frames_total)` after each block.
    pub fn run_with(&self, mut progress: impl FnMut(usize, usize)) -> Result<OfflineRender, GraphError> {
        let mut engine = Engine::with_graph(self.config, self.kernels, self.graph.clone())?;
        let channels = engine.graph.output_channels();
        let block = engine.config.block_size;
        let total = self.total_frames();

        let mut rendered: Vec<Vec<f32>> = (0..channels).map(|_| Vec::with_capacity(total)).collect();
        let mut scratch: Vec<Vec<f32>> = (0..channels).map(|_| vec![0.0; block]).collect();
        let mut done = 0;
        while done < total {
            {
                let mut outs: Vec<&mut [f32]> = scratch.iter_mut().map(Vec::as_mut_slice).collect();
                engine.process_block(&[], &mut outs);
            }
            engine.events.drain().for_each(drop);
            let take = block.min(total - done);
            for (dst, src) in rendered.iter_mut().zip(&scratch) {
                dst.extend_from_slice(&src[..take]);
            }
            done += take;
            progress(done, total);
        }

        Ok(OfflineRender {
            sample_rate: engine.config.sample_rate,
            channels: rendered,
        })
    }
}

#[inline]
fn first_non_finite(buffer: &ChannelBuffer) -> Option<usize> {
    (0..buffer.channels()).find(|&c| !all_finite(buffer.channel(c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::KernelContext;
    use crate::param_info::Params;

    fn config(channels: usize, block: usize) -> EngineConfig {
        EngineConfig {
            block_size: block,
            max_channels: channels,
            ..EngineConfig::default()
        }
    }

    fn run(engine: &mut Engine, input: &[f32], channels: usize) -> Vec<Vec<f32>> {
        let block = engine.config().block_size;
        let mut outs = vec![vec![0.0; block]; channels];
        {
            let mut slices: Vec<&mut [f32]> = outs.iter_mut().map(|v| v.as_mut_slice()).collect();
            engine.process_block(&[input], &mut slices);
        }
        outs
    }

    fn exploding(
        _input: &ChannelBuffer,
        output: &mut ChannelBuffer,
        _params: &Params,
        _state: &mut NodeState,
        _ctx: &KernelContext,
    ) -> Result<(), KernelFault> {
        output.as_mut_slice().fill(f32::INFINITY);
        Ok(())
    }

    #[test]
    fn test_empty_graph_is_silent() {
        let mut engine = Engine::new(config(2, 16), KernelTable::standard());
        let outs = run(&mut engine, &[1.0; 16], 2);
        assert!(outs.iter().flatten().all(|s| *s == 0.0));
        assert_eq!(engine.status().blocks_processed, 1);
    }

    #[test]
    fn test_single_node_is_final_mix() {
        let mut engine = Engine::new(config(1, 16), KernelTable::standard());
        let input = engine.add_node(NodeKind::InputMixer);
        let outs = run(&mut engine, &[0.25; 16], 1);
        assert_eq!(outs[0], vec![0.25; 16]);
        assert_eq!(engine.graph().index_of(input), Some(0));
    }

    #[test]
    fn test_state_survives_unrelated_mutation() {
        let mut engine = Engine::new(config(1, 16), KernelTable::standard());
        let osc = engine.add_node(NodeKind::Oscillator);
        run(&mut engine, &[0.0; 16], 1);
        let NodeState::Oscillator(s) = &engine.states()[0] else { unreachable!() };
        let phase = s.phase();
        assert!(phase > 0.0);

        engine.add_node(NodeKind::Gain);
        let NodeState::Oscillator(s) = &engine.states()[0] else { unreachable!() };
        assert_eq!(s.phase(), phase);
        assert_eq!(engine.graph().index_of(osc), Some(0));
    }

    #[test]
    fn test_non_finite_kernel_output_zeroed_and_reported() {
        let kernels = KernelTable::standard().with_kernel(NodeKind::Gain, exploding);
        let mut engine = Engine::new(config(1, 8), kernels);
        let bad = engine.add_node(NodeKind::Gain);
        let outs = run(&mut engine, &[0.0; 8], 1);
        assert!(outs[0].iter().all(|s| *s == 0.0));
        let events: Vec<_> = engine.drain_events().collect();
        assert_eq!(
            events,
            vec![EngineEvent::NodeFault {
                node: bad,
                fault: KernelFault::NonFiniteOutput { channel: 0 }
            }]
        );
        assert!(engine.node_output(0).unwrap().as_slice().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_output_channel_bounds() {
        let mut engine = Engine::new(config(2, 8), KernelTable::standard());
        assert_eq!(
            engine.set_output_channels(3),
            Err(GraphError::InvalidChannelCount { requested: 3, max: 2 })
        );
        engine.set_output_channels(1).unwrap();
        assert_eq!(engine.status().output_channels, 1);
    }

    #[test]
    fn test_replace_graph_rejects_too_many_channels() {
        let mut engine = Engine::new(config(2, 8), KernelTable::standard());
        let before = engine.graph().clone();
        assert!(engine.replace_graph(AudioGraph::new(4)).is_err());
        assert_eq!(engine.graph(), &before);
    }

    #[test]
    fn test_overload_event_only_on_onset() {
        let mut engine = Engine::new(config(1, 64), KernelTable::standard());
        engine.add_node(NodeKind::InputMixer);
        for _ in 0..3 {
            run(&mut engine, &[2.0; 64], 1);
        }
        let events: Vec<_> = engine.drain_events().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EngineEvent::OverloadGuard { channel: 0, .. }));
    }

    #[test]
    fn test_offline_render_leaves_engine_untouched() {
        let mut engine = Engine::new(config(2, 128), KernelTable::standard());
        let osc = engine.add_node(NodeKind::Oscillator);
        let out = engine.add_node(NodeKind::OutputMixer);
        engine.set_matrix_weight(0, osc, out, 1.0).unwrap();
        let render = engine.render_offline(0.01).unwrap();
        assert_eq!(render.channels.len(), 2);
        assert_eq!(render.channels[0].len(), 480);
        assert!(render.channels[0].iter().any(|s| *s != 0.0));
        assert!(render.channels[1].iter().all(|s| *s == 0.0));
        assert_eq!(engine.status().blocks_processed, 0);
        assert!(engine.render_offline(-1.0).is_err());
    }

    #[test]
    fn test_offline_job_is_a_detached_snapshot() {
        let mut engine = Engine::new(config(1, 128), KernelTable::standard());
        let osc = engine.add_node(NodeKind::Oscillator);
        let job = engine.offline_job(0.01).unwrap();
        assert_eq!(job.total_frames(), 480);
        assert_eq!(job.graph().len(), 1);

        // Later edits to the live engine do not reach the snapshot.
        engine.remove_node(osc).unwrap();
        let render = job.run().unwrap();
        assert_eq!(render.channels[0].len(), 480);
        assert!(render.channels[0].iter().any(|s| *s != 0.0));

        assert!(engine.offline_job(MAX_OFFLINE_SECONDS + 1.0).is_err());
        assert!(engine.offline_job(f32::NAN).is_err());
    }
}
