//! Audio-side message handler.
//!
//! [`Processor`] lives on the audio thread. At the start of every block it
//! drains the command queue with `try_recv`, applies each message to the
//! engine in arrival order, then runs the block. Every message is answered
//! with a confirmation or an error notification; nothing is dropped
//! silently. Kernel faults recorded by the engine during the block are
//! forwarded as `NODE_ERROR`.
//!
//! `RENDER_OFFLINE` is only validated and snapshotted here; the render
//! itself runs wherever the [`EngineHandle`](crate::EngineHandle) is read.

use crossbeam_channel::{Receiver, Sender};

use recirc_core::{
    Engine, EngineEvent, EnvelopeSettings, GraphError, KernelTable, LfoSettings, LfoWaveform, ModSlot,
    ModSource,
};

use crate::config::EngineSettings;
use crate::error::ControlError;
use crate::ids::IdMap;
use crate::message::{ControlMessage, Notification};
use crate::queue::Outbound;
use crate::wire::{GraphDef, NodeDef, ParamValue};

/// Notification sender that counts what it could not deliver.
#[derive(Debug)]
struct Outbox {
    tx: Sender<Outbound>,
    dropped: u64,
}

impl Outbox {
    fn send(&mut self, notification: Notification) {
        self.push(Outbound::Notification(notification));
    }

    fn push(&mut self, outbound: Outbound) {
        if self.tx.try_send(outbound).is_err() {
            self.dropped += 1;
        }
    }
}

/// Owns the engine and applies control messages at block boundaries.
#[derive(Debug)]
pub struct Processor {
    settings: EngineSettings,
    kernels: KernelTable,
    engine: Option<Engine>,
    ids: IdMap,
    commands: Receiver<ControlMessage>,
    outbox: Outbox,
}

impl Processor {
    /// Creates an uninitialized processor reading `commands` and writing
    /// `notifications`. See [`crate::queue::channel`].
    pub fn new(
        settings: EngineSettings,
        kernels: KernelTable,
        commands: Receiver<ControlMessage>,
        notifications: Sender<Outbound>,
    ) -> Self {
        Self {
            settings,
            kernels,
            engine: None,
            ids: IdMap::default(),
            commands,
            outbox: Outbox {
                tx: notifications,
                dropped: 0,
            },
        }
    }

    /// Returns `true` once `INIT_PROCESSOR` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// The engine, once initialized.
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    /// Wire id bindings.
    pub fn ids(&self) -> &IdMap {
        &self.ids
    }

    /// Active settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Notifications lost to a full queue.
    pub fn dropped_notifications(&self) -> u64 {
        self.outbox.dropped
    }

    /// The current graph in wire form.
    pub fn graph_def(&self) -> Option<GraphDef> {
        self.engine.as_ref().map(|e| GraphDef::from_graph(e.graph(), &self.ids))
    }

    /// Runs one block: drains pending messages, processes audio, forwards
    /// engine events. Before initialization the output is silent.
    pub fn process_block(&mut self, input: &[&[f32]], output: &mut [&mut [f32]]) {
        while let Ok(message) = self.commands.try_recv() {
            self.apply(message);
        }

        let Some(engine) = self.engine.as_mut() else {
            for channel in output.iter_mut() {
                channel.fill(0.0);
            }
            return;
        };

        engine.process_block(input, output);

        for event in engine.drain_events() {
            match event {
                EngineEvent::NodeFault { node, fault } => self.outbox.send(Notification::NodeError {
                    node_id: self.ids.label(node),
                    message: fault.to_string(),
                }),
                EngineEvent::OverloadGuard { .. } => {}
            }
        }
    }

    /// Applies one message and emits its answer.
    pub fn apply(&mut self, message: ControlMessage) {
        let name = message.name();
        match self.handle(message) {
            Ok(()) => tracing::debug!(message = name, "applied control message"),
            Err(err) => {
                tracing::warn!(message = name, error = %err, "rejected control message");
                self.outbox.send(Notification::from_error(&err));
            }
        }
    }

    fn handle(&mut self, message: ControlMessage) -> Result<(), ControlError> {
        match message {
            ControlMessage::InitProcessor {
                graph,
                sample_rate,
                max_channels,
            } => self.init(&graph, sample_rate, max_channels),
            ControlMessage::CheckProcessorStatus {} => {
                let status = self.engine.as_ref().map(Engine::status);
                self.outbox.send(Notification::ProcessorStatus {
                    is_initialized: status.is_some(),
                    graph_node_count: status.map_or(0, |s| s.node_count),
                    blocks_processed: status.map_or(0, |s| s.blocks_processed),
                    dropped_notifications: self.outbox.dropped,
                    sample_rate: status.map_or(self.settings.sample_rate, |s| s.sample_rate),
                    block_size: status.map_or(self.settings.block_size, |s| s.block_size),
                    output_channels: status.map_or(0, |s| s.output_channels),
                });
                Ok(())
            }
            ControlMessage::UpdateGraph { graph } => {
                let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
                let mut ids = self.ids.clone();
                let built = graph.to_graph(&mut ids, self.settings.max_channels)?;
                engine.replace_graph(built).map_err(|e| ControlError::from_graph(e, &ids))?;
                let live = engine.graph();
                ids.retain(|id| live.index_of(id).is_some());
                self.ids = ids;
                self.send_graph();
                Ok(())
            }
            ControlMessage::AddNode { node_instance } => {
                let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
                if self.ids.resolve(&node_instance.id).is_some() {
                    return Err(ControlError::DuplicateNode(node_instance.id));
                }
                let mut ids = self.ids.clone();
                let id = ids.assign(&node_instance.id);
                let instance = node_instance.to_instance(id)?;
                ids.set_type_name(id, &node_instance.kind, node_instance.node_kind());
                let id = engine.insert_node(instance).map_err(|e| ControlError::from_graph(e, &ids))?;
                self.ids = ids;
                if let Some(node) = engine.graph().node(id) {
                    self.outbox.send(Notification::NodeAdded {
                        node_instance: NodeDef::from_instance(node, &self.ids),
                    });
                }
                Ok(())
            }
            ControlMessage::RemoveNode { node_id } => {
                let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
                let id = self.ids.resolve(&node_id).ok_or_else(|| ControlError::UnknownNode(node_id.clone()))?;
                engine.remove_node(id).map_err(|e| ControlError::from_graph(e, &self.ids))?;
                self.ids.forget(&node_id);
                self.outbox.send(Notification::NodeRemoved { node_id });
                Ok(())
            }
            ControlMessage::UpdateParameter {
                node_id,
                parameter_id,
                value,
            } => {
                let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
                let id = self.ids.resolve(&node_id).ok_or_else(|| ControlError::UnknownNode(node_id.clone()))?;
                let kind = engine.graph().node(id).map(|n| n.kind).ok_or_else(|| ControlError::UnknownNode(node_id.clone()))?;
                let index = kind.param_index(&parameter_id).ok_or_else(|| ControlError::UnknownParameter {
                    node: node_id.clone(),
                    parameter: parameter_id.clone(),
                })?;
                let desc = &kind.params()[index];
                let stored = engine
                    .update_parameter(id, index, value.resolve(desc)?)
                    .map_err(|e| ControlError::from_graph(e, &self.ids))?;
                self.outbox.send(Notification::ParameterUpdated {
                    node_id: Some(node_id),
                    parameter_id,
                    value: ParamValue::from_slot(desc, stored),
                });
                Ok(())
            }
            ControlMessage::SetModulation {
                node_id,
                parameter_id,
                source,
                enabled,
                amount,
            } => {
                let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
                let id = self.ids.resolve(&node_id).ok_or_else(|| ControlError::UnknownNode(node_id.clone()))?;
                let source = ModSource::from_name(&source)
                    .ok_or_else(|| ControlError::invalid_value("modulation source", format!("unknown source '{source}'")))?;
                if !amount.is_finite() {
                    return Err(ControlError::invalid_value("modulation amount", format!("{amount} is not finite")));
                }
                let index = engine
                    .set_modulation(id, &parameter_id, source, ModSlot { enabled, amount })
                    .map_err(|e| ControlError::from_graph(e, &self.ids))?;
                let node = engine.graph().node(id).ok_or_else(|| ControlError::UnknownNode(node_id.clone()))?;
                let desc = &node.kind.params()[index];
                self.outbox.send(Notification::ParameterUpdated {
                    node_id: Some(node_id),
                    parameter_id,
                    value: ParamValue::from_slot(desc, node.params.get(index)),
                });
                Ok(())
            }
            ControlMessage::SetMatrixWeight {
                channel,
                source_id,
                dest_id,
                weight,
            } => {
                let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
                let source = self.ids.resolve(&source_id).ok_or(ControlError::UnknownNode(source_id))?;
                let dest = self.ids.resolve(&dest_id).ok_or(ControlError::UnknownNode(dest_id))?;
                if !weight.is_finite() {
                    return Err(ControlError::invalid_value("weight", format!("{weight} is not finite")));
                }
                engine
                    .set_matrix_weight(channel, source, dest, weight)
                    .map_err(|e| ControlError::from_graph(e, &self.ids))?;
                self.send_graph();
                Ok(())
            }
            ControlMessage::SetOutputChannels { output_channels } => {
                let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
                engine
                    .set_output_channels(output_channels)
                    .map_err(|e| ControlError::from_graph(e, &self.ids))?;
                self.send_graph();
                Ok(())
            }
            ControlMessage::SetGlobalParameter { parameter_id, value } => {
                let stored = self.set_global(&parameter_id, &value)?;
                self.outbox.send(Notification::ParameterUpdated {
                    node_id: None,
                    parameter_id,
                    value: stored,
                });
                Ok(())
            }
            ControlMessage::RenderOffline { duration_seconds } => {
                let engine = self.engine.as_ref().ok_or(ControlError::NotInitialized)?;
                let job = engine
                    .offline_job(duration_seconds)
                    .map_err(|e| ControlError::from_graph(e, &self.ids))?;
                self.outbox.push(Outbound::Render(job));
                Ok(())
            }
        }
    }

    fn init(
        &mut self,
        graph: &GraphDef,
        sample_rate: Option<f32>,
        max_channels: Option<usize>,
    ) -> Result<(), ControlError> {
        let settings = EngineSettings {
            sample_rate: sample_rate.unwrap_or(self.settings.sample_rate),
            max_channels: max_channels.unwrap_or(self.settings.max_channels),
            ..self.settings
        };
        settings.validate()?;

        let mut ids = IdMap::default();
        let built = graph.to_graph(&mut ids, settings.max_channels)?;
        let engine = Engine::with_graph(settings.engine_config(), self.kernels, built)
            .map_err(|e| ControlError::from_graph(e, &ids))?;

        tracing::info!(
            sample_rate = settings.sample_rate,
            block_size = settings.block_size,
            max_channels = settings.max_channels,
            nodes = engine.graph().len(),
            "processor initialized"
        );

        self.settings = settings;
        self.engine = Some(engine);
        self.ids = ids;
        self.outbox.send(Notification::ProcessorReady {});
        Ok(())
    }

    fn send_graph(&mut self) {
        if let Some(graph) = self.graph_def() {
            self.outbox.send(Notification::GraphUpdated { graph });
        }
    }

    /// Applies a global parameter. Returns the value as stored.
    fn set_global(&mut self, parameter_id: &str, value: &ParamValue) -> Result<ParamValue, ControlError> {
        let engine = self.engine.as_mut().ok_or(ControlError::NotInitialized)?;
        let number = || {
            value
                .as_number()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ControlError::invalid_value(parameter_id, format!("expected a number, got {value:?}")))
        };
        let flag = || {
            value
                .as_bool()
                .ok_or_else(|| ControlError::invalid_value(parameter_id, format!("expected a boolean, got {value:?}")))
        };
        let graph_err = |e: GraphError| ControlError::from_graph(e, &self.ids);

        match parameter_id {
            "masterGain" => {
                engine.set_master_gain(number()?).map_err(graph_err)?;
                return Ok(ParamValue::Number(engine.graph().master_gain()));
            }
            "chaosLevel" => {
                engine.set_chaos_level(number()?).map_err(graph_err)?;
                return Ok(ParamValue::Number(engine.graph().modulation().chaos_level));
            }
            _ => {}
        }

        let (generator, field) = parameter_id
            .split_once('.')
            .ok_or_else(|| ControlError::invalid_value("parameterId", format!("unknown global parameter '{parameter_id}'")))?;
        let unknown = || ControlError::invalid_value("parameterId", format!("unknown global parameter '{parameter_id}'"));

        match generator {
            "lfo1" | "lfo2" => {
                let index = usize::from(generator == "lfo2");
                let mut lfo: LfoSettings = engine.graph().modulation().lfos[index];
                match field {
                    "enabled" => lfo.enabled = flag()?,
                    "frequency" => lfo.frequency = number()?,
                    "amount" => lfo.amount = number()?,
                    "waveform" => {
                        lfo.waveform = match value {
                            ParamValue::Text(name) => LfoWaveform::from_name(name).ok_or_else(|| {
                                ControlError::invalid_value(parameter_id, format!("unknown waveform '{name}'"))
                            })?,
                            _ => LfoWaveform::from_index(number()? as usize),
                        };
                    }
                    _ => return Err(unknown()),
                }
                engine.set_lfo(index, lfo).map_err(graph_err)?;
                let lfo = engine.graph().modulation().lfos[index];
                Ok(match field {
                    "enabled" => ParamValue::Bool(lfo.enabled),
                    "frequency" => ParamValue::Number(lfo.frequency),
                    "amount" => ParamValue::Number(lfo.amount),
                    _ => ParamValue::Text(lfo.waveform.as_str().to_string()),
                })
            }
            "env1" | "env2" => {
                let index = usize::from(generator == "env2");
                let mut env: EnvelopeSettings = engine.graph().modulation().envelopes[index];
                match field {
                    "enabled" => env.enabled = flag()?,
                    "attack" => env.attack = number()?,
                    "release" => env.release = number()?,
                    "amount" => env.amount = number()?,
                    "source" => {
                        env.source = match value {
                            ParamValue::Text(name) if name.is_empty() || name.eq_ignore_ascii_case("none") => None,
                            ParamValue::Text(name) => {
                                Some(self.ids.resolve(name).ok_or_else(|| ControlError::UnknownNode(name.clone()))?)
                            }
                            _ => {
                                return Err(ControlError::invalid_value(parameter_id, "expected a node id"));
                            }
                        };
                    }
                    _ => return Err(unknown()),
                }
                engine.set_envelope(index, env).map_err(graph_err)?;
                let env = engine.graph().modulation().envelopes[index];
                Ok(match field {
                    "enabled" => ParamValue::Bool(env.enabled),
                    "attack" => ParamValue::Number(env.attack),
                    "release" => ParamValue::Number(env.release),
                    "amount" => ParamValue::Number(env.amount),
                    _ => ParamValue::Text(env.source.map(|id| self.ids.label(id)).unwrap_or_default()),
                })
            }
            _ => Err(unknown()),
        }
    }
}
