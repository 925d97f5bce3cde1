//! Lock-free message queues between the control thread and the audio thread.
//!
//! Two bounded crossbeam channels: commands flow to the [`Processor`],
//! notifications flow back. Neither side ever blocks; a full queue is
//! reported to the sender instead.
//!
//! Offline renders travel back as [`OfflineJob`]s in notification order.
//! The handle runs them when it reaches them, on the control thread, and
//! yields the result as `DATA_AVAILABLE`.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use recirc_core::{KernelTable, OfflineJob};

use crate::config::EngineSettings;
use crate::error::ControlError;
use crate::message::{ControlMessage, Notification, OFFLINE_RENDER, RenderData};
use crate::processor::Processor;

/// What the processor hands back to the control side.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A finished notification.
    Notification(Notification),
    /// A render request to run off the audio thread.
    Render(OfflineJob),
}

impl Outbound {
    /// Resolves to a notification, running the render if there is one.
    fn complete(self) -> Notification {
        match self {
            Outbound::Notification(notification) => notification,
            Outbound::Render(job) => {
                tracing::debug!(
                    seconds = job.duration_seconds(),
                    nodes = job.graph().len(),
                    "offline render"
                );
                match job.run() {
                    Ok(render) => Notification::DataAvailable {
                        data_type: OFFLINE_RENDER.to_string(),
                        data: RenderData {
                            sample_rate: render.sample_rate,
                            channels: render.channels,
                        },
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "offline render failed");
                        Notification::WorkletError {
                            message: format!("offline render failed: {err}"),
                        }
                    }
                }
            }
        }
    }
}

/// Control-side end of the queues.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: Sender<ControlMessage>,
    notifications: Receiver<Outbound>,
}

impl EngineHandle {
    /// Queues a message for the next block boundary.
    ///
    /// A full queue hands the message back in [`ControlError::QueueFull`].
    pub fn send(&self, message: ControlMessage) -> Result<(), ControlError> {
        self.commands.try_send(message).map_err(|err| match err {
            TrySendError::Full(message) => ControlError::QueueFull(Box::new(message)),
            TrySendError::Disconnected(_) => ControlError::Disconnected,
        })
    }

    /// Decodes a JSON message and queues it.
    pub fn send_json(&self, json: &str) -> Result<(), ControlError> {
        let message = ControlMessage::from_json(json).inspect_err(|err| {
            tracing::warn!(error = %err, "dropping undecodable control message");
        })?;
        self.send(message)
    }

    /// Next pending notification, if any. A pending offline render is
    /// run here, on the calling thread.
    pub fn try_recv(&self) -> Option<Notification> {
        self.notifications.try_recv().ok().map(Outbound::complete)
    }

    /// Every pending notification, running offline renders as they come up.
    pub fn drain(&self) -> impl Iterator<Item = Notification> + '_ {
        self.notifications.try_iter().map(Outbound::complete)
    }

    /// Messages waiting for the processor.
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }
}

/// Creates a connected handle and processor with the built-in kernels.
pub fn channel(settings: EngineSettings) -> (EngineHandle, Processor) {
    channel_with_kernels(settings, KernelTable::standard())
}

/// Creates a connected handle and processor with a custom kernel table.
pub fn channel_with_kernels(settings: EngineSettings, kernels: KernelTable) -> (EngineHandle, Processor) {
    let (command_tx, command_rx) = bounded(settings.command_capacity.max(1));
    let (notify_tx, notify_rx) = bounded(settings.notification_capacity.max(1));
    let handle = EngineHandle {
        commands: command_tx,
        notifications: notify_rx,
    };
    let processor = Processor::new(settings, kernels, command_rx, notify_tx);
    (handle, processor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe() -> ControlMessage {
        ControlMessage::CheckProcessorStatus {}
    }

    #[test]
    fn full_queue_returns_message() {
        let settings = EngineSettings {
            command_capacity: 1,
            ..EngineSettings::default()
        };
        let (handle, _processor) = channel(settings);
        handle.send(probe()).unwrap();
        assert_eq!(handle.pending_commands(), 1);
        match handle.send(probe()) {
            Err(ControlError::QueueFull(message)) => assert_eq!(*message, probe()),
            other => panic!("expected QueueFull, got {other:?}"),
        }
    }

    #[test]
    fn dropped_processor_disconnects() {
        let (handle, processor) = channel(EngineSettings::default());
        drop(processor);
        assert!(matches!(handle.send(probe()), Err(ControlError::Disconnected)));
    }

    #[test]
    fn status_probe_before_init() {
        let (handle, mut processor) = channel(EngineSettings::default());
        handle
            .send_json(r#"{"type":"CHECK_PROCESSOR_STATUS","payload":{}}"#)
            .unwrap();
        processor.process_block(&[], &mut []);
        let Some(Notification::ProcessorStatus {
            is_initialized,
            graph_node_count,
            ..
        }) = handle.try_recv()
        else {
            panic!("expected status");
        };
        assert!(!is_initialized);
        assert_eq!(graph_node_count, 0);
    }

    #[test]
    fn undecodable_json_is_not_queued() {
        let (handle, _processor) = channel(EngineSettings::default());
        assert!(matches!(handle.send_json("{"), Err(ControlError::Decode(_))));
        assert_eq!(handle.pending_commands(), 0);
    }

    #[test]
    fn full_notification_queue_counts_drops() {
        let settings = EngineSettings {
            notification_capacity: 1,
            ..EngineSettings::default()
        };
        let (handle, mut processor) = channel(settings);
        handle.send(probe()).unwrap();
        handle.send(probe()).unwrap();
        processor.process_block(&[], &mut []);
        assert_eq!(processor.dropped_notifications(), 1);
        assert_eq!(handle.drain().count(), 1);
    }

    #[test]
    fn offline_render_runs_on_the_control_side() {
        use crate::wire::{GraphDef, NodeDef};
        use recirc_core::{ChannelBuffer, KernelContext, KernelFault, NodeKind, NodeState, Params};
        use std::sync::atomic::{AtomicUsize, Ordering};

        static GAIN_CALLS: AtomicUsize = AtomicUsize::new(0);

        fn counting_gain(
            input: &ChannelBuffer,
            output: &mut ChannelBuffer,
            _params: &Params,
            _state: &mut NodeState,
            _ctx: &KernelContext,
        ) -> Result<(), KernelFault> {
            GAIN_CALLS.fetch_add(1, Ordering::SeqCst);
            output.copy_from(input);
            Ok(())
        }

        let settings = EngineSettings {
            block_size: 16,
            max_channels: 1,
            ..EngineSettings::default()
        };
        let kernels = KernelTable::standard().with_kernel(NodeKind::Gain, counting_gain);
        let (handle, mut processor) = channel_with_kernels(settings, kernels);
        processor.apply(ControlMessage::InitProcessor {
            graph: GraphDef {
                nodes: vec![NodeDef::new("g", "gain")],
                output_channels: 1,
                ..GraphDef::default()
            },
            sample_rate: None,
            max_channels: None,
        });
        assert_eq!(handle.try_recv(), Some(Notification::ProcessorReady {}));

        handle
            .send(ControlMessage::RenderOffline {
                duration_seconds: 0.01,
            })
            .unwrap();
        let mut out = [0.0f32; 16];
        processor.process_block(&[], &mut [&mut out[..]]);
        // Only the live block ran inside the callback.
        assert_eq!(GAIN_CALLS.load(Ordering::SeqCst), 1);

        let Some(Notification::DataAvailable { data, .. }) = handle.try_recv() else {
            panic!("expected render data");
        };
        assert_eq!(data.channels[0].len(), 480);
        assert_eq!(GAIN_CALLS.load(Ordering::SeqCst), 1 + 480 / 16);
    }
}
