//! Building engines from graph documents outside the realtime path.

use recirc_core::{Engine, KernelTable, OfflineRender};

use crate::config::EngineSettings;
use crate::error::ControlError;
use crate::ids::IdMap;
use crate::wire::GraphDef;

/// Validates `settings`, converts `graph` and builds an engine for it.
///
/// Returns the engine together with the id bindings used to build it.
pub fn build_engine(graph: &GraphDef, settings: &EngineSettings) -> Result<(Engine, IdMap), ControlError> {
    settings.validate()?;
    let mut ids = IdMap::default();
    let built = graph.to_graph(&mut ids, settings.max_channels)?;
    let engine = Engine::with_graph(settings.engine_config(), KernelTable::standard(), built)
        .map_err(|e| ControlError::from_graph(e, &ids))?;
    Ok((engine, ids))
}

/// Renders `seconds` of `graph` with silent input.
///
/// `progress(done, total)` is called after every block.
pub fn render_graph(
    graph: &GraphDef,
    settings: &EngineSettings,
    seconds: f32,
    progress: impl FnMut(usize, usize),
) -> Result<OfflineRender, ControlError> {
    let (engine, ids) = build_engine(graph, settings)?;
    tracing::debug!(seconds, nodes = engine.graph().len(), "offline render");
    engine
        .render_offline_with(seconds, progress)
        .map_err(|e| ControlError::from_graph(e, &ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::NodeDef;

    #[test]
    fn oscillator_render() {
        let graph = GraphDef {
            nodes: vec![NodeDef::new("osc", "oscillator").with_param("gain", 0.5)],
            output_channels: 1,
            ..GraphDef::default()
        };
        let settings = EngineSettings {
            max_channels: 1,
            ..EngineSettings::default()
        };
        let mut calls = 0;
        let render = render_graph(&graph, &settings, 0.1, |_, _| calls += 1).unwrap();
        assert_eq!(render.channels.len(), 1);
        assert_eq!(render.channels[0].len(), 4800);
        assert!(render.channels[0].iter().any(|s| s.abs() > 0.1));
        assert!(calls > 0);
    }

    #[test]
    fn bad_duration_rejected() {
        let graph = GraphDef::default();
        let err = render_graph(&graph, &EngineSettings::default(), -1.0, |_, _| {}).unwrap_err();
        assert!(matches!(err, ControlError::InvalidValue { .. }));
    }
}
