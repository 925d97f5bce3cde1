//! Property-based tests for recirc-core.
//!
//! Checks graph invariants under random mutation sequences and output
//! finiteness of every kernel under random parameters and input.

use proptest::prelude::*;
use recirc_core::{
    AudioGraph, ChannelBuffer, Engine, EngineConfig, KernelContext, KernelTable, NodeId, NodeKind,
    NodeState, kernels::StateConfig,
};

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    Weight(usize, usize, usize, f32),
    Channels(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..NodeKind::COUNT).prop_map(Op::Add),
        (0usize..16).prop_map(Op::Remove),
        (0usize..4, 0usize..16, 0usize..16, -2.0f32..2.0).prop_map(|(c, s, d, w)| Op::Weight(c, s, d, w)),
        (1usize..=4).prop_map(Op::Channels),
    ]
}

fn pick(ids: &[NodeId], i: usize) -> Option<NodeId> {
    if ids.is_empty() { None } else { Some(ids[i % ids.len()]) }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of mutations keeps the matrix at `[channels][N][N]`
    /// with every weight in `[0, 1]`.
    #[test]
    fn matrix_dimensions_track_mutations(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut graph = AudioGraph::new(2);
        for op in ops {
            let ids: Vec<NodeId> = graph.nodes().iter().map(|n| n.id).collect();
            match op {
                Op::Add(k) => {
                    graph.add_node(NodeKind::ALL[k]);
                }
                Op::Remove(i) => {
                    if let Some(id) = pick(&ids, i) {
                        graph.remove_node(id).unwrap();
                    }
                }
                Op::Weight(c, s, d, w) => {
                    if let (Some(src), Some(dst)) = (pick(&ids, s), pick(&ids, d)) {
                        let result = graph.set_matrix_weight(c, src, dst, w);
                        prop_assert_eq!(result.is_ok(), c < graph.output_channels());
                    }
                }
                Op::Channels(n) => graph.set_output_channels(n).unwrap(),
            }

            let matrix = graph.matrix();
            prop_assert_eq!(matrix.channels(), graph.output_channels());
            prop_assert_eq!(matrix.node_count(), graph.len());
            prop_assert!(matrix.validate().is_ok());
            prop_assert!(graph.validate().is_ok());
        }
    }

    /// The engine survives the same mutations interleaved with processing and
    /// never emits non-finite samples.
    #[test]
    fn engine_output_finite_under_mutation(
        ops in prop::collection::vec(op_strategy(), 1..24),
        amplitude in 0.0f32..4.0,
    ) {
        let config = EngineConfig {
            block_size: 32,
            max_channels: 4,
            max_delay_seconds: 0.1,
            waveshaper_curve_size: 256,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(config, KernelTable::standard());
        let input = vec![amplitude; 32];
        let mut outs = vec![vec![0.0f32; 32]; 4];

        for op in ops {
            let ids: Vec<NodeId> = engine.graph().nodes().iter().map(|n| n.id).collect();
            match op {
                Op::Add(k) => {
                    engine.add_node(NodeKind::ALL[k]);
                }
                Op::Remove(i) => {
                    if let Some(id) = pick(&ids, i) {
                        engine.remove_node(id).unwrap();
                    }
                }
                Op::Weight(c, s, d, w) => {
                    if let (Some(src), Some(dst)) = (pick(&ids, s), pick(&ids, d)) {
                        let _ = engine.set_matrix_weight(c, src, dst, w);
                    }
                }
                Op::Channels(n) => engine.set_output_channels(n).unwrap(),
            }
            prop_assert_eq!(engine.states().len(), engine.graph().len());

            let inputs = [&input[..], &input[..], &input[..], &input[..]];
            let mut slices: Vec<&mut [f32]> = outs.iter_mut().map(|v| v.as_mut_slice()).collect();
            engine.process_block(&inputs, &mut slices);
            prop_assert!(outs.iter().flatten().all(|s| s.is_finite()));
        }
    }

    /// Every kernel produces finite output for any in-range parameters and
    /// bounded input.
    #[test]
    fn kernel_output_finite(
        kind_index in 0usize..NodeKind::COUNT,
        normalized in prop::array::uniform8(0.0f32..=1.0),
        input in prop::array::uniform32(-4.0f32..=4.0),
    ) {
        let kind = NodeKind::ALL[kind_index];
        let schema = kind.params();
        let mut params = kind.default_params();
        for (i, desc) in schema.iter().enumerate() {
            params.set(i, desc.quantize(desc.denormalize(normalized[i])));
        }

        let config = StateConfig {
            sample_rate: 48000.0,
            channels: 2,
            max_delay_seconds: 0.05,
            curve_size: 512,
            seed: 3,
        };
        let ctx = KernelContext { sample_rate: 48000.0, block_size: 32, channels: 2 };
        let mut state = NodeState::new(kind, &config);
        let mut buffer = ChannelBuffer::new(2, 32);
        buffer.channel_mut(0).copy_from_slice(&input);
        buffer.channel_mut(1).copy_from_slice(&input);
        let mut output = ChannelBuffer::new(2, 32);

        let kernels = KernelTable::standard();
        for _ in 0..8 {
            let result = kernels.get(kind)(&buffer, &mut output, &params, &mut state, &ctx);
            prop_assert!(result.is_ok(), "{} faulted: {:?}", kind, result);
            prop_assert!(output.as_slice().iter().all(|s| s.is_finite()), "{} produced non-finite output", kind);
        }
    }
}
