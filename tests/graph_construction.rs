//! End-to-end scenario tests driving the reference `Interpreter` backend
//! straight from hand-built `GraphFunction`s, without going through JSON.
//! Covers S1 (branch on a constant), S2 (local variable round trip), and S3
//! (a pure node shared by two divergent consumers) of `spec.md` §8.

mod common;

use common::*;
use graphy::backend::interpreter::{DebugMeta, Interpreter, Type};
use graphy::backend::Backend;
use graphy::cache::ModuleCache;
use graphy::codegen::module_compiler;
use graphy::core::node_type::{CodegenContext, ConstIntBehavior, IfBehavior, NodeBehavior};
use graphy::core::{DataType, GraphFunction, NamedDataType, NodeInstance, NodeType, Position};
use graphy::diagnostics::Diagnostics;
use graphy::mangle::mangle;
use std::sync::Arc;

fn compile_and_run(f: GraphFunction<Interpreter>) -> i32 {
    let mut ctx = context_with_function(f);
    let dir = tempfile::tempdir().unwrap();
    let cache = ModuleCache::new(dir.path());
    let (compiled, diag) = module_compiler::compile(&mut ctx, "test/main", &cache);
    assert!(diag.success(), "{diag}");
    let module = compiled.expect("successful compile returns a module");

    let symbol = mangle("test/main", "main");
    let function = Interpreter::get_function(&module, &symbol).expect("mangled `main` symbol exists");
    Interpreter::jit_execute_main(module, function, &[], &[]).expect("jit execution")
}

#[test]
fn s1_if_true_selects_exec_output_zero() {
    assert_eq!(compile_and_run(build_if_diamond(true)), 0);
}

#[test]
fn s1_if_false_selects_exec_output_one() {
    assert_eq!(compile_and_run(build_if_diamond(false)), 1);
}

#[test]
fn s2_local_variable_set_then_get_round_trips_without_error() {
    // `observe` reads `_get_counter` after `_set_counter` ran earlier in the
    // same exec chain; a single exec output (index 0) is reached either way.
    assert_eq!(compile_and_run(build_local_roundtrip(7)), 0);
}

/// A non-pure node with one data input and no outputs; used below to give a
/// shared pure node two independent, divergent consumers.
#[derive(Debug)]
struct SinkBehavior;

impl NodeBehavior<Interpreter> for SinkBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, Interpreter>) -> Diagnostics {
        let _ = Interpreter::build_load(ctx.module, ctx.entry_block, ctx.io_values[0], ctx.io_types[0].clone());
        if let Some(target) = ctx.exit_blocks.first() {
            Interpreter::build_br(ctx.module, ctx.entry_block, *target);
        }
        Diagnostics::new()
    }
}

fn i32_ty() -> DataType<Interpreter> {
    DataType::new("lang", "i32", Type::I32, DebugMeta("i32".into()))
}

fn sink_node_type() -> NodeType<Interpreter> {
    NodeType {
        module_path: "test".into(),
        name: "sink".into(),
        data_inputs: vec![NamedDataType::new("value", i32_ty())],
        data_outputs: vec![],
        exec_inputs: vec!["in".into()],
        exec_outputs: vec!["out".into()],
        pure: false,
        data: serde_json::json!({}),
        behavior: Arc::new(SinkBehavior),
    }
}

/// `entry -> if(cond) -> true: sink(seven) -> exit_true`
///                    `-> false: sink(seven) -> exit_false`
/// One `const-int(7)` pure node feeds a `sink` on each of the two divergent
/// branches `if` can take -- the node compiler must compile `seven` exactly
/// once and reach it from both call sites via `jumpBackInst` (`spec.md`
/// §4.4), regardless of which branch runs.
fn build_shared_pure_across_branches(cond: bool) -> GraphFunction<Interpreter> {
    let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");

    let entry = NodeInstance::new(f.entry_node_type(), Position::zero());
    let entry_id = entry.id;

    let cond_node = NodeInstance::new(
        NodeType {
            module_path: "lang".into(),
            name: "const-bool".into(),
            data_inputs: vec![],
            data_outputs: vec![NamedDataType::new("value", DataType::new("lang", "i1", Type::I1, DebugMeta("i1".into())))],
            exec_inputs: vec![],
            exec_outputs: vec![],
            pure: true,
            data: serde_json::json!({ "value": cond }),
            behavior: Arc::new(graphy::core::node_type::ConstBoolBehavior { value: cond }),
        },
        Position::zero(),
    );
    let cond_id = cond_node.id;

    let seven = NodeInstance::new(
        NodeType {
            module_path: "lang".into(),
            name: "const-int".into(),
            data_inputs: vec![],
            data_outputs: vec![NamedDataType::new("value", i32_ty())],
            exec_inputs: vec![],
            exec_outputs: vec![],
            pure: true,
            data: serde_json::json!({ "value": 7 }),
            behavior: Arc::new(ConstIntBehavior { value: 7 }),
        },
        Position::zero(),
    );
    let seven_id = seven.id;

    let mut if_node = NodeInstance::new(
        NodeType {
            module_path: "lang".into(),
            name: "if".into(),
            data_inputs: vec![NamedDataType::new("condition", DataType::new("lang", "i1", Type::I1, DebugMeta("i1".into())))],
            data_outputs: vec![],
            exec_inputs: vec!["in".into()],
            exec_outputs: vec!["true".into(), "false".into()],
            pure: false,
            data: serde_json::json!({}),
            behavior: Arc::new(IfBehavior),
        },
        Position::zero(),
    );
    if_node.input_data = vec![Some((cond_id, 0))];
    let if_id = if_node.id;

    let mut sink_true = NodeInstance::new(sink_node_type(), Position::zero());
    sink_true.input_data = vec![Some((seven_id, 0))];
    let sink_true_id = sink_true.id;

    let mut sink_false = NodeInstance::new(sink_node_type(), Position::zero());
    sink_false.input_data = vec![Some((seven_id, 0))];
    let sink_false_id = sink_false.id;

    let mut exit_true = NodeInstance::new(f.exit_node_type(), Position::zero());
    exit_true.input_exec = vec![smallvec::smallvec![(sink_true_id, 0)]];
    let exit_true_id = exit_true.id;

    let mut exit_false = NodeInstance::new(f.exit_node_type(), Position::zero());
    exit_false.input_exec = vec![smallvec::smallvec![(sink_false_id, 0)]];
    let exit_false_id = exit_false.id;

    let mut entry_node = entry;
    entry_node.output_exec = vec![Some((if_id, 0))];
    if_node.input_exec = vec![smallvec::smallvec![(entry_id, 0)]];
    if_node.output_exec = vec![Some((sink_true_id, 0)), Some((sink_false_id, 0))];
    sink_true.input_exec = vec![smallvec::smallvec![(if_id, 0)]];
    sink_true.output_exec = vec![Some((exit_true_id, 0))];
    sink_false.input_exec = vec![smallvec::smallvec![(if_id, 1)]];
    sink_false.output_exec = vec![Some((exit_false_id, 0))];

    f.add_node(entry_node);
    f.add_node(cond_node);
    f.add_node(seven);
    f.add_node(if_node);
    f.add_node(sink_true);
    f.add_node(sink_false);
    f.add_node(exit_true);
    f.add_node(exit_false);
    f.set_entry(entry_id);
    f
}

#[test]
fn s3_shared_pure_node_reached_from_either_branch() {
    assert_eq!(compile_and_run(build_shared_pure_across_branches(true)), 0);
    assert_eq!(compile_and_run(build_shared_pure_across_branches(false)), 0);
}
