//! Shared test helpers used across the integration test modules: building
//! small `GraphFunction`/`GraphModule` fixtures against the reference
//! `Interpreter` backend without going through JSON at all, so each
//! scenario test can focus on the pipeline stage it's exercising.

use graphy::backend::interpreter::{DebugMeta, Interpreter, Type};
use graphy::backend::Backend;
use graphy::core::node_type::{CodegenContext, ConstBoolBehavior, ConstIntBehavior, IfBehavior, NodeBehavior, NodeType};
use graphy::core::{Context, DataType, GraphFunction, GraphModule, Module, NamedDataType, NodeInstance, Position};
use graphy::diagnostics::Diagnostics;
use std::sync::Arc;

pub fn i1_type() -> DataType<Interpreter> {
    DataType::new("lang", "i1", Type::I1, DebugMeta("i1".into()))
}

pub fn i32_type() -> DataType<Interpreter> {
    DataType::new("lang", "i32", Type::I32, DebugMeta("i32".into()))
}

/// `entry -> if(const-bool(cond)) -> exit(selector 0) | exit(selector 1)`.
/// Returns the function plus the ids of both exit nodes, in (true, false)
/// order, so a caller can assert which one the `if` selected.
pub fn build_if_diamond(cond: bool) -> GraphFunction<Interpreter> {
    let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");

    let entry = NodeInstance::new(f.entry_node_type(), Position::zero());
    let entry_id = entry.id;

    let const_cond = NodeInstance::new(
        NodeType {
            module_path: "lang".into(),
            name: "const-bool".into(),
            data_inputs: vec![],
            data_outputs: vec![NamedDataType::new("value", i1_type())],
            exec_inputs: vec![],
            exec_outputs: vec![],
            pure: true,
            data: serde_json::json!({ "value": cond }),
            behavior: Arc::new(ConstBoolBehavior { value: cond }),
        },
        Position::zero(),
    );
    let cond_id = const_cond.id;

    let mut if_node = NodeInstance::new(
        NodeType {
            module_path: "lang".into(),
            name: "if".into(),
            data_inputs: vec![NamedDataType::new("condition", i1_type())],
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

    let mut exit_true = NodeInstance::new(f.exit_node_type(), Position::zero());
    exit_true.input_exec = vec![smallvec::smallvec![(if_id, 0)]];
    let exit_true_id = exit_true.id;

    let mut exit_false = NodeInstance::new(f.exit_node_type(), Position::zero());
    exit_false.input_exec = vec![smallvec::smallvec![(if_id, 1)]];
    let exit_false_id = exit_false.id;

    let mut entry_node = entry;
    entry_node.output_exec = vec![Some((if_id, 0))];
    if_node.input_exec = vec![smallvec::smallvec![(entry_id, 0)]];
    if_node.output_exec = vec![Some((exit_true_id, 0)), Some((exit_false_id, 0))];

    f.add_node(entry_node);
    f.add_node(const_cond);
    f.add_node(if_node);
    f.add_node(exit_true);
    f.add_node(exit_false);
    f.set_entry(entry_id);
    f
}

/// A non-pure node with one data input and no outputs that simply loads its
/// input and falls through to its one exec output -- stands in for a
/// side-effecting "observe" node (e.g. a print) that forces a pure
/// dependency to actually be compiled and read, without this test needing
/// any arithmetic instruction from the reference backend to check the value.
#[derive(Debug)]
struct ObserveBehavior;

impl NodeBehavior<Interpreter> for ObserveBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, Interpreter>) -> Diagnostics {
        let _ = Interpreter::build_load(ctx.module, ctx.entry_block, ctx.io_values[0], ctx.io_types[0].clone());
        if let Some(target) = ctx.exit_blocks.first() {
            Interpreter::build_br(ctx.module, ctx.entry_block, *target);
        }
        Diagnostics::new()
    }
}

fn observe_node_type() -> NodeType<Interpreter> {
    NodeType {
        module_path: "test".into(),
        name: "observe".into(),
        data_inputs: vec![NamedDataType::new("value", i32_type())],
        data_outputs: vec![],
        exec_inputs: vec!["in".into()],
        exec_outputs: vec!["out".into()],
        pure: false,
        data: serde_json::json!({}),
        behavior: Arc::new(ObserveBehavior),
    }
}

/// `entry -> _set_counter(const-int(value)) -> observe(_get_counter) -> exit`,
/// exercising a local variable's full set/get round trip (`spec.md` §3):
/// `_get_counter` is a pure dependency of `observe`, which only runs (and
/// only reads a meaningful value) after `_set_counter` has already run
/// earlier in the exec chain.
pub fn build_local_roundtrip(value: i64) -> GraphFunction<Interpreter> {
    let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");
    f.add_local("counter", i32_type());

    let entry = NodeInstance::new(f.entry_node_type(), Position::zero());
    let entry_id = entry.id;

    let konst = NodeInstance::new(
        NodeType {
            module_path: "lang".into(),
            name: "const-int".into(),
            data_inputs: vec![],
            data_outputs: vec![NamedDataType::new("value", i32_type())],
            exec_inputs: vec![],
            exec_outputs: vec![],
            pure: true,
            data: serde_json::json!({ "value": value }),
            behavior: Arc::new(ConstIntBehavior { value }),
        },
        Position::zero(),
    );
    let konst_id = konst.id;

    let mut set_node = NodeInstance::new(f.local_set_node_type("counter").unwrap(), Position::zero());
    set_node.input_data = vec![Some((konst_id, 0))];
    let set_id = set_node.id;

    let get_node = NodeInstance::new(f.local_get_node_type("counter").unwrap(), Position::zero());
    let get_id = get_node.id;

    let mut observe = NodeInstance::new(observe_node_type(), Position::zero());
    observe.input_data = vec![Some((get_id, 0))];
    let observe_id = observe.id;

    let mut exit = NodeInstance::new(f.exit_node_type(), Position::zero());
    let exit_id = exit.id;
    exit.input_exec = vec![smallvec::smallvec![(observe_id, 0)]];

    let mut entry_node = entry;
    entry_node.output_exec = vec![Some((set_id, 0))];
    set_node.input_exec = vec![smallvec::smallvec![(entry_id, 0)]];
    set_node.output_exec = vec![Some((observe_id, 0))];
    observe.input_exec = vec![smallvec::smallvec![(set_id, 0)]];
    observe.output_exec = vec![Some((exit_id, 0))];

    f.add_node(entry_node);
    f.add_node(konst);
    f.add_node(set_node);
    f.add_node(get_node);
    f.add_node(observe);
    f.add_node(exit);
    f.set_entry(entry_id);
    f
}

/// Wraps `function` as the sole function of a fresh `GraphModule` named
/// `test/main`, registers it on a fresh `Context`, and returns both so a
/// caller can drive `module_compiler::compile` against them.
pub fn context_with_function(function: GraphFunction<Interpreter>) -> Context<Interpreter> {
    let mut ctx: Context<Interpreter> = Context::new();
    let mut module = GraphModule::new("test/main");
    module.functions.push(function);
    ctx.add_module(Module::Graph(module)).unwrap();
    ctx
}
