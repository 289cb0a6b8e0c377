//! Benchmarks for the two-stage node compiler and the module-level pipeline,
//! in the teacher's `criterion` benchmark-group style
//! (`examples/Far-Beyond-Pulsar-Graphy/benches/graph_benchmarks.rs`): build
//! synthetic graphs of increasing size, then time the compiler stage that
//! operates on them.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use graphy::backend::interpreter::{DebugMeta, Interpreter, Type};
use graphy::backend::Backend;
use graphy::cache::ModuleCache;
use graphy::codegen::function_compiler::FunctionCompiler;
use graphy::codegen::module_compiler;
use graphy::core::node_type::{CodegenContext, ConstIntBehavior, NodeBehavior};
use graphy::core::{Context, DataType, GraphFunction, GraphModule, Module, NamedDataType, NodeInstance, NodeType, Position};
use graphy::diagnostics::Diagnostics;
use std::sync::Arc;

fn i32_type() -> DataType<Interpreter> {
    DataType::new("lang", "i32", Type::I32, DebugMeta("i32".into()))
}

/// A pure node behavior that loads its single input and stores it straight
/// through to its single output; stands in for `math.add` in the teacher's
/// benchmarks without needing a real arithmetic instruction in the
/// reference interpreter (same minimal shape as `FunctionCompiler`'s own
/// `TestAddBehavior` test helper).
#[derive(Debug)]
struct PassthroughBehavior;

impl NodeBehavior<Interpreter> for PassthroughBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, Interpreter>) -> Diagnostics {
        let v = Interpreter::build_load(ctx.module, ctx.entry_block, ctx.io_values[0], ctx.io_types[0].clone());
        Interpreter::build_store(ctx.module, ctx.entry_block, ctx.io_values[1], v);
        if let Some(target) = ctx.exit_blocks.first() {
            Interpreter::build_br(ctx.module, ctx.entry_block, *target);
        }
        Diagnostics::new()
    }
}

fn passthrough_node_type() -> NodeType<Interpreter> {
    NodeType {
        module_path: "test".into(),
        name: "passthrough".into(),
        data_inputs: vec![NamedDataType::new("a", i32_type())],
        data_outputs: vec![NamedDataType::new("r", i32_type())],
        exec_inputs: vec!["in".into()],
        exec_outputs: vec!["out".into()],
        pure: false,
        data: serde_json::json!({}),
        behavior: Arc::new(PassthroughBehavior),
    }
}

fn const_int_node_type(value: i64) -> NodeType<Interpreter> {
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
    }
}

/// `entry -> passthrough_0 -> passthrough_1 -> ... -> passthrough_{n-1} ->
/// exit`, each `passthrough` fed by its own `const-int` pure dependency —
/// stresses line-number assignment and per-node pure-dependency
/// back-propagation (`spec.md` §4.4, §4.5) over increasing node counts.
fn build_linear_chain(n: usize) -> GraphFunction<Interpreter> {
    let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main").with_data_output("r", i32_type());

    let entry = NodeInstance::new(f.entry_node_type(), Position::zero());
    let entry_id = entry.id;
    let mut entry = entry;

    let mut prev_exec = entry_id;
    let mut last_id = entry_id;

    for i in 0..n {
        let konst = NodeInstance::new(const_int_node_type(i as i64), Position::zero());
        let konst_id = konst.id;

        let mut node = NodeInstance::new(passthrough_node_type(), Position::zero());
        node.input_data = vec![Some((konst_id, 0))];
        let node_id = node.id;
        node.input_exec = vec![smallvec::smallvec![(prev_exec, 0)]];

        if i == 0 {
            entry.output_exec = vec![Some((node_id, 0))];
        } else {
            // wire the previous passthrough's single exec output to this one
            let prev = f.nodes.get_mut(&last_id).unwrap();
            prev.output_exec = vec![Some((node_id, 0))];
        }

        f.add_node(konst);
        f.add_node(node);
        prev_exec = node_id;
        last_id = node_id;
    }

    let mut exit = NodeInstance::new(f.exit_node_type(), Position::zero());
    exit.input_data = vec![Some((last_id, 0))];
    exit.input_exec = vec![smallvec::smallvec![(last_id, 0)]];
    let exit_id = exit.id;
    if n == 0 {
        entry.output_exec = vec![Some((exit_id, 0))];
    } else {
        f.nodes.get_mut(&last_id).unwrap().output_exec = vec![Some((exit_id, 0))];
    }

    f.add_node(entry);
    f.add_node(exit);
    f.set_entry(entry_id);
    f
}

fn bench_function_compile_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("function_compile_linear_chain");
    for &n in &[10usize, 50, 100, 500, 1000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let f = build_linear_chain(n);
            b.iter(|| {
                let mut ctx = Interpreter::create_context();
                let mut module = Interpreter::create_module(&mut ctx, "bench");
                let func = Interpreter::create_function(&mut module, "main", &[Type::Pointer(Box::new(Type::I32)), Type::I32], Type::I32);
                let debug_file = Interpreter::create_debug_file(&mut module, "main.chimod", "bench");
                let mut fc = FunctionCompiler::new(&mut module, func, black_box(&f), Type::I32, Type::Pointer(Box::new(Type::I8)), debug_file);
                let diag = fc.compile();
                black_box(diag);
            });
        });
    }
    group.finish();
}

fn bench_module_compile_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("module_compile_cold");
    group.sample_size(20);
    for &n in &[10usize, 50, 100] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut ctx: Context<Interpreter> = Context::new();
                let mut module = GraphModule::new("test/main");
                module.functions.push(black_box(build_linear_chain(n)));
                ctx.add_module(Module::Graph(module)).unwrap();

                let dir = tempfile::tempdir().unwrap();
                let cache = ModuleCache::new(dir.path());
                let (compiled, diag) = module_compiler::compile(&mut ctx, "test/main", &cache);
                black_box((compiled, diag));
            });
        });
    }
    group.finish();
}

fn bench_module_compile_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("module_compile_cache_hit");
    for &n in &[10usize, 100] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let dir = tempfile::tempdir().unwrap();
            let cache = ModuleCache::new(dir.path());
            let mut ctx: Context<Interpreter> = Context::new();
            let mut module = GraphModule::new("test/main");
            module.functions.push(build_linear_chain(n));
            ctx.add_module(Module::Graph(module)).unwrap();
            let (_, diag) = module_compiler::compile(&mut ctx, "test/main", &cache);
            assert!(diag.success(), "{diag}");

            b.iter(|| {
                let (compiled, diag) = module_compiler::compile(black_box(&mut ctx), "test/main", &cache);
                black_box((compiled, diag));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_function_compile_chain, bench_module_compile_cold, bench_module_compile_cache_hit);
criterion_main!(benches);
