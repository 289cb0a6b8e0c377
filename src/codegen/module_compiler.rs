//! # Module compiler (C9)
//!
//! `compile(module_path)` (`spec.md` §4.6): topologically sorts the
//! transitive dependency graph (erroring on cycles, including the
//! self-dependency case from `spec.md` §9's Open Question 1), ensures every
//! dependency is cached-or-freshly-compiled, forward-declares their
//! functions into a fresh backend module, compiles `module_path`'s own
//! functions, links in any `CModule` dependency's bitcode, and caches the
//! result under the module's current last-edit time.

use crate::backend::Backend;
use crate::cache::ModuleCache;
use crate::codegen::function_compiler::FunctionCompiler;
use crate::codes;
use crate::core::context::Context;
use crate::core::graph_function::GraphFunction;
use crate::core::module::Module;
use crate::diagnostics::Diagnostics;
use crate::mangle::mangle;
use serde_json::json;
use std::collections::HashMap;
use std::time::SystemTime;

/// Drives the full algorithm of `spec.md` §4.6 and returns the compiled
/// backend module for `module_path`, if compilation succeeded.
pub fn compile<B: Backend>(ctx: &mut Context<B>, module_path: &str, cache: &ModuleCache) -> (Option<B::Module>, Diagnostics) {
    let mut diag = Diagnostics::new();

    let order = match topo_sort(ctx, module_path) {
        Ok(order) => order,
        Err(cycle_diag) => {
            diag += cycle_diag;
            return (None, diag);
        }
    };

    // SPEC_FULL A5: validating every function of the target module is pure
    // over `&GraphFunction` and touches no backend state, so it is safe to
    // parallelize even though the rest of the core is single-threaded
    // (`spec.md` §5) — forward declaration and codegen below all need
    // exclusive access to the one backend module being built and stay
    // sequential.
    if let Some(Module::Graph(g)) = ctx.module(module_path) {
        let functions = g.functions.clone();
        use rayon::prelude::*;
        for d in functions.par_iter().map(crate::analysis::validate).collect::<Vec<_>>() {
            diag += d;
        }
        if !diag.success() {
            return (None, diag);
        }
    }

    tracing::info!("[MODULE] compiling `{module_path}` ({} transitive module(s))", order.len());

    let mut result = None;
    for path in &order {
        let (dep_diag, module) = ensure_compiled(ctx, path, cache);
        diag += dep_diag;
        if !diag.success() {
            tracing::info!("[MODULE] `{module_path}` failed to compile");
            return (None, diag);
        }
        if path == module_path {
            result = module;
        }
    }
    tracing::info!("[MODULE] `{module_path}` compiled successfully");
    (result, diag)
}

/// Topologically sorts `module_path`'s transitive dependency graph,
/// dependency-first, with `module_path` itself last. A dependency cycle
/// (including a module depending on itself, directly or transitively)
/// reports `E24` and aborts the sort (`spec.md` §9 Open Question 1).
fn topo_sort<B: Backend>(ctx: &Context<B>, module_path: &str) -> Result<Vec<String>, Diagnostics> {
    let mut diag = Diagnostics::new();
    let mut state: HashMap<String, VisitState> = HashMap::new();
    let mut order = Vec::new();
    visit(ctx, module_path, &mut state, &mut order, &mut diag);
    if diag.success() {
        Ok(order)
    } else {
        Err(diag)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

fn visit<B: Backend>(ctx: &Context<B>, path: &str, state: &mut HashMap<String, VisitState>, order: &mut Vec<String>, diag: &mut Diagnostics) {
    match state.get(path) {
        Some(VisitState::InProgress) => {
            diag.add_entry(
                codes::model::E24_DEPENDENCY_CYCLE,
                format!("module `{path}` depends on itself, directly or transitively"),
                json!({ "module": path }),
            );
            return;
        }
        Some(VisitState::Done) => return,
        None => {}
    }
    state.insert(path.to_string(), VisitState::InProgress);

    let deps: Vec<String> = match ctx.module(path) {
        Some(m) => m.dependencies().to_vec(),
        None => {
            diag.add_entry(codes::lookup::E10_UNKNOWN_MODULE, format!("unknown module `{path}`"), json!({ "module": path }));
            state.insert(path.to_string(), VisitState::Done);
            return;
        }
    };
    for dep in &deps {
        visit(ctx, dep, state, order, diag);
    }

    state.insert(path.to_string(), VisitState::Done);
    order.push(path.to_string());
}

/// Loads `path` from `cache` if it is up to date, else builds it fresh and
/// stores the result (`spec.md` §4.8: `cacheUpdateTime >= module.lastEditTime`).
fn ensure_compiled<B: Backend>(ctx: &mut Context<B>, path: &str, cache: &ModuleCache) -> (Diagnostics, Option<B::Module>) {
    let mut diag = Diagnostics::new();

    let last_edit = match ctx.module(path) {
        Some(Module::Lang(_)) => return (diag, None),
        Some(Module::Graph(g)) => g.last_edit_time,
        Some(Module::C(_)) => SystemTime::now(),
        None => {
            diag.add_entry(codes::lookup::E10_UNKNOWN_MODULE, format!("unknown module `{path}`"), json!({ "module": path }));
            return (diag, None);
        }
    };

    if let Some(bytes) = cache.retrieve(path, last_edit) {
        match B::parse_bitcode(ctx.backend_context_mut(), &bytes) {
            Ok(module) => {
                tracing::debug!("[MODULE] cache hit for `{path}`");
                diag.add(codes::info::I01_CACHE_HIT, format!("loaded `{path}` from cache"));
                return (diag, Some(module));
            }
            Err(e) => diag.add_entry(codes::io::E03_JSON_PARSE, format!("cache entry for `{path}` could not be parsed: {e}"), json!({})),
        }
    }

    tracing::debug!("[MODULE] cache miss for `{path}`, compiling fresh");
    let (build_diag, module) = build_module(ctx, path);
    diag += build_diag;
    if let Some(module) = &module {
        let bytes = B::write_bitcode(module);
        match cache.store(path, &bytes, last_edit) {
            Ok(()) => diag.add(codes::info::I02_MODULE_COMPILED, format!("compiled `{path}`")),
            Err(e) => diag.add_entry(codes::io::E04_WORKSPACE_WRITE_FAILED, format!("failed to cache `{path}`: {e}"), json!({})),
        }
    }
    (diag, module)
}

enum Snapshot<B: Backend> {
    Graph { functions: Vec<GraphFunction<B>>, dependencies: Vec<String> },
    C { bitcode: Vec<u8> },
}

/// Emits forward declarations (step 3), compiles every function (step 4),
/// and links in `CModule` dependencies' bitcode (step 5) of `spec.md` §4.6.
fn build_module<B: Backend>(ctx: &mut Context<B>, path: &str) -> (Diagnostics, Option<B::Module>) {
    let mut diag = Diagnostics::new();

    let snapshot = match ctx.module(path) {
        Some(Module::Graph(g)) => Snapshot::Graph { functions: g.functions.clone(), dependencies: g.dependencies.clone() },
        Some(Module::C(c)) => Snapshot::C { bitcode: c.bitcode.clone() },
        Some(Module::Lang(_)) | None => return (diag, None),
    };

    let (functions, dependencies) = match snapshot {
        Snapshot::Graph { functions, dependencies } => (functions, dependencies),
        Snapshot::C { bitcode } => {
            return match B::parse_bitcode(ctx.backend_context_mut(), &bitcode) {
                Ok(module) => (diag, Some(module)),
                Err(e) => {
                    diag.add_entry(codes::io::E03_JSON_PARSE, format!("failed to parse C-module bitcode for `{path}`: {e}"), json!({}));
                    (diag, None)
                }
            };
        }
    };

    let i32_ty = ctx.lang().type_named("i32").expect("lang module always defines i32").backend_type;
    let address_ty = B::type_pointer(B::type_i8(ctx.backend_context()));

    let mut module = B::create_module(ctx.backend_context_mut(), path);
    let debug_file = B::create_debug_file(&mut module, &format!("{path}.chimod"), path);

    for dep_path in &dependencies {
        let dep_functions: Vec<GraphFunction<B>> = match ctx.module(dep_path) {
            Some(Module::Graph(g)) => g.functions.clone(),
            _ => Vec::new(),
        };
        for f in &dep_functions {
            declare_function::<B>(&mut module, dep_path, f, &i32_ty);
        }
    }

    for f in &functions {
        let param_types = function_param_types::<B>(f, &i32_ty);
        let symbol = mangle(path, &f.name);
        let backend_function = B::create_function(&mut module, &symbol, &param_types, i32_ty.clone());
        let mut fc = FunctionCompiler::new(&mut module, backend_function, f, i32_ty.clone(), address_ty.clone(), debug_file.clone());
        diag += fc.compile();
        if !diag.success() {
            return (diag, None);
        }
    }

    for dep_path in &dependencies {
        let c_bitcode = match ctx.module(dep_path) {
            Some(Module::C(c)) => Some(c.bitcode.clone()),
            _ => None,
        };
        let Some(bitcode) = c_bitcode else { continue };
        match B::parse_bitcode(ctx.backend_context_mut(), &bitcode) {
            Ok(src) => {
                if let Err(e) = B::link_modules(&mut module, src) {
                    diag.add_entry(codes::codegen::E40_VERIFIER_REJECTED, format!("failed to link C-module `{dep_path}` into `{path}`: {e}"), json!({}));
                }
            }
            Err(e) => diag.add_entry(codes::io::E03_JSON_PARSE, format!("failed to parse C-module bitcode for `{dep_path}`: {e}"), json!({})),
        }
    }

    if let Err(e) = B::verify_module(&module) {
        diag.add_entry(codes::codegen::E40_VERIFIER_REJECTED, format!("module `{path}` failed verification: {e}"), json!({}));
    }

    (diag, Some(module))
}

/// `dataInputs(F) ++ dataOutputs(F) (as pointers) ++ [i32 exec selector]`,
/// the backend function signature layout shared by definitions and forward
/// declarations (`spec.md` §4.5 point 1).
fn function_param_types<B: Backend>(f: &GraphFunction<B>, i32_ty: &B::Type) -> Vec<B::Type> {
    f.data_inputs
        .iter()
        .map(|p| p.ty.backend_type.clone())
        .chain(f.data_outputs.iter().map(|p| B::type_pointer(p.ty.backend_type.clone())))
        .chain(std::iter::once(i32_ty.clone()))
        .collect()
}

fn declare_function<B: Backend>(module: &mut B::Module, dep_path: &str, f: &GraphFunction<B>, i32_ty: &B::Type) {
    let symbol = mangle(dep_path, &f.name);
    if B::get_function(module, &symbol).is_some() {
        return;
    }
    let param_types = function_param_types::<B>(f, i32_ty);
    B::create_function(module, &symbol, &param_types, i32_ty.clone());
}
