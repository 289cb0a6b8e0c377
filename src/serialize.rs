//! # Graph JSON schema (A6, spec.md §6)
//!
//! The live model (`GraphModule`/`GraphFunction`/`NodeInstance`) is not
//! itself `#[derive(Serialize)]`: `DataType` carries a live backend type/
//! debug-type handle that has no JSON representation. Every round trip goes
//! through the DTO types below instead, exactly as the original separates
//! `chi::JsonSerializer`/`chi::JsonDeserializer` from the live C++ graph
//! objects (`examples/original_source/libchigraph/include/chi/JsonDeserializer.hpp`).
//!
//! Resolving a DTO's `"mod:type"` strings back into live `DataType<B>`
//! values needs a backend type for any struct referenced across a module
//! boundary, and the minimal backend facade (`spec.md` §6) has no generic
//! "build me a struct type" operation — that construction is the module
//! compiler's job while it builds a module's own `GraphStruct`s. So
//! `from_dto` takes an already-resolved type table rather than attempting to
//! synthesize backend struct types itself; a workspace loader builds that
//! table by loading dependencies (whose structs are already compiled)
//! before loading a dependent module. See `DESIGN.md`.

use crate::backend::Backend;
use crate::codes;
use crate::core::graph_function::GraphFunction;
use crate::core::graph_struct::GraphStruct;
use crate::core::module::{GraphModule, LangModule};
use crate::core::node_instance::{Endpoint, NodeInstance};
use crate::core::node_type::NodeType;
use crate::core::types::{DataType, NamedDataType, Position};
use crate::diagnostics::Diagnostics;
use serde_json::Value as Json;
use std::collections::HashMap;
use uuid::Uuid;

/// A lookup table from `"mod:type"` to a live, backend-resolved type.
/// Typically seeded from `ctx.lang()`'s primitives plus every struct type of
/// every already-loaded dependency module.
pub type TypeTable<B> = HashMap<String, DataType<B>>;

/// A lookup table from `"mod:name"` to a node type not synthesized directly
/// from a `GraphFunction`'s own signature (`entry`/`exit`/`_get_<var>`/
/// `_set_<var>` are handled separately; see [`resolve_node_type`]).
pub type NodeTypeTable<B> = HashMap<String, NodeType<B>>;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphModuleDto {
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub types: HashMap<String, Vec<HashMap<String, String>>>,
    pub graphs: Vec<GraphFunctionDto>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphFunctionDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub inputs: Vec<HashMap<String, String>>,
    pub outputs: Vec<HashMap<String, String>>,
    pub exec_inputs: Vec<String>,
    pub exec_outputs: Vec<String>,
    #[serde(default)]
    pub local_variables: HashMap<String, String>,
    pub nodes: HashMap<Uuid, NodeInstanceDto>,
    pub connections: Vec<ConnectionDto>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub entry: Option<Uuid>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeInstanceDto {
    #[serde(rename = "type")]
    pub node_type: String,
    pub location: (f64, f64),
    pub data: Json,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConnectionDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub input: (Uuid, usize),
    pub output: (Uuid, usize),
}

/// Serializes a [`GraphModule`] to its JSON-schema DTO (`spec.md` §6). Pure
/// and backend-independent: every live type is reduced to its qualified
/// name string.
pub fn to_dto<B: Backend>(module: &GraphModule<B>) -> GraphModuleDto {
    let types = module
        .structs
        .iter()
        .map(|s| {
            let fields = s.fields.iter().map(|f| HashMap::from([(f.name.clone(), f.ty.qualified_name())])).collect();
            (s.name.clone(), fields)
        })
        .collect();

    let graphs = module.functions.iter().map(function_to_dto).collect();

    GraphModuleDto { dependencies: module.dependencies.clone(), types, graphs }
}

fn function_to_dto<B: Backend>(f: &GraphFunction<B>) -> GraphFunctionDto {
    let mut nodes = HashMap::with_capacity(f.nodes.len());
    let mut connections = Vec::new();

    for (id, node) in &f.nodes {
        nodes.insert(*id, NodeInstanceDto { node_type: node.node_type.qualified_name(), location: (node.position.x, node.position.y), data: node.node_type.data.clone() });

        for (slot, producer) in node.input_data.iter().enumerate() {
            if let Some((peer_id, peer_slot)) = producer {
                connections.push(ConnectionDto { kind: "data".to_string(), input: (*id, slot), output: (*peer_id, *peer_slot) });
            }
        }
        for (slot, consumers) in node.input_exec.iter().enumerate() {
            for (peer_id, peer_slot) in consumers {
                connections.push(ConnectionDto { kind: "exec".to_string(), input: (*id, slot), output: (*peer_id, *peer_slot) });
            }
        }
    }

    GraphFunctionDto {
        kind: "function".to_string(),
        name: f.name.clone(),
        inputs: f.data_inputs.iter().map(|p| HashMap::from([(p.name.clone(), p.ty.qualified_name())])).collect(),
        outputs: f.data_outputs.iter().map(|p| HashMap::from([(p.name.clone(), p.ty.qualified_name())])).collect(),
        exec_inputs: f.exec_inputs.clone(),
        exec_outputs: f.exec_outputs.clone(),
        local_variables: f.locals.iter().map(|l| (l.name.clone(), l.ty.qualified_name())).collect(),
        nodes,
        connections,
        entry: f.entry_id,
    }
}

/// Materializes a [`GraphModuleDto`] into a live [`GraphModule`], resolving
/// every `"mod:type"`/`"mod:name"` string against `types`/`node_types` (and,
/// for built-in `lang` node types, against `lang` itself — see
/// [`resolve_node_type`]). Unresolvable references are reported (`E11`/`E12`)
/// rather than panicking; the returned module omits whatever could not be
/// resolved.
pub fn from_dto<B: Backend>(
    module_path: &str,
    dto: &GraphModuleDto,
    lang: &LangModule<B>,
    types: &TypeTable<B>,
    node_types: &NodeTypeTable<B>,
    backend_ctx: &B::Context,
    scratch_module: &mut B::Module,
) -> (GraphModule<B>, Diagnostics) {
    let mut diag = Diagnostics::new();
    let mut module = GraphModule::new(module_path);
    module.dependencies = dto.dependencies.clone();

    // Own-module struct field types must resolve against `types` as given
    // (cross-module struct fields referencing another same-module struct
    // are not supported — see DESIGN.md).
    for (struct_name, fields_dto) in &dto.types {
        let mut s = GraphStruct::new(module_path, struct_name.clone());
        for field in fields_dto {
            for (field_name, qualified_ty) in field {
                match types.get(qualified_ty) {
                    Some(ty) => s = s.with_field(field_name.clone(), ty.clone()),
                    None => diag.add_entry(codes::lookup::E11_UNKNOWN_TYPE, format!("unknown field type `{qualified_ty}`"), serde_json::json!({ "struct": struct_name, "field": field_name })),
                }
            }
        }
        module.structs.push(s);
    }

    // Materialize this module's own struct backend types and register their
    // synthesized `_make_`/`_break_` node types into a local extension of
    // `node_types`, so node instances in this very module can reference them
    // (`spec.md` §3). See `DESIGN.md` "cross-module struct resolution".
    let mut local_node_types = node_types.clone();
    for s in &mut module.structs {
        let struct_ty = s.resolve_type(backend_ctx, scratch_module);
        let make = s.make_node_type(struct_ty.clone());
        let brk = s.break_node_type(struct_ty);
        local_node_types.insert(make.qualified_name(), make);
        local_node_types.insert(brk.qualified_name(), brk);
    }

    for graph in &dto.graphs {
        let (f, d) = function_from_dto(module_path, graph, lang, types, &local_node_types);
        diag += d;
        module.functions.push(f);
    }

    (module, diag)
}

fn function_from_dto<B: Backend>(module_path: &str, dto: &GraphFunctionDto, lang: &LangModule<B>, types: &TypeTable<B>, node_types: &NodeTypeTable<B>) -> (GraphFunction<B>, Diagnostics) {
    let mut diag = Diagnostics::new();
    let mut f: GraphFunction<B> = GraphFunction::new(module_path, dto.name.clone());
    f.exec_inputs = dto.exec_inputs.clone();
    f.exec_outputs = dto.exec_outputs.clone();

    let mut named = |list: &[HashMap<String, String>], kind: &str, diag: &mut Diagnostics| -> Vec<NamedDataType<B>> {
        let mut out = Vec::with_capacity(list.len());
        for pair in list {
            for (name, qualified_ty) in pair {
                match types.get(qualified_ty) {
                    Some(ty) => out.push(NamedDataType::new(name.clone(), ty.clone())),
                    None => diag.add_entry(codes::lookup::E11_UNKNOWN_TYPE, format!("unknown type `{qualified_ty}` on `{name}`"), serde_json::json!({ "function": dto.name, "port": name, "kind": kind })),
                }
            }
        }
        out
    };
    f.data_inputs = named(&dto.inputs, "input", &mut diag);
    f.data_outputs = named(&dto.outputs, "output", &mut diag);

    for (name, qualified_ty) in &dto.local_variables {
        match types.get(qualified_ty) {
            Some(ty) => f.add_local(name.clone(), ty.clone()),
            None => diag.add_entry(codes::lookup::E11_UNKNOWN_TYPE, format!("unknown local-variable type `{qualified_ty}`"), serde_json::json!({ "function": dto.name, "local": name })),
        }
    }

    for (id, node_dto) in &dto.nodes {
        match resolve_node_type(&f, lang, node_dto, node_types) {
            Some(mut node_type) => {
                node_type.data = node_dto.data.clone();
                let instance = NodeInstance::new(node_type, Position::new(node_dto.location.0, node_dto.location.1)).with_id(*id);
                f.add_node(instance);
            }
            None => diag.add_entry(codes::lookup::E12_UNKNOWN_NODE_TYPE, format!("unknown node type `{}`", node_dto.node_type), serde_json::json!({ "function": dto.name, "node": id.to_string() })),
        }
    }

    for conn in &dto.connections {
        wire_connection(&mut f, conn, &mut diag);
    }

    if let Some(entry_id) = dto.entry {
        f.set_entry(entry_id);
    } else if let Some((id, _)) = f.nodes.iter().find(|(_, n)| n.node_type.name == "entry") {
        f.set_entry(*id);
    }

    (f, diag)
}

/// `entry`/`exit`/`_get_<var>`/`_set_<var>` are synthesized from the
/// function's own signature/locals rather than looked up in a catalogue
/// (`spec.md` §4.2). Built-in `lang` nodes carrying a per-instance literal
/// (`const-int`, `const-bool`, `const-float`, `strliteral`) are synthesized
/// from the node's own `data` payload via the same `LangModule` constructors
/// the rest of the core uses — a static `node_types` table cannot hold them,
/// since the literal value differs per instance while the qualified name
/// does not. `if` is parameterless and also lives on `LangModule`. Struct
/// `_make_`/`_break_` and anything else (e.g. a `CModule`'s exported
/// functions) come from `node_types`.
fn resolve_node_type<B: Backend>(f: &GraphFunction<B>, lang: &LangModule<B>, node_dto: &NodeInstanceDto, node_types: &NodeTypeTable<B>) -> Option<NodeType<B>> {
    let qualified_name = node_dto.node_type.as_str();
    let (module, short) = qualified_name.split_once(':').unwrap_or(("", qualified_name));

    if module == LangModule::<B>::PATH {
        return match short {
            "if" => lang.if_node_type(),
            "const-int" => lang.const_int_node_type(node_dto.data.get("value")?.as_i64()?),
            "const-bool" => lang.const_bool_node_type(node_dto.data.get("value")?.as_bool()?),
            "const-float" => lang.const_float_node_type(node_dto.data.get("value")?.as_f64()?),
            "strliteral" => lang.strliteral_node_type(node_dto.data.get("value")?.as_str()?.to_string()),
            _ => None,
        };
    }

    if qualified_name == f.entry_node_type().qualified_name() {
        return Some(f.entry_node_type());
    }
    if qualified_name == f.exit_node_type().qualified_name() {
        return Some(f.exit_node_type());
    }
    if let Some(var) = short.strip_prefix("_get_") {
        if let Some(nt) = f.local_get_node_type(var) {
            return Some(nt);
        }
    }
    if let Some(var) = short.strip_prefix("_set_") {
        if let Some(nt) = f.local_set_node_type(var) {
            return Some(nt);
        }
    }
    node_types.get(qualified_name).cloned()
}

fn wire_connection<B: Backend>(f: &mut GraphFunction<B>, conn: &ConnectionDto, diag: &mut Diagnostics) {
    let (input_id, input_slot) = conn.input;
    let (output_id, output_slot) = conn.output;

    match conn.kind.as_str() {
        "data" => {
            if let Some(node) = f.nodes.get_mut(&input_id) {
                if let Some(slot) = node.input_data.get_mut(input_slot) {
                    *slot = Some((output_id, output_slot));
                } else {
                    report_bad_connection(diag, &conn.kind, input_id, input_slot);
                }
            } else {
                report_bad_connection(diag, &conn.kind, input_id, input_slot);
            }
            if let Some(node) = f.nodes.get_mut(&output_id) {
                if let Some(slot) = node.output_data.get_mut(output_slot) {
                    slot.push((input_id, input_slot));
                }
            }
        }
        "exec" => {
            let endpoint: Endpoint = (output_id, output_slot);
            if let Some(node) = f.nodes.get_mut(&input_id) {
                if let Some(slot) = node.input_exec.get_mut(input_slot) {
                    slot.push(endpoint);
                } else {
                    report_bad_connection(diag, &conn.kind, input_id, input_slot);
                }
            } else {
                report_bad_connection(diag, &conn.kind, input_id, input_slot);
            }
            if let Some(node) = f.nodes.get_mut(&output_id) {
                if let Some(slot) = node.output_exec.get_mut(output_slot) {
                    *slot = Some((input_id, input_slot));
                }
            }
        }
        other => diag.add_entry(codes::io::E03_JSON_PARSE, format!("unknown connection kind `{other}`"), serde_json::json!({})),
    }
}

fn report_bad_connection(diag: &mut Diagnostics, kind: &str, node: Uuid, slot: usize) {
    diag.add_entry(codes::model::E23_DANGLING_DEPENDENCY, format!("{kind} connection references a nonexistent node or slot"), serde_json::json!({ "node": node.to_string(), "slot": slot }));
}
