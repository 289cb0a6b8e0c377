//! # Validator (C6)
//!
//! Two pure checks over a [`GraphFunction`], per `spec.md` §4.7: connection
//! symmetry and execution-order dataflow availability. A third check, pure
//! dependency cycles, is supplemented here from `spec.md` §4.3 ("Cycles
//! among pure nodes are a validation error") since the distilled §4.7 text
//! only names the first two explicitly but §4.3 requires the third to be
//! caught somewhere before codegen.

use crate::backend::Backend;
use crate::codes;
use crate::core::graph_function::GraphFunction;
use crate::diagnostics::Diagnostics;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Run every check and return the concatenated diagnostics (`spec.md` §4.7).
pub fn validate<B: Backend>(f: &GraphFunction<B>) -> Diagnostics {
    let mut diag = validate_connection_symmetry(f);
    diag += validate_execution_order(f);
    diag += validate_pure_cycles(f);
    diag
}

/// "For every outgoing data/exec connection on every instance, verify the
/// matching incoming connection exists with the same slot indices. Report
/// one `E` entry per violation." (`spec.md` §4.7, invariant 1 of §8.)
pub fn validate_connection_symmetry<B: Backend>(f: &GraphFunction<B>) -> Diagnostics {
    let mut diag = Diagnostics::new();

    for (id, node) in &f.nodes {
        for (slot, out) in node.output_exec.iter().enumerate() {
            let Some((peer_id, peer_slot)) = out else { continue };
            let symmetric = f
                .nodes
                .get(peer_id)
                .and_then(|peer| peer.input_exec.get(*peer_slot))
                .map(|fan_in| fan_in.iter().any(|(back_id, back_slot)| back_id == id && *back_slot == slot))
                .unwrap_or(false);
            if !symmetric {
                diag.add_entry(
                    codes::topology::E30_ASYMMETRIC_CONNECTION,
                    format!("exec connection {id}.{slot} -> {peer_id}.{peer_slot} has no matching input"),
                    json!({ "kind": "exec", "from_node": id.to_string(), "from_slot": slot, "to_node": peer_id.to_string(), "to_slot": peer_slot }),
                );
            }
        }

        for (slot, consumers) in node.output_data.iter().enumerate() {
            for (peer_id, peer_slot) in consumers {
                let symmetric = f
                    .nodes
                    .get(peer_id)
                    .and_then(|peer| peer.input_data.get(*peer_slot))
                    .map(|back| *back == Some((*id, slot)))
                    .unwrap_or(false);
                if !symmetric {
                    diag.add_entry(
                        codes::topology::E30_ASYMMETRIC_CONNECTION,
                        format!("data connection {id}.{slot} -> {peer_id}.{peer_slot} has no matching input"),
                        json!({ "kind": "data", "from_node": id.to_string(), "from_slot": slot, "to_node": peer_id.to_string(), "to_slot": peer_slot }),
                    );
                }
            }
        }
    }

    diag
}

/// "A recursive walk from the entry node along exec edges, maintaining
/// `visited: NodeInstance -> set<input_exec_id>`" (`spec.md` §4.7).
pub fn validate_execution_order<B: Backend>(f: &GraphFunction<B>) -> Diagnostics {
    let mut diag = Diagnostics::new();
    let Some(entry_id) = f.entry_id else {
        diag.add(codes::model::E25_NO_ENTRY_NODE, "function has no designated entry node");
        return diag;
    };

    let mut visited: HashMap<Uuid, HashSet<usize>> = HashMap::new();
    walk(f, entry_id, 0, &mut visited, &mut diag);
    diag
}

fn walk<B: Backend>(f: &GraphFunction<B>, node_id: Uuid, input_exec_id: usize, visited: &mut HashMap<Uuid, HashSet<usize>>, diag: &mut Diagnostics) {
    if visited.get(&node_id).map(|ids| ids.contains(&input_exec_id)).unwrap_or(false) {
        return;
    }
    let Some(node) = f.nodes.get(&node_id) else {
        diag.add_entry(codes::model::E23_DANGLING_DEPENDENCY, format!("exec edge targets missing node {node_id}"), json!({ "node": node_id.to_string() }));
        return;
    };

    for (peer_id, _) in node.input_data.iter().flatten() {
        let Some(peer) = f.nodes.get(peer_id) else { continue };
        if peer.is_pure() {
            continue;
        }
        let already_ran = visited.get(peer_id).map(|ids| !ids.is_empty()).unwrap_or(false);
        if !already_ran {
            diag.add_entry(
                codes::topology::E31_MISSING_DATA_INPUT,
                format!("node {node_id} consumes data from {peer_id}, which has not executed yet"),
                json!({ "consumer": node_id.to_string(), "producer": peer_id.to_string() }),
            );
        }
    }

    visited.entry(node_id).or_default().insert(input_exec_id);

    for out in &node.output_exec {
        if let Some((next_id, next_slot)) = out {
            walk(f, *next_id, *next_slot, visited, diag);
        }
    }
}

/// Supplemented from `spec.md` §4.3: a cycle among pure nodes reachable
/// through `inputData` is a validation error (`E32`), not a runtime crash.
pub fn validate_pure_cycles<B: Backend>(f: &GraphFunction<B>) -> Diagnostics {
    let mut diag = Diagnostics::new();
    let mut state: HashMap<Uuid, VisitState> = HashMap::new();

    for id in f.nodes.keys() {
        if f.nodes[id].is_pure() && !state.contains_key(id) {
            detect_cycle(f, *id, &mut state, &mut diag);
        }
    }
    diag
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

fn detect_cycle<B: Backend>(f: &GraphFunction<B>, id: Uuid, state: &mut HashMap<Uuid, VisitState>, diag: &mut Diagnostics) -> bool {
    match state.get(&id) {
        Some(VisitState::InProgress) => {
            diag.add_entry(codes::topology::E32_PURE_CYCLE, format!("pure node {id} participates in a dependency cycle"), json!({ "node": id.to_string() }));
            return true;
        }
        Some(VisitState::Done) => return false,
        None => {}
    }
    state.insert(id, VisitState::InProgress);
    let mut found = false;
    if let Some(node) = f.nodes.get(&id) {
        for (peer_id, _) in node.input_data.iter().flatten() {
            if f.nodes.get(peer_id).map(|p| p.is_pure()).unwrap_or(false) {
                found |= detect_cycle(f, *peer_id, state, diag);
            }
        }
    }
    state.insert(id, VisitState::Done);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::interpreter::{DebugMeta, Interpreter, Type};
    use crate::core::node_instance::NodeInstance;
    use crate::core::node_type::EntryBehavior;
    use crate::core::types::{DataType, Position};
    use std::sync::Arc;

    fn i32_type() -> DataType<Interpreter> {
        DataType::new("lang", "i32", Type::I32, DebugMeta("i32".into()))
    }

    fn unused_entry_type() -> crate::core::node_type::NodeType<Interpreter> {
        crate::core::node_type::NodeType {
            module_path: "lang".into(),
            name: "entry".into(),
            data_inputs: vec![],
            data_outputs: vec![],
            exec_inputs: vec![],
            exec_outputs: vec!["out".into()],
            pure: false,
            data: json!({}),
            behavior: Arc::new(EntryBehavior),
        }
    }

    #[test]
    fn s4_asymmetric_connection_reports_e30() {
        // spec.md S4: A.outputExec[0] = (B, 0) recorded, but B.inputExec[0] is empty.
        let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");
        let mut a = NodeInstance::new(unused_entry_type(), Position::zero());
        let mut b = NodeInstance::new(unused_entry_type(), Position::zero());
        a.output_exec[0] = Some((b.id, 0));
        // b.input_exec intentionally left empty: asymmetric.
        b.input_exec = vec![Default::default()];
        let a_id = a.id;
        let b_id = b.id;
        f.add_node(a);
        f.add_node(b);
        f.set_entry(a_id);

        let diag = validate_connection_symmetry(&f);
        let e30s = diag.entries_with_prefix(codes::topology::E30_ASYMMETRIC_CONNECTION);
        assert_eq!(e30s.len(), 1);
        assert_eq!(e30s[0].data["from_node"], a_id.to_string());
        assert_eq!(e30s[0].data["to_node"], b_id.to_string());
    }

    #[test]
    fn symmetric_graph_has_no_e30() {
        let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");
        let mut a = NodeInstance::new(unused_entry_type(), Position::zero());
        let mut b = NodeInstance::new(unused_entry_type(), Position::zero());
        b.input_exec = vec![Default::default()];
        a.output_exec[0] = Some((b.id, 0));
        b.input_exec[0].push((a.id, 0));
        f.set_entry(a.id);
        f.add_node(a);
        f.add_node(b);

        let diag = validate_connection_symmetry(&f);
        assert!(diag.entries_with_prefix("E30").is_empty());
    }

    #[test]
    fn missing_entry_reports_e25() {
        let f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");
        let diag = validate_execution_order(&f);
        assert_eq!(diag.entries_with_prefix("E25").len(), 1);
    }

    #[test]
    fn data_from_unexecuted_node_reports_e31() {
        let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");
        // `consumer` reads from `producer`, a non-pure node that never runs
        // before it along the exec chain.
        let mut consumer = NodeInstance::new(unused_entry_type(), Position::zero());
        let producer = NodeInstance::new(unused_entry_type(), Position::zero());
        consumer.input_data = vec![Some((producer.id, 0))];
        let consumer_id = consumer.id;
        f.add_node(consumer);
        f.add_node(producer);
        f.set_entry(consumer_id);

        let diag = validate_execution_order(&f);
        assert_eq!(diag.entries_with_prefix("E31").len(), 1);
    }

    #[test]
    fn pure_cycle_reports_e32() {
        let i32ty = i32_type();
        let pure_type = crate::core::node_type::NodeType {
            module_path: "lang".into(),
            name: "const-int".into(),
            data_inputs: vec![crate::core::types::NamedDataType::new("x", i32ty.clone())],
            data_outputs: vec![crate::core::types::NamedDataType::new("value", i32ty)],
            exec_inputs: vec![],
            exec_outputs: vec![],
            pure: true,
            data: json!({}),
            behavior: Arc::new(crate::core::node_type::ConstIntBehavior { value: 0 }),
        };
        let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");
        let mut p = NodeInstance::new(pure_type.clone(), Position::zero());
        let mut q = NodeInstance::new(pure_type, Position::zero());
        p.input_data = vec![Some((q.id, 0))];
        q.input_data = vec![Some((p.id, 0))];
        f.add_node(p);
        f.add_node(q);

        let diag = validate_pure_cycles(&f);
        assert!(!diag.entries_with_prefix("E32").is_empty());
    }
}
