//! # Graph function (part of C5, Graph IR)
//!
//! `spec.md` §3: owns an ordered signature (named data/exec inputs and
//! outputs), a local-variable table, and an unordered map from node UUID to
//! [`NodeInstance`]. One designated node instance is the entry; `entry`/
//! `exit` node types are derived on request from the signature, per
//! `spec.md` §4.2 and invariant 4 of §8 (`outputs(entry.type) ==
//! dataInputs(F) ++ execInputs(F)`).

use crate::backend::Backend;
use crate::core::node_instance::NodeInstance;
use crate::core::node_type::{EntryBehavior, ExitBehavior, LocalGetBehavior, LocalSetBehavior, NodeType};
use crate::core::types::{DataType, NamedDataType};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct GraphFunction<B: Backend> {
    pub module_path: String,
    pub name: String,
    pub data_inputs: Vec<NamedDataType<B>>,
    pub data_outputs: Vec<NamedDataType<B>>,
    pub exec_inputs: Vec<String>,
    pub exec_outputs: Vec<String>,
    pub locals: Vec<NamedDataType<B>>,
    pub nodes: FxHashMap<Uuid, NodeInstance<B>>,
    pub entry_id: Option<Uuid>,
}

impl<B: Backend> GraphFunction<B> {
    pub fn new(module_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            name: name.into(),
            data_inputs: Vec::new(),
            data_outputs: Vec::new(),
            exec_inputs: vec!["in".to_string()],
            exec_outputs: vec!["out".to_string()],
            locals: Vec::new(),
            nodes: FxHashMap::default(),
            entry_id: None,
        }
    }

    pub fn with_data_input(mut self, name: impl Into<String>, ty: DataType<B>) -> Self {
        self.data_inputs.push(NamedDataType::new(name, ty));
        self
    }

    pub fn with_data_output(mut self, name: impl Into<String>, ty: DataType<B>) -> Self {
        self.data_outputs.push(NamedDataType::new(name, ty));
        self
    }

    /// `entry`'s outputs are `dataInputs(F) ++ execInputs(F)` (invariant 4,
    /// `spec.md` §8): data outputs mirror the function's data inputs, exec
    /// outputs mirror the function's exec inputs.
    pub fn entry_node_type(&self) -> NodeType<B> {
        NodeType {
            module_path: self.module_path.clone(),
            name: "entry".to_string(),
            data_inputs: Vec::new(),
            data_outputs: self.data_inputs.clone(),
            exec_inputs: Vec::new(),
            exec_outputs: self.exec_inputs.clone(),
            pure: false,
            data: serde_json::json!({ "inputs": self.data_inputs.iter().map(|d| &d.name).collect::<Vec<_>>(), "exec": self.exec_inputs }),
            behavior: Arc::new(EntryBehavior),
        }
    }

    /// `exit`'s inputs are `dataOutputs(F) ++ execOutputs(F)`: data inputs
    /// mirror the function's data outputs, exec inputs mirror the
    /// function's exec outputs (one `exit` instance per exec-output path).
    pub fn exit_node_type(&self) -> NodeType<B> {
        NodeType {
            module_path: self.module_path.clone(),
            name: "exit".to_string(),
            data_inputs: self.data_outputs.clone(),
            data_outputs: Vec::new(),
            exec_inputs: self.exec_outputs.clone(),
            exec_outputs: Vec::new(),
            pure: false,
            data: serde_json::json!({}),
            behavior: Arc::new(ExitBehavior),
        }
    }

    pub fn local_get_node_type(&self, var: &str) -> Option<NodeType<B>> {
        let local = self.locals.iter().find(|l| l.name == var)?;
        Some(NodeType {
            module_path: self.module_path.clone(),
            name: format!("_get_{var}"),
            data_inputs: Vec::new(),
            data_outputs: vec![NamedDataType::new("value", local.ty.clone())],
            exec_inputs: Vec::new(),
            exec_outputs: Vec::new(),
            pure: true,
            data: serde_json::json!({}),
            behavior: Arc::new(LocalGetBehavior { var: var.to_string() }),
        })
    }

    pub fn local_set_node_type(&self, var: &str) -> Option<NodeType<B>> {
        let local = self.locals.iter().find(|l| l.name == var)?;
        Some(NodeType {
            module_path: self.module_path.clone(),
            name: format!("_set_{var}"),
            data_inputs: vec![NamedDataType::new("value", local.ty.clone())],
            data_outputs: Vec::new(),
            exec_inputs: vec!["in".to_string()],
            exec_outputs: vec!["out".to_string()],
            pure: false,
            data: serde_json::json!({}),
            behavior: Arc::new(LocalSetBehavior { var: var.to_string() }),
        })
    }

    pub fn add_local(&mut self, name: impl Into<String>, ty: DataType<B>) {
        self.locals.push(NamedDataType::new(name, ty));
    }

    /// Rename a local variable, regenerating every `_get_<var>`/`_set_<var>`
    /// `NodeInstance` that referenced the old name (`spec.md` §3: "rename
    /// ... propagates to all `_get_<var>` / `_set_<var>` instances").
    pub fn rename_local(&mut self, old_name: &str, new_name: impl Into<String>) -> bool {
        let new_name = new_name.into();
        let Some(local) = self.locals.iter_mut().find(|l| l.name == old_name) else {
            return false;
        };
        local.name = new_name.clone();

        let get_name = format!("_get_{old_name}");
        let set_name = format!("_set_{old_name}");
        let ids: Vec<Uuid> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.node_type.name == get_name || n.node_type.name == set_name)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let is_get = self.nodes[&id].node_type.name == get_name;
            let replacement = if is_get { self.local_get_node_type(&new_name) } else { self.local_set_node_type(&new_name) };
            if let (Some(node), Some(new_type)) = (self.nodes.get_mut(&id), replacement) {
                node.node_type = new_type;
            }
        }
        true
    }

    pub fn add_node(&mut self, node: NodeInstance<B>) -> Uuid {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    pub fn set_entry(&mut self, id: Uuid) {
        self.entry_id = Some(id);
    }

    pub fn entry(&self) -> Option<&NodeInstance<B>> {
        self.entry_id.and_then(|id| self.nodes.get(&id))
    }
}

impl<B: Backend> std::fmt::Debug for GraphFunction<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphFunction")
            .field("module_path", &self.module_path)
            .field("name", &self.name)
            .field("node_count", &self.nodes.len())
            .finish()
    }
}
