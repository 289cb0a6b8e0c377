//! # Function compiler (C8)
//!
//! Orchestrates the per-node stage-1/stage-2 codegen of `spec.md` §4.4 across
//! an entire [`GraphFunction`]: allocates the entry/alloc block, assigns the
//! debug-line-number bijection (§4.5 point 3), walks the exec graph from the
//! designated entry node (stage-1-ing successors before stage-2-ing a node,
//! per the §4.4 "Ordering policy"), and finalizes every shared pure node's
//! `jumpBackInst` indirect branch once the whole walk is done.

use crate::analysis::validate;
use crate::backend::Backend;
use crate::codegen::node_compiler::{dependent_pures_recursive, NonPureState, PureState};
use crate::codes;
use crate::core::graph_function::GraphFunction;
use crate::diagnostics::Diagnostics;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Orchestrates codegen for one [`GraphFunction`] against one backend
/// function. Owns every transient per-node compiler state for the duration
/// of a single `compile()` call (`spec.md` §5 ownership: "`FunctionCompiler`
/// owns a transient map of `NodeCompiler`s for the duration of one `compile`
/// call; nothing outside holds references into it").
pub struct FunctionCompiler<'a, B: Backend> {
    function: &'a GraphFunction<B>,
    module: &'a mut B::Module,
    backend_function: B::Function,
    i32_type: B::Type,
    /// A generic pointer type, wide enough to hold a block address, used for
    /// `jumpBackInst` return-address cells.
    address_type: B::Type,
    debug_file: B::DebugMeta,
    alloc_block: B::BasicBlock,
    function_data_input_count: usize,
    selector_param_index: usize,
    locals: HashMap<String, (B::Value, B::Type)>,
    output_cells: HashMap<Uuid, Vec<(B::Value, B::Type)>>,
    pure_states: HashMap<Uuid, PureState<B>>,
    non_pure_states: HashMap<Uuid, HashMap<usize, NonPureState<B>>>,
    line_numbers: HashMap<Uuid, u32>,
    diag: Diagnostics,
}

impl<'a, B: Backend> FunctionCompiler<'a, B> {
    /// `initialize` (`spec.md` §4.5): builds the backend function signature
    /// (the caller already created `backend_function` with that signature —
    /// see `crate::codegen::module_compiler`, which owns struct/primitive
    /// type resolution), creates the alloc block, allocates every local
    /// variable's and every node's output cells, assigns the debug-line
    /// bijection, and runs full validation.
    pub fn new(
        module: &'a mut B::Module,
        backend_function: B::Function,
        function: &'a GraphFunction<B>,
        i32_type: B::Type,
        address_type: B::Type,
        debug_file: B::DebugMeta,
    ) -> Self {
        let alloc_block = B::append_basic_block(module, backend_function, "alloc");
        let function_data_input_count = function.data_inputs.len();
        let selector_param_index = function.data_inputs.len() + function.data_outputs.len();

        let mut locals = HashMap::new();
        for local in &function.locals {
            let cell = B::build_alloca(module, alloc_block, local.ty.backend_type.clone(), &local.name);
            locals.insert(local.name.clone(), (cell, local.ty.backend_type.clone()));
        }

        let mut output_cells = HashMap::new();
        for (id, node) in &function.nodes {
            if node.node_type.data_outputs.is_empty() {
                continue;
            }
            let cells: Vec<(B::Value, B::Type)> = node
                .node_type
                .data_outputs
                .iter()
                .map(|port| {
                    let ty = port.ty.backend_type.clone();
                    let cell = B::build_alloca(module, alloc_block, ty.clone(), &format!("{}_{}", id, port.name));
                    (cell, ty)
                })
                .collect();
            output_cells.insert(*id, cells);
        }

        let mut diag = validate(function);
        let line_numbers = assign_line_numbers(function);
        diag += check_line_number_bijection(function, &line_numbers);

        tracing::debug!("[FUNCTION] compiling `{}:{}` ({} nodes)", function.module_path, function.name, function.nodes.len());

        Self {
            function,
            module,
            backend_function,
            i32_type,
            address_type,
            debug_file,
            alloc_block,
            function_data_input_count,
            selector_param_index,
            locals,
            output_cells,
            pure_states: HashMap::new(),
            non_pure_states: HashMap::new(),
            line_numbers,
            diag,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn line_numbers(&self) -> &HashMap<Uuid, u32> {
        &self.line_numbers
    }

    /// `compile` (`spec.md` §4.5): walks the exec graph from `entry`,
    /// stage-1/stage-2-ing every reachable node, finalizes shared pure
    /// nodes' indirect branches, and wires the alloc block into entry's
    /// first block. Aborts at the first `E`-severity diagnostic produced by
    /// `initialize` (`spec.md` §4.5 "Error semantics").
    pub fn compile(&mut self) -> Diagnostics {
        if !self.diag.success() {
            return self.diag.clone();
        }

        let Some(entry_id) = self.function.entry_id else {
            self.diag.add(codes::model::E25_NO_ENTRY_NODE, "function has no designated entry node");
            return self.diag.clone();
        };
        if !self.function.nodes.contains_key(&entry_id) {
            self.diag.add_entry(
                codes::model::E23_DANGLING_DEPENDENCY,
                "designated entry id does not name a node in this function",
                json!({ "entry": entry_id.to_string() }),
            );
            return self.diag.clone();
        }

        self.compile_node(entry_id, 0);

        for (_, state) in self.pure_states.drain().collect::<Vec<_>>() {
            B::build_indirect_br(self.module, state.code_block, state.return_addr_cell, &state.possible_destinations);
        }
        // re-materialize an (unused) map so later calls to `compile` (there
        // are none in practice — compile is one-shot per function) don't
        // panic on a missing field; kept empty intentionally.
        self.pure_states = HashMap::new();

        let entry_first = self.stage1(entry_id, 0);
        B::build_br(self.module, self.alloc_block, entry_first);

        let param_debug_types: Vec<B::DebugMeta> = self
            .function
            .data_inputs
            .iter()
            .chain(self.function.data_outputs.iter())
            .map(|p| p.ty.debug_type.clone())
            .collect();
        B::create_debug_subroutine_type(self.module, &param_debug_types);

        if self.diag.success() {
            tracing::debug!("[FUNCTION] `{}:{}` compiled cleanly", self.function.module_path, self.function.name);
        } else {
            tracing::info!("[FUNCTION] `{}:{}` compiled with {} diagnostic(s)", self.function.module_path, self.function.name, self.diag.entries().len());
        }

        self.diag.clone()
    }

    /// Stage-1 then stage-2 `node_id` at `input_exec_id`, then recurse into
    /// its exec successors (`spec.md` §4.5 point 2, §4.4 "Ordering policy").
    /// Memoized on `stage2_done` so exec cycles ("cycle OK" per the
    /// validator, `spec.md` §4.7) terminate instead of looping forever.
    fn compile_node(&mut self, node_id: Uuid, input_exec_id: usize) {
        if self.non_pure_states.get(&node_id).and_then(|m| m.get(&input_exec_id)).map(|s| s.stage2_done).unwrap_or(false) {
            return;
        }
        tracing::trace!("[NODE] visiting {node_id} at k={input_exec_id}");
        self.stage1(node_id, input_exec_id);

        let Some(node) = self.function.nodes.get(&node_id) else { return };
        if node.is_pure() {
            return;
        }
        let output_exec = node.output_exec.clone();

        let mut trailing = Vec::with_capacity(output_exec.len());
        for out in &output_exec {
            match out {
                Some((succ_id, succ_k)) => trailing.push(self.stage1(*succ_id, *succ_k)),
                None => {
                    self.diag.add_entry(
                        codes::topology::E30_ASYMMETRIC_CONNECTION,
                        "non-pure node has an unconnected exec output",
                        json!({ "node": node_id.to_string() }),
                    );
                    // Fabricate a trap block so codegen can still proceed
                    // and report every other error in one pass.
                    let trap = B::append_basic_block(self.module, self.backend_function, &format!("trap_{node_id}"));
                    let zero = B::build_const_int(self.module, self.i32_type.clone(), 0);
                    B::build_ret(self.module, trap, zero);
                    trailing.push(trap);
                }
            }
        }

        self.stage2(node_id, input_exec_id, trailing);

        for out in output_exec {
            if let Some((succ_id, succ_k)) = out {
                self.compile_node(succ_id, succ_k);
            }
        }
    }

    /// Stage 1 (`spec.md` §4.4): idempotent. For a pure node, ensures its
    /// single shared code block and return-address cell exist. For a
    /// non-pure node at `input_exec_id`, ensures its code block exists and
    /// builds the per-caller dispatch block that seeds every pure
    /// dependency's continuation before branching into the first of them.
    fn stage1(&mut self, node_id: Uuid, input_exec_id: usize) -> B::BasicBlock {
        let Some(node) = self.function.nodes.get(&node_id) else {
            return self.alloc_block;
        };

        if node.is_pure() {
            return self.ensure_pure_block(node_id);
        }

        if let Some(first) = self.non_pure_states.get(&node_id).and_then(|m| m.get(&input_exec_id)).filter(|s| s.stage1_done).and_then(|s| s.first_block) {
            return first;
        }

        let code_block = B::append_basic_block(self.module, self.backend_function, &format!("node_{node_id}_k{input_exec_id}"));
        let deps = dependent_pures_recursive(self.function, node_id);
        for dep in &deps {
            self.ensure_pure_block(*dep);
        }

        let first_block = if deps.is_empty() {
            code_block
        } else {
            let dispatch = B::append_basic_block(self.module, self.backend_function, &format!("dispatch_{node_id}_k{input_exec_id}"));
            for (i, dep) in deps.iter().enumerate() {
                let target = if i + 1 < deps.len() { self.pure_states[&deps[i + 1]].code_block } else { code_block };
                let addr = B::block_address(self.module, self.backend_function, target);
                let cell = self.pure_states[dep].return_addr_cell;
                B::build_store(self.module, dispatch, cell, addr);
                self.pure_states.get_mut(dep).unwrap().possible_destinations.push(target);
            }
            let first_dep_block = self.pure_states[&deps[0]].code_block;
            B::build_br(self.module, dispatch, first_dep_block);
            dispatch
        };

        let entry = self.non_pure_states.entry(node_id).or_default();
        let state = entry.entry(input_exec_id).or_default();
        state.code_block = Some(code_block);
        state.first_block = Some(first_block);
        state.stage1_done = true;
        first_block
    }

    /// Creates `node_id`'s shared code block, return-address cell, and (by
    /// immediately invoking its behavior) its instructions, if not already
    /// created. A pure node's codegen never depends on its caller, so it is
    /// filled exactly once regardless of how many non-pure nodes depend on
    /// it (`spec.md` §4.4 boundary: "a diamond of pure dependencies is
    /// compiled exactly once for its shared pure predecessor").
    fn ensure_pure_block(&mut self, node_id: Uuid) -> B::BasicBlock {
        if let Some(state) = self.pure_states.get(&node_id) {
            return state.code_block;
        }
        let code_block = B::append_basic_block(self.module, self.backend_function, &format!("pure_{node_id}"));
        let return_addr_cell = B::build_alloca(self.module, self.alloc_block, self.address_type.clone(), &format!("retaddr_{node_id}"));
        self.pure_states.insert(node_id, PureState { code_block, return_addr_cell, possible_destinations: Vec::new() });

        // Recurse into this pure node's own pure dependencies first so their
        // blocks/cells exist before we fill this one's instructions — but we
        // don't chain them here: the chain for a pure node's own upstream
        // pures is only ever built by the dispatch block of whichever
        // non-pure node's stage-1 walked this node's full `deps(N)` list
        // (already flattened and topologically ordered), so nothing further
        // is needed beyond making sure every ancestor exists.
        let deps = dependent_pures_recursive(self.function, node_id);
        for dep in &deps {
            self.ensure_pure_block(*dep);
        }

        self.stage2(node_id, 0, Vec::new());
        code_block
    }

    /// Stage 2 (`spec.md` §4.4): idempotent per `input_exec_id`. Assembles
    /// `io_values`/`io_types` from the storage cells of every data input's
    /// producer followed by this node's own output cells, then invokes the
    /// node type's `codegen`.
    fn stage2(&mut self, node_id: Uuid, input_exec_id: usize, trailing_blocks: Vec<B::BasicBlock>) {
        let is_pure = self.function.nodes[&node_id].is_pure();
        let already_done = if is_pure {
            false // stage2 for pure nodes is invoked exactly once from ensure_pure_block, which itself is idempotent.
        } else {
            self.non_pure_states.get(&node_id).and_then(|m| m.get(&input_exec_id)).map(|s| s.stage2_done).unwrap_or(false)
        };
        if already_done {
            return;
        }

        let node = &self.function.nodes[&node_id];
        let mut io_values = Vec::with_capacity(node.input_data.len() + node.output_data.len());
        let mut io_types = Vec::with_capacity(io_values.capacity());

        for (slot, input) in node.input_data.iter().enumerate() {
            match input {
                Some((peer_id, peer_slot)) => match self.output_cells.get(peer_id).and_then(|cells| cells.get(*peer_slot)) {
                    Some((cell, ty)) => {
                        io_values.push(*cell);
                        io_types.push(ty.clone());
                    }
                    None => {
                        self.diag.add_entry(
                            codes::topology::E31_MISSING_DATA_INPUT,
                            "data input slot has no producer output cell",
                            json!({ "node": node_id.to_string(), "slot": slot }),
                        );
                        let ty = node.node_type.data_inputs[slot].ty.backend_type.clone();
                        io_values.push(B::build_alloca(self.module, self.alloc_block, ty.clone(), "unconnected"));
                        io_types.push(ty);
                    }
                },
                None => {
                    self.diag.add_entry(
                        codes::topology::E31_MISSING_DATA_INPUT,
                        "data input slot is not connected",
                        json!({ "node": node_id.to_string(), "slot": slot }),
                    );
                    let ty = node.node_type.data_inputs[slot].ty.backend_type.clone();
                    io_values.push(B::build_alloca(self.module, self.alloc_block, ty.clone(), "unconnected"));
                    io_types.push(ty);
                }
            }
        }

        let own_cells = self.output_cells.get(&node_id).cloned().unwrap_or_default();
        for (cell, ty) in &own_cells {
            io_values.push(*cell);
            io_types.push(ty.clone());
        }

        let entry_block = if is_pure { self.pure_states[&node_id].code_block } else { self.non_pure_states[&node_id][&input_exec_id].code_block.unwrap() };

        let line = self.line_numbers.get(&node_id).copied().unwrap_or(0);
        let loc = B::create_debug_location(self.module, line, 0, self.debug_file.clone());

        let node_type = self.function.nodes[&node_id].node_type.clone();
        let mut ctx = crate::core::node_type::CodegenContext {
            module: &mut *self.module,
            function: self.backend_function,
            exec_input_id: input_exec_id,
            loc: Some(loc),
            io_values: &io_values,
            io_types: &io_types,
            entry_block,
            exit_blocks: &trailing_blocks,
            locals: &self.locals,
            function_data_input_count: self.function_data_input_count,
            selector_param_index: self.selector_param_index,
            selector_type: self.i32_type.clone(),
        };
        self.diag += node_type.behavior.codegen(&mut ctx);

        if is_pure {
            // no per-(node,k) state to update: tracked entirely in pure_states.
        } else {
            let state = self.non_pure_states.entry(node_id).or_default().entry(input_exec_id).or_default();
            state.stage2_done = true;
        }
    }
}

/// Assigns each node a unique 1-based debug line number (`spec.md` §4.5
/// point 3, §8 invariant 6: "a bijection over the function's node set").
/// Nodes reachable from entry along exec edges are numbered in visitation
/// order (breadth-first, `spec.md` §5 "deterministic ordering"); any
/// remaining (unreachable) nodes are appended afterward in sorted-UUID order
/// so every node still gets a line even if the graph is disconnected.
fn assign_line_numbers<B: Backend>(function: &GraphFunction<B>) -> HashMap<Uuid, u32> {
    let mut order = Vec::with_capacity(function.nodes.len());
    let mut seen = std::collections::HashSet::new();

    if let Some(entry_id) = function.entry_id {
        let mut queue = VecDeque::new();
        queue.push_back(entry_id);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let Some(node) = function.nodes.get(&id) else { continue };
            for (peer_id, _) in node.input_data.iter().flatten() {
                if !seen.contains(peer_id) {
                    queue.push_back(*peer_id);
                }
            }
            for out in node.output_exec.iter().flatten() {
                queue.push_back(out.0);
            }
        }
    }

    let mut remaining: Vec<Uuid> = function.nodes.keys().filter(|id| !seen.contains(*id)).copied().collect();
    remaining.sort();
    order.extend(remaining);

    order.into_iter().enumerate().map(|(i, id)| (id, (i + 1) as u32)).collect()
}

fn check_line_number_bijection<B: Backend>(function: &GraphFunction<B>, lines: &HashMap<Uuid, u32>) -> Diagnostics {
    let mut diag = Diagnostics::new();
    if lines.len() != function.nodes.len() {
        diag.add_entry(
            codes::model::E20_DUPLICATE_NODE_ID,
            "debug line-number assignment is not a bijection over the function's node set",
            json!({ "nodes": function.nodes.len(), "lines": lines.len() }),
        );
    }
    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::interpreter::{DebugMeta, Interpreter, Type};
    use crate::core::module::LangModule;
    use crate::core::node_instance::NodeInstance;
    use crate::core::node_type::{ConstBoolBehavior, ConstIntBehavior, IfBehavior, NodeType};
    use crate::core::types::{DataType, NamedDataType, Position};
    use std::sync::Arc;

    fn i1_type() -> DataType<Interpreter> {
        DataType::new("lang", "i1", Type::I1, DebugMeta("i1".into()))
    }
    fn i32_type() -> DataType<Interpreter> {
        DataType::new("lang", "i32", Type::I32, DebugMeta("i32".into()))
    }

    fn entry_exit_if_diamond() -> (GraphFunction<Interpreter>, i32, Interpreter, <Interpreter as Backend>::Module, <Interpreter as Backend>::Function) {
        // S1: entry -> if <- const-bool(true); if.true -> exit(0); if.false -> exit(1).
        let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");

        let entry = NodeInstance::new(f.entry_node_type(), Position::zero());
        let entry_id = entry.id;

        let cond = NodeInstance::new(
            NodeType {
                module_path: "lang".into(),
                name: "const-bool".into(),
                data_inputs: vec![],
                data_outputs: vec![NamedDataType::new("value", i1_type())],
                exec_inputs: vec![],
                exec_outputs: vec![],
                pure: true,
                data: serde_json::json!({ "value": true }),
                behavior: Arc::new(ConstBoolBehavior { value: true }),
            },
            Position::zero(),
        );
        let cond_id = cond.id;

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
        exit_true.node_type.exec_inputs = vec!["out".into()];
        exit_true.input_exec = vec![Default::default()];
        exit_true.node_type.data_inputs = vec![];
        let exit_true_id = exit_true.id;

        let mut exit_false = NodeInstance::new(f.exit_node_type(), Position::zero());
        exit_false.node_type.exec_inputs = vec!["out".into()];
        exit_false.input_exec = vec![Default::default()];
        exit_false.node_type.data_inputs = vec![];
        let exit_false_id = exit_false.id;

        // wire exec: entry -> if; if.true -> exit_true; if.false -> exit_false
        let mut entry_node = entry;
        entry_node.output_exec = vec![Some((if_id, 0))];
        let mut if_node_final = if_node;
        if_node_final.input_exec = vec![smallvec::smallvec![(entry_id, 0)]];
        if_node_final.output_exec = vec![Some((exit_true_id, 0)), Some((exit_false_id, 0))];
        exit_true.input_exec = vec![smallvec::smallvec![(if_id, 0)]];
        exit_false.input_exec = vec![smallvec::smallvec![(if_id, 1)]];

        f.add_node(entry_node);
        f.add_node(cond);
        f.add_node(if_node_final);
        f.add_node(exit_true);
        f.add_node(exit_false);
        f.set_entry(entry_id);

        let mut ctx = Interpreter::create_context();
        let mut module = Interpreter::create_module(&mut ctx, "test");
        let func = Interpreter::create_function(&mut module, "main", &[Type::I32], Type::I32);
        (f, 0, Interpreter, module, func)
    }

    #[test]
    fn s1_if_on_constant_compiles_and_runs() {
        let (f, _, _backend, mut module, func) = entry_exit_if_diamond();
        let debug_file = Interpreter::create_debug_file(&mut module, "main.chimod", "test");
        let mut fc = FunctionCompiler::new(&mut module, func, &f, Type::I32, Type::Pointer(Box::new(Type::I8)), debug_file);
        let diag = fc.compile();
        assert!(diag.success(), "{diag}");
        drop(fc);

        let result = Interpreter::jit_execute_main(module, func, &[], &[]).unwrap();
        assert_eq!(result, 0, "true branch should select exec-output 0");
    }

    #[test]
    fn line_numbers_are_a_bijection() {
        let (f, ..) = entry_exit_if_diamond();
        let lines = assign_line_numbers(&f);
        assert_eq!(lines.len(), f.nodes.len());
        let mut values: Vec<u32> = lines.values().copied().collect();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), f.nodes.len());
    }

    #[test]
    fn s3_shared_pure_dependency_compiled_once() {
        // add(const_seven, const_seven) -> exit; exactly one `pure_` block
        // should be created for the shared const-int(7) instance.
        let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main").with_data_output("r", i32_type());
        let entry = NodeInstance::new(f.entry_node_type(), Position::zero());
        let entry_id = entry.id;

        let seven = NodeInstance::new(
            NodeType {
                module_path: "lang".into(),
                name: "const-int".into(),
                data_inputs: vec![],
                data_outputs: vec![NamedDataType::new("value", i32_type())],
                exec_inputs: vec![],
                exec_outputs: vec![],
                pure: true,
                data: serde_json::json!({ "value": 7 }),
                behavior: Arc::new(ConstIntBehavior { value: 7 }),
            },
            Position::zero(),
        );
        let seven_id = seven.id;

        let add_type = NodeType {
            module_path: "test".into(),
            name: "add".into(),
            data_inputs: vec![NamedDataType::new("a", i32_type()), NamedDataType::new("b", i32_type())],
            data_outputs: vec![NamedDataType::new("sum", i32_type())],
            exec_inputs: vec!["in".into()],
            exec_outputs: vec!["out".into()],
            pure: false,
            data: serde_json::json!({}),
            behavior: Arc::new(TestAddBehavior),
        };
        let mut add = NodeInstance::new(add_type, Position::zero());
        add.input_data = vec![Some((seven_id, 0)), Some((seven_id, 0))];
        let add_id = add.id;

        let mut exit = NodeInstance::new(f.exit_node_type(), Position::zero());
        exit.input_data = vec![Some((add_id, 0))];
        let exit_id = exit.id;

        let mut entry_node = entry;
        entry_node.output_exec = vec![Some((add_id, 0))];
        add.input_exec = vec![smallvec::smallvec![(entry_id, 0)]];
        add.output_exec = vec![Some((exit_id, 0))];
        exit.input_exec = vec![smallvec::smallvec![(add_id, 0)]];

        f.add_node(entry_node);
        f.add_node(seven);
        f.add_node(add);
        f.add_node(exit);
        f.set_entry(entry_id);

        let mut ctx = Interpreter::create_context();
        let mut module = Interpreter::create_module(&mut ctx, "test");
        let func = Interpreter::create_function(&mut module, "main", &[Type::Pointer(Box::new(Type::I32)), Type::I32], Type::I32);
        let debug_file = Interpreter::create_debug_file(&mut module, "main.chimod", "test");
        let mut fc = FunctionCompiler::new(&mut module, func, &f, Type::I32, Type::Pointer(Box::new(Type::I8)), debug_file);
        let diag = fc.compile();
        assert!(diag.success(), "{diag}");
        assert_eq!(fc.pure_states.len(), 0); // drained into indirect branches by compile()
    }

    #[derive(Debug)]
    struct TestAddBehavior;
    impl crate::core::node_type::NodeBehavior<Interpreter> for TestAddBehavior {
        fn codegen(&self, ctx: &mut crate::core::node_type::CodegenContext<'_, Interpreter>) -> Diagnostics {
            let a = Interpreter::build_load(ctx.module, ctx.entry_block, ctx.io_values[0], ctx.io_types[0].clone());
            let b = Interpreter::build_load(ctx.module, ctx.entry_block, ctx.io_values[1], ctx.io_types[1].clone());
            // The reference interpreter has no native add instruction; model
            // it with insert/extract-free arithmetic isn't available either,
            // so this test behavior only exercises shared-dependency
            // plumbing, not actual arithmetic: it stores `a` through.
            let _ = b;
            Interpreter::build_store(ctx.module, ctx.entry_block, ctx.io_values[2], a);
            match ctx.exit_blocks.first() {
                Some(target) => Interpreter::build_br(ctx.module, ctx.entry_block, *target),
                None => {}
            }
            Diagnostics::new()
        }
    }
}
