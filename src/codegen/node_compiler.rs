//! # Dependent-pure enumeration (`spec.md` §4.3)
//!
//! `deps(N)`: the ordered sequence of pure node instances reachable
//! backward through `inputData` that a non-pure instance `N` transitively
//! needs, in topological order (each node after all of its own pure
//! dependencies), duplicates elided on first emission.
//!
//! The per-node stage-1/stage-2 state machine of C7 is implemented as part
//! of [`crate::codegen::function_compiler::FunctionCompiler`] rather than as
//! a separate type: its state (shared pure-node blocks, output-value
//! cells) is inherently per-*function*, not per-node — a pure node shared
//! by two callers needs ONE code block visible to both, which a
//! standalone-per-node compiler can't own. See `DESIGN.md`.

use crate::backend::Backend;
use crate::core::graph_function::GraphFunction;
use std::collections::HashSet;
use uuid::Uuid;

/// Per-pure-node compile state (`spec.md` §4.4 "Pure-back-edge handling").
/// A pure node is stage-1'd (and its single code block filled) exactly once
/// regardless of how many non-pure callers share it as a dependency; the
/// `return_addr_cell`/`possible_destinations` pair is the `jumpBackInst`
/// mechanism that lets that one block resume at whichever caller entered it.
#[derive(Debug)]
pub struct PureState<B: Backend> {
    pub code_block: B::BasicBlock,
    pub return_addr_cell: B::Value,
    /// Every distinct continuation block some caller has ever registered;
    /// folded into the indirect branch's destination list once, at the end
    /// of `FunctionCompiler::compile` (`spec.md` §4.4: the terminator is an
    /// indirect branch restricted to its possible destinations).
    pub possible_destinations: Vec<B::BasicBlock>,
}

/// Per-`(non-pure node, input_exec_id)` compile state. Unlike a pure node, a
/// non-pure node's code block is never shared across `input_exec_id`s: the
/// built-in `exit` behavior, for instance, bakes `exec_input_id` into the
/// value it returns, so two exec inputs of the same instance legitimately
/// compile to different code.
#[derive(Debug)]
pub struct NonPureState<B: Backend> {
    /// The block stage-2 fills with this node's own code.
    pub code_block: Option<B::BasicBlock>,
    /// What stage-1 returns: `code_block` when this node has no pure data
    /// dependencies, or a dedicated per-caller "dispatch" block that
    /// registers continuations with each pure dependency before branching
    /// into the first of them (`spec.md` §4.4).
    pub first_block: Option<B::BasicBlock>,
    pub stage1_done: bool,
    pub stage2_done: bool,
}

/// Hand-written rather than `#[derive(Default)]`: a derived impl would add
/// an unwanted `B: Default` bound (derive ignores that every field here is
/// already `Default` regardless of `B`).
impl<B: Backend> Default for NonPureState<B> {
    fn default() -> Self {
        Self { code_block: None, first_block: None, stage1_done: false, stage2_done: false }
    }
}

/// `deps(N)` per `spec.md` §4.3: computed once per `(function, start-node)`
/// by the caller (the function compiler caches per node, see
/// `FunctionCompiler::dependent_pures`).
pub fn dependent_pures_recursive<B: Backend>(f: &GraphFunction<B>, start: Uuid) -> Vec<Uuid> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    visit(f, start, &mut seen, &mut order);
    order
}

fn visit<B: Backend>(f: &GraphFunction<B>, id: Uuid, seen: &mut HashSet<Uuid>, order: &mut Vec<Uuid>) {
    let Some(node) = f.nodes.get(&id) else { return };
    for (peer_id, _) in node.input_data.iter().flatten() {
        let Some(peer) = f.nodes.get(peer_id) else { continue };
        if peer.is_pure() && seen.insert(*peer_id) {
            visit(f, *peer_id, seen, order);
            order.push(*peer_id);
        }
    }
}
