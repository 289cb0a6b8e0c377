//! # Reference interpreter backend
//!
//! A dependency-free [`Backend`] implementation: instead of emitting LLVM
//! IR and JIT-compiling it, `Interpreter` builds a small in-memory
//! instruction list per basic block and walks it directly. It exists so the
//! core (`core`, `analysis`, `codegen`) can be exercised end-to-end
//! (`spec.md` §8 scenarios S1-S6) without a dependency on `llvm-sys`, which
//! this crate's stack does not carry.
//!
//! "Bitcode" here is just `serde_json`-serialized [`Module`] — there is no
//! real bitcode format to write, and this crate already depends on
//! `serde_json` for the graph schema (`spec.md` §6).

use super::Backend;
use std::collections::HashMap;

/// Backend types for the reference interpreter. Zero-sized; all state lives
/// in the `Module`/`Context` values threaded through the `Backend` methods.
#[derive(Debug, Default)]
pub struct Interpreter;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Type {
    I1,
    I8,
    I32,
    I64,
    Float,
    Double,
    Pointer(Box<Type>),
    Struct(Vec<Type>),
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Value {
    ConstInt(i64),
    /// `f64::to_bits`, so the handle can be `Eq`/`Hash`.
    ConstFloat(u64),
    Param(u32, u32),
    /// `(function, block, instruction)` — the result of a non-terminator instruction.
    Local(u32, u32, u32),
    /// The address of a block, for `build_indirect_br` (`jumpBackInst`).
    BlockAddr(u32, u32),
}

impl Value {
    pub fn const_float(v: f64) -> Self {
        Value::ConstFloat(v.to_bits())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DebugMeta(pub String);

/// `(function index, block index)`.
pub type BasicBlock = (u32, u32);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
enum Instr {
    Alloca { ty: Type },
    Load { ptr: Value, ty: Type },
    Store { ptr: Value, value: Value },
    Call { function: u32, args: Vec<Value> },
    Phi { ty: Type, incoming: Vec<(Value, BasicBlock)> },
    Undef { ty: Type },
    ExtractValue { aggregate: Value, field_index: usize },
    InsertValue { aggregate: Value, field_index: usize, value: Value },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
enum Terminator {
    Br(BasicBlock),
    CondBr { cond: Value, then_block: BasicBlock, else_block: BasicBlock },
    Switch { value: Value, default: BasicBlock, cases: Vec<(i64, BasicBlock)> },
    IndirectBr { address: Value, possible: Vec<BasicBlock> },
    Ret(Value),
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Block {
    name: String,
    instrs: Vec<Instr>,
    terminator: Option<Terminator>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Function {
    name: String,
    param_types: Vec<Type>,
    #[allow(dead_code)]
    return_type: Type,
    blocks: Vec<Block>,
}

/// A compiled module: a flat list of functions, each a flat list of blocks.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Module {
    name: String,
    functions: Vec<Function>,
    function_by_name: HashMap<String, u32>,
}

#[derive(Debug, Default)]
pub struct Context;

impl Backend for Interpreter {
    type Context = Context;
    type Module = Module;
    type Function = u32;
    type BasicBlock = BasicBlock;
    type Value = Value;
    type Type = Type;
    type DebugMeta = DebugMeta;

    fn create_context() -> Self::Context {
        Context
    }

    fn create_module(_ctx: &mut Self::Context, name: &str) -> Self::Module {
        Module { name: name.to_string(), functions: Vec::new(), function_by_name: HashMap::new() }
    }

    fn type_i1(_ctx: &Self::Context) -> Self::Type {
        Type::I1
    }
    fn type_i8(_ctx: &Self::Context) -> Self::Type {
        Type::I8
    }
    fn type_i32(_ctx: &Self::Context) -> Self::Type {
        Type::I32
    }
    fn type_i64(_ctx: &Self::Context) -> Self::Type {
        Type::I64
    }
    fn type_float(_ctx: &Self::Context) -> Self::Type {
        Type::Float
    }
    fn type_double(_ctx: &Self::Context) -> Self::Type {
        Type::Double
    }
    fn type_pointer(inner: Self::Type) -> Self::Type {
        Type::Pointer(Box::new(inner))
    }
    fn type_struct(_ctx: &Self::Context, fields: &[Self::Type]) -> Self::Type {
        Type::Struct(fields.to_vec())
    }

    fn create_function(module: &mut Self::Module, name: &str, param_types: &[Self::Type], return_type: Self::Type) -> Self::Function {
        let idx = module.functions.len() as u32;
        module.functions.push(Function {
            name: name.to_string(),
            param_types: param_types.to_vec(),
            return_type,
            blocks: Vec::new(),
        });
        module.function_by_name.insert(name.to_string(), idx);
        idx
    }

    fn get_function(module: &Self::Module, name: &str) -> Option<Self::Function> {
        module.function_by_name.get(name).copied()
    }

    fn append_basic_block(module: &mut Self::Module, function: Self::Function, name: &str) -> Self::BasicBlock {
        let func = &mut module.functions[function as usize];
        let idx = func.blocks.len() as u32;
        func.blocks.push(Block { name: name.to_string(), ..Default::default() });
        (function, idx)
    }

    fn function_param(_module: &Self::Module, function: Self::Function, index: usize) -> Self::Value {
        Value::Param(function, index as u32)
    }

    fn build_alloca(module: &mut Self::Module, block: Self::BasicBlock, ty: Self::Type, _name: &str) -> Self::Value {
        push_instr(module, block, Instr::Alloca { ty })
    }

    fn build_load(module: &mut Self::Module, block: Self::BasicBlock, ptr: Self::Value, ty: Self::Type) -> Self::Value {
        push_instr(module, block, Instr::Load { ptr, ty })
    }

    fn build_store(module: &mut Self::Module, block: Self::BasicBlock, ptr: Self::Value, value: Self::Value) {
        block_mut(module, block).instrs.push(Instr::Store { ptr, value });
    }

    fn build_br(module: &mut Self::Module, block: Self::BasicBlock, target: Self::BasicBlock) {
        block_mut(module, block).terminator = Some(Terminator::Br(target));
    }

    fn build_cond_br(module: &mut Self::Module, block: Self::BasicBlock, cond: Self::Value, then_block: Self::BasicBlock, else_block: Self::BasicBlock) {
        block_mut(module, block).terminator = Some(Terminator::CondBr { cond, then_block, else_block });
    }

    fn build_switch(module: &mut Self::Module, block: Self::BasicBlock, value: Self::Value, default: Self::BasicBlock, cases: &[(i64, Self::BasicBlock)]) {
        block_mut(module, block).terminator = Some(Terminator::Switch { value, default, cases: cases.to_vec() });
    }

    fn build_call(module: &mut Self::Module, block: Self::BasicBlock, function: Self::Function, args: &[Self::Value]) -> Self::Value {
        push_instr(module, block, Instr::Call { function, args: args.to_vec() })
    }

    fn build_indirect_br(module: &mut Self::Module, block: Self::BasicBlock, address: Self::Value, possible_destinations: &[Self::BasicBlock]) {
        block_mut(module, block).terminator = Some(Terminator::IndirectBr { address, possible: possible_destinations.to_vec() });
    }

    fn build_ret(module: &mut Self::Module, block: Self::BasicBlock, value: Self::Value) {
        block_mut(module, block).terminator = Some(Terminator::Ret(value));
    }

    fn build_const_int(_module: &mut Self::Module, _ty: Self::Type, value: i64) -> Self::Value {
        Value::ConstInt(value)
    }

    fn build_const_float(_module: &mut Self::Module, _ty: Self::Type, value: f64) -> Self::Value {
        Value::const_float(value)
    }

    fn build_phi(module: &mut Self::Module, block: Self::BasicBlock, ty: Self::Type, incoming: &[(Self::Value, Self::BasicBlock)]) -> Self::Value {
        push_instr(module, block, Instr::Phi { ty, incoming: incoming.to_vec() })
    }

    fn block_address(_module: &mut Self::Module, function: Self::Function, block: Self::BasicBlock) -> Self::Value {
        debug_assert_eq!(function, block.0);
        Value::BlockAddr(block.0, block.1)
    }

    fn build_undef(module: &mut Self::Module, block: Self::BasicBlock, ty: Self::Type) -> Self::Value {
        push_instr(module, block, Instr::Undef { ty })
    }

    fn build_extract_value(module: &mut Self::Module, block: Self::BasicBlock, aggregate: Self::Value, field_index: usize) -> Self::Value {
        push_instr(module, block, Instr::ExtractValue { aggregate, field_index })
    }

    fn build_insert_value(module: &mut Self::Module, block: Self::BasicBlock, aggregate: Self::Value, field_index: usize, value: Self::Value) -> Self::Value {
        push_instr(module, block, Instr::InsertValue { aggregate, field_index, value })
    }

    fn print_module_to_string(module: &Self::Module) -> String {
        let mut out = format!("; module {}\n", module.name);
        for func in &module.functions {
            out.push_str(&format!("define {}({:?}) {{\n", func.name, func.param_types));
            for (bi, block) in func.blocks.iter().enumerate() {
                out.push_str(&format!("{bi} ({}):\n", block.name));
                for instr in &block.instrs {
                    out.push_str(&format!("  {instr:?}\n"));
                }
                out.push_str(&format!("  {:?}\n", block.terminator));
            }
            out.push_str("}\n");
        }
        out
    }

    fn write_bitcode(module: &Self::Module) -> Vec<u8> {
        serde_json::to_vec(module).unwrap_or_default()
    }

    fn parse_bitcode(_ctx: &mut Self::Context, bytes: &[u8]) -> Result<Self::Module, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }

    fn link_modules(dest: &mut Self::Module, src: Self::Module) -> Result<(), String> {
        let offset = dest.functions.len() as u32;
        for (name, idx) in &src.function_by_name {
            if dest.function_by_name.contains_key(name) {
                return Err(format!("duplicate symbol during link: {name}"));
            }
            dest.function_by_name.insert(name.clone(), idx + offset);
        }
        dest.functions.extend(src.functions);
        Ok(())
    }

    fn create_debug_compile_unit(_module: &mut Self::Module, file_name: &str, directory: &str) -> Self::DebugMeta {
        DebugMeta(format!("compile_unit:{directory}/{file_name}"))
    }

    fn create_debug_file(_module: &mut Self::Module, file_name: &str, directory: &str) -> Self::DebugMeta {
        DebugMeta(format!("file:{directory}/{file_name}"))
    }

    fn create_debug_subroutine_type(_module: &mut Self::Module, param_debug_types: &[Self::DebugMeta]) -> Self::DebugMeta {
        let joined = param_debug_types.iter().map(|d| d.0.as_str()).collect::<Vec<_>>().join(",");
        DebugMeta(format!("subroutine_type:({joined})"))
    }

    fn create_debug_location(_module: &mut Self::Module, line: u32, column: u32, scope: Self::DebugMeta) -> Self::DebugMeta {
        DebugMeta(format!("loc:{line}:{column}:{}", scope.0))
    }

    fn verify_module(module: &Self::Module) -> Result<(), String> {
        for func in &module.functions {
            for block in &func.blocks {
                let Some(term) = &block.terminator else {
                    return Err(format!("block `{}` in function `{}` has no terminator", block.name, func.name));
                };
                let targets: Vec<BasicBlock> = match term {
                    Terminator::Br(b) => vec![*b],
                    Terminator::CondBr { then_block, else_block, .. } => vec![*then_block, *else_block],
                    Terminator::Switch { default, cases, .. } => {
                        let mut v = vec![*default];
                        v.extend(cases.iter().map(|(_, b)| *b));
                        v
                    }
                    Terminator::IndirectBr { possible, .. } => possible.clone(),
                    Terminator::Ret(_) => Vec::new(),
                };
                for (fi, bi) in targets {
                    if module.functions.get(fi as usize).and_then(|f| f.blocks.get(bi as usize)).is_none() {
                        return Err(format!("branch target ({fi}, {bi}) does not exist"));
                    }
                }
            }
        }
        Ok(())
    }

    fn jit_execute_main(module: Self::Module, function: Self::Function, argv: &[String], _envp: &[String]) -> Result<i32, String> {
        Self::verify_module(&module)?;
        let func = module.functions.get(function as usize).ok_or("unknown function")?;
        let args = func
            .param_types
            .iter()
            .enumerate()
            .map(|(i, _)| if i == 0 { RuntimeValue::Int(argv.len() as i64) } else { RuntimeValue::Int(0) })
            .collect();
        let mut memory = Vec::new();
        match execute(&module, function, args, &mut memory, 0)? {
            RuntimeValue::Int(i) => Ok(i as i32),
            RuntimeValue::Float(f) => Ok(f as i32),
            other => Err(format!("main returned non-numeric value: {other:?}")),
        }
    }
}

fn push_instr(module: &mut Module, block: BasicBlock, instr: Instr) -> Value {
    let b = block_mut(module, block);
    let idx = b.instrs.len() as u32;
    b.instrs.push(instr);
    Value::Local(block.0, block.1, idx)
}

fn block_mut(module: &mut Module, block: BasicBlock) -> &mut Block {
    &mut module.functions[block.0 as usize].blocks[block.1 as usize]
}

#[derive(Debug, Clone)]
enum RuntimeValue {
    Int(i64),
    Float(f64),
    Block(u32, u32),
    Struct(Vec<RuntimeValue>),
}

fn undef_of(ty: &Type) -> RuntimeValue {
    match ty {
        Type::Struct(fields) => RuntimeValue::Struct(fields.iter().map(undef_of).collect()),
        Type::Float | Type::Double => RuntimeValue::Float(0.0),
        _ => RuntimeValue::Int(0),
    }
}

fn eval(frame: &HashMap<Value, RuntimeValue>, value: &Value) -> Result<RuntimeValue, String> {
    match value {
        Value::ConstInt(i) => Ok(RuntimeValue::Int(*i)),
        Value::ConstFloat(bits) => Ok(RuntimeValue::Float(f64::from_bits(*bits))),
        Value::BlockAddr(f, b) => Ok(RuntimeValue::Block(*f, *b)),
        Value::Param(..) | Value::Local(..) => {
            frame.get(value).cloned().ok_or_else(|| format!("use of undefined value {value:?}"))
        }
    }
}

fn truthy(v: &RuntimeValue) -> bool {
    matches!(v, RuntimeValue::Int(i) if *i != 0)
}

fn execute(module: &Module, func_idx: u32, args: Vec<RuntimeValue>, memory: &mut Vec<RuntimeValue>, depth: u32) -> Result<RuntimeValue, String> {
    if depth > 10_000 {
        return Err("interpreter recursion limit exceeded".to_string());
    }
    let func = module.functions.get(func_idx as usize).ok_or("call to unknown function")?;
    let mut frame: HashMap<Value, RuntimeValue> = HashMap::new();
    for (i, a) in args.into_iter().enumerate() {
        frame.insert(Value::Param(func_idx, i as u32), a);
    }

    let mut block_idx = 0u32;
    let mut prev_block: Option<BasicBlock> = None;

    loop {
        let block = func.blocks.get(block_idx as usize).ok_or("jump to unknown block")?;

        for (instr_idx, instr) in block.instrs.iter().enumerate() {
            let key = Value::Local(func_idx, block_idx, instr_idx as u32);
            let result = match instr {
                Instr::Alloca { .. } => {
                    let addr = memory.len();
                    memory.push(RuntimeValue::Int(0));
                    RuntimeValue::Int(addr as i64)
                }
                Instr::Load { ptr, .. } => {
                    let addr = as_addr(&eval(&frame, ptr)?)?;
                    memory.get(addr).cloned().ok_or("load from invalid address")?
                }
                Instr::Store { ptr, value } => {
                    let addr = as_addr(&eval(&frame, ptr)?)?;
                    let v = eval(&frame, value)?;
                    *memory.get_mut(addr).ok_or("store to invalid address")? = v;
                    continue;
                }
                Instr::Call { function, args } => {
                    let evaluated: Result<Vec<_>, String> = args.iter().map(|a| eval(&frame, a)).collect();
                    execute(module, *function, evaluated?, memory, depth + 1)?
                }
                Instr::Phi { incoming, .. } => {
                    let prev = prev_block.ok_or("phi reached with no predecessor")?;
                    let (val, _) = incoming
                        .iter()
                        .find(|(_, bb)| *bb == prev)
                        .ok_or("phi has no incoming value for predecessor block")?;
                    eval(&frame, val)?
                }
                Instr::Undef { ty } => undef_of(ty),
                Instr::ExtractValue { aggregate, field_index } => match eval(&frame, aggregate)? {
                    RuntimeValue::Struct(fields) => {
                        fields.get(*field_index).cloned().ok_or("extractvalue field index out of range")?
                    }
                    other => return Err(format!("extractvalue on non-aggregate value {other:?}")),
                },
                Instr::InsertValue { aggregate, field_index, value } => match eval(&frame, aggregate)? {
                    RuntimeValue::Struct(mut fields) => {
                        let v = eval(&frame, value)?;
                        *fields.get_mut(*field_index).ok_or("insertvalue field index out of range")? = v;
                        RuntimeValue::Struct(fields)
                    }
                    other => return Err(format!("insertvalue on non-aggregate value {other:?}")),
                },
            };
            frame.insert(key, result);
        }

        match block.terminator.as_ref().ok_or("block has no terminator")? {
            Terminator::Ret(v) => return eval(&frame, v),
            Terminator::Br(target) => {
                prev_block = Some((func_idx, block_idx));
                block_idx = target.1;
            }
            Terminator::CondBr { cond, then_block, else_block } => {
                let taken = truthy(&eval(&frame, cond)?);
                prev_block = Some((func_idx, block_idx));
                block_idx = if taken { then_block.1 } else { else_block.1 };
            }
            Terminator::Switch { value, default, cases } => {
                let v = match eval(&frame, value)? {
                    RuntimeValue::Int(i) => i,
                    _ => return Err("switch on non-integer value".to_string()),
                };
                let target = cases.iter().find(|(c, _)| *c == v).map(|(_, bb)| bb.1).unwrap_or(default.1);
                prev_block = Some((func_idx, block_idx));
                block_idx = target;
            }
            Terminator::IndirectBr { address, .. } => {
                let target = match eval(&frame, address)? {
                    RuntimeValue::Block(f, b) if f == func_idx => b,
                    RuntimeValue::Block(..) => return Err("indirect branch across functions".to_string()),
                    _ => return Err("indirect branch on non-block-address value".to_string()),
                };
                prev_block = Some((func_idx, block_idx));
                block_idx = target;
            }
        }
    }
}

fn as_addr(v: &RuntimeValue) -> Result<usize, String> {
    match v {
        RuntimeValue::Int(i) => Ok(*i as usize),
        other => Err(format!("expected a pointer value, found {other:?}")),
    }
}
