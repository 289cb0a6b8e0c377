//! # `chigc` — the chigraph core compiler CLI
//!
//! A thin `clap`-derived front end over [`graphy`]: each subcommand loads a
//! [`Workspace`], drives one core operation (`workspace::load_module`,
//! `codegen::module_compiler::compile`, `Backend::jit_execute_main`), prints
//! the resulting [`Diagnostics::dump`], and exits with
//! [`Diagnostics::exit_code`] — exactly the "exit code 0 on success, 1 on
//! any E-severity Result" contract of `spec.md` §6 (SPEC_FULL A7).
//!
//! This binary is pinned to [`Interpreter`], the one `Backend` shipped with
//! this crate; a real deployment would monomorphize the same subcommands
//! over an LLVM-backed `Backend` impl without touching `graphy`'s library
//! code (that's the point of the trait).

use clap::{Parser, Subcommand};
use graphy::backend::interpreter::Interpreter;
use graphy::backend::Backend;
use graphy::codegen::module_compiler;
use graphy::codes;
use graphy::diagnostics::Diagnostics;
use graphy::mangle::mangle;
use graphy::{Context, Workspace};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chigc")]
#[command(about = "Chigraph core compiler — graph IR to native code via a pluggable backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Workspace root. If omitted, discovered by walking up from the
    /// current directory looking for a `.chigraphroot` marker
    /// (`Workspace::discover`).
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new workspace skeleton (`.chigraphroot`, `src/`, `lib/`).
    Init {
        /// Directory to initialize (created if missing).
        path: PathBuf,
    },
    /// Compile a module and every transitive dependency; prints textual IR
    /// (or writes bitcode to `--out`) on success.
    Compile {
        /// Dotted/slashed module path under `src/`, e.g. `test/main`.
        module: String,
        /// Write the compiled module's bitcode here instead of printing IR text.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compile a module, then JIT-execute its `main` function.
    Run {
        /// Module path to compile and run.
        module: String,
        /// Arguments passed through as `argv` to the JIT-executed `main`.
        args: Vec<String>,
    },
    /// JIT-execute `main` directly out of a bitcode file (skips graph
    /// loading and compilation entirely).
    Interpret {
        /// Path to a `.bc` file previously produced by `compile --out`.
        bitcode: PathBuf,
        /// Arguments passed through as `argv`.
        args: Vec<String>,
    },
    /// Fetch a dependency module from a package source. Not implemented by
    /// this core — package resolution and network I/O are an external
    /// collaborator (`spec.md` §1 Non-goals); reports an unsupported-operation
    /// diagnostic rather than silently no-op-ing.
    Get {
        /// The dependency module path that was requested.
        dependency: String,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Init { path } => cmd_init(&path),
        Command::Compile { module, out } => with_workspace(&cli.workspace, |ws| cmd_compile(ws, &module, out.as_deref())),
        Command::Run { module, args } => with_workspace(&cli.workspace, |ws| cmd_run(ws, &module, &args)),
        Command::Interpret { bitcode, args } => cmd_interpret(&bitcode, &args),
        Command::Get { dependency } => cmd_get(&dependency),
    }
}

/// Resolves the workspace (either `--workspace` or discovery from the
/// current directory) before running `body`, reporting `E02` if neither
/// locates one.
fn with_workspace(explicit: &Option<PathBuf>, body: impl FnOnce(&Workspace) -> Diagnostics) -> i32 {
    let ws = match explicit {
        Some(root) => Workspace::discover(root),
        None => std::env::current_dir().map_err(Into::into).and_then(|cwd| Workspace::discover(cwd)),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(e) => {
            let mut diag = Diagnostics::new();
            diag.add_entry(codes::io::E02_NOT_A_WORKSPACE, format!("no chigraph workspace found: {e}"), serde_json::json!({}));
            print!("{}", diag.dump());
            return diag.exit_code();
        }
    };
    let diag = body(&ws);
    print!("{}", diag.dump());
    diag.exit_code()
}

fn cmd_init(path: &std::path::Path) -> i32 {
    let mut diag = Diagnostics::new();
    match Workspace::init(path) {
        Ok(_) => {
            diag.add(codes::info::I02_MODULE_COMPILED, format!("initialized workspace at `{}`", path.display()));
        }
        Err(e) => {
            diag.add_entry(codes::io::E04_WORKSPACE_WRITE_FAILED, format!("failed to initialize workspace: {e}"), serde_json::json!({ "path": path.display().to_string() }));
        }
    }
    print!("{}", diag.dump());
    diag.exit_code()
}

fn cmd_compile(ws: &Workspace, module: &str, out: Option<&std::path::Path>) -> Diagnostics {
    let mut ctx: Context<Interpreter> = Context::new();
    let mut diag = ws.load_module(&mut ctx, module);
    if !diag.success() {
        return diag;
    }

    let cache = ws.module_cache();
    let (compiled, compile_diag) = module_compiler::compile(&mut ctx, module, &cache);
    diag += compile_diag;
    let Some(backend_module) = compiled else {
        return diag;
    };

    match out {
        Some(path) => {
            let bytes = Interpreter::write_bitcode(&backend_module);
            if let Err(e) = std::fs::write(path, bytes) {
                diag.add_entry(codes::io::E04_WORKSPACE_WRITE_FAILED, format!("failed to write `{}`: {e}", path.display()), serde_json::json!({}));
            }
        }
        None => {
            println!("{}", Interpreter::print_module_to_string(&backend_module));
        }
    }
    diag
}

fn cmd_run(ws: &Workspace, module: &str, args: &[String]) -> Diagnostics {
    let mut ctx: Context<Interpreter> = Context::new();
    let mut diag = ws.load_module(&mut ctx, module);
    if !diag.success() {
        return diag;
    }

    let cache = ws.module_cache();
    let (compiled, compile_diag) = module_compiler::compile(&mut ctx, module, &cache);
    diag += compile_diag;
    let Some(backend_module) = compiled else {
        return diag;
    };

    let symbol = mangle(module, "main");
    let Some(function) = Interpreter::get_function(&backend_module, &symbol) else {
        diag.add_entry(codes::lookup::E13_UNKNOWN_FUNCTION, format!("module `{module}` defines no `main` function"), serde_json::json!({ "module": module }));
        return diag;
    };

    match Interpreter::jit_execute_main(backend_module, function, args, &[]) {
        Ok(code) => diag.add(codes::info::I02_MODULE_COMPILED, format!("`{module}` exited with code {code}")),
        Err(e) => diag.add_entry(codes::codegen::E40_VERIFIER_REJECTED, format!("JIT execution of `{module}` failed: {e}"), serde_json::json!({})),
    }
    diag
}

fn cmd_interpret(bitcode: &std::path::Path, args: &[String]) -> i32 {
    let mut diag = Diagnostics::new();
    let bytes = match std::fs::read(bitcode) {
        Ok(bytes) => bytes,
        Err(e) => {
            diag.add_entry(codes::io::E01_FILE_NOT_FOUND, format!("could not read `{}`: {e}", bitcode.display()), serde_json::json!({}));
            print!("{}", diag.dump());
            return diag.exit_code();
        }
    };

    let mut ctx: Context<Interpreter> = Context::new();
    let module = match Interpreter::parse_bitcode(ctx.backend_context_mut(), &bytes) {
        Ok(module) => module,
        Err(e) => {
            diag.add_entry(codes::io::E03_JSON_PARSE, format!("could not parse bitcode `{}`: {e}", bitcode.display()), serde_json::json!({}));
            print!("{}", diag.dump());
            return diag.exit_code();
        }
    };

    // `mangle("", "main") == "main"` (spec.md's documented special case):
    // standalone bitcode produced outside a module context names its entry
    // point `main` directly.
    let symbol = mangle("", "main");
    let Some(function) = Interpreter::get_function(&module, &symbol) else {
        diag.add_entry(codes::lookup::E13_UNKNOWN_FUNCTION, format!("`{}` defines no `main` function", bitcode.display()), serde_json::json!({}));
        print!("{}", diag.dump());
        return diag.exit_code();
    };

    match Interpreter::jit_execute_main(module, function, args, &[]) {
        Ok(code) => diag.add(codes::info::I02_MODULE_COMPILED, format!("exited with code {code}")),
        Err(e) => diag.add_entry(codes::codegen::E40_VERIFIER_REJECTED, format!("JIT execution failed: {e}"), serde_json::json!({})),
    }
    print!("{}", diag.dump());
    diag.exit_code()
}

fn cmd_get(dependency: &str) -> i32 {
    let mut diag = Diagnostics::new();
    diag.add_entry(
        codes::io::E05_UNSUPPORTED_OPERATION,
        format!("fetching `{dependency}` is not supported by this core; package resolution is an external collaborator"),
        serde_json::json!({ "dependency": dependency }),
    );
    print!("{}", diag.dump());
    diag.exit_code()
}
