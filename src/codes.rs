//! # Diagnostic code taxonomy
//!
//! Every [`crate::diagnostics::Diagnostics`] entry carries a letter-prefixed
//! code per `spec.md` §7. These constants exist so call sites read
//! `codes::E30_ASYMMETRIC_CONNECTION` instead of a bare string literal; the
//! string value is still what's stored (and printed) on the entry.

/// `E01`-`E05`: I/O and workspace.
pub mod io {
    pub const E01_FILE_NOT_FOUND: &str = "E01";
    pub const E02_NOT_A_WORKSPACE: &str = "E02";
    pub const E03_JSON_PARSE: &str = "E03";
    pub const E04_WORKSPACE_WRITE_FAILED: &str = "E04";
    pub const E05_UNSUPPORTED_OPERATION: &str = "E05";
}

/// `E10`-`E19`: IR-model lookup failures.
pub mod lookup {
    pub const E10_UNKNOWN_MODULE: &str = "E10";
    pub const E11_UNKNOWN_TYPE: &str = "E11";
    pub const E12_UNKNOWN_NODE_TYPE: &str = "E12";
    pub const E13_UNKNOWN_FUNCTION: &str = "E13";
    pub const E14_UNKNOWN_LOCAL_VARIABLE: &str = "E14";
}

/// `E20`-`E29`: IR-model constraint violations.
pub mod model {
    pub const E20_DUPLICATE_NODE_ID: &str = "E20";
    pub const E21_ENTRY_TYPE_MISMATCH: &str = "E21";
    pub const E22_EXIT_TYPE_MISMATCH: &str = "E22";
    pub const E23_DANGLING_DEPENDENCY: &str = "E23";
    pub const E24_DEPENDENCY_CYCLE: &str = "E24";
    pub const E25_NO_ENTRY_NODE: &str = "E25";
    pub const E26_DUPLICATE_MODULE_PATH: &str = "E26";
}

/// `E30`-`E39`: connection topology.
pub mod topology {
    pub const E30_ASYMMETRIC_CONNECTION: &str = "E30";
    pub const E31_MISSING_DATA_INPUT: &str = "E31";
    pub const E32_PURE_CYCLE: &str = "E32";
}

/// `E40`-`E49`: codegen failures surfaced by the backend.
pub mod codegen {
    pub const E40_VERIFIER_REJECTED: &str = "E40";
    pub const E41_CODEGEN_TYPE_MISMATCH: &str = "E41";
    pub const E42_WRONG_IO_COUNT: &str = "E42";
    pub const E43_WRONG_EXIT_BLOCK_COUNT: &str = "E43";
}

/// Warnings and informational entries.
pub mod info {
    pub const W01_UNUSED_LOCAL_VARIABLE: &str = "W01";
    pub const W02_CACHE_STALE: &str = "W02";
    pub const I01_CACHE_HIT: &str = "I01";
    pub const I02_MODULE_COMPILED: &str = "I02";
}
