//! Options controlling schema compilation.

/// Options passed to [`super::compile_with_options`].
#[derive(Clone, Copy, Debug)]
pub struct CompileOptions {
    /// Whether to check the schema document against the built-in
    /// metaschema before compiling it. Only takes effect when the
    /// `metaschema` Cargo feature is enabled; ignored otherwise.
    pub check_metaschema: bool,
    /// Whether to emit a `tracing::warn!` for each schema object member
    /// whose key is not one of the draft-4 keywords this compiler
    /// recognises. These members are otherwise silently ignored, as
    /// draft-4 requires (unknown keywords are not validation failures).
    pub log_unknown_keywords: bool,
}

impl Default for CompileOptions {
    fn default() -> CompileOptions {
        CompileOptions { check_metaschema: cfg!(feature = "metaschema"), log_unknown_keywords: false }
    }
}
