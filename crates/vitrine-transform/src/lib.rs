//! Source Transformer: author-written example source → compiled module.
//!
//! ```text
//! source text → lex → parse → resolve imports → lower markup → CompiledModule
//! ```
//!
//! The transform is a pure function of the source text and the import map.
//! Failures (malformed syntax, unresolved imports, unknown exports) come
//! back as [`CompileErrors`] — execution is never attempted for a module
//! that does not transform.

mod emit;
mod imports;
mod line_map;

pub use imports::{ImportMap, ModuleTarget};
pub use line_map::{LineMap, RewriteSpan, TranslatedPos, PRELUDE_LINES};

use sha2::{Digest, Sha256};
use tracing::debug;
use vitrine_parser::parse_source;
use vitrine_types::{CompileError, CompileErrors, ErrorCode, SourceFile};

/// One resolved import of a compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    /// The bare specifier as written (`"vane"`).
    pub specifier: String,
    /// The resolved specifier the realm registry is keyed by.
    pub resolved: String,
    /// Names bound from this module.
    pub names: Vec<String>,
}

/// The directly executable form of a source document.
///
/// Derived deterministically; superseded wholesale on every recompilation —
/// it has no identity beyond the fingerprint of the source it came from.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    /// Executable module text (plain subset — no markup).
    pub text: String,
    /// Compiled-position → original-position table.
    pub line_map: LineMap,
    /// Imports, in declaration order.
    pub imports: Vec<ResolvedImport>,
    /// SHA-256 hex fingerprint of the source text this was derived from.
    pub fingerprint: String,
}

/// Hex SHA-256 of a source text. The pipeline uses this to skip a
/// compile/run cycle when a settled edit left the text unchanged.
pub fn fingerprint(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Transform source text into a [`CompiledModule`].
pub fn transform(source: &str, imports: &ImportMap) -> Result<CompiledModule, CompileErrors> {
    let source_file = SourceFile::new("playground", source);
    let result = parse_source(&source_file);
    if result.errors.has_errors() {
        debug!(
            target: "vitrine::transform",
            errors = result.errors.total_errors,
            "transform failed in parse"
        );
        return Err(result.errors);
    }
    let module = match result.module {
        Some(module) => module,
        None => {
            let mut errors = CompileErrors::empty();
            errors.push_error(CompileError::new(
                ErrorCode::UNEXPECTED_TOKEN,
                "empty parse result",
                vitrine_types::Span::point(1, 1),
                source_file.line(1).unwrap_or(""),
            ));
            return Err(errors);
        }
    };

    // Resolve bare imports before emitting; an unresolved specifier or an
    // unknown export is a compile failure with no stack frames.
    let mut errors = CompileErrors::empty();
    let mut resolved = Vec::with_capacity(module.imports.len());
    let mut resolved_specs = Vec::with_capacity(module.imports.len());
    for import in &module.imports {
        match imports.resolve(&import.specifier) {
            Some(target) => {
                for name in &import.names {
                    if !target.exports.iter().any(|e| e == &name.name) {
                        errors.push_error(CompileError::new(
                            ErrorCode::UNKNOWN_EXPORT,
                            format!(
                                "\"{}\" has no export named '{}'",
                                import.specifier, name.name
                            ),
                            name.span,
                            source_file.line(name.span.start_line).unwrap_or(""),
                        ));
                    }
                }
                resolved.push(ResolvedImport {
                    specifier: import.specifier.clone(),
                    resolved: target.resolved.clone(),
                    names: import.names.iter().map(|n| n.name.clone()).collect(),
                });
                resolved_specs.push(target.resolved.clone());
            }
            None => {
                errors.push_error(CompileError::new(
                    ErrorCode::UNRESOLVED_IMPORT,
                    format!("cannot resolve import \"{}\"", import.specifier),
                    import.specifier_span,
                    source_file.line(import.specifier_span.start_line).unwrap_or(""),
                ));
                resolved_specs.push(import.specifier.clone());
            }
        }
    }
    if errors.has_errors() {
        return Err(errors);
    }

    let (text, line_map) = emit::Emitter::new(&source_file).emit_module(&module, &resolved_specs);
    debug!(
        target: "vitrine::transform",
        imports = resolved.len(),
        rewrites = line_map.rewrites.len(),
        "transform ok"
    );
    Ok(CompiledModule {
        text,
        line_map,
        imports: resolved,
        fingerprint: fingerprint(source),
    })
}
