//! Compile a builder model and look at the result.

use cds::hir::{AnnoValue, ArtifactId, Diagnostic, Model, ModelBuilder, Severity};
use cds::{CompileOptions, Compiled, compile};

/// Options used by most tests: keep going after errors, stable order.
pub fn test_options() -> CompileOptions {
    CompileOptions::default()
        .with_continue_after_errors()
        .with_test_mode()
}

/// Compile with [`test_options`].
pub fn compile_model(builder: ModelBuilder) -> Compiled {
    compile(builder.build(), &test_options()).expect("compile with continue_after_errors")
}

/// Compile and assert there is no error.
pub fn compile_clean(builder: ModelBuilder) -> Compiled {
    let compiled = compile_model(builder);
    assert_no_errors(&compiled.diagnostics);
    compiled
}

pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, got {} error(s):\n{}",
        errors.len(),
        errors
            .iter()
            .map(|e| format!("  {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Message ids in diagnostic order.
pub fn ids(compiled: &Compiled) -> Vec<&'static str> {
    compiled.diagnostics.iter().map(|d| d.id).collect()
}

/// The single diagnostic with message `id`.
pub fn only<'a>(compiled: &'a Compiled, id: &'a str) -> &'a Diagnostic {
    let found: Vec<_> = compiled.diagnostics_with_id(id).collect();
    assert_eq!(
        found.len(),
        1,
        "Expected exactly one {id}, got {:?}",
        ids(compiled)
    );
    found[0]
}

/// Main artifact `name`.
pub fn def(model: &Model, name: &str) -> ArtifactId {
    model
        .definition(name)
        .unwrap_or_else(|| panic!("no definition {name}"))
}

/// Element `path` (dot separated) of main artifact `name`.
pub fn elem(model: &Model, name: &str, path: &str) -> ArtifactId {
    let mut current = def(model, name);
    for step in path.split('.') {
        current = model
            .element(current, step)
            .unwrap_or_else(|| panic!("{} has no element {step}", model.display_name(current)));
    }
    current
}

/// Value of annotation `name` (with `@`) on `art`.
pub fn anno(model: &Model, art: ArtifactId, name: &str) -> Option<AnnoValue> {
    model.annotation(art, name).map(|a| a.value.clone())
}
