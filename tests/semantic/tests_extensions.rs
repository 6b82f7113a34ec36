#![allow(clippy::unwrap_used)]
use cds::hir::{
    AnnoValue, ArtifactKind, ExtensionTarget, Generated, Inferred, MemberGroup, ModelBuilder,
    Severity,
};
use cds::{CompileOptions, compile};
use rstest::rstest;

use crate::helpers::compile_helpers::*;

fn strings(values: &[&str]) -> AnnoValue {
    AnnoValue::Array(values.iter().map(|v| AnnoValue::string(v)).collect())
}

// ============================================================================
// ANNOTATE ACROSS LAYERS
// ============================================================================

#[test]
fn test_dependent_file_wins() {
    let mut b = ModelBuilder::new();
    let base = b.source("file1.cds");
    b.entity("A");
    b.annotate("A").anno("X", AnnoValue::string("one"));
    b.source("file2.cds");
    b.depends_on(base);
    b.annotate("A").anno("X", AnnoValue::string("two"));

    let compiled = compile_clean(b);
    assert!(compiled.diagnostics.is_empty(), "{:?}", ids(&compiled));
    let a = def(&compiled.model, "A");
    assert_eq!(anno(&compiled.model, a, "@X"), Some(AnnoValue::string("two")));
}

#[test]
fn test_extension_overrides_definition_value() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.entity("A").annotate("title", AnnoValue::string("Own"));
    b.annotate("A").anno("title", AnnoValue::string("Extended"));

    let compiled = compile_clean(b);
    let a = def(&compiled.model, "A");
    assert_eq!(
        anno(&compiled.model, a, "@title"),
        Some(AnnoValue::string("Extended"))
    );
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_result_independent_of_statement_order(#[case] top_first: bool) {
    let mut b = ModelBuilder::new();
    let base = b.source("base.cds");
    b.entity("A");
    let mid = b.source("mid.cds");
    b.depends_on(base);
    let top = b.source("top.cds");
    b.depends_on(mid);

    let order = if top_first { [top, mid] } else { [mid, top] };
    for source in order {
        b.switch_to(source);
        let value = if source == top { "top" } else { "mid" };
        b.annotate("A").anno("X", AnnoValue::string(value));
    }

    let compiled = compile_clean(b);
    assert!(compiled.diagnostics.is_empty());
    let a = def(&compiled.model, "A");
    assert_eq!(anno(&compiled.model, a, "@X"), Some(AnnoValue::string("top")));
}

#[test]
fn test_duplicate_in_same_file() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.entity("A");
    b.annotate("A").anno("X", AnnoValue::string("a"));
    b.annotate("A").anno("X", AnnoValue::string("b"));

    let compiled = compile_model(b);
    let d = only(&compiled, "anno-duplicate-same-file");
    assert_eq!(d.severity, Severity::Warning);
    assert!(!compiled.has_errors());
}

#[test]
fn test_duplicate_in_unrelated_layers() {
    let mut b = ModelBuilder::new();
    let base = b.source("base.cds");
    b.entity("A");
    let left = b.source("left.cds");
    b.depends_on(base);
    b.annotate("A").anno("X", AnnoValue::string("left"));
    let right = b.source("right.cds");
    b.depends_on(base);
    b.annotate("A").anno("X", AnnoValue::string("right"));

    let compiled = compile_model(b);
    assert!(ids(&compiled).contains(&"anno-duplicate-unrelated-layer"));
    assert!(compiled.layers.are_unrelated(left, right));
}

#[test]
fn test_duplicate_in_same_layer() {
    let mut b = ModelBuilder::new();
    let base = b.source("base.cds");
    b.entity("A");
    let left = b.source("left.cds");
    b.depends_on(base);
    b.annotate("A").anno("X", AnnoValue::string("left"));
    let right = b.source("right.cds");
    b.depends_on(base);
    b.depends_on(left);
    b.annotate("A").anno("X", AnnoValue::string("right"));
    b.switch_to(left);
    b.depends_on(right);

    let compiled = compile_model(b);
    assert!(ids(&compiled).contains(&"anno-duplicate"));
    assert!(compiled.layers.same_layer(left, right));
}

// ============================================================================
// ELLIPSIS
// ============================================================================

#[test]
fn test_ellipsis_splices_lower_layer_value() {
    let mut b = ModelBuilder::new();
    let base = b.source("base.cds");
    b.entity("E").annotate("A", strings(&["a", "b"]));
    b.source("ext.cds");
    b.depends_on(base);
    b.annotate("E").anno(
        "A",
        AnnoValue::Array(vec![AnnoValue::string("x"), AnnoValue::ellipsis()]),
    );

    let compiled = compile_clean(b);
    let e = def(&compiled.model, "E");
    assert_eq!(anno(&compiled.model, e, "@A"), Some(strings(&["x", "a", "b"])));
}

#[test]
fn test_ellipsis_in_definition_is_unexpected() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.entity("E").annotate(
        "A",
        AnnoValue::Array(vec![AnnoValue::string("a"), AnnoValue::ellipsis()]),
    );

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), ["anno-unexpected-ellipsis"]);
    let e = def(&compiled.model, "E");
    assert_eq!(anno(&compiled.model, e, "@A"), Some(strings(&["a"])));
}

// ============================================================================
// EXTEND
// ============================================================================

#[test]
fn test_extend_adds_element_seen_by_projection() {
    let mut b = ModelBuilder::new();
    let base = b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "a").ty("Integer");
    b.projection("P", "E");
    b.source("ext.cds");
    b.depends_on(base);
    b.extend("E").element("y", |d| {
        d.ty("String");
    });

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let y = elem(model, "E", "y");
    assert_eq!(model.artifact(y).parent, Some(def(model, "E")));
    assert!(model.type_of(y).is_some());

    let p = def(model, "P");
    let names: Vec<_> = model.artifact(p).elements.as_ref().unwrap().keys().cloned().collect();
    assert_eq!(names, ["a", "y"]);
    assert_eq!(model.artifact(elem(model, "P", "y")).origin, Some(y));
}

#[test]
fn test_undefined_extension_targets() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.extend("Nowhere").anno("X", AnnoValue::Bool(true));
    b.annotate("Elsewhere").anno("X", AnnoValue::Bool(true));

    let compiled = compile_model(b);
    let extend = only(&compiled, "ref-undefined-art");
    assert_eq!(extend.severity, Severity::Error);
    assert_eq!(extend.params.name.as_deref(), Some("Nowhere"));
    let annotate = only(&compiled, "anno-undefined-art");
    assert_eq!(annotate.severity, Severity::Warning);
    assert_eq!(annotate.params.name.as_deref(), Some("Elsewhere"));
}

#[test]
fn test_undefined_extension_target_suggests_names() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.entity("Books");
    b.extend("Bookz").anno("X", AnnoValue::Bool(true));

    let options = CompileOptions::default()
        .with_continue_after_errors()
        .with_valid_names();
    let compiled = compile(b.build(), &options).unwrap();
    let d = only(&compiled, "ref-undefined-art");
    assert!(d.valid_names.as_ref().unwrap().contains_key("Books"));
}

#[test]
fn test_extension_target_steps_are_recorded() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.entity("my.Books");
    b.annotate("my.Books").anno("X", AnnoValue::Bool(true));

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let ext = model.extension_ids().next().unwrap();
    let ExtensionTarget::Path(rid) = &model.extension(ext).target else {
        panic!("top-level extension expected");
    };
    let reference = model.reference(*rid);
    let steps: Vec<_> = reference.path.iter().map(|s| s.artifact).collect();
    assert_eq!(steps, [model.definition("my"), Some(def(model, "my.Books"))]);
    assert_eq!(reference.artifact(), Some(def(model, "my.Books")));
}

#[test]
fn test_annotate_elements() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "x").ty("String");
    b.element(e, "y").ty("String");
    b.annotate("E")
        .annotate_element("x", |x| {
            x.anno("title", AnnoValue::string("X"));
        })
        .annotate_element("nope", |n| {
            n.anno("title", AnnoValue::string("?"));
        });
    b.annotate("E:y").anno("title", AnnoValue::string("Y"));

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), ["anno-undefined-element"]);
    let model = &compiled.model;
    assert_eq!(anno(model, elem(model, "E", "x"), "@title"), Some(AnnoValue::string("X")));
    assert_eq!(anno(model, elem(model, "E", "y"), "@title"), Some(AnnoValue::string("Y")));
}

#[test]
fn test_annotate_bound_action_param() {
    let mut b = ModelBuilder::new();
    b.source("srv.cds");
    let e = b.entity("E").id();
    let act = b.bound_action(e, "approve").id();
    b.param(act, "reason").ty("String");
    b.annotate("E").member(MemberGroup::Actions, "approve", |a| {
        a.member(MemberGroup::Params, "reason", |p| {
            p.anno("title", AnnoValue::string("Reason"));
        })
        .member(MemberGroup::Params, "comment", |_| {});
    });

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), ["anno-undefined-param"]);
    let model = &compiled.model;
    let reason = model.member(act, MemberGroup::Params, "reason").unwrap();
    assert_eq!(anno(model, reason, "@title"), Some(AnnoValue::string("Reason")));
}

#[test]
fn test_extend_namespace_is_rejected() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.namespace("my");
    b.entity("E");
    b.extend("my").element("x", |d| {
        d.ty("String");
    });

    let compiled = compile_model(b);
    let d = only(&compiled, "extend-unexpected-kind");
    assert_eq!(d.params.kind, Some("namespace"));
    assert_eq!(compiled.diagnostics.len(), 1);
}

#[test]
fn test_extend_scalar_type_with_elements_is_rejected() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.type_def("T").ty("String");
    b.extend("T").element("x", |d| {
        d.ty("String");
    });

    let compiled = compile_model(b);
    let d = only(&compiled, "extend-unexpected-kind");
    assert_eq!(d.params.variant, Some("elements"));
    let t = def(&compiled.model, "T");
    assert!(compiled.model.artifact(t).elements.is_none());
}

#[test]
fn test_extend_generated_entity_is_rejected() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.entity("Texts").generated(Generated::Localized);
    b.extend("Texts").element("x", |d| {
        d.ty("String");
    });

    let compiled = compile_model(b);
    let d = only(&compiled, "extend-unexpected-kind");
    assert_eq!(d.params.variant, Some("generated"));
}

#[test]
fn test_extend_with_existing_element_is_duplicate() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "a").ty("Integer");
    b.extend("E").element("a", |d| {
        d.ty("String");
    });

    let compiled = compile_model(b);
    let d = only(&compiled, "duplicate-definition");
    assert_eq!(d.params.name.as_deref(), Some("a"));
    let model = &compiled.model;
    let a = elem(model, "E", "a");
    assert_eq!(model.artifact(model.type_of(a).unwrap()).name, "Integer");
}

#[test]
fn test_unrelated_layers_adding_elements() {
    let mut b = ModelBuilder::new();
    let base = b.source("base.cds");
    b.entity("E");
    b.source("left.cds");
    b.depends_on(base);
    b.extend("E").element("a", |d| {
        d.ty("String");
    });
    b.source("right.cds");
    b.depends_on(base);
    b.extend("E").element("b", |d| {
        d.ty("String");
    });

    let compiled = compile_clean(b);
    let d = only(&compiled, "extend-unrelated-layer");
    assert_eq!(d.severity, Severity::Info);
    let model = &compiled.model;
    elem(model, "E", "a");
    elem(model, "E", "b");
}

#[test]
fn test_extend_type_arguments_and_enum() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let status = b.type_def("Status").ty("String").length(10).id();
    b.enum_value(status, "open");
    let e = b.entity("E").id();
    b.element(e, "s")
        .ty("Status")
        .default_value(|b| b.enum_symbol("pending"));
    b.extend("Status").length(20).enum_value("pending");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let status = def(model, "Status");
    let args = &model.artifact(status).type_args;
    assert_eq!(args.length.as_ref().map(|l| l.value), Some(20));
    let symbols: Vec<_> = model
        .artifact(status)
        .enum_values
        .as_ref()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(symbols, ["open", "pending"]);
}

// ============================================================================
// INCLUDES
// ============================================================================

#[test]
fn test_included_elements_come_first() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let managed = b.aspect("Managed").id();
    b.element(managed, "createdAt").ty("Timestamp");
    let e = b.entity("E").includes("Managed").id();
    b.element(e, "ID").ty("Integer").key();

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let names: Vec<_> = model.artifact(e).elements.as_ref().unwrap().keys().cloned().collect();
    assert_eq!(names, ["createdAt", "ID"]);

    let created = elem(model, "E", "createdAt");
    assert_eq!(model.artifact(created).inferred, Some(Inferred::Include));
    assert_eq!(model.artifact(created).origin, Some(elem(model, "Managed", "createdAt")));
    let ty = model.type_of(created).unwrap();
    assert_eq!(model.artifact(ty).name, "Timestamp");
}

#[test]
fn test_type_derived_from_structured_type() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let base = b.type_def("Base").id();
    b.element(base, "id").ty("Integer");
    b.type_def("Derived").includes("Base");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let id = elem(model, "Derived", "id");
    assert_eq!(model.artifact(id).inferred, Some(Inferred::Include));
    assert_eq!(model.type_of(id), model.type_of(elem(model, "Base", "id")));
    assert_eq!(model.artifact(id).kind, ArtifactKind::Element);
}

#[test]
fn test_invalid_override_of_included_association() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.entity("Target");
    let a = b.aspect("A").id();
    b.element(a, "x").association("Target");
    let e = b.entity("E").includes("A").id();
    b.element(e, "x").ty("Integer");

    let compiled = compile_model(b);
    let d = only(&compiled, "ext-invalid-override");
    assert_eq!(d.params.variant, Some("assoc"));
}

#[derive(Clone, Copy, Debug)]
enum Shape {
    Scalar,
    Inline,
    Typed,
}

/// Element `s` of `parent` with the given shape; `Typed` uses `StructT`.
fn shaped_element(b: &mut ModelBuilder, parent: cds::hir::ArtifactId, shape: Shape) {
    match shape {
        Shape::Scalar => {
            b.element(parent, "s").ty("Integer");
        }
        Shape::Inline => {
            let s = b.element(parent, "s").id();
            b.element(s, "x").ty("Integer");
        }
        Shape::Typed => {
            b.element(parent, "s").ty("StructT");
        }
    }
}

#[rstest]
#[case::inline_struct_vs_scalar(Shape::Inline, Shape::Scalar, Some("std"))]
#[case::typed_struct_vs_scalar(Shape::Typed, Shape::Scalar, Some("std"))]
#[case::scalar_vs_typed_struct(Shape::Scalar, Shape::Typed, Some("std"))]
#[case::typed_vs_inline(Shape::Typed, Shape::Inline, None)]
#[case::scalar_vs_scalar(Shape::Scalar, Shape::Scalar, None)]
fn test_override_must_keep_structure(
    #[case] included: Shape,
    #[case] local: Shape,
    #[case] variant: Option<&str>,
) {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let t = b.type_def("StructT").id();
    b.element(t, "x").ty("Integer");
    let a = b.aspect("A").id();
    shaped_element(&mut b, a, included);
    let e = b.entity("E").includes("A").id();
    shaped_element(&mut b, e, local);

    let compiled = compile_model(b);
    match variant {
        Some(variant) => {
            let d = only(&compiled, "ext-invalid-override");
            assert_eq!(d.params.variant, Some(variant));
            assert_eq!(d.params.name.as_deref(), Some("s"));
            assert_eq!(d.related.len(), 1);
            assert_eq!(
                d.related[0].location,
                compiled.model.artifact(elem(&compiled.model, "A", "s")).location
            );
            assert_eq!(compiled.diagnostics.len(), 1);
        }
        None => assert!(compiled.diagnostics.is_empty(), "{:?}", ids(&compiled)),
    }
}

#[test]
fn test_extend_with_include_appends() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let managed = b.aspect("Managed").id();
    b.element(managed, "createdAt").ty("Timestamp");
    let e = b.entity("E").id();
    b.element(e, "ID").ty("Integer");
    b.extend("E").includes("Managed");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let names: Vec<_> = model.artifact(e).elements.as_ref().unwrap().keys().cloned().collect();
    assert_eq!(names, ["ID", "createdAt"]);
}

#[test]
fn test_extensions_of_included_aspect_apply_first() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.aspect("Managed");
    b.entity("E").includes("Managed");
    b.extend("E").element("own", |d| {
        d.ty("String");
    });
    b.extend("Managed").element("modifiedAt", |d| {
        d.ty("Timestamp");
    });

    let compiled = compile_clean(b);
    assert!(!compiled.used_unordered_fallback);
    let model = &compiled.model;
    let e = def(model, "E");
    let names: Vec<_> = model.artifact(e).elements.as_ref().unwrap().keys().cloned().collect();
    assert_eq!(names, ["modifiedAt", "own"]);
}

#[test]
fn test_cyclic_includes_use_unordered_fallback() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.aspect("A").includes("B");
    b.aspect("B").includes("A");
    b.annotate("A").anno("X", AnnoValue::Bool(true));
    b.annotate("B").anno("Y", AnnoValue::Bool(true));

    let compiled = compile_model(b);
    assert!(compiled.used_unordered_fallback);
    assert!(ids(&compiled).iter().all(|&id| id == "ref-cyclic"));
    assert!(!ids(&compiled).is_empty());
    let model = &compiled.model;
    assert_eq!(anno(model, def(model, "A"), "@X"), Some(AnnoValue::Bool(true)));
    assert_eq!(anno(model, def(model, "B"), "@Y"), Some(AnnoValue::Bool(true)));
}
