#![allow(clippy::unwrap_used)]
use cds::hir::{ArtifactKind, Generated, ModelBuilder, eq, op};
use cds::semantic::{ExpectedContext, Session};
use cds::{CompileOptions, compile};
use rstest::rstest;

use crate::helpers::compile_helpers::*;

// ============================================================================
// TYPES AND DEFINITIONS
// ============================================================================

#[rstest]
#[case("String")]
#[case("cds.String")]
#[case("cds.Integer")]
#[case("Decimal")]
fn test_builtin_types_resolve(#[case] type_name: &str) {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "x").ty(type_name);

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let ty = model.type_of(elem(model, "E", "x")).unwrap();
    assert_eq!(model.artifact(ty).kind, ArtifactKind::Builtin);
    assert!(compiled.diagnostics.is_empty());
}

#[test]
fn test_namespace_and_using_alias() {
    let mut b = ModelBuilder::new();
    let db = b.source("db.cds");
    b.namespace("my.bookshop");
    b.entity("Books");
    b.source("srv.cds");
    b.depends_on(db);
    b.using_as("my.bookshop.Books", "B");
    let orders = b.entity("Orders").id();
    b.element(orders, "book").association("B");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let book = elem(model, "Orders", "book");
    assert_eq!(model.target_of(book), Some(def(model, "my.bookshop.Books")));
}

#[test]
fn test_same_namespace_reference_without_using() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.namespace("my");
    b.type_def("Name").ty("String");
    let e = b.entity("E").id();
    b.element(e, "name").ty("Name");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    assert_eq!(model.type_of(elem(model, "my.E", "name")), Some(def(model, "my.Name")));
}

#[test]
fn test_undefined_type_reports_with_semantic_location() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "x").ty("Missing");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-undefined-def");
    assert!(d.is_error());
    assert_eq!(d.semantic_location.as_deref(), Some("E:x"));
    assert!(d.valid_names.is_none());
    assert_eq!(compiled.model.type_of(elem(&compiled.model, "E", "x")), None);
}

#[test]
fn test_valid_names_collected_on_request() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.type_def("Amount").ty("Decimal");
    let e = b.entity("E").id();
    b.element(e, "x").ty("Amout");

    let options = CompileOptions::default()
        .with_continue_after_errors()
        .with_valid_names();
    let compiled = compile(b.build(), &options).unwrap();
    let d = only(&compiled, "ref-undefined-def");
    let names = d.valid_names.as_ref().unwrap();
    assert!(names.contains_key("Amount"));
    assert!(names.contains_key("E"));
}

#[test]
fn test_missing_using_target_reported() {
    let mut b = ModelBuilder::new();
    b.source("srv.cds");
    b.using("other.Missing");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-undefined-def");
    assert_eq!(d.params.name.as_deref(), Some("other.Missing"));
}

#[test]
fn test_self_rejected_in_type_context() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "x").ty("$self");

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), ["ref-unexpected-self"]);
}

#[test]
fn test_action_cannot_be_included() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.action("doIt");
    b.entity("E").includes("doIt");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-expected-struct");
    assert_eq!(d.params.kind, Some("action"));
}

// ============================================================================
// IDEMPOTENCE
// ============================================================================

#[test]
fn test_resolution_is_idempotent() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    let x = b.element(e, "x").ty("String").id();
    let y = b.element(e, "y").ty("Nowhere").id();
    let model = b.build();
    let x_type = model.artifact(x).type_ref.unwrap();
    let y_type = model.artifact(y).type_ref.unwrap();

    let mut session = Session::new(model, test_options());
    session.compute_layers();
    session.apply_extensions();

    let first = session.resolve(x_type, ExpectedContext::Type, x);
    let second = session.resolve(x_type, ExpectedContext::Type, x);
    assert!(first.is_some());
    assert_eq!(first, second);

    assert_eq!(session.resolve(y_type, ExpectedContext::Type, y), None);
    let reported = session.diagnostics().diagnostics().len();
    assert_eq!(session.resolve(y_type, ExpectedContext::Type, y), None);
    assert_eq!(session.diagnostics().diagnostics().len(), reported);
    assert_eq!(reported, 1);

    // the whole-model pass does not search again either
    session.resolve_all();
    assert_eq!(session.diagnostics().diagnostics().len(), reported);
}

// ============================================================================
// ELEMENT PATHS
// ============================================================================

#[test]
fn test_calculated_element_refers_to_sibling() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "price").ty("Decimal");
    b.element(e, "gross")
        .ty("Decimal")
        .value(|b| op("*", vec![b.path("price"), b.number(2)]));

    compile_clean(b);
}

#[test]
fn test_navigation_into_scalar_is_invalid() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "x").ty("Integer");
    b.element(e, "y").ty("Integer").value(|b| b.path("x.z"));

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-invalid-navigation");
    assert_eq!(d.params.variant, Some("std"));
    assert_eq!(d.params.name.as_deref(), Some("z"));
}

#[test]
fn test_navigation_through_structured_type() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let address = b.type_def("Address").id();
    b.element(address, "city").ty("String");
    let e = b.entity("E").id();
    b.element(e, "home").ty("Address");
    b.element(e, "city").ty("String").value(|b| b.path("home.city"));
    b.element(e, "zip").ty("String").value(|b| b.path("home.zip"));

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-undefined-element");
    assert_eq!(d.params.name.as_deref(), Some("zip"));
}

#[rstest]
#[case("$user.id", &[])]
#[case("$user.locale", &[])]
#[case("$now", &[])]
#[case("$session.anything", &[])]
#[case("$user.nickname", &["ref-undefined-var"])]
#[case("$nothing", &["ref-undefined-var"])]
fn test_magic_variables(#[case] path: &str, #[case] expected: &[&str]) {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    let path = path.to_string();
    b.element(e, "v").ty("String").value(move |b| b.path(&path));

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), expected);
}

#[test]
fn test_type_of_sibling_element() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "a").ty("String").length(10);
    b.element(e, "b").type_of("a");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    assert_eq!(model.type_of(elem(model, "E", "b")), Some(elem(model, "E", "a")));
}

// ============================================================================
// ASSOCIATIONS
// ============================================================================

#[test]
fn test_association_target_must_be_entity() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.type_def("T").ty("String");
    let e = b.entity("E").id();
    b.element(e, "t").association("T");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-expected-entity");
    assert_eq!(d.params.kind, Some("type"));
}

#[test]
fn test_autoexposed_target_rejected_unless_internal() {
    let build = || {
        let mut b = ModelBuilder::new();
        b.source("db.cds");
        b.entity("Texts").generated(Generated::AutoExposed);
        let e = b.entity("E").id();
        b.element(e, "texts").association("Texts");
        b.build()
    };

    let options = test_options();
    let compiled = compile(build(), &options).unwrap();
    assert_eq!(ids(&compiled), ["ref-unexpected-autoexposed"]);

    let mut internal = test_options();
    internal.internal = true;
    let compiled = compile(build(), &internal).unwrap();
    assert!(compiled.diagnostics.is_empty());
}

#[test]
fn test_backlink_must_point_back() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "a").association("F").on_eq("a.b", "$self");
    let f = b.entity("F").id();
    b.element(f, "b").association("G");
    b.entity("G");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-invalid-backlink");
    assert_eq!(compiled.model.display_name(d.params.art.unwrap()), "F:b");
    assert_eq!(d.params.target, Some(def(&compiled.model, "E")));
}

#[test]
fn test_valid_backlink() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let authors = b.entity("Authors").id();
    b.element(authors, "books")
        .association("Books")
        .on_eq("books.author", "$self");
    let books = b.entity("Books").id();
    b.element(books, "author").association("Authors");

    compile_clean(b);
}

#[test]
fn test_unmanaged_association_in_calc_is_rejected() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "id").ty("Integer");
    b.element(e, "parent").association("E").on_eq("parent.id", "id");
    b.element(e, "p").ty("Integer").value(|b| b.path("parent"));

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), ["ref-unexpected-assoc"]);
}

#[test]
fn test_foreign_key_resolves_in_target() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let authors = b.entity("Authors").id();
    b.element(authors, "ID").ty("Integer").key();
    let books = b.entity("Books").id();
    let author = b.element(books, "author").association("Authors").id();
    b.foreign_key(author, "ID", "ID");
    b.foreign_key(author, "name", "name");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-undefined-element");
    assert_eq!(d.params.name.as_deref(), Some("name"));
}

// ============================================================================
// ENUMS AND PARAMS
// ============================================================================

fn status_model(default: &'static str, element_type: &'static str) -> ModelBuilder {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let status = b.type_def("Status").ty("String").id();
    b.enum_value(status, "open");
    b.enum_value(status, "closed");
    let e = b.entity("E").id();
    b.element(e, "s")
        .ty(element_type)
        .default_value(move |b| b.enum_symbol(default));
    b
}

#[rstest]
#[case("open", "Status", None)]
#[case("closed", "Status", None)]
#[case("pending", "Status", Some(None))]
#[case("open", "Integer", Some(Some("no-enum")))]
fn test_enum_symbol_defaults(
    #[case] symbol: &'static str,
    #[case] element_type: &'static str,
    #[case] expected: Option<Option<&str>>,
) {
    let compiled = compile_model(status_model(symbol, element_type));
    match expected {
        None => assert!(compiled.diagnostics.is_empty(), "{:?}", ids(&compiled)),
        Some(variant) => {
            let d = only(&compiled, "ref-undefined-enum");
            assert_eq!(d.params.variant, variant);
        }
    }
}

#[test]
fn test_enum_symbol_compared_in_condition() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let status = b.type_def("Status").ty("String").id();
    b.enum_value(status, "open");
    let e = b.entity("E").id();
    b.element(e, "s").ty("Status");
    b.select("V")
        .from("E")
        .column("s")
        .where_(|b| eq(b.path("s"), b.enum_symbol("closed")));

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-undefined-enum");
    assert_eq!(d.params.name.as_deref(), Some("closed"));
}

#[test]
fn test_parameter_references() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "year").ty("Integer");
    let v = b
        .select("V")
        .from("E")
        .column("year")
        .where_(|b| eq(b.path("year"), b.path(":year")))
        .having(|b| eq(b.path("year"), b.path(":month")))
        .id();
    b.param(v, "year").ty("Integer");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-undefined-param");
    assert_eq!(d.params.name.as_deref(), Some("month"));
}

#[test]
fn test_arguments_on_entity_without_params() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    b.element(e, "x").ty("Integer");
    b.select("V").from("E").column_expr(
        |b| {
            let one = b.number(1);
            b.call("x", vec![("p", one)])
        },
        Some("y"),
    );

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), ["ref-unexpected-args"]);
}
