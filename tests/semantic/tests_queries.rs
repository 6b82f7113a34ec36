#![allow(clippy::unwrap_used)]
use cds::hir::{ArtifactId, Inferred, Model, ModelBuilder, eq, op};
use smol_str::SmolStr;

use crate::helpers::compile_helpers::*;

fn element_names(model: &Model, art: ArtifactId) -> Vec<SmolStr> {
    model
        .artifact(art)
        .elements
        .as_ref()
        .map(|e| e.keys().cloned().collect())
        .unwrap_or_default()
}

/// `entity name { id; a; b; }`
fn entity_ab(b: &mut ModelBuilder, name: &str) {
    let e = b.entity(name).id();
    b.element(e, "id").ty("Integer").key();
    b.element(e, "a").ty("String");
    b.element(e, "b").ty("String");
}

#[test]
fn test_projection_has_source_elements() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "E");
    b.projection("P", "E");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let p = def(model, "P");
    assert_eq!(element_names(model, p), ["id", "a", "b"]);
    for name in ["id", "a", "b"] {
        let element = model.artifact(elem(model, "P", name));
        assert_eq!(element.inferred, Some(Inferred::Wildcard));
        assert_eq!(element.origin, Some(elem(model, "E", name)));
    }
}

#[test]
fn test_excluding_and_explicit_columns_shadow_wildcard() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "E");
    b.projection("P", "E").excluding("b");
    b.select("V").from("E").wildcard().column_as("a", "b");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    assert_eq!(element_names(model, def(model, "P")), ["id", "a"]);
    assert_eq!(element_names(model, def(model, "V")), ["id", "a", "b"]);
    assert_eq!(
        model.artifact(elem(model, "V", "b")).origin,
        Some(elem(model, "E", "a"))
    );
}

#[test]
fn test_ambiguous_column() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "A");
    entity_ab(&mut b, "B");
    b.select("V").from("A").from("B").column("A.id").column("a");

    let compiled = compile_model(b);
    let d = only(&compiled, "ref-ambiguous");
    assert_eq!(d.params.names, ["A.a", "B.a"]);
    assert_eq!(compiled.diagnostics.len(), 1);
}

#[test]
fn test_ambiguous_wildcard() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "A");
    let c = b.entity("C").id();
    b.element(c, "a").ty("String");
    b.element(c, "c").ty("String");
    b.select("V").from("A").from("C").wildcard();

    let compiled = compile_model(b);
    let d = only(&compiled, "wildcard-ambiguous");
    assert_eq!(d.params.name.as_deref(), Some("a"));
    assert_eq!(d.params.names, ["A", "C"]);
    let model = &compiled.model;
    assert_eq!(element_names(model, def(model, "V")), ["id", "b", "c"]);
}

#[test]
fn test_expression_column_requires_alias() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "E");
    b.select("V")
        .from("E")
        .column_expr(|b| op("+", vec![b.path("id"), b.number(1)]), None)
        .column_expr(|b| op("+", vec![b.path("id"), b.number(2)]), Some("next"));

    let compiled = compile_model(b);
    assert_eq!(ids(&compiled), ["query-req-name"]);
    let model = &compiled.model;
    assert_eq!(element_names(model, def(model, "V")), ["next"]);
    assert!(model.artifact(elem(model, "V", "next")).value.is_some());
}

#[test]
fn test_duplicate_column_name() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "E");
    b.select("V").from("E").column("a").column_as("b", "a");

    let compiled = compile_model(b);
    let d = only(&compiled, "duplicate-definition");
    assert_eq!(d.params.name.as_deref(), Some("a"));
}

#[test]
fn test_order_by_sees_query_elements_first() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "E");
    b.select("V")
        .from("E")
        .column_as("a", "x")
        .column("b")
        .where_(|b| eq(b.path("E.id"), b.number(1)))
        .group_by("a")
        .order_by("x")
        .order_by("id");

    compile_clean(b);
}

#[test]
fn test_column_through_association() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let authors = b.entity("Authors").id();
    b.element(authors, "ID").ty("Integer").key();
    b.element(authors, "name").ty("String");
    let books = b.entity("Books").id();
    b.element(books, "ID").ty("Integer").key();
    b.element(books, "author").association("Authors");
    b.select("V")
        .from("Books")
        .key_column("ID")
        .column_as("author.name", "authorName");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let author_name = elem(model, "V", "authorName");
    assert_eq!(
        model.artifact(author_name).origin,
        Some(elem(model, "Authors", "name"))
    );
    let id = model.artifact(elem(model, "V", "ID"));
    assert_eq!(id.key.as_ref().map(|k| k.value), Some(true));
}

#[test]
fn test_mixin_association() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let books = b.entity("Books").id();
    b.element(books, "ID").ty("Integer").key();
    let reviews = b.entity("Reviews").id();
    b.element(reviews, "book_ID").ty("Integer");
    b.select("V")
        .from("Books")
        .column("ID")
        .column("reviews")
        .mixin("reviews", "Reviews", "reviews.book_ID", "Books.ID");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let element = elem(model, "V", "reviews");
    assert_eq!(model.target_of(element), Some(def(model, "Reviews")));
}

#[test]
fn test_select_from_association() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let authors = b.entity("Authors").id();
    b.element(authors, "ID").ty("Integer").key();
    b.element(authors, "name").ty("String");
    let books = b.entity("Books").id();
    b.element(books, "author").association("Authors");
    b.select("V").from_as("Books:author", "a").column("a.name");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    assert_eq!(
        model.artifact(elem(model, "V", "name")).origin,
        Some(elem(model, "Authors", "name"))
    );
}

#[test]
fn test_query_elements_can_be_annotated() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    entity_ab(&mut b, "E");
    b.projection("P", "E");
    b.annotate("P:a")
        .anno("title", cds::hir::AnnoValue::string("A"));

    let compiled = compile_clean(b);
    let model = &compiled.model;
    assert_eq!(
        anno(model, elem(model, "P", "a"), "@title"),
        Some(cds::hir::AnnoValue::string("A"))
    );
}
