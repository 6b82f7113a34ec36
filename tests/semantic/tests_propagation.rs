#![allow(clippy::unwrap_used)]
use cds::hir::{AnnoValue, Inferred, ModelBuilder};
use rstest::rstest;

use crate::helpers::compile_helpers::*;

#[test]
fn test_annotation_follows_include_chain() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.aspect("B").annotate("X", AnnoValue::string("b"));
    b.aspect("C").includes("B");
    b.entity("D").includes("C");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    for name in ["C", "D"] {
        let annotation = model.annotation(def(model, name), "@X").unwrap();
        assert_eq!(annotation.value, AnnoValue::string("b"));
        assert_eq!(annotation.inferred, Some(Inferred::Propagated), "{name}");
    }
    let own = model.annotation(def(model, "B"), "@X").unwrap();
    assert!(!own.is_inferred());
}

#[test]
fn test_own_value_is_kept() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.aspect("A").annotate("X", AnnoValue::string("a"));
    b.entity("E")
        .includes("A")
        .annotate("X", AnnoValue::string("e"));
    b.entity("F")
        .includes("A")
        .annotate("X", AnnoValue::Null);

    let compiled = compile_clean(b);
    let model = &compiled.model;
    assert_eq!(anno(model, def(model, "E"), "@X"), Some(AnnoValue::string("e")));
    assert_eq!(anno(model, def(model, "F"), "@X"), Some(AnnoValue::Null));
}

#[test]
fn test_null_is_not_propagated() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.aspect("A").annotate("X", AnnoValue::Null);
    b.entity("E").includes("A");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    assert_eq!(anno(model, def(model, "E"), "@X"), None);
}

#[test]
fn test_type_step_copies_annotations_and_doc_only() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.type_def("Name")
        .ty("String")
        .length(80)
        .annotate("title", AnnoValue::string("Name"))
        .doc("A person's name");
    let e = b.entity("E").id();
    b.element(e, "name").ty("Name");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let name = model.artifact(elem(model, "E", "name"));
    assert_eq!(
        name.annotations.get("@title").map(|a| a.value.clone()),
        Some(AnnoValue::string("Name"))
    );
    assert_eq!(name.doc.as_ref().map(|d| d.value.as_str()), Some("A person's name"));
    assert!(name.type_args.length.is_none());
    assert_eq!(model.type_of(elem(model, "E", "name")), Some(def(model, "Name")));
}

#[rstest]
#[case("@title", true)]
#[case("@cds.autoexpose", true)]
#[case("@cds.persistence.table", false)]
#[case("@cds.persistence.exists", false)]
#[case("@sql.append", false)]
fn test_projection_inherits_entity_annotations(#[case] name: &str, #[case] inherited: bool) {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let books = b
        .entity("Books")
        .annotate(name.trim_start_matches('@'), AnnoValue::Bool(true))
        .id();
    b.element(books, "ID").ty("Integer").key();
    b.projection("P", "Books");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let p = def(model, "P");
    assert_eq!(model.annotation(p, name).is_some(), inherited);
    if inherited {
        assert!(model.annotation(p, name).unwrap().is_inferred());
    }
}

#[rstest]
#[case("@cds.autoexpose")]
#[case("@fiori.draft.enabled")]
fn test_main_only_annotations_skip_elements(#[case] name: &str) {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    b.type_def("T")
        .ty("String")
        .annotate(name.trim_start_matches('@'), AnnoValue::Bool(true))
        .annotate("title", AnnoValue::string("T"));
    let e = b.entity("E").id();
    b.element(e, "x").ty("T");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let x = elem(model, "E", "x");
    assert!(model.annotation(x, "@title").is_some());
    assert!(model.annotation(x, name).is_none());
}

#[test]
fn test_query_elements_inherit_from_origin() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let books = b.entity("Books").id();
    b.element(books, "ID").ty("Integer").key();
    b.element(books, "title")
        .ty("String")
        .length(100)
        .not_null()
        .annotate("title", AnnoValue::string("Title"));
    b.projection("P", "Books");

    let compiled = compile_clean(b);
    let model = &compiled.model;

    let id = model.artifact(elem(model, "P", "ID"));
    assert_eq!(id.inferred, Some(Inferred::Wildcard));
    assert_eq!(id.key.as_ref().map(|k| k.value), Some(true));
    assert_eq!(id.key.as_ref().unwrap().inferred, Some(Inferred::Propagated));

    let title_id = elem(model, "P", "title");
    let title = model.artifact(title_id);
    assert_eq!(title.type_args.length.as_ref().map(|l| l.value), Some(100));
    assert_eq!(title.not_null.as_ref().map(|n| n.value), Some(true));
    assert_eq!(anno(model, title_id, "@title"), Some(AnnoValue::string("Title")));
    let ty = model.type_of(title_id).unwrap();
    assert_eq!(model.artifact(ty).name, "String");
}

#[test]
fn test_inline_structure_copied_as_proxies() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let e = b.entity("E").id();
    let s = b.element(e, "s").id();
    b.element(s, "a").ty("Integer");
    b.projection("P", "E");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let proxy = elem(model, "P", "s.a");
    assert_eq!(model.artifact(proxy).origin, Some(elem(model, "E", "s.a")));
    assert_eq!(model.artifact(proxy).inferred, Some(Inferred::Propagated));
    assert_eq!(model.type_of(proxy), model.type_of(elem(model, "E", "s.a")));
}

#[test]
fn test_association_propagates_unless_expanded() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let authors = b.entity("Authors").id();
    b.element(authors, "ID").ty("Integer").key();
    b.element(authors, "name").ty("String");
    let books = b.entity("Books").id();
    b.element(books, "ID").ty("Integer").key();
    b.element(books, "author").association("Authors");
    b.projection("P", "Books");
    b.select("V")
        .from("Books")
        .column("ID")
        .expand("author", None, &["name"]);

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let authors = def(model, "Authors");
    assert_eq!(model.target_of(elem(model, "P", "author")), Some(authors));

    let expanded = elem(model, "V", "author");
    assert!(model.artifact(expanded).expanded);
    assert_eq!(model.target_of(expanded), None);
    let nested: Vec<_> = model
        .artifact(expanded)
        .elements
        .as_ref()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(nested, ["name"]);
    let name = elem(model, "V", "author.name");
    assert_eq!(model.artifact(name).origin, Some(elem(model, "Authors", "name")));
}

#[test]
fn test_included_flags_propagate() {
    let mut b = ModelBuilder::new();
    b.source("db.cds");
    let a = b.aspect("A").id();
    b.element(a, "code").ty("String").not_null().masked();
    b.element(a, "ID").ty("Integer").key();
    b.entity("E").includes("A");

    let compiled = compile_clean(b);
    let model = &compiled.model;
    let code = model.artifact(elem(model, "E", "code"));
    assert_eq!(code.not_null.as_ref().map(|p| p.value), Some(true));
    assert_eq!(code.masked.as_ref().map(|p| p.value), Some(true));
    // key is copied with the included element itself
    let id = model.artifact(elem(model, "E", "ID"));
    assert_eq!(id.key.as_ref().map(|p| p.value), Some(true));
}
