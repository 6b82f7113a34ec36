//! Message catalog.
//!
//! Every diagnostic the engine emits has a stable id registered here
//! together with its default severity, whether the severity may be changed
//! through [`CompileOptions::severities`](crate::CompileOptions), and the text
//! templates for each variant. Templates use `{art}`, `{name}`, `{names}`,
//! `{target}`, `{kind}` and `{line}` placeholders.

use smol_str::SmolStr;

use super::diagnostics::Severity;
use super::ids::ArtifactId;

/// A message id with its texts.
#[derive(Debug)]
pub struct MessageDef {
    pub id: &'static str,
    pub severity: Severity,
    pub configurable: bool,
    /// `(variant, template)`; the first entry is the `std` text.
    pub texts: &'static [(&'static str, &'static str)],
}

impl MessageDef {
    /// Template for the given variant, falling back to the standard text.
    pub fn text(&self, variant: Option<&str>) -> &'static str {
        variant
            .and_then(|v| self.texts.iter().find(|(name, _)| *name == v))
            .or_else(|| self.texts.first())
            .map(|(_, text)| *text)
            .unwrap_or("")
    }
}

/// Parameters substituted into a message template.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageParams {
    pub art: Option<ArtifactId>,
    pub name: Option<SmolStr>,
    pub names: Vec<SmolStr>,
    pub target: Option<ArtifactId>,
    pub kind: Option<&'static str>,
    pub line: Option<u32>,
    pub variant: Option<&'static str>,
}

impl MessageParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn art(mut self, art: ArtifactId) -> Self {
        self.art = Some(art);
        self
    }

    pub fn name(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn names(mut self, names: impl IntoIterator<Item = SmolStr>) -> Self {
        self.names = names.into_iter().collect();
        self
    }

    pub fn target(mut self, target: ArtifactId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn variant(mut self, variant: &'static str) -> Self {
        self.variant = Some(variant);
        self
    }
}

macro_rules! message {
    ($id:literal, $severity:ident, $configurable:literal, [$(($variant:literal, $text:literal)),+ $(,)?]) => {
        MessageDef {
            id: $id,
            severity: Severity::$severity,
            configurable: $configurable,
            texts: &[$(($variant, $text)),+],
        }
    };
}

pub static MESSAGES: &[MessageDef] = &[
    // ------------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------------
    message!("ref-undefined-def", Error, false, [
        ("std", "Artifact {name} has not been found"),
        ("element", "Artifact {art} has no element {name}"),
    ]),
    message!("ref-undefined-art", Error, false, [
        ("std", "No artifact has been found with name {name}"),
    ]),
    message!("ref-undefined-element", Error, false, [
        ("std", "Element {name} has not been found"),
        ("element", "Artifact {art} has no element {name}"),
        ("query", "Element {name} has not been found in the elements of the query"),
        ("alias", "Element {name} has not been found in the sources of the query"),
    ]),
    message!("ref-undefined-param", Error, false, [
        ("std", "Entity {art} has no parameter {name}"),
        ("none", "Parameter {name} has not been found"),
    ]),
    message!("ref-undefined-var", Error, false, [
        ("std", "Variable {name} has not been found"),
        ("element", "Variable {art} has no element {name}"),
    ]),
    message!("ref-undefined-enum", Error, true, [
        ("std", "Enum symbol {name} is not defined in {art}"),
        ("no-enum", "Enum symbol {name} can't be used here, as {art} is not an enum type"),
    ]),
    message!("ref-ambiguous", Error, false, [
        ("std", "Ambiguous {name}, replace by {names}"),
    ]),
    message!("ref-expected-type", Error, false, [
        ("std", "A type or an element is expected here, but found {kind} {art}"),
    ]),
    message!("ref-expected-struct", Error, false, [
        ("std", "A structured type, entity or aspect is expected here, but found {kind} {art}"),
    ]),
    message!("ref-expected-entity", Error, false, [
        ("std", "An entity is expected here, but found {kind} {art}"),
    ]),
    message!("ref-expected-aspect", Error, false, [
        ("std", "An aspect is expected here, but found {kind} {art}"),
    ]),
    message!("ref-expected-source", Error, false, [
        ("std", "A query source must be an entity or an association, but found {kind} {art}"),
    ]),
    message!("ref-unexpected-autoexposed", Error, false, [
        ("std", "An auto-exposed entity can't be referred to, but {art} is auto-exposed"),
    ]),
    message!("ref-unexpected-self", Error, false, [
        ("std", "Path {name} can't be used here"),
    ]),
    message!("ref-unexpected-assoc", Error, true, [
        ("std", "An unmanaged association can't be used here, but {art} is one"),
    ]),
    message!("ref-unexpected-args", Error, false, [
        ("std", "Artifact {art} has no parameters, arguments can't be provided"),
    ]),
    message!("ref-invalid-navigation", Error, false, [
        ("std", "Can't follow {name}, {art} is not structured"),
        ("many", "Can't follow {name}, {art} is an array"),
    ]),
    message!("ref-invalid-backlink", Error, false, [
        ("std", "Association {art} does not point back to {target}, it can't be compared to $self"),
    ]),
    message!("ref-cyclic", Error, false, [
        ("std", "Illegal circular reference to {art}"),
        ("generic", "Illegal circular dependency between {names}"),
    ]),
    // ------------------------------------------------------------------------
    // Annotations and extensions
    // ------------------------------------------------------------------------
    message!("anno-undefined-art", Warning, true, [
        ("std", "No artifact has been found with name {name}"),
    ]),
    message!("anno-undefined-element", Warning, true, [
        ("std", "Element {name} has not been found in {art}"),
    ]),
    message!("anno-undefined-action", Warning, true, [
        ("std", "Action {name} has not been found in {art}"),
    ]),
    message!("anno-undefined-param", Warning, true, [
        ("std", "Parameter {name} has not been found in {art}"),
    ]),
    message!("anno-duplicate", Warning, true, [
        ("std", "Duplicate assignment of {name} to {art}"),
    ]),
    message!("anno-duplicate-same-file", Warning, true, [
        ("std", "Duplicate assignment of {name} to {art} in the same file"),
    ]),
    message!("anno-duplicate-unrelated-layer", Warning, true, [
        ("std", "Assignments of {name} to {art} from unrelated layers, the result is not defined"),
    ]),
    message!("anno-unexpected-ellipsis", Error, true, [
        ("std", "No base array value for the \"...\" of {name} on {art}"),
        ("position", "Only the last \"...\" of {name} may be used without \"up to\""),
    ]),
    message!("anno-mismatched-ellipsis", Error, true, [
        ("std", "The \"up to\" value in {name} on {art} does not match any item of the base array"),
    ]),
    message!("extend-unexpected-kind", Error, false, [
        ("std", "A {kind} can't be extended"),
        ("elements", "Elements can't be added to {kind} {art}"),
        ("generated", "Generated artifact {art} can't be extended"),
    ]),
    message!("extend-unrelated-layer", Info, true, [
        ("std", "Unstable element order due to other extension in file of line {line}"),
    ]),
    message!("duplicate-definition", Error, false, [
        ("std", "Duplicate definition of {name} in {art}"),
    ]),
    message!("ext-invalid-override", Error, false, [
        ("std", "Element {name} of {art} can't be redefined with a different structure"),
        ("assoc", "Element {name} of {art} can't be redefined, association and non-association differ"),
    ]),
    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------
    message!("query-req-name", Error, false, [
        ("std", "Alias name is required for this select item"),
    ]),
    message!("wildcard-ambiguous", Error, false, [
        ("std", "Ambiguous wildcard, element {name} is provided by {names}"),
    ]),
];

/// Look up a message definition.
pub fn message_def(id: &str) -> Option<&'static MessageDef> {
    MESSAGES.iter().find(|m| m.id == id)
}

/// Render a name as `"name"`, quoting non-identifiers as `"![na me]"`.
pub fn quote_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars.next().is_some_and(|c| {
                c == '$' || c == '_' || unicode_ident::is_xid_start(c)
            }) && chars.all(unicode_ident::is_xid_continue)
        });
    if plain {
        format!("\"{name}\"")
    } else {
        format!("\"![{name}]\"")
    }
}

/// Fill the template of `def` with `params`; `display` renders artifacts.
pub fn render(
    def: &MessageDef,
    params: &MessageParams,
    display: &dyn Fn(ArtifactId) -> String,
) -> String {
    let template = def.text(params.variant);
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let placeholder = &after[..close];
        match placeholder {
            "art" => out.push_str(&quoted_art(params.art, display)),
            "target" => out.push_str(&quoted_art(params.target, display)),
            "name" => out.push_str(&params.name.as_deref().map(quote_name).unwrap_or_default()),
            "names" => {
                let names: Vec<String> = params.names.iter().map(|n| quote_name(n)).collect();
                out.push_str(&names.join(", "));
            }
            "kind" => out.push_str(params.kind.unwrap_or("artifact")),
            "line" => out.push_str(&params.line.map(|l| l.to_string()).unwrap_or_default()),
            other => {
                out.push('{');
                out.push_str(other);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn quoted_art(art: Option<ArtifactId>, display: &dyn Fn(ArtifactId) -> String) -> String {
    art.map(|a| format!("\"{}\"", display(a))).unwrap_or_default()
}
