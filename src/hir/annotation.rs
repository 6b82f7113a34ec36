//! Annotation assignments and values.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::artifact::Inferred;
use super::ids::RefId;
use crate::base::Location;

/// The value of an annotation assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnoValue {
    /// `@A: null`: the explicit "delete" sentinel.
    Null,
    Bool(bool),
    Number(SmolStr),
    String(SmolStr),
    EnumSymbol(SmolStr),
    /// A path value, `@A: elem`.
    Ref(RefId),
    Array(Vec<AnnoValue>),
    Struct(IndexMap<SmolStr, AnnoValue>),
    /// `...` inside an array, optionally bounded by `up to <value>`.
    Ellipsis(Option<Box<AnnoValue>>),
}

impl AnnoValue {
    pub fn string(s: &str) -> Self {
        AnnoValue::String(SmolStr::new(s))
    }

    pub fn number(n: i64) -> Self {
        AnnoValue::Number(SmolStr::new(n.to_string()))
    }

    /// `...` without bound.
    pub fn ellipsis() -> Self {
        AnnoValue::Ellipsis(None)
    }

    /// `... up to <value>`.
    pub fn ellipsis_up_to(value: AnnoValue) -> Self {
        AnnoValue::Ellipsis(Some(Box::new(value)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AnnoValue::Null)
    }

    /// An array value with at least one `...` item.
    pub fn has_ellipsis(&self) -> bool {
        match self {
            AnnoValue::Array(items) => items.iter().any(|i| matches!(i, AnnoValue::Ellipsis(_))),
            _ => false,
        }
    }

    /// Drop all `...` items of an array value.
    pub fn without_ellipsis(self) -> Self {
        match self {
            AnnoValue::Array(items) => AnnoValue::Array(
                items
                    .into_iter()
                    .filter(|i| !matches!(i, AnnoValue::Ellipsis(_)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// All path values in this value, in order.
    pub fn collect_refs(&self, out: &mut Vec<RefId>) {
        match self {
            AnnoValue::Ref(id) => out.push(*id),
            AnnoValue::Array(items) => items.iter().for_each(|i| i.collect_refs(out)),
            AnnoValue::Struct(fields) => fields.values().for_each(|v| v.collect_refs(out)),
            AnnoValue::Ellipsis(Some(up_to)) => up_to.collect_refs(out),
            _ => {}
        }
    }
}

/// An annotation assignment `@name: value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub value: AnnoValue,
    pub location: Location,
    pub inferred: Option<Inferred>,
}

impl Annotation {
    pub fn new(value: AnnoValue, location: Location) -> Self {
        Self {
            value,
            location,
            inferred: None,
        }
    }

    pub fn is_inferred(&self) -> bool {
        self.inferred.is_some()
    }
}

/// Normalize an annotation name to carry the `@` prefix.
pub fn anno_name(name: &str) -> SmolStr {
    if name.starts_with('@') {
        SmolStr::new(name)
    } else {
        SmolStr::new(format!("@{name}"))
    }
}
