//! `...` in array annotation values.

use smol_str::SmolStr;

use crate::hir::{AnnoValue, Annotation, ArtifactId, MessageParams};
use crate::semantic::Session;

impl Session {
    /// Replace the `...` items of `annotation` by items of `base`.
    ///
    /// `... up to v` takes the base items up to and including the first one
    /// matching `v`; a bare `...` takes all remaining base items and must be
    /// the last bare one.
    pub(super) fn splice_ellipsis(
        &mut self,
        art: ArtifactId,
        name: &SmolStr,
        annotation: &Annotation,
        base: Option<AnnoValue>,
    ) -> AnnoValue {
        let AnnoValue::Array(items) = &annotation.value else {
            return annotation.value.clone();
        };
        let location = annotation.location;
        let Some(AnnoValue::Array(base_items)) = base else {
            let params = MessageParams::new().art(art).name(name.clone());
            self.report("anno-unexpected-ellipsis", location, Some(art), params);
            return annotation.value.clone().without_ellipsis();
        };

        let last_bare = items
            .iter()
            .rposition(|i| matches!(i, AnnoValue::Ellipsis(None)));
        let mut spliced = Vec::with_capacity(items.len() + base_items.len());
        let mut next = 0;
        for (index, item) in items.iter().enumerate() {
            match item {
                AnnoValue::Ellipsis(None) => {
                    if Some(index) != last_bare {
                        let params = MessageParams::new()
                            .art(art)
                            .name(name.clone())
                            .variant("position");
                        self.report("anno-unexpected-ellipsis", location, Some(art), params);
                        continue;
                    }
                    spliced.extend(base_items[next..].iter().cloned());
                    next = base_items.len();
                }
                AnnoValue::Ellipsis(Some(up_to)) => {
                    let found = (next..base_items.len())
                        .find(|&i| self.anno_matches(&base_items[i], up_to));
                    match found {
                        Some(end) => {
                            spliced.extend(base_items[next..=end].iter().cloned());
                            next = end + 1;
                        }
                        None => {
                            let params = MessageParams::new().art(art).name(name.clone());
                            self.report("anno-mismatched-ellipsis", location, Some(art), params);
                        }
                    }
                }
                other => spliced.push(other.clone()),
            }
        }
        AnnoValue::Array(spliced)
    }

    /// Does base item `item` match the `up to` value `pattern`?
    ///
    /// Paths match by their identifiers; a struct pattern matches if all
    /// its fields match.
    fn anno_matches(&self, item: &AnnoValue, pattern: &AnnoValue) -> bool {
        match (item, pattern) {
            (AnnoValue::Ref(a), AnnoValue::Ref(b)) => {
                self.model.reference(*a).same_path(self.model.reference(*b))
            }
            (AnnoValue::Struct(fields), AnnoValue::Struct(wanted)) => {
                wanted.iter().all(|(key, value)| {
                    fields
                        .get(key)
                        .is_some_and(|field| self.anno_matches(field, value))
                })
            }
            _ => item == pattern,
        }
    }
}
