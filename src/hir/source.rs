//! Source files of a model: the file-level lexical environment and the
//! dependency declarations used for layering.

use smol_str::SmolStr;

use super::artifact::Members;
use super::ids::ExtensionId;
use crate::base::{Location, SourceId};

/// `using my.long.Name as Alias;`
#[derive(Clone, Debug, PartialEq)]
pub struct Using {
    pub alias: SmolStr,
    /// Absolute name of the imported artifact.
    pub target: SmolStr,
    pub location: Location,
}

/// A parsed source file.
#[derive(Clone, Debug)]
pub struct Source {
    pub id: SourceId,
    pub filename: SmolStr,
    pub namespace: Option<SmolStr>,
    pub usings: Vec<Using>,
    /// Top-level definitions of this file by their first name segment.
    pub artifacts: Members,
    /// Sources this one depends on (`using from`), as computed by the
    /// module loader.
    pub dependencies: Vec<SourceId>,
    /// Top-level `extend`/`annotate` statements of this file.
    pub extensions: Vec<ExtensionId>,
}

impl Source {
    pub fn new(id: SourceId, filename: impl Into<SmolStr>) -> Self {
        Self {
            id,
            filename: filename.into(),
            namespace: None,
            usings: Vec::new(),
            artifacts: Members::new(),
            dependencies: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Look up a `using` alias.
    pub fn using(&self, alias: &str) -> Option<&Using> {
        self.usings.iter().find(|u| u.alias == alias)
    }
}
