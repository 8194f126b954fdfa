//! Declaration locator: pick the struct declarations a run should touch.

use crate::config::UpdateSpec;
use crate::model::SourceFile;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Which declaration names are eligible for merging.
#[derive(Debug, Clone, Default)]
pub enum TargetSelector {
    /// Every type named in the update specification.
    #[default]
    UpdateSpec,
    /// An explicit set of names.
    Names(BTreeSet<String>),
    /// Names matching a regular expression.
    Pattern(Regex),
}

impl TargetSelector {
    pub fn matches(&self, name: &str, spec: &UpdateSpec) -> bool {
        match self {
            Self::UpdateSpec => spec.contains_type(name),
            Self::Names(names) => names.contains(name),
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

/// Find struct declarations whose name satisfies `is_target`, keyed by name
/// and pointing into `file.declarations`. When several declarations share a
/// name, the last one visited wins.
pub fn find(file: &SourceFile, is_target: impl Fn(&str) -> bool) -> BTreeMap<String, usize> {
    let mut found = BTreeMap::new();
    for (index, decl) in file.declarations.iter().enumerate() {
        if is_target(&decl.name) {
            found.insert(decl.name.clone(), index);
        }
    }
    found
}
