// API surface data model - some helpers reserved for embedders
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An Android API level. Level 1 is the first platform release.
pub type ApiLevel = u32;

/// The version triple carried by every class and member.
///
/// `since` is always present; a missing `deprecated_in`/`removed_in` means
/// the entity was never deprecated/removed in the described surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersions {
    /// API level at which the entity was introduced
    pub since: ApiLevel,
    /// API level at which the entity was deprecated
    pub deprecated_in: Option<ApiLevel>,
    /// API level at which the entity was removed
    pub removed_in: Option<ApiLevel>,
}

impl ApiVersions {
    pub fn new(since: ApiLevel) -> Self {
        Self {
            since,
            deprecated_in: None,
            removed_in: None,
        }
    }

    /// Check the ordering invariants of the triple.
    ///
    /// `since >= 1`, `since <= deprecated_in`, `since <= removed_in`, and
    /// `deprecated_in <= removed_in` when both are present.
    pub fn is_consistent(&self) -> bool {
        if self.since < 1 {
            return false;
        }
        if let Some(deprecated) = self.deprecated_in {
            if deprecated < self.since {
                return false;
            }
            if let Some(removed) = self.removed_in {
                if removed < deprecated {
                    return false;
                }
            }
        }
        if let Some(removed) = self.removed_in {
            if removed < self.since {
                return false;
            }
        }
        true
    }
}

impl std::fmt::Display for ApiVersions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "since {}", self.since)?;
        if let Some(deprecated) = self.deprecated_in {
            write!(f, ", deprecated {}", deprecated)?;
        }
        if let Some(removed) = self.removed_in {
            write!(f, ", removed {}", removed)?;
        }
        Ok(())
    }
}

/// A superclass or interface link, with the API level at which the
/// relationship was introduced (a class can pick up interfaces in later
/// releases).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRef {
    /// Canonical name of the referenced class or interface
    pub name: String,
    /// API level at which the relationship appeared
    pub since: ApiLevel,
}

/// One class in the described API surface.
///
/// Method tables are keyed by `name(args)` with the JVM return type
/// stripped; field tables are keyed by the plain field name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClass {
    /// Canonical name: slash package separators, `$` nesting separators
    pub name: String,
    /// The class's own version triple
    pub versions: ApiVersions,
    /// Superclass chain links (usually one, but versioned reparenting happens)
    pub superclasses: Vec<ApiRef>,
    /// Implemented interface links
    pub interfaces: Vec<ApiRef>,
    /// Declared methods, keyed by overload signature
    pub methods: HashMap<String, ApiVersions>,
    /// Declared fields, keyed by field name
    pub fields: HashMap<String, ApiVersions>,
}

impl ApiClass {
    pub fn new(name: String, versions: ApiVersions) -> Self {
        Self {
            name,
            versions,
            superclasses: Vec::new(),
            interfaces: Vec::new(),
            methods: HashMap::new(),
            fields: HashMap::new(),
        }
    }

    /// The package portion of the canonical name, if the class is packaged.
    pub fn package(&self) -> Option<&str> {
        self.name.rsplit_once('/').map(|(package, _)| package)
    }

    /// All hierarchy links, superclasses first.
    pub fn links(&self) -> impl Iterator<Item = &ApiRef> {
        self.superclasses.iter().chain(self.interfaces.iter())
    }
}

/// A denormalized member row returned from bulk queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMember {
    /// Overload signature for methods, plain name for fields
    pub signature: String,
    pub since: ApiLevel,
    pub deprecated_in: Option<ApiLevel>,
    pub removed_in: Option<ApiLevel>,
}

impl std::fmt::Display for ApiMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let versions = ApiVersions {
            since: self.since,
            deprecated_in: self.deprecated_in,
            removed_in: self.removed_in,
        };
        write!(f, "{} ({})", self.signature, versions)
    }
}

/// The whole parsed API surface.
#[derive(Debug, Clone)]
pub struct Api {
    /// Schema version declared by the source document
    pub schema_version: u32,
    /// All classes, keyed by canonical name
    pub classes: HashMap<String, ApiClass>,
}

impl Api {
    pub fn new(schema_version: u32) -> Self {
        Self {
            schema_version,
            classes: HashMap::new(),
        }
    }

    /// Every package that contains at least one class.
    pub fn packages(&self) -> HashSet<String> {
        self.classes
            .values()
            .filter_map(|class| class.package().map(str::to_string))
            .collect()
    }

    /// Highest API level mentioned anywhere in the surface.
    pub fn highest_level(&self) -> ApiLevel {
        let mut highest = 0;
        for class in self.classes.values() {
            highest = highest.max(triple_peak(&class.versions));
            for link in class.links() {
                highest = highest.max(link.since);
            }
            for versions in class.methods.values().chain(class.fields.values()) {
                highest = highest.max(triple_peak(versions));
            }
        }
        highest
    }
}

fn triple_peak(versions: &ApiVersions) -> ApiLevel {
    versions
        .since
        .max(versions.deprecated_in.unwrap_or(0))
        .max(versions.removed_in.unwrap_or(0))
}
