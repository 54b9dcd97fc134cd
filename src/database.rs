//! The API availability database and its query surface.
//!
//! Answers "at what API level did X appear / get deprecated / get removed"
//! for classes, methods, fields, and cast targets. Negative results are
//! `None` (or an empty listing), never errors: an unknown class, an
//! unknown member, or a descriptor that matches no overload all mean "no
//! version requirement known".

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use miette::{miette, IntoDiagnostic, Result, WrapErr};
use tracing::debug;

use crate::cache;
use crate::client::ApiClient;
use crate::model::{Api, ApiClass, ApiLevel, ApiMember, ApiVersions};
use crate::names;
use crate::parser;

#[derive(Clone, Copy)]
enum MemberKind {
    Method,
    Field,
}

impl MemberKind {
    fn table<'a>(&self, class: &'a ApiClass) -> &'a HashMap<String, ApiVersions> {
        match self {
            MemberKind::Method => &class.methods,
            MemberKind::Field => &class.fields,
        }
    }
}

/// An immutable, query-ready view of one platform's API surface.
///
/// Construction goes through the cache protocol in [`crate::cache`];
/// queries are pure reads and the type is `Send + Sync`.
pub struct ApiDatabase {
    api: Api,
    platform: ApiLevel,
    packages: HashSet<String>,
    cache_path: Option<PathBuf>,
    loaded_from_cache: bool,
}

impl ApiDatabase {
    /// Build a database for the environment described by `client`.
    ///
    /// Uses the binary cache when it is present and valid; otherwise parses
    /// the XML description and rewrites the cache. Cache damage is reported
    /// through `client.log` and recovered, never raised.
    pub fn open(client: &dyn ApiClient, platform: ApiLevel) -> Result<Self> {
        let source = client.find_api_database().ok_or_else(|| {
            miette!("no api-versions.xml found; configure an SDK root or pass an explicit file")
        })?;
        let outcome = cache::load_or_rebuild(client, &source, platform)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to load API description {}", source.display()))?;
        debug!(
            "API database ready: {} classes, platform {}, cached={}",
            outcome.api.classes.len(),
            platform,
            outcome.loaded_from_cache
        );
        Ok(Self::from_parts(
            outcome.api,
            platform,
            outcome.cache_path,
            outcome.loaded_from_cache,
        ))
    }

    /// Parse an XML description directly, bypassing any cache.
    pub fn from_file(path: &Path, platform: ApiLevel) -> Result<Self> {
        let api = parser::parse_file(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::from_parts(api, platform, None, false))
    }

    /// Parse an in-memory XML description, bypassing any cache.
    pub fn from_document(contents: &str, platform: ApiLevel) -> Result<Self> {
        let api = parser::parse_document(contents).into_diagnostic()?;
        Ok(Self::from_parts(api, platform, None, false))
    }

    fn from_parts(
        api: Api,
        platform: ApiLevel,
        cache_path: Option<PathBuf>,
        loaded_from_cache: bool,
    ) -> Self {
        let packages = api.packages();
        Self {
            api,
            platform,
            packages,
            cache_path,
            loaded_from_cache,
        }
    }

    // --- class queries ---

    pub fn class_since(&self, class: &str) -> Option<ApiLevel> {
        self.lookup_class(class).map(|c| c.versions.since)
    }

    pub fn class_deprecated_in(&self, class: &str) -> Option<ApiLevel> {
        self.lookup_class(class).and_then(|c| c.versions.deprecated_in)
    }

    pub fn class_removed_in(&self, class: &str) -> Option<ApiLevel> {
        self.lookup_class(class).and_then(|c| c.versions.removed_in)
    }

    // --- member queries ---

    /// API level at which the method became callable on `class`.
    ///
    /// Constructors are matched only against `class` itself; everything
    /// else resolves through the superclass chain and transitively through
    /// interface chains. A member reached over a link introduced at level L
    /// is not callable before L, so the reported level is the minimum over
    /// paths of `max(member since, link levels along the path)`.
    pub fn method_since(&self, class: &str, name: &str, descriptor: &str) -> Option<ApiLevel> {
        let start = self.lookup_class(class)?;
        let key = names::method_key(name, descriptor);
        if name == "<init>" {
            return start.methods.get(&key).map(|v| v.since);
        }
        self.earliest_since(start, &key, MemberKind::Method)
    }

    pub fn method_deprecated_in(&self, class: &str, name: &str, descriptor: &str) -> Option<ApiLevel> {
        self.method_versions(class, name, descriptor)
            .and_then(|v| v.deprecated_in)
    }

    pub fn method_removed_in(&self, class: &str, name: &str, descriptor: &str) -> Option<ApiLevel> {
        self.method_versions(class, name, descriptor)
            .and_then(|v| v.removed_in)
    }

    pub fn field_since(&self, class: &str, name: &str) -> Option<ApiLevel> {
        let start = self.lookup_class(class)?;
        self.earliest_since(start, name, MemberKind::Field)
    }

    pub fn field_deprecated_in(&self, class: &str, name: &str) -> Option<ApiLevel> {
        self.field_versions(class, name).and_then(|v| v.deprecated_in)
    }

    pub fn field_removed_in(&self, class: &str, name: &str) -> Option<ApiLevel> {
        self.field_versions(class, name).and_then(|v| v.removed_in)
    }

    /// The declared version triple of the closest declaration of a method,
    /// walking the hierarchy outward from `class`.
    ///
    /// Deprecation and removal are reported exactly as declared on that
    /// closest declaration: an ancestor's deprecation never leaks into a
    /// redeclaring subclass, and link levels do not adjust the answer.
    fn method_versions(&self, class: &str, name: &str, descriptor: &str) -> Option<&ApiVersions> {
        let start = self.lookup_class(class)?;
        let key = names::method_key(name, descriptor);
        if name == "<init>" {
            return start.methods.get(&key);
        }
        self.closest_declaration(start, &key, MemberKind::Method)
    }

    fn field_versions(&self, class: &str, name: &str) -> Option<&ApiVersions> {
        let start = self.lookup_class(class)?;
        self.closest_declaration(start, name, MemberKind::Field)
    }

    // --- cast queries ---

    /// API level at which a value of `from` can be cast or assigned to
    /// `to`, i.e. when the hierarchy relationship was introduced. `None`
    /// when no relationship exists or either class is unknown.
    pub fn valid_cast_version(&self, from: &str, to: &str) -> Option<ApiLevel> {
        let from_class = self.lookup_class(from)?;
        let to_class = self.lookup_class(to)?;
        let base = from_class.versions.since.max(to_class.versions.since);
        if from_class.name == to_class.name {
            return Some(base);
        }

        let mut best: Option<ApiLevel> = None;
        let mut seen: HashMap<&str, ApiLevel> = HashMap::new();
        let mut work: Vec<(&ApiClass, ApiLevel)> = vec![(from_class, 0)];
        seen.insert(from_class.name.as_str(), 0);
        while let Some((class, floor)) = work.pop() {
            for link in class.links() {
                let next_floor = floor.max(link.since);
                if link.name == to_class.name {
                    let candidate = base.max(next_floor);
                    best = Some(best.map_or(candidate, |b| b.min(candidate)));
                }
                let Some(target) = self.api.classes.get(&link.name) else {
                    continue;
                };
                if seen
                    .get(target.name.as_str())
                    .map_or(true, |&f| next_floor < f)
                {
                    seen.insert(target.name.as_str(), next_floor);
                    work.push((target, next_floor));
                }
            }
        }
        best
    }

    // --- bulk queries ---

    /// Methods of `class` that were removed at some level, excluding
    /// members that merely moved to a supertype.
    pub fn removed_methods(&self, class: &str) -> Vec<ApiMember> {
        self.removed_members(class, MemberKind::Method)
    }

    /// Fields of `class` that were removed at some level, excluding
    /// members that merely moved to a supertype.
    pub fn removed_fields(&self, class: &str) -> Vec<ApiMember> {
        self.removed_members(class, MemberKind::Field)
    }

    fn removed_members(&self, class: &str, kind: MemberKind) -> Vec<ApiMember> {
        let Some(start) = self.lookup_class(class) else {
            return Vec::new();
        };
        let mut members: Vec<ApiMember> = kind
            .table(start)
            .iter()
            .filter(|(_, versions)| versions.removed_in.is_some())
            .filter(|(key, _)| !self.moved_to_supertype(start, key, kind))
            .map(|(key, versions)| ApiMember {
                signature: key.clone(),
                since: versions.since,
                deprecated_in: versions.deprecated_in,
                removed_in: versions.removed_in,
            })
            .collect();
        members.sort_by(|a, b| a.signature.cmp(&b.signature));
        members
    }

    // A removal that still resolves on an ancestor is a relocation, not a
    // deletion: the member remains callable through the supertype.
    fn moved_to_supertype(&self, start: &ApiClass, key: &str, kind: MemberKind) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&ApiClass> = VecDeque::new();
        visited.insert(start.name.as_str());
        self.enqueue_ancestors(start, &mut visited, &mut queue);
        while let Some(class) = queue.pop_front() {
            if let Some(versions) = kind.table(class).get(key) {
                if versions.removed_in.is_none() {
                    return true;
                }
            }
            self.enqueue_ancestors(class, &mut visited, &mut queue);
        }
        false
    }

    // --- package queries ---

    /// Whether a `java.*`/`javax.*` class name refers to a package that
    /// actually exists on this platform. Desktop-only packages such as
    /// `javax/swing` or `java/rmi` are absent from an Android description
    /// and report false.
    pub fn is_valid_java_package(&self, class_name: &str) -> bool {
        let package = match self.lookup_class(class_name) {
            Some(class) => class.package().map(str::to_string),
            None => names::canonicalize(class_name)
                .rsplit_once('/')
                .map(|(package, _)| package.to_string()),
        };
        let Some(package) = package else {
            return false;
        };
        let whitelisted = package == "java"
            || package == "javax"
            || package.starts_with("java/")
            || package.starts_with("javax/");
        whitelisted && self.packages.contains(&package)
    }

    // --- stats ---

    pub fn platform_version(&self) -> ApiLevel {
        self.platform
    }

    pub fn schema_version(&self) -> u32 {
        self.api.schema_version
    }

    pub fn class_count(&self) -> usize {
        self.api.classes.len()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Highest API level mentioned anywhere in the surface.
    pub fn highest_level(&self) -> ApiLevel {
        self.api.highest_level()
    }

    /// Cache file backing this database, if caching was in play.
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    pub fn loaded_from_cache(&self) -> bool {
        self.loaded_from_cache
    }

    // --- resolution internals ---

    fn lookup_class(&self, name: &str) -> Option<&ApiClass> {
        names::resolve(&self.api.classes, name)
    }

    fn enqueue_ancestors<'a>(
        &'a self,
        class: &'a ApiClass,
        visited: &mut HashSet<&'a str>,
        queue: &mut VecDeque<&'a ApiClass>,
    ) {
        for link in class.links() {
            if let Some(target) = self.api.classes.get(&link.name) {
                if visited.insert(target.name.as_str()) {
                    queue.push_back(target);
                }
            }
        }
    }

    // Min-max search: each worklist entry carries the highest link level on
    // the path so far (the floor below which the path does not exist). A
    // class is revisited only when reached over a cheaper path.
    fn earliest_since(&self, start: &ApiClass, key: &str, kind: MemberKind) -> Option<ApiLevel> {
        let mut best: Option<ApiLevel> = None;
        let mut seen: HashMap<&str, ApiLevel> = HashMap::new();
        let mut work: Vec<(&ApiClass, ApiLevel)> = vec![(start, 0)];
        seen.insert(start.name.as_str(), 0);
        while let Some((class, floor)) = work.pop() {
            if let Some(versions) = kind.table(class).get(key) {
                let candidate = versions.since.max(floor);
                best = Some(best.map_or(candidate, |b| b.min(candidate)));
            }
            for link in class.links() {
                let next_floor = floor.max(link.since);
                let Some(target) = self.api.classes.get(&link.name) else {
                    continue;
                };
                if seen
                    .get(target.name.as_str())
                    .map_or(true, |&f| next_floor < f)
                {
                    seen.insert(target.name.as_str(), next_floor);
                    work.push((target, next_floor));
                }
            }
        }
        best
    }

    // Level-order walk, the class itself first: the closest declaration
    // shadows everything above it.
    fn closest_declaration<'a>(
        &'a self,
        start: &'a ApiClass,
        key: &str,
        kind: MemberKind,
    ) -> Option<&'a ApiVersions> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&ApiClass> = VecDeque::new();
        visited.insert(start.name.as_str());
        queue.push_back(start);
        while let Some(class) = queue.pop_front() {
            if let Some(versions) = kind.table(class).get(key) {
                return Some(versions);
            }
            self.enqueue_ancestors(class, &mut visited, &mut queue);
        }
        None
    }
}
