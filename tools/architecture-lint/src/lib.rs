//! Repo-local lint that keeps the storefront crate hexagonal.
//!
//! The storefront client is split into `domain` (session state, guards,
//! ports), `inbound` (the command-line driver) and `outbound` (the HTTP
//! adapter). The lint walks each layer's sources and rejects:
//!
//! - `domain` code reaching into adapters, HTTP clients, CLI parsing,
//!   configuration loading, or process-global I/O
//! - `inbound` code importing the HTTP adapter or its client library
//! - `outbound` code importing the driver or CLI crates
//!
//! Run it with `cargo run -p architecture-lint` from anywhere in the
//! workspace.

use std::collections::BTreeSet;
use std::io::{self, Read};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use syn::visit::Visit;
use thiserror::Error;

/// Name the storefront crate is imported under from its own tests and bins.
const CRATE_NAME: &str = "storefront";

/// A single boundary violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File path relative to `storefront/src`.
    pub file: Utf8PathBuf,
    /// Which rule was broken.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file, self.message)
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug, Error)]
pub enum ArchitectureLintError {
    /// Walking or reading the source tree failed.
    #[error("I/O error while linting architecture: {0}")]
    Io(#[from] io::Error),
    /// A file could not be parsed or placed in a layer.
    #[error("cannot lint {file}: {message}")]
    Parse {
        /// Offending file.
        file: Utf8PathBuf,
        /// Parser or layout diagnostic.
        message: String,
    },
    /// One or more boundary violations were found.
    #[error("architecture boundary violations:\n{}", render_violations(.0))]
    Violations(Vec<Violation>),
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("- {violation}\n"))
        .collect()
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `storefront/src`.
    pub file: Utf8PathBuf,
    /// File contents.
    pub contents: String,
}

impl LintSource {
    /// Convenience constructor for tests.
    pub fn new(file: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            contents: contents.into(),
        }
    }
}

/// Lint the storefront crate on disk.
///
/// `crate_dir` is the `storefront/` directory; only `src/domain`,
/// `src/inbound` and `src/outbound` are inspected.
pub fn lint_storefront_sources(crate_dir: &Utf8Path) -> Result<(), ArchitectureLintError> {
    let src = Dir::open_ambient_dir(crate_dir.join("src"), ambient_authority())?;
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let Ok(dir) = src.open_dir(layer.name()) else {
            continue;
        };
        collect_sources(&dir, Utf8Path::new(layer.name()), &mut sources)?;
    }
    lint_sources(&sources)
}

/// Lint in-memory sources. Intended for unit and behaviour tests.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let layer = Layer::of(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is outside the domain, inbound and outbound layers".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(check_file(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

/// Hexagon layer inferred from the first path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Outbound,
}

impl Layer {
    const ALL: [Self; 3] = [Self::Domain, Self::Inbound, Self::Outbound];

    fn of(relative: &Utf8Path) -> Option<Self> {
        let first = relative.components().next()?.as_str();
        Self::ALL.into_iter().find(|layer| layer.name() == first)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    const fn forbidden_layers(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &["inbound", "outbound", "config"],
            Self::Inbound => &["outbound"],
            Self::Outbound => &["inbound", "config"],
        }
    }

    const fn forbidden_crates(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &[
                "reqwest",
                "clap",
                "ortho_config",
                "color_eyre",
                "tracing_subscriber",
                "actix_web",
            ],
            Self::Inbound => &["reqwest", "actix_web"],
            Self::Outbound => &["clap", "ortho_config", "color_eyre", "actix_web"],
        }
    }

    /// `std` paths that touch process-global state.
    const fn forbidden_std_paths(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &["env", "fs", "net", "process"],
            Self::Inbound | Self::Outbound => &[],
        }
    }
}

fn check_file(file: &Utf8Path, layer: Layer, parsed: &syn::File) -> Vec<Violation> {
    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let layer_name = layer.name();
    let mut messages = BTreeSet::new();
    for segments in &collector.paths {
        if let Some(root) =
            internal_root(segments).filter(|root| layer.forbidden_layers().contains(root))
        {
            messages.insert(format!("{layer_name} module must not depend on crate::{root}"));
        }
        if let Some(root) =
            external_root(segments).filter(|root| layer.forbidden_crates().contains(root))
        {
            messages.insert(format!(
                "{layer_name} module must not depend on external crate `{root}`"
            ));
        }
        if let Some(module) =
            std_module(segments).filter(|module| layer.forbidden_std_paths().contains(module))
        {
            messages.insert(format!("{layer_name} module must not use std::{module}"));
        }
    }

    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

fn is_relative(segment: &str) -> bool {
    matches!(segment, "crate" | "self" | "super")
}

/// Top-level crate module a path names, if it is crate-internal.
fn internal_root(segments: &[String]) -> Option<&str> {
    let first = segments.first()?.as_str();
    if Layer::ALL.iter().any(|layer| layer.name() == first) {
        return Some(first);
    }
    let index = if is_relative(first) {
        segments
            .iter()
            .position(|segment| !is_relative(segment))?
    } else if first == CRATE_NAME {
        1
    } else {
        return None;
    };
    segments.get(index).map(String::as_str)
}

fn external_root(segments: &[String]) -> Option<&str> {
    let root = segments.first()?.as_str();
    (!is_relative(root) && root != CRATE_NAME).then_some(root)
}

fn std_module(segments: &[String]) -> Option<&str> {
    match segments {
        [root, module, ..] if root == "std" => Some(module.as_str()),
        _ => None,
    }
}

#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn record_use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.paths.insert(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, Vec::new());
    }
}

fn collect_sources(
    dir: &Dir,
    relative: &Utf8Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            return Err(ArchitectureLintError::Parse {
                file: relative.to_path_buf(),
                message: format!("non UTF-8 file name {name:?}"),
            });
        };
        let path = relative.join(name);
        if entry.file_type()?.is_dir() {
            collect_sources(&entry.open_dir()?, &path, sources)?;
        } else if path.extension() == Some("rs") {
            let mut contents = String::new();
            entry.open()?.read_to_string(&mut contents)?;
            sources.push(LintSource {
                file: path,
                contents,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
