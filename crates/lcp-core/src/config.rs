//! Build environment captured once per invocation.
//!
//! Nothing in this crate reads process state directly: the binary builds a
//! [`BuildEnv`] and threads it through version resolution and the archive
//! build.

use std::path::{Path, PathBuf};

pub const CI_VAR: &str = "CI";
pub const BUILD_COUNTER_VAR: &str = "GITHUB_RUN_NUMBER";

/// What to do when a `replace` operation finds nothing to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissPolicy {
    #[default]
    Warn,
    Fail,
}

impl MissPolicy {
    /// CI builds fail on a miss; local builds only warn.
    pub fn default_for(ci: bool) -> Self {
        if ci { MissPolicy::Fail } else { MissPolicy::Warn }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    pub ci: bool,
    pub build_counter: Option<String>,
    pub miss_policy: MissPolicy,
}

impl BuildEnv {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn ci(build_counter: Option<&str>) -> Self {
        Self {
            ci: true,
            build_counter: build_counter.map(str::to_string),
            miss_policy: MissPolicy::default_for(true),
        }
    }

    /// Reads `CI` and `GITHUB_RUN_NUMBER` through `lookup`. CI mode is on
    /// only when `CI` is exactly `"true"`; an empty counter counts as unset.
    /// The miss policy starts at [`MissPolicy::default_for`] the CI mode.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ci = lookup(CI_VAR).as_deref() == Some("true");
        Self {
            ci,
            build_counter: lookup(BUILD_COUNTER_VAR).filter(|c| !c.is_empty()),
            miss_policy: MissPolicy::default_for(ci),
        }
    }

    pub fn with_miss_policy(mut self, policy: MissPolicy) -> Self {
        self.miss_policy = policy;
        self
    }

    /// The counter that replaces the patch segment, if one applies.
    pub fn active_counter(&self) -> Option<&str> {
        if self.ci {
            self.build_counter.as_deref().filter(|c| !c.is_empty())
        } else {
            None
        }
    }
}

pub const MANIFEST_FILENAME: &str = "lcp_manifest.json";
pub const TEMPLATE_MAP_FILENAME: &str = "template-map.json";
pub const ARCHIVE_EXTENSION: &str = "lcp";

/// Directory conventions of a content project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub template_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub schema_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            source_dir: root.join("src"),
            build_dir: root.join("build"),
            template_dir: root.join("templates"),
            metadata_path: root.join("package.json"),
            schema_dir: root
                .join("deps")
                .join("vscode-comp-con-content-authoring")
                .join("schemas"),
            root,
        }
    }

    pub fn template_map_path(&self) -> PathBuf {
        self.template_dir.join(TEMPLATE_MAP_FILENAME)
    }

    pub fn archive_path(&self, name: &str, version: &str) -> PathBuf {
        self.build_dir.join(lcp_filename(name, version))
    }
}

pub fn lcp_filename(name: &str, version: &str) -> String {
    format!("{}_{}.{}", name, version, ARCHIVE_EXTENSION)
}
