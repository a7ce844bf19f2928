//! lcp-core: packaging of LCP content packs
//!
//! This crate keeps the build pipeline small and explicit:
//! - Slash-delimited property paths into JSON records (`pointer`)
//! - Markup fragment insertion driven by a template map (`template`)
//! - Versioned `{name}_{version}.lcp` archive build (`build`, `version`)
//! - JSON-only extraction back into a source tree (`extract`)
//! - Schema verification of source records (`verify`)
//!
pub mod archive;
pub mod build;
pub mod config;
pub mod error;
pub mod extract;
pub mod pointer;
pub mod template;
pub mod verify;
pub mod version;

pub use archive::{Archive, SourceFile, read_source_dir};
pub use build::{BuildOptions, BuildOutput, Templating, build_archive, build_project};
pub use config::{BuildEnv, MANIFEST_FILENAME, MissPolicy, ProjectLayout, lcp_filename};
pub use error::{LcpError, Result};
pub use extract::{extract, extract_file};
pub use template::{
    FragmentDir, FragmentSource, Injection, TemplateDescriptor, TemplateInjector, TemplateMiss,
    TemplateOperation, collapse_whitespace,
};
pub use verify::{JsonSchemaValidator, SchemaValidator, VerifyReport, verify_dir};
pub use version::ContentVersion;
