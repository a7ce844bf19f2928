//! Assembling a versioned content pack from the source tree.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};

use crate::archive::{Archive, SourceFile, read_source_dir};
use crate::config::{BuildEnv, MANIFEST_FILENAME, ProjectLayout};
use crate::error::{LcpError, Result};
use crate::template::{
    FragmentDir, FragmentSource, TemplateDescriptor, TemplateInjector, descriptors_for,
    load_template_map,
};
use crate::version::{self, ContentVersion};

/// Template map plus the injector that runs it.
pub struct Templating<F> {
    pub descriptors: Vec<TemplateDescriptor>,
    pub injector: TemplateInjector<F>,
}

impl<F: FragmentSource> Templating<F> {
    pub fn new(descriptors: Vec<TemplateDescriptor>, injector: TemplateInjector<F>) -> Self {
        Self {
            descriptors,
            injector,
        }
    }
}

/// Builds the archive entries for `sources`.
///
/// With templating, each file is run through the descriptors targeting it.
/// Without templating under CI, the manifest's `version` is overwritten with
/// the resolved version. Every other file is copied verbatim. Entries keep
/// their names and order.
pub fn build_archive<F: FragmentSource>(
    sources: &[SourceFile],
    version: &ContentVersion,
    env: &BuildEnv,
    templating: Option<&Templating<F>>,
) -> Result<Archive> {
    if sources.is_empty() {
        return Err(LcpError::EmptySource);
    }
    if !sources.iter().any(|s| s.name == MANIFEST_FILENAME) {
        return Err(LcpError::MissingManifest(MANIFEST_FILENAME));
    }
    let mut archive = Archive::new();
    for file in sources {
        debug!(file = %file.name, "adding");
        let bytes = build_entry(file, version, env, templating)
            .map_err(|e| LcpError::in_file(&file.name, e))?;
        archive.add(file.name.as_str(), bytes);
    }
    Ok(archive)
}

fn build_entry<F: FragmentSource>(
    file: &SourceFile,
    version: &ContentVersion,
    env: &BuildEnv,
    templating: Option<&Templating<F>>,
) -> Result<Vec<u8>> {
    match templating {
        Some(t) => {
            let applicable = descriptors_for(&t.descriptors, &file.name);
            if applicable.is_empty() {
                return Ok(file.bytes.clone());
            }
            Ok(t.injector.apply(&file.name, &file.bytes, &applicable)?.bytes)
        }
        None if env.ci && file.name == MANIFEST_FILENAME => {
            stamp_manifest(&file.bytes, &version.version)
        }
        None => Ok(file.bytes.clone()),
    }
}

fn stamp_manifest(raw: &[u8], version: &str) -> Result<Vec<u8>> {
    let mut manifest: Value = serde_json::from_slice(raw)?;
    match manifest.as_object_mut() {
        Some(map) => {
            map.insert("version".to_string(), Value::String(version.to_string()));
        }
        None => {
            return Err(LcpError::InvalidManifest(
                "top level is not an object".to_string(),
            ));
        }
    }
    Ok(serde_json::to_vec(&manifest)?)
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub run_templates: bool,
}

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub version: ContentVersion,
    pub archive_path: PathBuf,
    pub entries: usize,
}

/// Full build of a project: resolve the version, recreate the build
/// directory, assemble the archive and write `{name}_{version}.lcp`.
pub fn build_project(
    layout: &ProjectLayout,
    env: &BuildEnv,
    opts: &BuildOptions,
) -> Result<BuildOutput> {
    info!("building LCP");
    let version = version::resolve_from_metadata(&layout.metadata_path, env)?;
    info!(output = %version.archive_filename(), "resolved version");

    info!(dir = %layout.build_dir.display(), "clearing build directory");
    if layout.build_dir.exists() {
        fs::remove_dir_all(&layout.build_dir)?;
    }
    fs::create_dir_all(&layout.build_dir)?;

    let templating = if opts.run_templates {
        let descriptors = load_template_map(&layout.template_map_path())?;
        info!(count = descriptors.len(), "loaded templates to insert");
        let injector =
            TemplateInjector::new(FragmentDir::new(layout.template_dir.clone()), env.miss_policy);
        Some(Templating::new(descriptors, injector))
    } else {
        None
    };

    info!(dir = %layout.source_dir.display(), "loading source files");
    let sources = read_source_dir(&layout.source_dir)?;
    let archive = build_archive(&sources, &version, env, templating.as_ref())?;

    let dest = layout.archive_path(&version.name, &version.version);
    info!(path = %dest.display(), entries = archive.len(), "writing archive");
    let archive_path = archive.write_to_path(&dest)?;
    Ok(BuildOutput {
        version,
        archive_path,
        entries: archive.len(),
    })
}
