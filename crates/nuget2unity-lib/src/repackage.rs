//! Repackager
//!
//! Merges the resolve, download, extract and packing steps into a single function [`repackage`] for convenience.

use std::path::{Path, PathBuf};

use crate::dependency_walker;
use crate::exclusion;
use crate::installation::{Materializer, MaterializedPackage};
use crate::package::*;
use crate::resolver;
use crate::unity;
use crate::{Config, Registry};

/// Options of a single run.
#[derive(Debug, Clone)]
pub struct RepackageOptions {
	/// Id of the root package.
	pub package: String,
	/// Exact root version, the latest listed release when `None`.
	pub version: Option<NuGetVersion>,
	/// Project to write assets into, a temporary directory is used when `None`.
	pub unity_project: Option<PathBuf>,
	/// Keep existing `.meta` files.
	pub include_meta: bool,
	/// Directory the `.unitypackage` is written to.
	pub output_path: PathBuf,
	pub skip_link_xml: bool,
}

impl RepackageOptions {
	pub fn new(package: impl Into<String>) -> Self {
		Self {
			package: package.into(),
			version: None,
			unity_project: None,
			include_meta: false,
			output_path: PathBuf::from("."),
			skip_link_xml: false,
		}
	}
}

/// Builds `{output_path}/{package}.unitypackage` holding the root package and its dependencies.
///
/// Nothing is written to `output_path` unless every step succeeds.
pub async fn repackage(config: &Config, registry: &Registry, options: &RepackageOptions) -> crate::Result<PathBuf> {
	let framework = config.framework();

	let version = match &options.version {
		Some(v) => v.clone(),
		None => registry.resolve_latest_version(&options.package, framework).await?,
	};
	let root = PackageIdentity::new(options.package.clone(), version);
	log::info!("Packaging {} for {}", root, framework);

	let graph = dependency_walker::walk(registry, &root, framework).await?;
	let resolved = resolver::resolve(&root, &graph.packages, config.dependency_behavior())?;
	for package in resolved.identities() {
		log::debug!("Resolved {}", package);
	}

	let resolved = exclusion::filter(resolved, &exclusion::exclusion_list(config));
	let materialized = Materializer::new(registry, config).materialize_all(&resolved).await?;

	let (project, temp_project) = match &options.unity_project {
		Some(p) => (p.clone(), None),
		None => {
			let temp = tempfile::tempdir()?;
			log::debug!("Using temporary project {}", temp.path().display());
			(temp.path().to_path_buf(), Some(temp))
		},
	};

	/* The temporary project and the unpersisted archive are removed if this future is dropped */
	let stage_options = options.clone();
	let archive = tokio::task::spawn_blocking(move || {
		let _temp_project = temp_project;
		stage(&project, &materialized, &stage_options)
	})
		.await
		.map_err(unity::UnityPackageError::from)??;

	Ok(unity::unitypackage::persist_unity_package(archive, &options.package, &options.output_path)?)
}

/// Copies the binaries into the project, writes `link.xml` and packs the `Assets` folder.
fn stage(project: &Path, packages: &[MaterializedPackage], options: &RepackageOptions) -> Result<tempfile::NamedTempFile, unity::UnityPackageError> {
	let copied = unity::copy_plugins(project, packages)?;

	if options.skip_link_xml {
		log::debug!("Skipping link.xml");
	} else {
		unity::link_xml::write_link_xml(unity::plugins_dir(project), &copied)?;
	}

	unity::unitypackage::build_unity_package(project, options.include_meta, &options.output_path)
}
