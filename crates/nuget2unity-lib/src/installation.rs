//! Gets resolved packages onto disk and picks the binaries to use from each.
//!
//! Packages are extracted once into `{package_dir}/{id}.{version}` and reused by later runs.

use std::path::PathBuf;

use futures::StreamExt;

use crate::package::*;
use crate::registry::RegistryError;
use crate::resolver::ResolvedSet;
use crate::Registry;

pub mod download;
pub mod content;

pub use download::get_package_install_path;

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
	#[error("failed to download {package}: {source}")]
	Download {
		package: PackageIdentity,
		source: RegistryError,
	},
	#[error("failed to extract {package}: {source}")]
	Extraction {
		package: PackageIdentity,
		source: content::ContentError,
	},
	/// Only raised for the root package, dependencies without binaries are skipped.
	#[error("{package} has no binaries compatible with {framework}")]
	FrameworkMismatch {
		package: PackageIdentity,
		framework: Framework,
	},
}

/// A package present on disk along with the binaries selected for the target framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedPackage {
	pub identity: PackageIdentity,
	pub install_path: PathBuf,
	/// The framework of the selected `lib` group, `None` when nothing was compatible.
	pub framework: Option<Framework>,
	/// Directory of the selected `lib` group, binary paths are relative to this when copied.
	pub lib_dir: Option<PathBuf>,
	/// Absolute paths of every binary in the selected group, sorted.
	pub binary_files: Vec<PathBuf>,
}

pub struct Materializer<'r> {
	registry: &'r Registry,
	package_dir: PathBuf,
	framework: Framework,
	max_concurrent_downloads: usize,
}

impl<'r> Materializer<'r> {
	pub fn new(registry: &'r Registry, config: &crate::Config) -> Self {
		Self {
			registry,
			package_dir: config.package_dir().clone(),
			framework: config.framework().clone(),
			max_concurrent_downloads: config.max_concurrent_downloads().max(1),
		}
	}

	pub fn package_dir(&self) -> &std::path::Path {
		&self.package_dir
	}

	/// Ensures a package is extracted then selects its binaries.
	///
	/// Content already on disk is reused without touching the registry.
	pub async fn materialize(&self, package: &DependencyInfo) -> Result<MaterializedPackage, MaterializeError> {
		let identity = &package.identity;
		let install_path = get_package_install_path(&self.package_dir, identity);

		if install_path.exists() {
			log::debug!("Package {} already extracted, skipping download.", identity);
		} else {
			let bytes = download::download_package(self.registry, package).await?;
			content::extract_package(bytes, &self.package_dir, &install_path)
				.await
				.map_err(|source| MaterializeError::Extraction { package: identity.clone(), source })?;
		}

		let selected = content::select_binaries(&install_path, &self.framework)
			.await
			.map_err(|source| MaterializeError::Extraction { package: identity.clone(), source })?;

		let (framework, lib_dir, binary_files) = match selected {
			Some((group, binaries)) => {
				log::debug!("Selected {} binaries from {} of {}", binaries.len(), group.framework, identity);
				(Some(group.framework), Some(group.path), binaries)
			},
			None => (None, None, Vec::new()),
		};

		Ok(MaterializedPackage {
			identity: identity.clone(),
			install_path,
			framework,
			lib_dir,
			binary_files,
		})
	}

	/// Materializes the whole install set, several packages at a time.
	///
	/// # Errors
	/// - The first download or extraction failure.
	/// - [`MaterializeError::FrameworkMismatch`] if the root package has no compatible binaries.
	pub async fn materialize_all(&self, resolved: &ResolvedSet) -> Result<Vec<MaterializedPackage>, MaterializeError> {
		log::info!("Materializing {} packages into {}", resolved.len(), self.package_dir.display());

		let results = futures::stream::iter(resolved.packages().map(|p| self.materialize(p)))
			.buffer_unordered(self.max_concurrent_downloads)
			.collect::<Vec<_>>()
			.await;

		let mut materialized = results.into_iter().collect::<Result<Vec<_>, _>>()?;
		materialized.sort_by(|a, b| a.identity.cmp(&b.identity));

		for package in &materialized {
			if package.framework.is_some() {
				continue;
			}
			if &package.identity == resolved.root() {
				return Err(MaterializeError::FrameworkMismatch {
					package: package.identity.clone(),
					framework: self.framework.clone(),
				})
			}
			log::warn!("{} has no binaries compatible with {}, it will be skipped", package.identity, self.framework);
		}

		Ok(materialized)
	}
}
