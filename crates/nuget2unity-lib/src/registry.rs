//! Talks to package registries.
//!
//! A [`Registry`] is an ordered list of [`PackageSource`]s, every query walks the sources in order.
//! Whichever source first knows about a package is the one it is downloaded from later on.

use async_trait::async_trait;

use crate::package::*;

pub mod nuget_v3;
pub use nuget_v3::NuGetV3Source;

/// Errors that can occur while querying a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
	/// No source has a listed, non-prerelease version of the package.
	#[error("package {0} not found in any source.")]
	NotFound(String),
	/// The exact package version is not present in the source it was resolved from.
	#[error("package {0} is missing from source {1}.")]
	PackageMissing(PackageIdentity, String),
	/// The source's service index does not advertise a resource we need.
	#[error("source {0} does not provide a {1} resource.")]
	MissingResource(String, &'static str),
	#[error("source index {0} is out of range.")]
	InvalidSource(usize),
	#[error("unexpected response from {0}: HTTP {1}")]
	Http(String, u16),
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("parsing error: {0}")]
	Parse(String),
}

/// One version of a package as listed by a source.
#[derive(Debug, Clone)]
pub struct PackageListing {
	pub version: NuGetVersion,
	pub listed: bool,
	/// Dependencies from the group nearest the requested framework.
	pub dependencies: Vec<PackageDependency>,
}

/// A single place packages can be found in.
#[async_trait]
pub trait PackageSource: Send + Sync {
	/// Human readable name used in logging and errors, usually the url.
	fn name(&self) -> &str;

	/// Lists every version of `id` this source has.
	///
	/// Returns `Ok(None)` when the source does not carry the package at all.
	async fn get_package_listings(&self, id: &str, framework: &Framework) -> Result<Option<Vec<PackageListing>>, RegistryError>;

	/// Downloads the `.nupkg` of an exact package version.
	async fn download_package(&self, package: &PackageIdentity) -> Result<Vec<u8>, RegistryError>;
}

/// An ordered list of package sources.
pub struct Registry {
	sources: Vec<Box<dyn PackageSource>>,
}

impl Registry {
	pub fn new(sources: Vec<Box<dyn PackageSource>>) -> Self {
		Self {
			sources,
		}
	}

	/// Creates a registry of NuGet v3 feeds from the configured source urls.
	pub fn from_config(config: &crate::Config) -> crate::Result<Self> {
		let client = reqwest::Client::builder()
			.https_only(config.https_only())
			.build()
			.map_err(RegistryError::from)?;

		let sources = config.sources()
			.iter()
			.map(|url| Box::new(NuGetV3Source::new(client.clone(), url.clone())) as Box<dyn PackageSource>)
			.collect();

		Ok(Self::new(sources))
	}

	pub fn sources(&self) -> &[Box<dyn PackageSource>] {
		&self.sources
	}

	pub fn source_name(&self, index: usize) -> &str {
		self.sources.get(index).map(|s| s.name()).unwrap_or("<unknown>")
	}

	/// Finds the highest listed release version of a package.
	///
	/// The first source with any listed release of the package wins, later sources are not consulted.
	pub async fn resolve_latest_version(&self, id: &str, framework: &Framework) -> Result<NuGetVersion, RegistryError> {
		for source in &self.sources {
			let Some(listings) = source.get_package_listings(id, framework).await? else { continue };

			let latest = listings
				.into_iter()
				.filter(|l| l.listed && !l.version.is_prerelease())
				.map(|l| l.version)
				.max();

			if let Some(latest) = latest {
				log::debug!("Latest version of {} in {} is {}", id, source.name(), latest);
				return Ok(latest)
			}
		}

		Err(RegistryError::NotFound(id.to_string()))
	}

	/// Gets the dependencies of an exact package version from the first source that has it.
	///
	/// A source without the package is skipped, `Ok(None)` means no source has it.
	pub async fn resolve_dependency_info(&self, package: &PackageIdentity, framework: &Framework) -> Result<Option<DependencyInfo>, RegistryError> {
		for (i, source) in self.sources.iter().enumerate() {
			let Some(listings) = source.get_package_listings(package.id(), framework).await? else { continue };

			if let Some(listing) = listings.into_iter().find(|l| &l.version == package.version()) {
				return Ok(Some(DependencyInfo {
					identity: PackageIdentity::new(package.id(), listing.version),
					dependencies: listing.dependencies,
					listed: listing.listed,
					source_repository: i,
				}))
			}
		}

		Ok(None)
	}

	/// Finds the lowest version of a package within `range`.
	///
	/// Used when the floor of a dependency range isn't itself a published version.
	/// Listed versions are preferred over unlisted ones, and prereleases are only considered when the floor is a prerelease.
	pub async fn resolve_lowest_version(&self, id: &str, range: &VersionRange, framework: &Framework) -> Result<Option<NuGetVersion>, RegistryError> {
		let allow_prerelease = range.min_version().map(|v| v.is_prerelease()).unwrap_or(false);

		for source in &self.sources {
			let Some(listings) = source.get_package_listings(id, framework).await? else { continue };

			let candidates = listings
				.into_iter()
				.filter(|l| range.satisfies(&l.version) && (allow_prerelease || !l.version.is_prerelease()))
				.collect::<Vec<_>>();

			let lowest = candidates.iter()
				.filter(|l| l.listed)
				.map(|l| &l.version)
				.min()
				.or_else(|| candidates.iter().map(|l| &l.version).min());

			if let Some(lowest) = lowest {
				return Ok(Some(lowest.clone()))
			}
		}

		Ok(None)
	}

	/// Downloads a package from the source it was resolved in.
	pub async fn download(&self, package: &DependencyInfo) -> Result<Vec<u8>, RegistryError> {
		let source = self.sources
			.get(package.source_repository)
			.ok_or(RegistryError::InvalidSource(package.source_repository))?;

		log::info!("Downloading package {} from {}", package.identity, source.name());
		source.download_package(&package.identity).await
	}
}
