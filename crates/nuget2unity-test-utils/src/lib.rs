//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nuget2unity::package::*;
use nuget2unity::registry::{PackageListing, PackageSource, RegistryError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("nuget2unity error: {0}")]
	NuGet2Unity(#[from] nuget2unity::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
}

/// Builds a `.nupkg` holding a nuspec and the given files.
///
/// Each file's content is its own path, so copies can be traced back to the package they came from.
pub fn build_nupkg(id: &str, files: &[&str]) -> Result<Vec<u8>, Error> {
	let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::<u8>::new()));
	let options = zip::write::FileOptions::default();

	zip.start_file(format!("{}.nuspec", id), options)?;
	zip.write_all(format!("<package><metadata><id>{}</id></metadata></package>", id).as_bytes())?;

	for file in files {
		zip.start_file(*file, options)?;
		zip.write_all(format!("{}/{}", id, file).as_bytes())?;
	}

	Ok(zip.finish()?.into_inner())
}

struct MemoryPackage {
	listing: PackageListing,
	content: Vec<u8>,
}

/// A [`PackageSource`] serving packages from memory.
///
/// Request counters are shared so they can still be read once the source is boxed into a registry.
pub struct MemorySource {
	name: String,
	packages: HashMap<String, Vec<MemoryPackage>>,
	downloads: Arc<AtomicUsize>,
	listing_requests: Arc<AtomicUsize>,
	stall_downloads: bool,
}

impl MemorySource {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			packages: HashMap::new(),
			downloads: Default::default(),
			listing_requests: Default::default(),
			stall_downloads: false,
		}
	}

	/// Adds a listed package.
	///
	/// # Parameters
	/// - `dependencies` - `(id, range)` pairs.
	/// - `files` - Paths within the package, such as `lib/netstandard2.0/Foo.dll`.
	pub fn with_package(self, id: &str, version: &str, dependencies: &[(&str, &str)], files: &[&str]) -> Result<Self, Error> {
		self.with_package_listed(id, version, dependencies, files, true)
	}

	pub fn with_package_listed(mut self, id: &str, version: &str, dependencies: &[(&str, &str)], files: &[&str], listed: bool) -> Result<Self, Error> {
		let dependencies = dependencies
			.iter()
			.map(|(id, range)| -> Result<PackageDependency, Error> { Ok(PackageDependency::new(*id, VersionRange::parse(range)?)) })
			.collect::<Result<Vec<_>, Error>>()?;

		let package = MemoryPackage {
			listing: PackageListing {
				version: NuGetVersion::new(version)?,
				listed,
				dependencies,
			},
			content: build_nupkg(id, files)?,
		};
		self.packages.entry(package_key(id)).or_default().push(package);
		Ok(self)
	}

	/// Number of downloads served.
	pub fn download_counter(&self) -> Arc<AtomicUsize> {
		self.downloads.clone()
	}

	/// Number of listing requests served, including for packages not carried.
	pub fn listing_counter(&self) -> Arc<AtomicUsize> {
		self.listing_requests.clone()
	}

	/// Makes every download pend forever once counted, to interrupt a run mid download.
	pub fn with_stalled_downloads(mut self) -> Self {
		self.stall_downloads = true;
		self
	}

	pub fn boxed(self) -> Box<dyn PackageSource> {
		Box::new(self)
	}
}

#[async_trait::async_trait]
impl PackageSource for MemorySource {
	fn name(&self) -> &str {
		&self.name
	}

	async fn get_package_listings(&self, id: &str, _framework: &Framework) -> Result<Option<Vec<PackageListing>>, RegistryError> {
		self.listing_requests.fetch_add(1, Ordering::SeqCst);
		Ok(self.packages
			.get(&package_key(id))
			.map(|p| p.iter().map(|p| p.listing.clone()).collect()))
	}

	async fn download_package(&self, package: &PackageIdentity) -> Result<Vec<u8>, RegistryError> {
		self.downloads.fetch_add(1, Ordering::SeqCst);
		if self.stall_downloads {
			std::future::pending::<()>().await;
		}
		self.packages
			.get(&package.key())
			.and_then(|p| p.iter().find(|p| &p.listing.version == package.version()))
			.map(|p| p.content.clone())
			.ok_or_else(|| RegistryError::PackageMissing(package.clone(), self.name.clone()))
	}
}

/// A config for offline tests with its package directory inside `dir`.
pub fn test_config(dir: &std::path::Path) -> nuget2unity::Config {
	let mut config = nuget2unity::Config::default();
	config.set_package_dir(dir.join("packages"));
	config.set_sources(Vec::new());
	config
}

/// A temporary directory to hold packages, projects and outputs of one test.
pub fn test_dir() -> Result<tempfile::TempDir, Error> {
	Ok(tempfile::Builder::new().prefix("nuget2unity-test").tempdir()?)
}
