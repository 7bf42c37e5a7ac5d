//! Various types associated with packages.

mod version;
pub use version::NuGetVersion;

mod version_range;
pub use version_range::VersionRange;

pub mod framework;
pub use framework::Framework;

/// Lowercases a package id for use as a map key.
///
/// NuGet ids are case-insensitive so every map keyed by id goes through here.
pub fn package_key(id: &str) -> String {
	id.to_ascii_lowercase()
}

/// A single exact version of a package.
///
/// Equality ignores the case of `id`, matching how the registry treats ids.
#[derive(Debug, Clone)]
pub struct PackageIdentity {
	id: String,
	version: NuGetVersion,
}

impl PackageIdentity {
	pub fn new(id: impl Into<String>, version: NuGetVersion) -> Self {
		Self {
			id: id.into(),
			version,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn version(&self) -> &NuGetVersion {
		&self.version
	}

	pub fn key(&self) -> String {
		package_key(&self.id)
	}
}

impl PartialEq for PackageIdentity {
	fn eq(&self, other: &Self) -> bool {
		self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
	}
}

impl Eq for PackageIdentity {}

impl std::hash::Hash for PackageIdentity {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.key().hash(state);
		self.version.hash(state);
	}
}

impl Ord for PackageIdentity {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		match self.key().cmp(&other.key()) {
			std::cmp::Ordering::Equal => {}
			ord => return ord,
		}
		self.version.cmp(&other.version)
	}
}

impl PartialOrd for PackageIdentity {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::fmt::Display for PackageIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.id, self.version)
	}
}

impl AsRef<PackageIdentity> for PackageIdentity {
	fn as_ref(&self) -> &PackageIdentity {
		self
	}
}

/// An outgoing edge of a package, the id of another package and the versions accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
	pub id: String,
	pub range: VersionRange,
}

impl PackageDependency {
	pub fn new(id: impl Into<String>, range: VersionRange) -> Self {
		Self {
			id: id.into(),
			range,
		}
	}
}

impl std::fmt::Display for PackageDependency {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.id, self.range)
	}
}

/// A package's dependencies for the target framework along with the source that served it.
#[derive(Debug, Clone)]
pub struct DependencyInfo {
	pub identity: PackageIdentity,
	pub dependencies: Vec<PackageDependency>,
	pub listed: bool,
	/// Index into the [`Registry`](crate::Registry) sources this package was found in.
	pub source_repository: usize,
}

impl DependencyInfo {
	pub fn new(identity: PackageIdentity, dependencies: Vec<PackageDependency>, source_repository: usize) -> Self {
		Self {
			identity,
			dependencies,
			listed: true,
			source_repository,
		}
	}
}

impl AsRef<PackageIdentity> for DependencyInfo {
	fn as_ref(&self) -> &PackageIdentity {
		&self.identity
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> NuGetVersion { NuGetVersion::new(s).unwrap() }

	#[test]
	fn identity_ignores_id_case() {
		assert_eq!(PackageIdentity::new("Newtonsoft.Json", v("13.0.1")), PackageIdentity::new("newtonsoft.json", v("13.0.1")));
	}

	#[test]
	fn identity_compares_normalized_version() {
		assert_eq!(PackageIdentity::new("Foo", v("1.0")), PackageIdentity::new("Foo", v("1.0.0.0")));
		assert_ne!(PackageIdentity::new("Foo", v("1.0")), PackageIdentity::new("Foo", v("1.0.1")));
	}

	#[test]
	fn identity_hash_matches_eq() {
		let mut set = std::collections::HashSet::new();
		set.insert(PackageIdentity::new("System.Memory", v("4.5.4")));
		assert!(set.contains(&PackageIdentity::new("SYSTEM.MEMORY", v("4.5.4"))));
	}
}
