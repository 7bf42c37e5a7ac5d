//! Downloads a package's content.

use std::path::{Path, PathBuf};

use super::MaterializeError;
use crate::package::*;

/// Where a package is extracted to, `{package_dir}/{id}.{version}` all lowercase.
pub fn get_package_install_path(package_dir: impl AsRef<Path>, id: &PackageIdentity) -> PathBuf {
	package_dir.as_ref().join(format!("{}.{}", id.key(), id.version().to_normalized_string().to_ascii_lowercase()))
}

/// Downloads the `.nupkg` of a package from the source it was resolved in.
pub async fn download_package(registry: &crate::Registry, package: &DependencyInfo) -> Result<Vec<u8>, MaterializeError> {
	let bytes = registry
		.download(package)
		.await
		.map_err(|source| MaterializeError::Download { package: package.identity.clone(), source })?;

	/* TODO: Verify against the catalog's packageHash */
	log::debug!("Downloaded {} ({} bytes)", package.identity, bytes.len());
	Ok(bytes)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn install_path_is_lowercase_and_normalized() {
		let id = PackageIdentity::new("Newtonsoft.Json", NuGetVersion::new("13.0.1.0").unwrap());
		assert_eq!(get_package_install_path("/packages", &id), PathBuf::from("/packages/newtonsoft.json.13.0.1"));

		let id = PackageIdentity::new("Foo", NuGetVersion::new("1.0.0-Beta.2").unwrap());
		assert_eq!(get_package_install_path("/packages", &id), PathBuf::from("/packages/foo.1.0.0-beta.2"));
	}
}
