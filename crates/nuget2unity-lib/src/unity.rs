//! Places binaries into a Unity project and packs it up.
//!
//! Everything is written below `Assets/Plugins` of the working project, see [`plugins_dir()`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::installation::MaterializedPackage;
use crate::PackageIdentity;

pub mod link_xml;
pub mod unitypackage;

#[derive(Debug, thiserror::Error)]
pub enum UnityPackageError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("walkdir error: {0}")]
	WalkDir(#[from] walkdir::Error),
	/// A binary doesn't live under the folder it was collected from.
	#[error("{0} is not inside {1}")]
	OutsideDir(PathBuf, PathBuf),
	#[error("meta file {0} has no guid")]
	InvalidMeta(PathBuf),
	#[error("packing task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}

pub fn plugins_dir(project: impl AsRef<Path>) -> PathBuf {
	project.as_ref().join("Assets").join("Plugins")
}

/// Clears `Assets/Plugins` of everything, then creates it if missing.
pub fn clean_plugins_dir(project: impl AsRef<Path>) -> Result<PathBuf, UnityPackageError> {
	let plugins = plugins_dir(project);
	if plugins.is_dir() {
		log::debug!("Cleaning {}", plugins.display());
		for entry in std::fs::read_dir(&plugins)? {
			let entry = entry?;
			if entry.file_type()?.is_dir() {
				std::fs::remove_dir_all(entry.path())?;
			} else {
				std::fs::remove_file(entry.path())?;
			}
		}
	}
	std::fs::create_dir_all(&plugins)?;
	Ok(plugins)
}

/// Copies every selected binary into `Assets/Plugins`.
///
/// Binaries keep their path relative to their lib group, so `lib/netstandard2.0/de/Foo.resources.dll`
/// becomes `Assets/Plugins/de/Foo.resources.dll`. When two packages provide the same file the later one wins.
///
/// Returns the copied files, sorted.
pub fn copy_plugins(project: impl AsRef<Path>, packages: &[MaterializedPackage]) -> Result<Vec<PathBuf>, UnityPackageError> {
	let plugins = clean_plugins_dir(project)?;
	let mut copied = HashMap::<PathBuf, &PackageIdentity>::new();

	for package in packages {
		let Some(lib_dir) = &package.lib_dir else { continue };

		for binary in &package.binary_files {
			let relative = binary
				.strip_prefix(lib_dir)
				.map_err(|_| UnityPackageError::OutsideDir(binary.clone(), lib_dir.clone()))?;
			let destination = plugins.join(relative);

			if let Some(previous) = copied.get(&destination) {
				log::warn!("{} from {} overwrites the copy from {}", relative.display(), package.identity, previous);
			}

			if let Some(parent) = destination.parent() {
				std::fs::create_dir_all(parent)?;
			}
			log::trace!("Copying {} to {}", binary.display(), destination.display());
			std::fs::copy(binary, &destination)?;
			copied.insert(destination, &package.identity);
		}
	}

	let mut copied = copied.into_keys().collect::<Vec<_>>();
	copied.sort();
	log::info!("Copied {} binaries into {}", copied.len(), plugins.display());
	Ok(copied)
}
