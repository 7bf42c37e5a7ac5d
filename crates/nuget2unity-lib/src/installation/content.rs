//! Extracting packages and finding their `lib` groups.

use std::path::{Path, PathBuf};

use crate::package::Framework;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
	#[error("walkdir error: {0}")]
	WalkDir(#[from] walkdir::Error),
	#[error("extraction task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}

/// A folder of binaries for one target framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibGroup {
	pub framework: Framework,
	pub path: PathBuf,
	/// Files placed directly in `lib/` form a group of their own, which must not descend into the framework folders.
	pub recursive: bool,
}

/// Extracts a `.nupkg` to `install_path`.
///
/// Content is extracted into a temporary directory next to `install_path` and renamed into place,
/// so `install_path` only ever exists complete.
/// If another process finishes the same package first its content is kept.
pub async fn extract_package(bytes: Vec<u8>, package_dir: &Path, install_path: &Path) -> Result<(), ContentError> {
	let package_dir = package_dir.to_path_buf();
	let install_path = install_path.to_path_buf();
	tokio::task::spawn_blocking(move || extract_package_blocking(&bytes, &package_dir, &install_path)).await?
}

fn extract_package_blocking(bytes: &[u8], package_dir: &Path, install_path: &Path) -> Result<(), ContentError> {
	log::trace!("Extracting to {}", install_path.display());
	std::fs::create_dir_all(package_dir)?;

	/* Dropped on any error path which removes partial content */
	let temp = tempfile::Builder::new()
		.prefix(".extract-")
		.tempdir_in(package_dir)?;

	let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
	archive.extract(temp.path())?;

	match std::fs::rename(temp.path(), install_path) {
		Ok(()) => Ok(()),
		Err(_) if install_path.exists() => {
			log::debug!("{} was extracted concurrently, discarding our copy", install_path.display());
			Ok(())
		},
		Err(e) => Err(e.into()),
	}
}

/// Lists the framework groups under `lib/` of an extracted package.
///
/// Folders that aren't a framework name are logged and ignored.
pub fn get_lib_groups(install_path: impl AsRef<Path>) -> Result<Vec<LibGroup>, ContentError> {
	let lib = install_path.as_ref().join("lib");
	if !lib.is_dir() {
		return Ok(Vec::new())
	}

	let mut groups = Vec::<LibGroup>::new();
	let mut has_loose_files = false;

	for entry in std::fs::read_dir(&lib)? {
		let entry = entry?;
		let file_type = entry.file_type()?;
		if file_type.is_file() {
			has_loose_files = true;
		} else if file_type.is_dir() {
			let name = entry.file_name().to_string_lossy().to_string();
			match Framework::parse(&name) {
				Ok(framework) => groups.push(LibGroup {
					framework,
					path: entry.path(),
					recursive: true,
				}),
				Err(e) => log::warn!("Ignoring lib folder {}: {}", name, e),
			}
		}
	}

	if has_loose_files {
		groups.push(LibGroup {
			framework: Framework::any(),
			path: lib,
			recursive: false,
		});
	}

	groups.sort_by(|a, b| a.path.cmp(&b.path));
	Ok(groups)
}

/// Collects every `.dll` in a group, sorted by path.
pub fn collect_binaries(group: &LibGroup) -> Result<Vec<PathBuf>, ContentError> {
	let mut walker = walkdir::WalkDir::new(&group.path).min_depth(1);
	if !group.recursive {
		walker = walker.max_depth(1);
	}

	let mut binaries = Vec::<PathBuf>::new();
	for entry in walker {
		let entry = entry?;
		let is_dll = entry.path().extension().map(|e| e.eq_ignore_ascii_case("dll")).unwrap_or(false);
		if entry.file_type().is_file() && is_dll {
			binaries.push(entry.into_path());
		}
	}

	binaries.sort();
	Ok(binaries)
}

/// Picks the `lib` group nearest to `framework` and collects its binaries, off the async workers.
pub async fn select_binaries(install_path: &Path, framework: &Framework) -> Result<Option<(LibGroup, Vec<PathBuf>)>, ContentError> {
	let install_path = install_path.to_path_buf();
	let framework = framework.clone();
	tokio::task::spawn_blocking(move || {
		let groups = get_lib_groups(&install_path)?;
		let nearest = crate::package::framework::get_nearest(&framework, groups.iter().map(|g| &g.framework));
		match nearest.and_then(|f| groups.iter().find(|g| &g.framework == f)) {
			Some(group) => Ok(Some((group.clone(), collect_binaries(group)?))),
			None => Ok(None),
		}
	}).await?
}
