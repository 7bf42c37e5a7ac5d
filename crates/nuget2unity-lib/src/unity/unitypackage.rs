//! Writes `.unitypackage` archives.
//!
//! A `.unitypackage` is a gzipped tar with one folder per asset, named after the asset's guid.
//! - `<guid>/pathname` holds the project relative path, e.g. `Assets/Plugins/Foo.dll`.
//! - `<guid>/asset.meta` holds the asset's `.meta` file.
//! - `<guid>/asset` holds the file itself, folders have none.

use std::path::{Path, PathBuf};

use super::UnityPackageError;

/// One file or folder below `Assets/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
	pub guid: String,
	/// Project relative, `/` separated.
	pub pathname: String,
	pub meta: String,
	/// `None` for folders.
	pub file: Option<PathBuf>,
}

/// A stable guid for an asset path.
pub fn generate_guid(pathname: &str) -> String {
	sha256::digest(pathname.as_bytes())[..32].to_string()
}

/// Reads the `guid:` line of a `.meta` file.
pub fn parse_meta_guid(meta: &str) -> Option<String> {
	meta.lines()
		.find_map(|l| l.trim().strip_prefix("guid:"))
		.map(|g| g.trim().to_string())
		.filter(|g| !g.is_empty())
}

const IMPORTER_FOOTER: &str = "  userData: \n  assetBundleName: \n  assetBundleVariant: \n";

pub fn generate_meta(guid: &str, pathname: &str, is_folder: bool) -> String {
	let mut meta = format!("fileFormatVersion: 2\nguid: {}\n", guid);
	let is_dll = pathname.rsplit('.').next().map(|e| e.eq_ignore_ascii_case("dll")).unwrap_or(false);

	if is_folder {
		meta.push_str("folderAsset: yes\nDefaultImporter:\n  externalObjects: {}\n");
	} else if is_dll {
		meta.push_str(concat!(
			"PluginImporter:\n",
			"  externalObjects: {}\n",
			"  serializedVersion: 2\n",
			"  iconMap: {}\n",
			"  executionOrder: {}\n",
			"  defineConstraints: []\n",
			"  isPreloaded: 0\n",
			"  isOverridable: 0\n",
			"  isExplicitlyReferenced: 0\n",
			"  validateReferences: 1\n",
			"  platformData:\n",
			"  - first:\n",
			"      Any: \n",
			"    second:\n",
			"      enabled: 1\n",
			"      settings: {}\n",
		));
	} else {
		meta.push_str("DefaultImporter:\n  externalObjects: {}\n");
	}

	meta.push_str(IMPORTER_FOOTER);
	meta
}

/// Collects every asset under `{project}/Assets`, sorted by path.
///
/// `.meta` files are never assets themselves. With `include_meta` an asset's existing `.meta` is used
/// as is, otherwise one is generated.
pub fn collect_assets(project: impl AsRef<Path>, include_meta: bool) -> Result<Vec<Asset>, UnityPackageError> {
	let project = project.as_ref();
	let assets_dir = project.join("Assets");
	if !assets_dir.is_dir() {
		return Ok(Vec::new())
	}

	let mut assets = Vec::<Asset>::new();
	for entry in walkdir::WalkDir::new(&assets_dir).min_depth(1).sort_by_file_name() {
		let entry = entry?;
		let path = entry.path();
		let is_meta = path.extension().map(|e| e == "meta").unwrap_or(false);
		if is_meta {
			continue;
		}

		let relative = path
			.strip_prefix(project)
			.map_err(|_| UnityPackageError::OutsideDir(path.to_path_buf(), project.to_path_buf()))?;
		let pathname = relative
			.components()
			.map(|c| c.as_os_str().to_string_lossy())
			.collect::<Vec<_>>()
			.join("/");

		let is_folder = entry.file_type().is_dir();
		let mut meta_path = path.as_os_str().to_owned();
		meta_path.push(".meta");
		let meta_path = PathBuf::from(meta_path);

		let (guid, meta) = if include_meta && meta_path.is_file() {
			let meta = std::fs::read_to_string(&meta_path)?;
			let guid = parse_meta_guid(&meta).ok_or(UnityPackageError::InvalidMeta(meta_path))?;
			(guid, meta)
		} else {
			let guid = generate_guid(&pathname);
			let meta = generate_meta(&guid, &pathname, is_folder);
			(guid, meta)
		};

		assets.push(Asset {
			guid,
			pathname,
			meta,
			file: (!is_folder).then(|| path.to_path_buf()),
		});
	}

	Ok(assets)
}

fn append_bytes<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8]) -> std::io::Result<()> {
	let mut header = tar::Header::new_gnu();
	header.set_size(data.len() as u64);
	header.set_mode(0o644);
	header.set_cksum();
	builder.append_data(&mut header, path, data)
}

/// Packs the `Assets` folder of `project` into a temporary file inside `output_dir`.
///
/// The file is removed when dropped, see [`persist_unity_package`] to keep it.
pub fn build_unity_package(project: impl AsRef<Path>, include_meta: bool, output_dir: impl AsRef<Path>) -> Result<tempfile::NamedTempFile, UnityPackageError> {
	let output_dir = output_dir.as_ref();
	let assets = collect_assets(project, include_meta)?;

	std::fs::create_dir_all(output_dir)?;
	let mut temp = tempfile::NamedTempFile::new_in(output_dir)?;
	{
		let encoder = flate2::write::GzEncoder::new(&mut temp, flate2::Compression::default());
		let mut builder = tar::Builder::new(encoder);

		for asset in &assets {
			log::trace!("Packing {} as {}", asset.pathname, asset.guid);
			append_bytes(&mut builder, &format!("{}/pathname", asset.guid), asset.pathname.as_bytes())?;
			append_bytes(&mut builder, &format!("{}/asset.meta", asset.guid), asset.meta.as_bytes())?;
			if let Some(file) = &asset.file {
				builder.append_path_with_name(file, format!("{}/asset", asset.guid))?;
			}
		}

		builder.into_inner()?.finish()?;
	}

	log::debug!("Packed {} assets", assets.len());
	Ok(temp)
}

/// Moves a built archive to `{output_dir}/{package_name}.unitypackage`.
pub fn persist_unity_package(archive: tempfile::NamedTempFile, package_name: &str, output_dir: impl AsRef<Path>) -> Result<PathBuf, UnityPackageError> {
	let output_path = output_dir.as_ref().join(format!("{}.unitypackage", package_name));
	archive.persist(&output_path).map_err(|e| UnityPackageError::IO(e.error))?;
	log::info!("Wrote {}", output_path.display());
	Ok(output_path)
}
