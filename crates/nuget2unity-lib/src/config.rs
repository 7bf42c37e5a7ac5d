//! Configuration shared by every step of a run.

use serde::{Serialize, Deserialize};

use crate::package::Framework;
use crate::resolver::DependencyBehavior;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Where extracted packages are kept between runs.
	package_dir: std::path::PathBuf,
	/// NuGet v3 service indexes, queried in order.
	sources: Vec<String>,
	framework: Framework,
	dependency_behavior: DependencyBehavior,
	/// Added to [`RUNTIME_PROVIDED_PACKAGES`](crate::exclusion::RUNTIME_PROVIDED_PACKAGES).
	excluded_packages: Vec<String>,
	max_concurrent_downloads: usize,
	https_only: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			package_dir: {
				#[cfg(target_os = "windows")]
				let path = std::env::var("LOCALAPPDATA")
					.map(std::path::PathBuf::from)
					.unwrap_or_else(|_| std::env::temp_dir());

				#[cfg(not(target_os = "windows"))]
				let path = if let Ok(e) = std::env::var("XDG_CACHE_HOME") {
					std::path::PathBuf::from(e)
				} else if let Ok(home) = std::env::var("HOME") {
					std::path::PathBuf::from(home).join(".cache")
				} else {
					std::env::temp_dir()
				};

				path.join("nuget2unity").join("packages")
			},
			sources: vec!["https://api.nuget.org/v3/index.json".to_string()],
			framework: Framework::netstandard(2, 0),
			dependency_behavior: DependencyBehavior::Lowest,
			excluded_packages: Vec::new(),
			max_concurrent_downloads: 4,
			https_only: true,
		}
	}
}

impl Config {
	/// Path of the configuration file, `None` if the platform's config directory is unknown.
	pub fn config_path() -> Option<std::path::PathBuf> {
		#[cfg(target_os = "windows")]
		let path = std::env::var("APPDATA").ok().map(std::path::PathBuf::from);

		#[cfg(not(target_os = "windows"))]
		let path = if let Ok(e) = std::env::var("XDG_CONFIG_HOME") {
			Some(std::path::PathBuf::from(e))
		} else {
			std::env::var("HOME").ok().map(|h| std::path::PathBuf::from(h).join(".config"))
		};

		path.map(|p| p.join("nuget2unity").join("config.json"))
	}

	/// Reads the config file at `path`.
	pub fn load(path: &std::path::Path) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
	}

	/// Loads the user's config file, falling back to the defaults if it can't be read.
	pub fn load_from_disk() -> Self {
		let Some(path) = Self::config_path() else {
			log::warn!("No configuration directory, using default configuration");
			return Self::default()
		};

		if !path.exists() {
			log::debug!("No configuration at {}, using defaults", path.display());
			return Self::default()
		}

		match Self::load(&path) {
			Ok(config) => config,
			Err(e) => {
				log::warn!("Failed to read configuration {}: {}. Using defaults", path.display(), e);
				Self::default()
			},
		}
	}

	pub fn package_dir(&self) -> &std::path::PathBuf {
		&self.package_dir
	}
	pub fn set_package_dir(&mut self, package_dir: std::path::PathBuf) {
		self.package_dir = package_dir;
	}

	pub fn sources(&self) -> &[String] {
		&self.sources
	}
	pub fn set_sources(&mut self, sources: Vec<String>) {
		self.sources = sources;
	}

	pub fn framework(&self) -> &Framework {
		&self.framework
	}
	pub fn set_framework(&mut self, framework: Framework) {
		self.framework = framework;
	}

	pub fn dependency_behavior(&self) -> DependencyBehavior {
		self.dependency_behavior
	}
	pub fn set_dependency_behavior(&mut self, dependency_behavior: DependencyBehavior) {
		self.dependency_behavior = dependency_behavior;
	}

	pub fn excluded_packages(&self) -> &[String] {
		&self.excluded_packages
	}
	pub fn set_excluded_packages(&mut self, excluded_packages: Vec<String>) {
		self.excluded_packages = excluded_packages;
	}

	pub fn max_concurrent_downloads(&self) -> usize {
		self.max_concurrent_downloads
	}
	/// Zero is treated as one.
	pub fn set_max_concurrent_downloads(&mut self, max_concurrent_downloads: usize) {
		self.max_concurrent_downloads = max_concurrent_downloads.max(1);
	}

	pub fn https_only(&self) -> bool {
		self.https_only
	}
	pub fn set_https_only(&mut self, https_only: bool) {
		self.https_only = https_only;
	}
}
