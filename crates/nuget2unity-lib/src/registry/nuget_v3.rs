//! A [`PackageSource`] backed by a NuGet v3 feed such as `https://api.nuget.org/v3/index.json`.
//!
//! Only two resources of the feed are used.
//! - `RegistrationsBaseUrl` for version listings and dependency groups.
//! - `PackageBaseAddress` (the flat container) for downloading `.nupkg` files.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::*;
use crate::package::framework::get_nearest;

const REGISTRATIONS_TYPES: [&str; 3] = ["RegistrationsBaseUrl/3.6.0", "RegistrationsBaseUrl/3.4.0", "RegistrationsBaseUrl"];
const PACKAGE_BASE_TYPE: &str = "PackageBaseAddress/3.0.0";

#[derive(Debug, Deserialize)]
struct ServiceIndex {
	resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
	#[serde(rename = "@id")]
	id: String,
	#[serde(rename = "@type")]
	kind: OneOrMany,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
	One(String),
	Many(Vec<String>),
}

impl OneOrMany {
	fn contains(&self, s: &str) -> bool {
		match self {
			OneOrMany::One(v) => v == s,
			OneOrMany::Many(v) => v.iter().any(|v| v == s),
		}
	}
}

#[derive(Debug, Deserialize)]
struct RegistrationIndex {
	items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
struct RegistrationPage {
	#[serde(rename = "@id")]
	id: String,
	/// Large packages leave this out and the page has to be fetched from `id`.
	items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationLeaf {
	catalog_entry: CatalogEntry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
	version: String,
	#[serde(default = "listed_default")]
	listed: bool,
	#[serde(default)]
	dependency_groups: Vec<DependencyGroup>,
}

fn listed_default() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyGroup {
	target_framework: Option<String>,
	#[serde(default)]
	dependencies: Vec<RegistrationDependency>,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistrationDependency {
	id: String,
	range: Option<String>,
}

/// Urls of the resources we use, read from the service index.
#[derive(Debug, Clone)]
struct ServiceResources {
	registrations_base: String,
	package_base: String,
}

pub struct NuGetV3Source {
	client: reqwest::Client,
	index_url: String,
	resources: tokio::sync::OnceCell<ServiceResources>,
	/* Entries don't depend on the framework so they're cached as is. */
	catalog_cache: std::sync::Mutex<HashMap<String, Option<Vec<CatalogEntry>>>>,
}

impl NuGetV3Source {
	pub fn new(client: reqwest::Client, index_url: String) -> Self {
		Self {
			client,
			index_url,
			resources: Default::default(),
			catalog_cache: Default::default(),
		}
	}

	/// Gets and deserializes a JSON document, a 404 gives `Ok(None)`.
	async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>, RegistryError> {
		log::trace!("GET {}", url);
		let response = self.client.get(url).send().await?;
		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Ok(None)
		}
		if !response.status().is_success() {
			return Err(RegistryError::Http(url.to_string(), response.status().as_u16()))
		}
		let bytes = response.bytes().await?;
		Ok(Some(serde_json::from_slice(&bytes)?))
	}

	async fn resources(&self) -> Result<&ServiceResources, RegistryError> {
		self.resources.get_or_try_init(|| async {
			log::debug!("Reading service index {}", self.index_url);
			let index: ServiceIndex = self.get_json(&self.index_url)
				.await?
				.ok_or_else(|| RegistryError::Http(self.index_url.clone(), 404))?;

			let find = |kind: &str| index.resources.iter().find(|r| r.kind.contains(kind)).map(|r| with_trailing_slash(&r.id));

			let registrations_base = REGISTRATIONS_TYPES
				.iter()
				.find_map(|kind| find(kind))
				.ok_or_else(|| RegistryError::MissingResource(self.index_url.clone(), "RegistrationsBaseUrl"))?;
			let package_base = find(PACKAGE_BASE_TYPE)
				.ok_or_else(|| RegistryError::MissingResource(self.index_url.clone(), PACKAGE_BASE_TYPE))?;

			Ok::<_, RegistryError>(ServiceResources {
				registrations_base,
				package_base,
			})
		}).await
	}

	/// Entries are only ever inserted whole, a panic while the lock was held leaves them usable.
	fn catalog_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Option<Vec<CatalogEntry>>>> {
		self.catalog_cache.lock().unwrap_or_else(|poisoned| {
			log::warn!("Registration cache of {} was poisoned, recovering it", self.index_url);
			poisoned.into_inner()
		})
	}

	async fn get_catalog_entries(&self, id: &str) -> Result<Option<Vec<CatalogEntry>>, RegistryError> {
		let key = package_key(id);
		if let Some(cached) = self.catalog_cache().get(&key).cloned() {
			log::trace!("Using cached registration of {}", key);
			return Ok(cached)
		}

		let url = format!("{}{}/index.json", self.resources().await?.registrations_base, key);
		let entries = match self.get_json::<RegistrationIndex>(&url).await? {
			None => None,
			Some(index) => {
				let mut entries = Vec::<CatalogEntry>::new();
				for page in index.items {
					let leaves = match page.items {
						Some(leaves) => leaves,
						None => {
							self.get_json::<RegistrationPage>(&page.id)
								.await?
								.and_then(|p| p.items)
								.unwrap_or_default()
						},
					};
					entries.extend(leaves.into_iter().map(|l| l.catalog_entry));
				}
				Some(entries)
			},
		};

		self.catalog_cache().insert(key, entries.clone());

		Ok(entries)
	}
}

#[async_trait]
impl PackageSource for NuGetV3Source {
	fn name(&self) -> &str {
		&self.index_url
	}

	async fn get_package_listings(&self, id: &str, framework: &Framework) -> Result<Option<Vec<PackageListing>>, RegistryError> {
		Ok(self.get_catalog_entries(id).await?.map(|entries| listings_from_entries(id, entries, framework)))
	}

	async fn download_package(&self, package: &PackageIdentity) -> Result<Vec<u8>, RegistryError> {
		let id = package.key();
		let version = package.version().to_normalized_string().to_ascii_lowercase();
		let url = format!("{}{}/{}/{}.{}.nupkg", self.resources().await?.package_base, id, version, id, version);

		log::trace!("GET {}", url);
		let response = self.client.get(&url).send().await?;
		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(RegistryError::PackageMissing(package.clone(), self.index_url.clone()))
		}
		if !response.status().is_success() {
			return Err(RegistryError::Http(url, response.status().as_u16()))
		}

		Ok(response.bytes().await?.to_vec())
	}
}

fn with_trailing_slash(url: &str) -> String {
	if url.ends_with('/') {
		url.to_string()
	} else {
		format!("{}/", url)
	}
}

/// Converts raw catalog entries into listings, taking the dependency group nearest `framework`.
///
/// Entries that fail to parse are logged and skipped rather than failing the whole package.
fn listings_from_entries(id: &str, entries: Vec<CatalogEntry>, framework: &Framework) -> Vec<PackageListing> {
	let mut listings = Vec::<PackageListing>::with_capacity(entries.len());

	for entry in entries {
		let version = match NuGetVersion::new(&entry.version) {
			Ok(v) => v,
			Err(e) => {
				log::warn!("Skipping version of {} from registry: {}", id, e);
				continue;
			},
		};

		let mut groups = Vec::<(Framework, &DependencyGroup)>::new();
		for group in &entry.dependency_groups {
			match Framework::parse(group.target_framework.as_deref().unwrap_or_default()) {
				Ok(f) => groups.push((f, group)),
				Err(e) => log::warn!("Skipping dependency group of {} {}: {}", id, version, e),
			}
		}

		let nearest = get_nearest(framework, groups.iter().map(|(f, _)| f));
		let dependencies = match nearest.and_then(|n| groups.iter().find(|(f, _)| f == n)) {
			None => Vec::new(),
			Some((_, group)) => group.dependencies
				.iter()
				.filter_map(|d| {
					match VersionRange::parse(d.range.as_deref().unwrap_or_default()) {
						Ok(range) => Some(PackageDependency::new(d.id.clone(), range)),
						Err(e) => {
							log::warn!("Ignoring dependency {} of {} {}: {}", d.id, id, version, e);
							None
						},
					}
				})
				.collect(),
		};

		listings.push(PackageListing {
			version,
			listed: entry.listed,
			dependencies,
		});
	}

	listings
}
