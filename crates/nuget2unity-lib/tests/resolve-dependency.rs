use std::sync::atomic::Ordering;

use nuget2unity::dependency_walker::{walk, WalkError};
use nuget2unity::package::*;
use nuget2unity::resolver::{resolve, DependencyBehavior, ResolveError};
use nuget2unity::Registry;
use nuget2unity_test_utils::MemorySource;

fn v(s: &str) -> NuGetVersion { NuGetVersion::new(s).unwrap() }

fn target() -> Framework { Framework::netstandard(2, 0) }

async fn walk_and_resolve(registry: &Registry, id: &str, version: &str) -> Result<nuget2unity::resolver::ResolvedSet, ResolveError> {
	let root = PackageIdentity::new(id, v(version));
	let graph = walk(registry, &root, &target()).await.unwrap();
	resolve(&root, &graph.packages, DependencyBehavior::Lowest)
}

#[tokio::test]
async fn cycle_terminates_and_resolves_each_once() {
	let source = MemorySource::new("memory")
		.with_package("A", "1.0.0", &[("B", "1.0.0")], &[]).unwrap()
		.with_package("B", "1.0.0", &[("A", "1.0.0")], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let root = PackageIdentity::new("A", v("1.0.0"));
	let graph = walk(&registry, &root, &target()).await.unwrap();
	assert_eq!(graph.packages.len(), 2);

	let set = resolve(&root, &graph.packages, DependencyBehavior::Lowest).unwrap();
	assert_eq!(set.len(), 2);
}

#[tokio::test]
async fn diamond_resolves_to_highest_floor() {
	let source = MemorySource::new("memory")
		.with_package("Root", "1.0.0", &[("A", "1.0.0"), ("B", "1.0.0")], &[]).unwrap()
		.with_package("A", "1.0.0", &[("C", "1.0.0")], &[]).unwrap()
		.with_package("B", "1.0.0", &[("C", "1.2.0")], &[]).unwrap()
		.with_package("C", "1.0.0", &[], &[]).unwrap()
		.with_package("C", "1.2.0", &[], &[]).unwrap()
		.with_package("C", "1.5.0", &[], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let set = walk_and_resolve(&registry, "Root", "1.0.0").await.unwrap();
	assert_eq!(set.get("C").unwrap().identity.version(), &v("1.2.0"));
	assert_eq!(set.len(), 4);
}

#[tokio::test]
async fn shared_dependency_is_expanded_once() {
	let source = MemorySource::new("memory")
		.with_package("Root", "1.0.0", &[("A", "1.0.0"), ("B", "1.0.0")], &[]).unwrap()
		.with_package("A", "1.0.0", &[("C", "1.0.0")], &[]).unwrap()
		.with_package("B", "1.0.0", &[("C", "1.0.0"), ("A", "1.0.0")], &[]).unwrap()
		.with_package("C", "1.0.0", &[("Root", "1.0.0")], &[]).unwrap();
	let listings = source.listing_counter();
	let registry = Registry::new(vec![source.boxed()]);

	let root = PackageIdentity::new("Root", v("1.0.0"));
	let graph = walk(&registry, &root, &target()).await.unwrap();
	assert_eq!(graph.packages.len(), 4);
	assert!(graph.missing.is_empty());
	/* One listing per identity, every edge back into the graph is skipped */
	assert_eq!(listings.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn disjoint_ranges_are_unsatisfiable() {
	let source = MemorySource::new("memory")
		.with_package("Root", "1.0.0", &[("A", "1.0.0"), ("B", "1.0.0")], &[]).unwrap()
		.with_package("A", "1.0.0", &[("C", "[1.0.0, 1.1.0)")], &[]).unwrap()
		.with_package("B", "1.0.0", &[("C", "[1.2.0, 2.0.0)")], &[]).unwrap()
		.with_package("C", "1.0.0", &[], &[]).unwrap()
		.with_package("C", "1.2.0", &[], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let result = walk_and_resolve(&registry, "Root", "1.0.0").await;
	assert!(matches!(result, Err(ResolveError::Unsatisfiable { .. })));
}

#[tokio::test]
async fn conflict_from_a_replaced_version_is_not_fatal() {
	let source = MemorySource::new("memory")
		.with_package("Root", "1.0.0", &[("A", "1.0.0"), ("B", "1.0.0")], &[]).unwrap()
		.with_package("A", "1.0.0", &[("C", "[1.0.0, 1.1.0)")], &[]).unwrap()
		.with_package("A", "2.0.0", &[], &[]).unwrap()
		.with_package("B", "1.0.0", &[("A", "2.0.0"), ("C", "[1.2.0, 2.0.0)")], &[]).unwrap()
		.with_package("C", "1.0.0", &[], &[]).unwrap()
		.with_package("C", "1.2.0", &[], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let set = walk_and_resolve(&registry, "Root", "1.0.0").await.unwrap();
	assert_eq!(set.len(), 4);
	assert_eq!(set.get("A").unwrap().identity.version(), &v("2.0.0"));
	assert_eq!(set.get("B").unwrap().identity.version(), &v("1.0.0"));
	assert_eq!(set.get("C").unwrap().identity.version(), &v("1.2.0"));
}

#[tokio::test]
async fn missing_manifest_is_skipped() {
	let source = MemorySource::new("memory")
		.with_package("Root", "1.0.0", &[("Ghost", "1.0.0"), ("A", "1.0.0")], &[]).unwrap()
		.with_package("A", "1.0.0", &[], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let root = PackageIdentity::new("Root", v("1.0.0"));
	let graph = walk(&registry, &root, &target()).await.unwrap();
	assert_eq!(graph.packages.len(), 2);
	assert_eq!(graph.missing, vec![PackageDependency::new("Ghost", VersionRange::parse("1.0.0").unwrap())]);

	let set = resolve(&root, &graph.packages, DependencyBehavior::Lowest).unwrap();
	assert!(set.contains("A"));
	assert!(!set.contains("Ghost"));
}

#[tokio::test]
async fn missing_root_is_fatal() {
	let registry = Registry::new(vec![MemorySource::new("memory").boxed()]);
	let result = walk(&registry, &PackageIdentity::new("Nothing", v("1.0.0")), &target()).await;
	assert!(matches!(result, Err(nuget2unity::Error::Walk(WalkError::RootNotFound(_)))));
}

#[tokio::test]
async fn unpublished_floor_uses_lowest_in_range() {
	let source = MemorySource::new("memory")
		.with_package("Root", "1.0.0", &[("A", "[1.0.0, 2.0.0)")], &[]).unwrap()
		.with_package("A", "1.3.0", &[], &[]).unwrap()
		.with_package("A", "1.1.0", &[], &[]).unwrap()
		.with_package("A", "2.0.0", &[], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let set = walk_and_resolve(&registry, "Root", "1.0.0").await.unwrap();
	assert_eq!(set.get("a").unwrap().identity.version(), &v("1.1.0"));
}

#[tokio::test]
async fn lowest_in_range_prefers_listed_releases() {
	let source = MemorySource::new("memory")
		.with_package("A", "1.0.1-beta", &[], &[]).unwrap()
		.with_package_listed("A", "1.0.5", &[], &[], false).unwrap()
		.with_package("A", "1.1.0", &[], &[]).unwrap()
		.with_package_listed("B", "1.0.5", &[], &[], false).unwrap()
		.with_package("C", "1.0.0-beta", &[], &[]).unwrap()
		.with_package("C", "1.0.0", &[], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);
	let range = |s: &str| VersionRange::parse(s).unwrap();

	let a = registry.resolve_lowest_version("A", &range("[1.0.0, 2.0.0)"), &target()).await.unwrap();
	assert_eq!(a, Some(v("1.1.0")));

	/* Unlisted only when nothing listed is in range */
	let b = registry.resolve_lowest_version("B", &range("[1.0.0, 2.0.0)"), &target()).await.unwrap();
	assert_eq!(b, Some(v("1.0.5")));

	let c = registry.resolve_lowest_version("C", &range("[1.0.0-alpha, 2.0.0)"), &target()).await.unwrap();
	assert_eq!(c, Some(v("1.0.0-beta")));
}

#[tokio::test]
async fn ids_are_case_insensitive() {
	let source = MemorySource::new("memory")
		.with_package("Root", "1.0.0", &[("newtonsoft.json", "13.0.1")], &[]).unwrap()
		.with_package("Newtonsoft.Json", "13.0.1", &[], &[]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let set = walk_and_resolve(&registry, "Root", "1.0.0").await.unwrap();
	assert!(set.contains("Newtonsoft.Json"));
	assert_eq!(set.len(), 2);
}

#[tokio::test]
async fn latest_version_skips_prerelease_and_unlisted() {
	let source = MemorySource::new("memory")
		.with_package("Foo", "1.0.0", &[], &[]).unwrap()
		.with_package("Foo", "1.1.0", &[], &[]).unwrap()
		.with_package("Foo", "2.0.0-beta", &[], &[]).unwrap()
		.with_package_listed("Foo", "1.5.0", &[], &[], false).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	assert_eq!(registry.resolve_latest_version("foo", &target()).await.unwrap(), v("1.1.0"));
	assert!(matches!(
		registry.resolve_latest_version("Bar", &target()).await,
		Err(nuget2unity::registry::RegistryError::NotFound(_))
	));
}

#[tokio::test]
async fn sources_are_queried_in_order() {
	let first = MemorySource::new("first")
		.with_package("Foo", "1.0.0", &[], &[]).unwrap();
	let second = MemorySource::new("second")
		.with_package("Foo", "1.0.0", &[], &[]).unwrap()
		.with_package("Bar", "1.0.0", &[], &[]).unwrap();
	let registry = Registry::new(vec![first.boxed(), second.boxed()]);

	let foo = registry.resolve_dependency_info(&PackageIdentity::new("Foo", v("1.0.0")), &target()).await.unwrap().unwrap();
	assert_eq!(foo.source_repository, 0);

	let bar = registry.resolve_dependency_info(&PackageIdentity::new("Bar", v("1.0.0")), &target()).await.unwrap().unwrap();
	assert_eq!(bar.source_repository, 1);
	assert_eq!(registry.source_name(bar.source_repository), "second");
}
