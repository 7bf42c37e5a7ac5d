use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::Ordering;
use std::time::Duration;

use nuget2unity::package::NuGetVersion;
use nuget2unity::repackage::{repackage, RepackageOptions};
use nuget2unity::Registry;
use nuget2unity_test_utils::{test_config, test_dir, MemorySource};

fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// Reads a `.unitypackage` back into `pathname -> (asset.meta, asset)`.
fn read_unity_package(path: &std::path::Path) -> HashMap<String, (String, Option<Vec<u8>>)> {
	let file = std::fs::File::open(path).unwrap();
	let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));

	let mut entries = HashMap::<String, HashMap<String, Vec<u8>>>::new();
	for entry in archive.entries().unwrap() {
		let mut entry = entry.unwrap();
		let name = entry.path().unwrap().to_string_lossy().to_string();
		let (guid, part) = name.split_once('/').unwrap();
		let mut data = Vec::new();
		entry.read_to_end(&mut data).unwrap();
		entries.entry(guid.to_string()).or_default().insert(part.to_string(), data);
	}

	entries
		.into_values()
		.map(|mut parts| {
			let pathname = String::from_utf8(parts.remove("pathname").unwrap()).unwrap();
			let meta = String::from_utf8(parts.remove("asset.meta").unwrap()).unwrap();
			(pathname, (meta, parts.remove("asset")))
		})
		.collect()
}

#[tokio::test]
async fn single_package_end_to_end() {
	init_logging();
	let dir = test_dir().unwrap();
	let config = test_config(dir.path());
	let source = MemorySource::new("memory")
		.with_package("Foo", "1.0.0", &[], &["lib/netstandard2.0/Foo.dll", "lib/netstandard2.0/Foo.xml"]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let mut options = RepackageOptions::new("Foo");
	options.output_path = dir.path().join("out");

	let output = repackage(&config, &registry, &options).await.unwrap();
	assert_eq!(output, dir.path().join("out").join("Foo.unitypackage"));

	let assets = read_unity_package(&output);
	let mut names = assets.keys().cloned().collect::<Vec<_>>();
	names.sort();
	assert_eq!(names, vec!["Assets/Plugins", "Assets/Plugins/Foo.dll", "Assets/Plugins/link.xml"]);

	let (meta, content) = &assets["Assets/Plugins/Foo.dll"];
	assert!(meta.contains("PluginImporter:"));
	assert_eq!(content.as_deref(), Some("Foo/lib/netstandard2.0/Foo.dll".as_bytes()));

	let (_, link_xml) = &assets["Assets/Plugins/link.xml"];
	let link_xml = String::from_utf8(link_xml.clone().unwrap()).unwrap();
	assert!(link_xml.contains(r#"<assembly fullname="System.Core">"#));
	assert!(link_xml.contains(r#"<assembly fullname="Foo" preserve="all"/>"#));
	assert_eq!(link_xml.matches("<assembly ").count(), 2);

	assert!(assets["Assets/Plugins"].1.is_none());
}

#[tokio::test]
async fn dependencies_are_packed_and_excluded_ones_skipped() {
	init_logging();
	let dir = test_dir().unwrap();
	let config = test_config(dir.path());
	let source = MemorySource::new("memory")
		.with_package("Foo", "2.0.0", &[("Bar", "1.0.0"), ("System.Runtime.Serialization.Primitives", "4.3.0")], &["lib/netstandard2.0/Foo.dll"]).unwrap()
		.with_package("Bar", "1.0.0", &[], &["lib/netstandard1.3/Bar.dll"]).unwrap()
		.with_package("System.Runtime.Serialization.Primitives", "4.3.0", &[], &["lib/netstandard1.3/System.Runtime.Serialization.Primitives.dll"]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let project = dir.path().join("project");
	let mut options = RepackageOptions::new("Foo");
	options.version = Some(NuGetVersion::new("2.0.0").unwrap());
	options.unity_project = Some(project.clone());
	options.output_path = dir.path().join("out");

	let output = repackage(&config, &registry, &options).await.unwrap();
	let assets = read_unity_package(&output);

	assert!(assets.contains_key("Assets/Plugins/Foo.dll"));
	assert!(assets.contains_key("Assets/Plugins/Bar.dll"));
	assert!(!assets.contains_key("Assets/Plugins/System.Runtime.Serialization.Primitives.dll"));

	/* The given project keeps its assets */
	assert!(project.join("Assets/Plugins/Bar.dll").is_file());
	assert!(project.join("Assets/Plugins/link.xml").is_file());
}

#[tokio::test]
async fn skip_link_xml_and_stale_plugins_are_cleared() {
	init_logging();
	let dir = test_dir().unwrap();
	let config = test_config(dir.path());
	let source = MemorySource::new("memory")
		.with_package("Foo", "1.0.0", &[], &["lib/netstandard2.0/Foo.dll"]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let project = dir.path().join("project");
	std::fs::create_dir_all(project.join("Assets/Plugins/Old")).unwrap();
	std::fs::write(project.join("Assets/Plugins/Old/Stale.dll"), b"stale").unwrap();

	let mut options = RepackageOptions::new("Foo");
	options.unity_project = Some(project.clone());
	options.output_path = dir.path().join("out");
	options.skip_link_xml = true;

	let output = repackage(&config, &registry, &options).await.unwrap();
	let mut names = read_unity_package(&output).into_keys().collect::<Vec<_>>();
	names.sort();
	assert_eq!(names, vec!["Assets/Plugins", "Assets/Plugins/Foo.dll"]);
	assert!(!project.join("Assets/Plugins/Old").exists());
}

#[tokio::test]
async fn guids_are_stable_across_runs() {
	init_logging();
	let dir = test_dir().unwrap();
	let config = test_config(dir.path());
	let source = MemorySource::new("memory")
		.with_package("Foo", "1.0.0", &[], &["lib/netstandard2.0/Foo.dll"]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let mut options = RepackageOptions::new("Foo");
	options.output_path = dir.path().join("first");
	let first = read_unity_package(&repackage(&config, &registry, &options).await.unwrap());
	options.output_path = dir.path().join("second");
	let second = read_unity_package(&repackage(&config, &registry, &options).await.unwrap());

	assert_eq!(first, second);
}

#[tokio::test]
async fn failed_run_writes_no_archive() {
	init_logging();
	let dir = test_dir().unwrap();
	let config = test_config(dir.path());
	let source = MemorySource::new("memory")
		.with_package("Foo", "1.0.0", &[], &["lib/net6.0/Foo.dll"]).unwrap();
	let registry = Registry::new(vec![source.boxed()]);

	let mut options = RepackageOptions::new("Foo");
	options.output_path = dir.path().join("out");

	let result = repackage(&config, &registry, &options).await;
	assert!(matches!(result, Err(nuget2unity::Error::Materialize(_))));
	assert!(!dir.path().join("out").join("Foo.unitypackage").exists());
}

#[tokio::test]
async fn cancelled_run_leaves_nothing_behind() {
	init_logging();
	let dir = test_dir().unwrap();
	let config = test_config(dir.path());
	let source = MemorySource::new("memory")
		.with_package("Foo", "1.0.0", &[], &["lib/netstandard2.0/Foo.dll"]).unwrap()
		.with_stalled_downloads();
	let downloads = source.download_counter();
	let registry = Registry::new(vec![source.boxed()]);

	let mut options = RepackageOptions::new("Foo");
	options.output_path = dir.path().join("out");

	let result = tokio::time::timeout(Duration::from_millis(200), repackage(&config, &registry, &options)).await;
	assert!(result.is_err());
	assert_eq!(downloads.load(Ordering::SeqCst), 1);

	assert!(!config.package_dir().join("foo.1.0.0").exists());
	if config.package_dir().exists() {
		assert_eq!(std::fs::read_dir(config.package_dir()).unwrap().count(), 0);
	}
	assert!(!dir.path().join("out").exists());
}
