//! Removes packages the Unity runtime already provides.

use crate::resolver::ResolvedSet;

/// Packages shipped with Unity, copying them into a project causes duplicate assembly errors.
pub const RUNTIME_PROVIDED_PACKAGES: &[&str] = &[
	"System.Runtime.Serialization.Primitives",
];

/// The built in list followed by the configured extras.
pub fn exclusion_list(config: &crate::Config) -> Vec<String> {
	RUNTIME_PROVIDED_PACKAGES
		.iter()
		.map(|s| s.to_string())
		.chain(config.excluded_packages().iter().cloned())
		.collect()
}

/// Removes every package whose id exactly matches an entry of `exclusions`.
///
/// Matching is case sensitive. Runs after resolution so excluded packages still constrain their dependencies.
pub fn filter<S: AsRef<str>>(mut resolved: ResolvedSet, exclusions: &[S]) -> ResolvedSet {
	resolved.retain(|package| {
		let excluded = exclusions.iter().any(|e| e.as_ref() == package.identity.id());
		if excluded {
			log::info!("Excluding {}, it is provided by the runtime", package.identity);
		}
		!excluded
	});
	resolved
}
