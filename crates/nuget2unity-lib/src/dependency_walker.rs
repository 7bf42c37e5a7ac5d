//! Expands the transitive dependency closure of a root package.
//!
//! The walk is depth first over an explicit worklist, each dependency edge is followed at the floor of its range.
//! Every version encountered is kept, picking one version per id is left to the [`resolver`](crate::resolver).

use std::collections::HashSet;

use crate::package::*;
use crate::Registry;

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
	/// The root package has no manifest in any source.
	#[error("package {0} not found in any source.")]
	RootNotFound(PackageIdentity),
}

/// The result of a walk.
#[derive(Debug, Default)]
pub struct DependencyGraph {
	/// Every package version reached, possibly several versions of one id. The root is always first.
	pub packages: Vec<DependencyInfo>,
	/// Dependencies that had no reachable manifest, their subtrees are absent from `packages`.
	pub missing: Vec<PackageDependency>,
}

/// State of a single walk.
struct WalkContext<'a> {
	registry: &'a Registry,
	framework: &'a Framework,
	visited: HashSet<PackageIdentity>,
	worklist: Vec<PackageDependency>,
	graph: DependencyGraph,
}

impl<'a> WalkContext<'a> {
	/// Finds the manifest a dependency edge points at.
	///
	/// The floor of the range is tried first, if the floor isn't inclusive or isn't published
	/// the lowest version in the range is used instead.
	async fn find_dependency_info(&self, dependency: &PackageDependency) -> crate::Result<Option<DependencyInfo>> {
		let range = &dependency.range;

		if let (Some(min), true) = (range.min_version(), range.is_min_inclusive()) {
			let identity = PackageIdentity::new(dependency.id.clone(), min.clone());
			if self.visited.contains(&identity) {
				return Ok(None)
			}
			if let Some(info) = self.registry.resolve_dependency_info(&identity, self.framework).await? {
				return Ok(Some(info))
			}
			log::debug!("{} is not published, looking for the lowest version in {}", identity, range);
		}

		let Some(version) = self.registry.resolve_lowest_version(&dependency.id, range, self.framework).await? else {
			return Ok(None)
		};

		let identity = PackageIdentity::new(dependency.id.clone(), version);
		if self.visited.contains(&identity) {
			return Ok(None)
		}
		Ok(self.registry.resolve_dependency_info(&identity, self.framework).await?)
	}

	fn is_visited(&self, dependency: &PackageDependency) -> bool {
		match (dependency.range.min_version(), dependency.range.is_min_inclusive()) {
			(Some(min), true) => self.visited.contains(&PackageIdentity::new(dependency.id.clone(), min.clone())),
			_ => false,
		}
	}

	fn visit(&mut self, info: DependencyInfo) {
		log::trace!("Visiting {} with {} dependencies", info.identity, info.dependencies.len());
		self.visited.insert(info.identity.clone());
		/* Reversed so the first declared dependency is expanded first */
		for dependency in info.dependencies.iter().rev() {
			if !self.is_visited(dependency) {
				self.worklist.push(dependency.clone());
			}
		}
		self.graph.packages.push(info);
	}
}

/// Walks the dependency graph below `root`.
///
/// Dependencies without a manifest are logged and skipped, only a missing root is an error.
pub async fn walk(registry: &Registry, root: &PackageIdentity, framework: &Framework) -> crate::Result<DependencyGraph> {
	log::info!("Walking dependencies of {} for {}", root, framework);

	let mut context = WalkContext {
		registry,
		framework,
		visited: HashSet::new(),
		worklist: Vec::new(),
		graph: DependencyGraph::default(),
	};

	let root_info = registry
		.resolve_dependency_info(root, framework)
		.await?
		.ok_or_else(|| WalkError::RootNotFound(root.clone()))?;
	context.visit(root_info);

	while let Some(dependency) = context.worklist.pop() {
		/* Two paths can queue the same edge before either is visited */
		if context.is_visited(&dependency) {
			continue;
		}

		let found = context.find_dependency_info(&dependency).await?;
		match found {
			Some(info) if context.visited.contains(&info.identity) => {},
			Some(info) => context.visit(info),
			None => {
				if !context.graph.missing.contains(&dependency) && !is_reached(&context, &dependency) {
					log::warn!("No manifest found for dependency {}, skipping it", dependency);
					context.graph.missing.push(dependency);
				}
			},
		}
	}

	log::debug!("Walk reached {} package versions", context.graph.packages.len());
	Ok(context.graph)
}

/// Checks if some already visited version satisfies the dependency.
///
/// `find_dependency_info` gives `None` both for a missing manifest and for a version already visited.
fn is_reached(context: &WalkContext, dependency: &PackageDependency) -> bool {
	context.graph.packages
		.iter()
		.any(|p| p.identity.id().eq_ignore_ascii_case(&dependency.id) && dependency.range.satisfies(p.identity.version()))
}
