//! Picks exactly one version per package id from the walked graph.
//!
//! Constraints are folded per id by intersecting the ranges every selected dependent declares.
//! A version is then picked for each constrained id and the process repeats until the selection is stable.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Serialize, Deserialize};

use crate::package::*;

/// Which version to pick when several satisfy the constraints.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyBehavior {
	/// The lowest satisfying version, NuGet's default.
	#[default]
	Lowest,
	Highest,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
	/// No version of `id` can satisfy every dependent.
	#[error("unable to satisfy constraints on {id}: {reason}")]
	Unsatisfiable {
		id: String,
		reason: String,
	},
	#[error("root package {0} is not in the dependency graph.")]
	RootMissing(PackageIdentity),
}

/// The final install set, keyed by lowercase package id.
#[derive(Debug, Clone)]
pub struct ResolvedSet {
	root: PackageIdentity,
	packages: BTreeMap<String, DependencyInfo>,
}

impl ResolvedSet {
	pub fn root(&self) -> &PackageIdentity {
		&self.root
	}

	pub fn get(&self, id: &str) -> Option<&DependencyInfo> {
		self.packages.get(&package_key(id))
	}

	pub fn contains(&self, id: &str) -> bool {
		self.packages.contains_key(&package_key(id))
	}

	pub fn len(&self) -> usize {
		self.packages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.packages.is_empty()
	}

	/// Packages ordered by id.
	pub fn packages(&self) -> impl Iterator<Item = &DependencyInfo> {
		self.packages.values()
	}

	pub fn identities(&self) -> impl Iterator<Item = &PackageIdentity> {
		self.packages.values().map(|p| &p.identity)
	}

	pub fn retain(&mut self, mut f: impl FnMut(&DependencyInfo) -> bool) {
		self.packages.retain(|_, p| f(p));
	}

	pub fn into_packages(self) -> Vec<DependencyInfo> {
		self.packages.into_values().collect()
	}
}

/// A constraint on one id and where its parts came from.
struct Constraint {
	/// The id as first declared, for messages.
	id: String,
	/// `None` once two requirements stop overlapping.
	range: Option<VersionRange>,
	required_by: Vec<String>,
}

struct Resolver<'a> {
	root: &'a PackageIdentity,
	/// Every walked version of each id, sorted ascending.
	pool: HashMap<String, Vec<&'a DependencyInfo>>,
	behavior: DependencyBehavior,
}

type Selection<'a> = BTreeMap<String, &'a DependencyInfo>;

impl<'a> Resolver<'a> {
	/// Intersects the ranges declared by every package reachable from the root through `selection`.
	fn constraints(&self, selection: &Selection<'a>) -> BTreeMap<String, Constraint> {
		let mut constraints = BTreeMap::<String, Constraint>::new();
		constraints.insert(self.root.key(), Constraint {
			id: self.root.id().to_string(),
			range: Some(VersionRange::exact(self.root.version().clone())),
			required_by: vec!["<root>".to_string()],
		});

		let mut stack = vec![self.root.key()];
		let mut reached = HashSet::<String>::new();
		reached.insert(self.root.key());

		while let Some(key) = stack.pop() {
			/* Ids that aren't selected yet get picked in the next round */
			let Some(package) = selection.get(&key) else { continue };

			for dependency in &package.dependencies {
				let dep_key = package_key(&dependency.id);
				if !self.pool.contains_key(&dep_key) {
					continue;
				}

				let requirement = format!("{} requires {}", package.identity, dependency);
				match constraints.get_mut(&dep_key) {
					Some(existing) => {
						existing.required_by.push(requirement);
						existing.range = existing.range.as_ref().and_then(|r| r.intersect(&dependency.range));
					},
					None => {
						constraints.insert(dep_key.clone(), Constraint {
							id: dependency.id.clone(),
							range: Some(dependency.range.clone()),
							required_by: vec![requirement],
						});
					},
				}

				if reached.insert(dep_key.clone()) {
					stack.push(dep_key);
				}
			}
		}

		constraints
	}

	fn pick(&self, key: &str, constraint: &Constraint) -> Result<&'a DependencyInfo, ResolveError> {
		let Some(range) = &constraint.range else {
			return Err(ResolveError::Unsatisfiable {
				id: constraint.id.clone(),
				reason: format!("no overlap between {}", constraint.required_by.join(", ")),
			})
		};

		let candidates = self.pool.get(key).map(Vec::as_slice).unwrap_or_default();
		let mut satisfying = candidates.iter().filter(|p| range.satisfies(p.identity.version()));

		let picked = match self.behavior {
			DependencyBehavior::Lowest => satisfying.next(),
			DependencyBehavior::Highest => satisfying.last(),
		};

		picked.copied().ok_or_else(|| ResolveError::Unsatisfiable {
			id: constraint.id.clone(),
			reason: format!(
				"none of the available versions [{}] satisfy {} ({})",
				candidates.iter().map(|p| p.identity.version().to_string()).collect::<Vec<_>>().join(", "),
				range,
				constraint.required_by.join(", "),
			),
		})
	}
}

/// Picks one version per package id reachable from `root`.
///
/// Ids that appear in ranges but have no version in `available` are left out,
/// the walk already reported them as missing.
///
/// A conflict only fails the resolution once the selection stops changing,
/// until then it may come from a dependent that is about to be replaced.
pub fn resolve(root: &PackageIdentity, available: &[DependencyInfo], behavior: DependencyBehavior) -> Result<ResolvedSet, ResolveError> {
	let mut pool = HashMap::<String, Vec<&DependencyInfo>>::new();
	for package in available {
		let versions = pool.entry(package.identity.key()).or_default();
		if !versions.iter().any(|p| p.identity == package.identity) {
			versions.push(package);
		}
	}
	for versions in pool.values_mut() {
		versions.sort_by(|a, b| a.identity.version().cmp(b.identity.version()));
	}

	let root_info = pool
		.get(&root.key())
		.and_then(|versions| versions.iter().find(|p| &p.identity == root))
		.copied()
		.ok_or_else(|| ResolveError::RootMissing(root.clone()))?;

	let resolver = Resolver {
		root,
		pool,
		behavior,
	};

	let mut selection = Selection::new();
	selection.insert(root.key(), root_info);
	let mut seen = HashSet::<Vec<PackageIdentity>>::new();

	loop {
		let constraints = resolver.constraints(&selection);

		let mut next = Selection::new();
		let mut conflicts = Vec::new();
		for (key, constraint) in &constraints {
			match resolver.pick(key, constraint) {
				Ok(picked) => {
					next.insert(key.clone(), picked);
				},
				Err(conflict) => {
					/* Hold the previous pick while the dependents settle */
					if let Some(previous) = selection.get(key) {
						next.insert(key.clone(), *previous);
					}
					log::trace!("Deferring conflict: {}", conflict);
					conflicts.push(conflict);
				},
			}
		}

		let snapshot = next.values().map(|p| p.identity.clone()).collect::<Vec<_>>();
		if next.len() == selection.len() && next.iter().all(|(k, p)| selection.get(k).map(|s| s.identity == p.identity).unwrap_or(false)) {
			if let Some(conflict) = conflicts.into_iter().next() {
				return Err(conflict)
			}
			log::debug!("Resolved {} packages", next.len());
			return Ok(ResolvedSet {
				root: root.clone(),
				packages: next.into_iter().map(|(k, p)| (k, p.clone())).collect(),
			})
		}

		/* Revisiting a selection means the constraints oscillate and will never settle */
		if !seen.insert(snapshot) {
			return Err(conflicts.into_iter().next().unwrap_or_else(|| ResolveError::Unsatisfiable {
				id: root.id().to_string(),
				reason: "the selected versions never settle on a consistent set".to_string(),
			}))
		}

		selection = next;
	}
}
