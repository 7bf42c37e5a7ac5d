//! Target frameworks and the "nearest compatible" relation between them.
//!
//! Packages group their binaries and dependencies by target framework, e.g. `lib/netstandard2.0/`.
//! Given the framework being built for, [`get_nearest()`] picks the one group that should be used.

/// The family of a target framework, versions are only comparable within a family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameworkFamily {
	/// Content that applies to every framework, such as files placed directly in `lib/`.
	Any,
	NetStandard,
	/// The classic .NET Framework, `net45`, `net461` etc.
	NetFramework,
	/// .NET Core and `net5.0` onwards.
	NetCoreApp,
	/// Universal Windows Platform.
	Uap,
	/// An identifier we don't know how to relate to anything else.
	Other(String),
}

/// A framework version, always four components with missing components as zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameworkVersion(pub u32, pub u32, pub u32, pub u32);

impl FrameworkVersion {
	pub fn new(major: u32, minor: u32) -> Self {
		FrameworkVersion(major, minor, 0, 0)
	}

	/// Parses both dotted (`2.0`, `10.0.16299`) and folder style (`20`, `461`) versions.
	fn parse(version: &str) -> crate::Result<Self> {
		let parse_error = || crate::Error::Parse(format!("\"{}\" is not a valid framework version", version));

		let parts: Vec<u32> = if version.contains('.') {
			version.split('.').map(|p| p.parse::<u32>().map_err(|_| parse_error())).collect::<crate::Result<_>>()?
		} else {
			version.chars().map(|c| c.to_digit(10).ok_or_else(parse_error)).collect::<crate::Result<_>>()?
		};

		if parts.is_empty() || parts.len() > 4 {
			return Err(parse_error())
		}

		let mut v = [0u32; 4];
		v[..parts.len()].copy_from_slice(&parts);
		Ok(FrameworkVersion(v[0], v[1], v[2], v[3]))
	}

	fn dotted(&self) -> String {
		let mut s = format!("{}.{}", self.0, self.1);
		if self.2 != 0 || self.3 != 0 { s.push_str(&format!(".{}", self.2)); }
		if self.3 != 0 { s.push_str(&format!(".{}", self.3)); }
		s
	}
}

/// A target framework moniker such as `netstandard2.0` or `net6.0-windows`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Framework {
	family: FrameworkFamily,
	version: FrameworkVersion,
	platform: Option<String>,
}

impl Framework {
	pub fn new(family: FrameworkFamily, version: FrameworkVersion) -> Self {
		Self {
			family,
			version,
			platform: None,
		}
	}

	pub fn any() -> Self {
		Self::new(FrameworkFamily::Any, FrameworkVersion::default())
	}

	pub fn netstandard(major: u32, minor: u32) -> Self {
		Self::new(FrameworkFamily::NetStandard, FrameworkVersion::new(major, minor))
	}

	pub fn family(&self) -> &FrameworkFamily {
		&self.family
	}

	pub fn version(&self) -> FrameworkVersion {
		self.version
	}

	pub fn platform(&self) -> Option<&str> {
		self.platform.as_deref()
	}

	/// Parses a framework from either a folder name (`netstandard2.0`, `net461`)
	/// or a long name (`.NETStandard2.0`, `.NETFramework,Version=v4.6.1`).
	///
	/// An empty string or `any` gives [`Framework::any()`].
	pub fn parse(framework: &str) -> crate::Result<Self> {
		let lower = framework.trim().to_ascii_lowercase();
		if lower.is_empty() || lower == "any" {
			return Ok(Self::any())
		}

		let (name, platform) = match lower.split_once('-') {
			Some((n, p)) => (n, Some(p.to_string())),
			None => (lower.as_str(), None),
		};

		let (identifier, version) = match name.split_once(",version=") {
			/* Long names may carry a trailing `,Profile=...` */
			Some((i, v)) => (i, v.split(',').next().unwrap_or_default().trim_start_matches('v')),
			None => {
				let i = name.find(|c: char| c.is_ascii_digit()).unwrap_or(name.len());
				(&name[..i], &name[i..])
			},
		};

		let version = if version.is_empty() {
			FrameworkVersion::default()
		} else {
			FrameworkVersion::parse(version)?
		};

		let family = match identifier.trim_start_matches('.') {
			"netstandard" => FrameworkFamily::NetStandard,
			"netframework" => FrameworkFamily::NetFramework,
			"netcoreapp" => FrameworkFamily::NetCoreApp,
			"net" if version.0 >= 5 => FrameworkFamily::NetCoreApp,
			"net" => FrameworkFamily::NetFramework,
			"uap" | "netplatform" => FrameworkFamily::Uap,
			"any" => FrameworkFamily::Any,
			other => FrameworkFamily::Other(other.to_string()),
		};

		Ok(Framework {
			family,
			version,
			platform,
		})
	}

	/// The short folder name of this framework.
	pub fn folder_name(&self) -> String {
		let name = match &self.family {
			FrameworkFamily::Any => return "any".to_string(),
			FrameworkFamily::NetStandard => format!("netstandard{}", self.version.dotted()),
			FrameworkFamily::NetFramework => {
				let FrameworkVersion(a, b, c, d) = self.version;
				let mut s = format!("net{}{}", a, b);
				if c != 0 || d != 0 { s.push_str(&c.to_string()); }
				if d != 0 { s.push_str(&d.to_string()); }
				s
			},
			FrameworkFamily::NetCoreApp if self.version.0 >= 5 => format!("net{}", self.version.dotted()),
			FrameworkFamily::NetCoreApp => format!("netcoreapp{}", self.version.dotted()),
			FrameworkFamily::Uap => format!("uap{}", self.version.dotted()),
			FrameworkFamily::Other(name) if self.version == FrameworkVersion::default() => name.clone(),
			FrameworkFamily::Other(name) => format!("{}{}", name, self.version.dotted()),
		};
		match &self.platform {
			Some(platform) => format!("{}-{}", name, platform),
			None => name,
		}
	}
}

impl std::str::FromStr for Framework {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for Framework {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(&value) }
}

impl From<Framework> for String {
	fn from(value: Framework) -> Self {
		value.folder_name()
	}
}

impl std::fmt::Display for Framework {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.folder_name())
	}
}

/// The highest `netstandard` version a framework implements.
fn netstandard_support(target: &Framework) -> Option<FrameworkVersion> {
	let v = target.version;
	match target.family {
		FrameworkFamily::NetStandard => Some(v),
		FrameworkFamily::NetFramework if v >= FrameworkVersion(4, 6, 1, 0) => Some(FrameworkVersion::new(2, 0)),
		FrameworkFamily::NetFramework if v >= FrameworkVersion(4, 6, 0, 0) => Some(FrameworkVersion::new(1, 3)),
		FrameworkFamily::NetFramework if v >= FrameworkVersion(4, 5, 1, 0) => Some(FrameworkVersion::new(1, 2)),
		FrameworkFamily::NetFramework if v >= FrameworkVersion(4, 5, 0, 0) => Some(FrameworkVersion::new(1, 1)),
		FrameworkFamily::NetCoreApp if v >= FrameworkVersion::new(3, 0) => Some(FrameworkVersion::new(2, 1)),
		FrameworkFamily::NetCoreApp if v >= FrameworkVersion::new(2, 0) => Some(FrameworkVersion::new(2, 0)),
		FrameworkFamily::NetCoreApp if v >= FrameworkVersion::new(1, 0) => Some(FrameworkVersion::new(1, 6)),
		FrameworkFamily::Uap if v >= FrameworkVersion(10, 0, 16299, 0) => Some(FrameworkVersion::new(2, 0)),
		FrameworkFamily::Uap if v >= FrameworkVersion::new(10, 0) => Some(FrameworkVersion::new(1, 4)),
		_ => None,
	}
}

/// Checks if content built for `candidate` can be used by a project targeting `target`.
pub fn is_compatible(target: &Framework, candidate: &Framework) -> bool {
	if candidate.family == FrameworkFamily::Any {
		return true
	}

	/* Platform specific content needs a project for that platform */
	if let Some(platform) = &candidate.platform {
		if target.platform.as_ref() != Some(platform) {
			return false
		}
	}

	if candidate.family == target.family {
		return candidate.version <= target.version
	}

	if candidate.family == FrameworkFamily::NetStandard {
		if let Some(supported) = netstandard_support(target) {
			return candidate.version <= supported
		}
	}

	false
}

/// Picks the candidate nearest to `target` from those compatible with it.
///
/// Candidates of the same family as the target are preferred, then `netstandard`, then `any`.
/// Within a family the highest version wins, and a matching platform beats none.
/// Returns `None` when no candidate is compatible.
pub fn get_nearest<'a>(target: &Framework, candidates: impl IntoIterator<Item = &'a Framework>) -> Option<&'a Framework> {
	fn tier(target: &Framework, candidate: &Framework) -> u8 {
		if candidate.family == target.family {
			0
		} else if candidate.family == FrameworkFamily::NetStandard {
			1
		} else {
			2
		}
	}

	candidates
		.into_iter()
		.filter(|c| is_compatible(target, c))
		.min_by(|a, b| {
			tier(target, a).cmp(&tier(target, b))
				.then_with(|| b.version.cmp(&a.version))
				.then_with(|| b.platform.is_some().cmp(&a.platform.is_some()))
		})
}

#[cfg(test)]
mod test {
	use super::*;

	fn f(s: &str) -> Framework { Framework::parse(s).unwrap() }

	#[test]
	fn framework_parses_folder_names() {
		assert_eq!(f("netstandard2.0"), Framework::netstandard(2, 0));
		assert_eq!(f("netstandard20"), Framework::netstandard(2, 0));
		assert_eq!(f("net461"), Framework::new(FrameworkFamily::NetFramework, FrameworkVersion(4, 6, 1, 0)));
		assert_eq!(f("netcoreapp3.1"), Framework::new(FrameworkFamily::NetCoreApp, FrameworkVersion::new(3, 1)));
		assert_eq!(f("net6.0").family(), &FrameworkFamily::NetCoreApp);
		assert_eq!(f("net6.0-windows").platform(), Some("windows"));
		assert_eq!(f("uap10.0.16299").version(), FrameworkVersion(10, 0, 16299, 0));
		assert_eq!(f(""), Framework::any());
	}

	#[test]
	fn framework_parses_long_names() {
		assert_eq!(f(".NETStandard2.0"), Framework::netstandard(2, 0));
		assert_eq!(f(".NETStandard,Version=v1.3"), Framework::netstandard(1, 3));
		assert_eq!(f(".NETFramework4.6.1"), f("net461"));
		assert_eq!(f(".NETCoreApp3.1"), f("netcoreapp3.1"));
	}

	#[test]
	fn framework_unknown_identifier_is_other() {
		assert_eq!(f("portable-net45+win8").family(), &FrameworkFamily::Other("portable".to_string()));
		assert_eq!(f("monoandroid10").family(), &FrameworkFamily::Other("monoandroid".to_string()));
	}

	#[test]
	fn framework_folder_name_round_trips() {
		for s in ["netstandard2.0", "netstandard1.3", "net461", "net45", "netcoreapp3.1", "net6.0", "net6.0-windows", "uap10.0", "any"] {
			assert_eq!(f(s).folder_name(), s);
		}
	}

	#[test]
	fn framework_compatibility() {
		let target = Framework::netstandard(2, 0);
		assert!(is_compatible(&target, &Framework::netstandard(1, 0)));
		assert!(is_compatible(&target, &Framework::netstandard(2, 0)));
		assert!(!is_compatible(&target, &Framework::netstandard(2, 1)));
		assert!(!is_compatible(&target, &f("net461")));
		assert!(is_compatible(&target, &Framework::any()));

		assert!(is_compatible(&f("net472"), &Framework::netstandard(2, 0)));
		assert!(!is_compatible(&f("net472"), &Framework::netstandard(2, 1)));
		assert!(is_compatible(&f("net6.0"), &Framework::netstandard(2, 1)));
		assert!(!is_compatible(&f("net6.0"), &f("net6.0-windows")));
		assert!(is_compatible(&f("net6.0-windows"), &f("net6.0")));
	}

	#[test]
	fn nearest_picks_exact_match() {
		let groups = [f("netstandard1.0"), f("netstandard2.0"), f("netstandard2.1")];
		assert_eq!(get_nearest(&Framework::netstandard(2, 0), &groups), Some(&groups[1]));
	}

	#[test]
	fn nearest_never_picks_higher_than_target() {
		let groups = [f("netstandard1.0"), f("netstandard2.1")];
		assert_eq!(get_nearest(&Framework::netstandard(2, 0), &groups), Some(&groups[0]));

		let groups = [f("netstandard2.1")];
		assert_eq!(get_nearest(&Framework::netstandard(2, 0), &groups), None);
	}

	#[test]
	fn nearest_prefers_same_family_then_netstandard_then_any() {
		let groups = [Framework::any(), f("netstandard2.0"), f("net45"), f("net461")];
		assert_eq!(get_nearest(&f("net472"), &groups), Some(&groups[3]));
		assert_eq!(get_nearest(&f("netcoreapp3.1"), &groups), Some(&groups[1]));
		assert_eq!(get_nearest(&f("netstandard1.0"), &groups), Some(&groups[0]));
	}
}
