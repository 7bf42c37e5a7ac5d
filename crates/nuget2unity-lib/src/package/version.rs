/// The version of a NuGet package.
///
/// # Format
/// Versions follow the format `major.minor[.patch[.revision]][-label[.label]*][+metadata]`.
/// - A missing `patch` or `revision` counts as zero.
/// - `label`s mark a prerelease, a version without labels is a release.
/// - `metadata` is kept for display but has no effect on equality or ordering.
#[derive(Debug, Clone)]
pub struct NuGetVersion {
	major: u64,
	minor: u64,
	patch: u64,
	revision: u64,
	release_labels: Vec<String>,
	metadata: Option<String>,
}

impl NuGetVersion {
	pub fn new(version: &str) -> crate::Result<Self> {
		let version = version.trim();
		let parse_error = || crate::Error::Parse(format!("\"{}\" is not a valid package version", version));

		let (version_part, metadata) = match version.split_once('+') {
			Some((v, m)) => {
				if m.is_empty() { return Err(parse_error()) }
				(v, Some(m.to_string()))
			},
			None => (version, None),
		};

		let (numbers, release_labels) = match version_part.split_once('-') {
			Some((n, l)) => {
				let labels = l.split('.').map(str::to_string).collect::<Vec<_>>();
				if labels.iter().any(|l| l.is_empty() || !l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')) {
					return Err(parse_error())
				}
				(n, labels)
			},
			None => (version_part, Vec::new()),
		};

		let parts = numbers.split('.').collect::<Vec<_>>();
		if parts.is_empty() || parts.len() > 4 {
			return Err(parse_error())
		}
		let mut components = [0u64; 4];
		for (i, p) in parts.iter().enumerate() {
			if p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()) {
				return Err(parse_error())
			}
			components[i] = p.parse::<u64>().map_err(|_| parse_error())?;
		}

		Ok(NuGetVersion {
			major: components[0],
			minor: components[1],
			patch: components[2],
			revision: components[3],
			release_labels,
			metadata,
		})
	}

	pub fn from_parts(major: u64, minor: u64, patch: u64) -> Self {
		NuGetVersion {
			major,
			minor,
			patch,
			revision: 0,
			release_labels: Vec::new(),
			metadata: None,
		}
	}

	pub fn major(&self) -> u64 { self.major }
	pub fn minor(&self) -> u64 { self.minor }
	pub fn patch(&self) -> u64 { self.patch }
	pub fn revision(&self) -> u64 { self.revision }

	pub fn is_prerelease(&self) -> bool {
		!self.release_labels.is_empty()
	}

	pub fn metadata(&self) -> Option<&str> {
		self.metadata.as_deref()
	}

	/// The form used for install paths and download urls.
	///
	/// The revision is only written when non-zero and metadata is dropped.
	pub fn to_normalized_string(&self) -> String {
		let mut s = format!("{}.{}.{}", self.major, self.minor, self.patch);
		if self.revision != 0 {
			s.push_str(&format!(".{}", self.revision));
		}
		if self.is_prerelease() {
			s.push('-');
			s.push_str(&self.release_labels.join("."));
		}
		s
	}
}

impl std::str::FromStr for NuGetVersion {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl TryFrom<String> for NuGetVersion {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(&value) }
}

impl PartialEq for NuGetVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == std::cmp::Ordering::Equal
	}
}

impl Eq for NuGetVersion {}

impl Ord for NuGetVersion {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		/* Numeric labels compare numerically and always sort before alphanumeric ones,
		alphanumeric labels compare without case. */
		fn compare_label(lhs: &str, rhs: &str) -> std::cmp::Ordering {
			match (lhs.parse::<u64>(), rhs.parse::<u64>()) {
				(Ok(l), Ok(r)) => l.cmp(&r),
				(Ok(_), Err(_)) => std::cmp::Ordering::Less,
				(Err(_), Ok(_)) => std::cmp::Ordering::Greater,
				(Err(_), Err(_)) => lhs.to_ascii_lowercase().cmp(&rhs.to_ascii_lowercase()),
			}
		}

		let lhs = (self.major, self.minor, self.patch, self.revision);
		let rhs = (other.major, other.minor, other.patch, other.revision);
		match lhs.cmp(&rhs) {
			std::cmp::Ordering::Equal => {},
			ord => return ord,
		}

		/* A release is greater than any of its prereleases */
		match (self.is_prerelease(), other.is_prerelease()) {
			(false, false) => return std::cmp::Ordering::Equal,
			(false, true) => return std::cmp::Ordering::Greater,
			(true, false) => return std::cmp::Ordering::Less,
			(true, true) => {},
		}

		for (l, r) in self.release_labels.iter().zip(other.release_labels.iter()) {
			match compare_label(l, r) {
				std::cmp::Ordering::Equal => {},
				ord => return ord,
			}
		}

		self.release_labels.len().cmp(&other.release_labels.len())
	}
}

impl PartialOrd for NuGetVersion {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::hash::Hash for NuGetVersion {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.major.hash(state);
		self.minor.hash(state);
		self.patch.hash(state);
		self.revision.hash(state);
		for label in &self.release_labels {
			label.to_ascii_lowercase().hash(state);
		}
	}
}

impl std::fmt::Display for NuGetVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.to_normalized_string())
	}
}
