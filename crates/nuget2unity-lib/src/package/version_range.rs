use super::NuGetVersion;

/// A range of acceptable versions as declared by a dependency.
///
/// A missing bound is unbounded in that direction, [`VersionRange::default()`] accepts every version.
///
/// # Format
/// - `1.0` is a minimum inclusive version, NuGet's most common form.
/// - `[1.0]` is an exact version.
/// - `[1.0,2.0)`, `(1.0,)` and `(,2.0]` use interval notation.
/// - `1.*` floats and is read as `1.0` since the resolver always takes the floor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VersionRange {
	min: Option<NuGetVersion>,
	max: Option<NuGetVersion>,
	min_inclusive: bool,
	max_inclusive: bool,
}

impl VersionRange {
	pub fn new(min: Option<NuGetVersion>, min_inclusive: bool, max: Option<NuGetVersion>, max_inclusive: bool) -> Self {
		Self {
			min_inclusive: min_inclusive && min.is_some(),
			max_inclusive: max_inclusive && max.is_some(),
			min,
			max,
		}
	}

	/// Accepts every version.
	pub fn all() -> Self {
		Self::default()
	}

	pub fn at_least(min: NuGetVersion) -> Self {
		Self::new(Some(min), true, None, false)
	}

	pub fn exact(version: NuGetVersion) -> Self {
		Self::new(Some(version.clone()), true, Some(version), true)
	}

	pub fn parse(range: &str) -> crate::Result<Self> {
		let range = range.trim();
		let parse_error = || crate::Error::Parse(format!("\"{}\" is not a valid version range", range));

		if range.is_empty() || range == "*" {
			return Ok(Self::all())
		}

		let first = range.chars().next().ok_or_else(parse_error)?;
		if first != '[' && first != '(' {
			if let Some(floating) = range.strip_suffix('*') {
				let floor = floating.trim_end_matches(&['.', '-'][..]);
				if floor.is_empty() {
					return Ok(Self::all())
				}
				return Ok(Self::at_least(NuGetVersion::new(floor)?))
			}
			return Ok(Self::at_least(NuGetVersion::new(range)?))
		}

		let last = range.chars().last().ok_or_else(parse_error)?;
		if range.len() < 3 || (last != ']' && last != ')') {
			return Err(parse_error())
		}
		let min_inclusive = first == '[';
		let max_inclusive = last == ']';
		let inner = &range[1..range.len() - 1];

		let parsed = match inner.split_once(',') {
			None => {
				/* Only `[1.0]` is meaningful without a comma */
				if !(min_inclusive && max_inclusive) {
					return Err(parse_error())
				}
				Self::exact(NuGetVersion::new(inner)?)
			},
			Some((min, max)) => {
				if max.contains(',') {
					return Err(parse_error())
				}
				let min = min.trim();
				let max = max.trim();
				if min.is_empty() && max.is_empty() {
					return Err(parse_error())
				}
				let min = (!min.is_empty()).then(|| NuGetVersion::new(min)).transpose()?;
				let max = (!max.is_empty()).then(|| NuGetVersion::new(max)).transpose()?;
				Self::new(min, min_inclusive, max, max_inclusive)
			},
		};

		if parsed.is_empty() {
			return Err(parse_error())
		}

		Ok(parsed)
	}

	pub fn min_version(&self) -> Option<&NuGetVersion> {
		self.min.as_ref()
	}

	pub fn max_version(&self) -> Option<&NuGetVersion> {
		self.max.as_ref()
	}

	pub fn is_min_inclusive(&self) -> bool {
		self.min_inclusive
	}

	pub fn is_max_inclusive(&self) -> bool {
		self.max_inclusive
	}

	pub fn satisfies(&self, version: &NuGetVersion) -> bool {
		let above_min = match &self.min {
			Some(min) if self.min_inclusive => version >= min,
			Some(min) => version > min,
			None => true,
		};
		let below_max = match &self.max {
			Some(max) if self.max_inclusive => version <= max,
			Some(max) => version < max,
			None => true,
		};
		above_min && below_max
	}

	/// Gets the intersection between the ranges, if no intersection exists returns `None`
	pub fn intersect(&self, other: &Self) -> Option<Self> {
		let (min, min_inclusive) = match (&self.min, &other.min) {
			(None, None) => (None, false),
			(Some(a), None) => (Some(a.clone()), self.min_inclusive),
			(None, Some(b)) => (Some(b.clone()), other.min_inclusive),
			(Some(a), Some(b)) => match a.cmp(b) {
				std::cmp::Ordering::Greater => (Some(a.clone()), self.min_inclusive),
				std::cmp::Ordering::Less => (Some(b.clone()), other.min_inclusive),
				std::cmp::Ordering::Equal => (Some(a.clone()), self.min_inclusive && other.min_inclusive),
			},
		};

		let (max, max_inclusive) = match (&self.max, &other.max) {
			(None, None) => (None, false),
			(Some(a), None) => (Some(a.clone()), self.max_inclusive),
			(None, Some(b)) => (Some(b.clone()), other.max_inclusive),
			(Some(a), Some(b)) => match a.cmp(b) {
				std::cmp::Ordering::Less => (Some(a.clone()), self.max_inclusive),
				std::cmp::Ordering::Greater => (Some(b.clone()), other.max_inclusive),
				std::cmp::Ordering::Equal => (Some(a.clone()), self.max_inclusive && other.max_inclusive),
			},
		};

		let range = Self::new(min, min_inclusive, max, max_inclusive);
		(!range.is_empty()).then_some(range)
	}

	/// A range is empty when no version can satisfy it.
	pub fn is_empty(&self) -> bool {
		match (&self.min, &self.max) {
			(Some(min), Some(max)) => match min.cmp(max) {
				std::cmp::Ordering::Greater => true,
				std::cmp::Ordering::Equal => !(self.min_inclusive && self.max_inclusive),
				std::cmp::Ordering::Less => false,
			},
			_ => false,
		}
	}
}

impl std::str::FromStr for VersionRange {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl std::fmt::Display for VersionRange {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match (&self.min, &self.max) {
			(None, None) => write!(f, "*"),
			(Some(min), Some(max)) if min == max && self.min_inclusive && self.max_inclusive => write!(f, "[{}]", min),
			_ => {
				write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
				if let Some(min) = &self.min { write!(f, "{}", min)?; }
				write!(f, ", ")?;
				if let Some(max) = &self.max { write!(f, "{}", max)?; }
				write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
			},
		}
	}
}
