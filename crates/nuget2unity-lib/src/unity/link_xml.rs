//! `link.xml` stops Unity's managed code stripping from removing code only reached through reflection.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

fn assembly(name: &str) -> BytesStart<'_> {
	let mut element = BytesStart::new("assembly");
	element.push_attribute(("fullname", name));
	element
}

/// Builds a `link.xml` preserving every given assembly in full.
///
/// Assemblies are sorted and duplicates dropped.
/// The `System.Core` entry is written regardless of which binaries were copied.
pub fn generate<S: AsRef<str>>(assemblies: impl IntoIterator<Item = S>) -> std::io::Result<String> {
	let mut assemblies = assemblies.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>();
	assemblies.sort();
	assemblies.dedup();

	let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
	writer.write_event(Event::Start(BytesStart::new("linker")))?;

	writer.write_event(Event::Start(assembly("System.Core")))?;
	let mut light_lambda = BytesStart::new("type");
	light_lambda.push_attribute(("fullname", "System.Linq.Expressions.Interpreter.LightLambda"));
	light_lambda.push_attribute(("preserve", "all"));
	writer.write_event(Event::Empty(light_lambda))?;
	writer.write_event(Event::End(BytesEnd::new("assembly")))?;

	for name in &assemblies {
		let mut element = assembly(name);
		element.push_attribute(("preserve", "all"));
		writer.write_event(Event::Empty(element))?;
	}

	writer.write_event(Event::End(BytesEnd::new("linker")))?;

	let mut xml = String::from_utf8_lossy(&writer.into_inner().into_inner()).into_owned();
	xml.push('\n');
	Ok(xml)
}

/// The assembly name of a binary, its file name without extension.
pub fn assembly_name(binary: &Path) -> Option<String> {
	binary.file_stem().map(|s| s.to_string_lossy().to_string())
}

/// Writes `link.xml` into `plugins_dir` for the given binaries.
pub fn write_link_xml(plugins_dir: impl AsRef<Path>, binaries: &[PathBuf]) -> std::io::Result<PathBuf> {
	let path = plugins_dir.as_ref().join("link.xml");
	let xml = generate(binaries.iter().filter_map(|b| assembly_name(b)))?;
	std::fs::write(&path, xml)?;
	log::debug!("Wrote {}", path.display());
	Ok(path)
}
