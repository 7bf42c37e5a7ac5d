use nuget2unity::repackage::RepackageOptions;

#[tokio::main]
async fn main() {
	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optopt(  "n", "nugetpackage", "NuGet package to repackage", "ID");
		opts.optopt(  "v", "version",      "Exact package version, the latest release when omitted", "VERSION");
		opts.optopt(  "p", "unityproject", "Unity project to write assets into, a temporary project when omitted", "PATH");
		opts.optflag( "m", "includemeta",  "Keep existing .meta files");
		opts.optopt(  "o", "outputpath",   "Directory to write the .unitypackage to", "DIR");
		opts.optflag( "",  "skiplinkxml",  "Don't generate link.xml");
		opts.optopt(  "f", "framework",    "Target framework, netstandard2.0 by default", "TFM");
		opts.optflag( "",  "verbose",      "Increased verbosity");
		opts.optflag( "h", "help",         "Show help");

		let parsed_options = match opts.parse(&args[1..]) {
			Ok(m)  => { m }
			Err(e) => { eprintln!("Unable to parse options: {}", e); std::process::exit(2) }
		};

		if parsed_options.opt_present("h") {
			eprintln!("{}", opts.usage("Usage: nuget2unity -n <package> [options]"));
			return;
		}

		parsed_options
	};

	let default_filter = if parsed_options.opt_present("verbose") { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

	let (mut config, options) = match get_run_options(&parsed_options) {
		Ok(o) => o,
		Err(e) => {
			eprintln!("{}", e);
			eprintln!("{}", opts.usage("Usage: nuget2unity -n <package> [options]"));
			std::process::exit(2)
		},
	};

	if let Some(framework) = parsed_options.opt_str("f") {
		match nuget2unity::package::Framework::parse(&framework) {
			Ok(f) => config.set_framework(f),
			Err(e) => { eprintln!("Invalid framework: {}", e); std::process::exit(2) },
		}
	}

	/* Dropping the run on ctrl-c cancels it, temporary directories clean up when dropped */
	let result = tokio::select! {
		result = run(&config, &options) => result,
		_ = tokio::signal::ctrl_c() => Err(Error::Cancelled),
	};

	match result {
		Ok(path) => log::info!("Created {}", path.display()),
		Err(e) => {
			log::error!("{}", e);
			eprintln!("Error: {}", e);
			std::process::exit(1)
		},
	}
}

fn get_run_options(parsed_options: &getopts::Matches) -> Result<(nuget2unity::Config, RepackageOptions), Error> {
	let package = parsed_options.opt_str("n").ok_or(Error::MissingArgument("--nugetpackage"))?;
	let mut options = RepackageOptions::new(package);

	options.version = parsed_options.opt_str("v")
		.map(|v| nuget2unity::package::NuGetVersion::new(&v))
		.transpose()?;
	options.unity_project = parsed_options.opt_str("p").map(std::path::PathBuf::from);
	options.include_meta = parsed_options.opt_present("m");
	options.skip_link_xml = parsed_options.opt_present("skiplinkxml");
	if let Some(output) = parsed_options.opt_str("o") {
		options.output_path = std::path::PathBuf::from(output);
	}

	Ok((nuget2unity::Config::load_from_disk(), options))
}

async fn run(config: &nuget2unity::Config, options: &RepackageOptions) -> Result<std::path::PathBuf, Error> {
	let registry = nuget2unity::Registry::from_config(config)?;
	Ok(nuget2unity::repackage::repackage(config, &registry, options).await?)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	NuGet2Unity(#[from] nuget2unity::Error),
	#[error("Missing argument {0}")]
	MissingArgument(&'static str),
	#[error("Cancelled")]
	Cancelled,
}
