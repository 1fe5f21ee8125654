// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::error::{Result, ScanError};
use crate::{NamespaceFilter, ScanMode, ScanOptions};
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Summary,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum InspectMode {
    Full,
    Declaration,
    Defaults,
}

pub struct EnhancedCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl Default for EnhancedCli {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancedCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        let result = match matches.subcommand() {
            Some(("scan", sub_matches)) => handlers::handle_scan_command(self, sub_matches),
            Some(("inspect", sub_matches)) => handlers::handle_inspect_command(sub_matches),
            Some(("benchmark", sub_matches)) => handlers::handle_benchmark_command(self, sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        };
        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        result
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("scan")
                    .about("Scan compiled classes for front-end dependencies")
                    .arg(Arg::new("classpath").help("Class directories and jar files").index(1).action(ArgAction::Append))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Write the JSON report to a file"))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("summary").help("Output format"))
                    .args(scan_flags())
                    .arg(Arg::new("debug").short('d').long("debug").help("Enable debug mode with extra logging").action(ArgAction::SetTrue))
                    .arg(Arg::new("stats").long("stats").help("Show detailed scan statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch the classpath and rescan on changes").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("inspect")
                    .about("Dump what the class reader sees in one class file")
                    .arg(Arg::new("input").help("Input .class file").required(true).index(1))
                    .arg(Arg::new("mode").short('m').long("mode").value_parser(clap::value_parser!(InspectMode)).default_value("full").help("Parse mode")),
            )
            .subcommand(
                Command::new("benchmark")
                    .about("Run repeated scans and report timings")
                    .arg(Arg::new("classpath").help("Class directories and jar files").index(1).action(ArgAction::Append))
                    .arg(Arg::new("iterations").short('n').long("iterations").value_name("N").help("Number of benchmark iterations").default_value("10"))
                    .arg(Arg::new("warmup").long("warmup").value_name("N").help("Number of warmup iterations").default_value("3"))
                    .args(scan_flags()),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Classpath from the command line, or from the configuration file when none is given
    pub fn classpath(&self, matches: &clap::ArgMatches) -> Result<Vec<String>> {
        let mut entries: Vec<String> = matches
            .get_many::<String>("classpath")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        if entries.is_empty() {
            entries = self.config.classpath.clone().unwrap_or_default();
        }
        if entries.is_empty() {
            return Err(ScanError::classpath(
                "No classpath given. Pass class directories or jars, or set `classpath` in the config file.",
            ));
        }
        Ok(entries)
    }

    pub fn output_path(&self, matches: &clap::ArgMatches) -> Option<String> {
        matches
            .get_one::<String>("output")
            .cloned()
            .or_else(|| self.config.output.clone())
    }

    pub fn build_scan_options(&self, matches: &clap::ArgMatches) -> Result<ScanOptions> {
        let mut options = ScanOptions::default();
        let flag = |name: &str| matches.try_get_one::<bool>(name).ok().flatten().copied().unwrap_or(false);

        options.debug_mode = flag("debug");
        if flag("full-classpath") || self.config.full_classpath.unwrap_or(false) {
            options.mode = ScanMode::FullClasspath;
        }
        options.widget_exports = !flag("no-exports") && self.config.widget_exports.unwrap_or(true);
        options.react_enabled = flag("react") || self.config.react_enabled.unwrap_or(false);

        let mut filter = NamespaceFilter::default();
        if let Ok(Some(packages)) = matches.try_get_many::<String>("exclude") {
            for package in packages {
                filter = filter.with_package(package.clone());
            }
        }
        for package in self.config.excluded_packages.iter().flatten() {
            filter = filter.with_package(package.clone());
        }
        for suffix in self.config.excluded_suffixes.iter().flatten() {
            if suffix.is_empty() {
                return Err(ScanError::InvalidFormat {
                    message: "Excluded suffixes must not be empty".to_string(),
                });
            }
            filter = filter.with_suffix(suffix.clone());
        }
        options.filter = Arc::new(filter);
        Ok(options)
    }
}

/// Flags shared by every subcommand that runs a scan
fn scan_flags() -> [Arg; 4] {
    [
        Arg::new("full-classpath").long("full-classpath").help("Collect assets from every class instead of following entry points").action(ArgAction::SetTrue),
        Arg::new("no-exports").long("no-exports").help("Do not treat widget exporters as entry points").action(ArgAction::SetTrue),
        Arg::new("react").long("react").help("Include the client-side router outlet").action(ArgAction::SetTrue),
        Arg::new("exclude").short('x').long("exclude").value_name("PACKAGE").help("Never inspect classes in this package").action(ArgAction::Append),
    ]
}
