// FILE: src/cli/handlers.rs
use crate::{
    cli::{InspectMode, OutputFormat},
    parse_class, scan_with_defaults, ClassEvent, ClasspathFinder, MarkerDefaults, ParseMode, Result, ScanError,
    ScanOptions, ScanResult,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

fn argument<'m>(matches: &'m clap::ArgMatches, name: &str) -> Result<&'m String> {
    matches.get_one::<String>(name).ok_or_else(|| ScanError::InvalidFormat {
        message: format!("Missing argument '{}'", name),
    })
}

fn count(matches: &clap::ArgMatches, name: &str) -> Result<usize> {
    argument(matches, name)?.parse().map_err(|_| ScanError::InvalidFormat {
        message: format!("Invalid {} number", name),
    })
}

// --- SCAN ---
pub fn handle_scan_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let classpath = cli.classpath(matches)?;
    let options = cli.build_scan_options(matches)?;
    let output = ScanOutput {
        format: matches.get_one::<OutputFormat>("format").cloned().unwrap_or(OutputFormat::Summary),
        path: cli.output_path(matches),
        stats: matches.get_flag("stats"),
    };

    if matches.get_flag("watch") {
        watch_and_scan(&classpath, &options, &output)
    } else {
        scan_classpath(&classpath, &options, &output).map(|_| ())
    }
}

struct ScanOutput {
    format: OutputFormat,
    path: Option<String>,
    stats: bool,
}

impl ScanOutput {
    /// Stdout carries nothing but the report
    fn json_on_stdout(&self) -> bool {
        matches!(self.format, OutputFormat::Json) && self.path.is_none()
    }
}

// Status lines go to stderr; stdout carries only the report
fn scan_classpath(classpath: &[String], options: &ScanOptions, output: &ScanOutput) -> Result<ScanResult> {
    eprintln!("🔍 Scanning {}", classpath.join(", "));

    let scan_start = Instant::now();
    let finder = ClasspathFinder::from_paths(classpath)?;
    let result = scan_with_defaults(&finder, options, &MarkerDefaults::new())?;
    let scan_time = scan_start.elapsed();

    match output.format {
        OutputFormat::Summary => print_summary(&result),
        OutputFormat::Json if output.path.is_none() => println!("{}", report_json(&result)?),
        OutputFormat::Json => {}
    }
    if let Some(path) = &output.path {
        write_report(&result, path)?;
    }
    if output.stats {
        if output.json_on_stdout() {
            write_detailed_stats(&mut std::io::stderr(), &result)?;
        } else {
            write_detailed_stats(&mut std::io::stdout(), &result)?;
        }
    }

    eprintln!("✅ Scan finished in {:.2}ms", scan_time.as_secs_f64() * 1000.0);
    for warning in &result.warnings {
        eprintln!("   ⚠️  {}", warning);
    }
    Ok(result)
}

fn watch_and_scan(classpath: &[String], options: &ScanOptions, output: &ScanOutput) -> Result<()> {
    eprintln!("👀 Watching {} for changes...", classpath.join(", "));

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| {
        ScanError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to create file watcher: {}", e),
        ))
    })?;

    for entry in classpath {
        watcher.watch(Path::new(entry), RecursiveMode::Recursive).map_err(|e| {
            ScanError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to watch {}: {}", entry, e),
            ))
        })?;
    }

    if let Err(e) = scan_classpath(classpath, options, output) {
        eprintln!("❌ Initial scan failed: {}", e);
    }

    loop {
        match rx.recv() {
            Ok(_event) => {
                // Builds touch many files at once
                while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}
                eprintln!("🔄 Classpath changed, rescanning...");
                if let Err(e) = scan_classpath(classpath, options, output) {
                    eprintln!("❌ Scan failed: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Watch channel closed: {}", e);
                return Ok(());
            }
        }
    }
}

// --- INSPECT ---
pub fn handle_inspect_command(matches: &clap::ArgMatches) -> Result<()> {
    let input_path = argument(matches, "input")?;
    let mode = match matches.get_one::<InspectMode>("mode") {
        Some(InspectMode::Declaration) => ParseMode::Declaration,
        Some(InspectMode::Defaults) => ParseMode::Defaults,
        _ => ParseMode::Full,
    };

    let bytes = fs::read(input_path).map_err(|e| ScanError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;
    let parsed = parse_class(&bytes, mode).map_err(|e| e.with_class(input_path))?;

    println!("📄 {} (version {}.{})", parsed.name, parsed.major_version, parsed.minor_version);
    println!("   Access flags: 0x{:04x}", parsed.access_flags);
    println!("   Bytes: {}", bytes.len());
    for event in &parsed.events {
        println!("   {}", describe_event(event));
    }
    let references = parsed.referenced_types();
    println!("   Referenced types: {}", references.len());
    for reference in references {
        println!("     {}", reference);
    }
    Ok(())
}

fn describe_event(event: &ClassEvent) -> String {
    match event {
        ClassEvent::SuperType(name) => format!("extends {}", name),
        ClassEvent::Interface(name) => format!("implements {}", name),
        ClassEvent::Signature(signature) => format!("signature {}", signature),
        ClassEvent::Field { name, descriptor, .. } => format!("field {} {}", name, descriptor),
        ClassEvent::Method { name, descriptor, .. } => format!("method {}{}", name, descriptor),
        ClassEvent::Marker { target, marker } => format!("marker on {:?}: {}", target, marker),
        ClassEvent::TypeReference(name) => format!("uses {}", name),
        ClassEvent::MarkerDefault { attribute, value } => format!("default {} = {}", attribute, value),
    }
}

// --- BENCHMARK ---
pub fn handle_benchmark_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let classpath = cli.classpath(matches)?;
    let iterations = count(matches, "iterations")?;
    let warmup = count(matches, "warmup")?;

    println!("🏁 Running scan benchmarks");
    println!("   Classpath: {}", classpath.join(", "));
    println!("   Warmup iterations: {}", warmup);
    println!("   Benchmark iterations: {}", iterations);

    let options = cli.build_scan_options(matches)?;
    let finder = ClasspathFinder::from_paths(&classpath)?;
    let defaults = MarkerDefaults::new();

    print!("   Warming up");
    for _ in 0..warmup {
        print!(".");
        std::io::stdout().flush()?;
        if let Err(e) = scan_with_defaults(&finder, &options, &defaults) {
            log::warn!("Warmup scan failed: {}", e);
        }
    }
    println!(" done");

    let mut times = Vec::new();
    print!("   Benchmarking");
    for _ in 0..iterations {
        print!(".");
        std::io::stdout().flush()?;
        let start = Instant::now();
        match scan_with_defaults(&finder, &options, &defaults) {
            Ok(_) => times.push(start.elapsed().as_nanos() as f64 / 1_000_000.0),
            Err(e) => log::warn!("Benchmark scan failed: {}", e),
        }
    }
    println!(" done");

    if times.is_empty() {
        return Err(ScanError::Classpath {
            message: "All benchmark iterations failed".to_string(),
        });
    }

    times.sort_by(f64::total_cmp);
    let min = times[0];
    let max = times[times.len() - 1];
    let median = times[times.len() / 2];
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    let std_dev = {
        let variance = times.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / times.len() as f64;
        variance.sqrt()
    };

    println!("\n📊 Benchmark Results:");
    println!("   Successful iterations: {}/{}", times.len(), iterations);
    println!("   Classes indexed: {}", finder.class_count());
    println!("   Min time: {:.2}ms", min);
    println!("   Max time: {:.2}ms", max);
    println!("   Median time: {:.2}ms", median);
    println!("   Mean time: {:.2}ms ± {:.2}ms", mean, std_dev);
    if mean > 0.0 && std_dev / mean > 0.1 {
        println!("   ⚠️  High variance detected ({:.1}%)", (std_dev / mean) * 100.0);
    }
    Ok(())
}

// --- HELPERS ---
fn print_summary(result: &ScanResult) {
    println!("\n📦 Chunks:");
    for (info, assets) in result.chunks.iter() {
        let loading = if info.eager { "eager" } else { "lazy" };
        println!("   {} [{}]", info.id(), loading);
        for module in &assets.modules {
            println!("     module  {}", module);
        }
        for module in &assets.modules_development_only {
            println!("     dev     {}", module);
        }
        for script in &assets.scripts {
            println!("     script  {}", script);
        }
        for css in &assets.css {
            println!("     css     {}", css.value);
        }
    }
    match &result.theme {
        Some(theme) if theme.name.is_empty() => println!("🎨 Theme: {}", theme.theme_class),
        Some(theme) => println!("🎨 Theme: {} ({})", theme.name, theme.theme_class),
        None => println!("🎨 Theme: none"),
    }
    if result.pwa.enabled {
        println!("📱 PWA: {} ({})", result.pwa.name, result.pwa.manifest_path);
    }
    if !result.packages.is_empty() {
        println!("📚 Packages:");
        for (name, version) in &result.packages.dependencies {
            println!("     {}@{}", name, version);
        }
        for (name, version) in &result.packages.dev_dependencies {
            println!("     {}@{} (dev)", name, version);
        }
    }
}

fn report_json(result: &ScanResult) -> Result<String> {
    serde_json::to_string_pretty(&result.report()).map_err(|e| ScanError::InvalidFormat {
        message: format!("Could not serialize report: {}", e),
    })
}

fn write_report(result: &ScanResult, path: &str) -> Result<()> {
    let json = report_json(result)?;
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    eprintln!("   Report: {}", path);
    Ok(())
}

fn write_detailed_stats(out: &mut dyn Write, result: &ScanResult) -> Result<()> {
    let stats = &result.stats;
    writeln!(out, "\n📊 Detailed Scan Statistics:")?;
    writeln!(out, "   Entry points: {}", stats.entry_point_count)?;
    writeln!(out, "   Classes visited: {}", stats.visited_classes)?;
    writeln!(out, "   Classes inspected: {}", stats.inspected_classes)?;
    writeln!(out, "   Scan time: {}ms", stats.scan_time_ms)?;
    writeln!(out, "   Fingerprint: {}", result.fingerprint)?;
    writeln!(out, "\n   Asset breakdown:")?;
    writeln!(out, "     Chunks: {}", stats.chunk_count)?;
    writeln!(out, "     Modules: {}", stats.module_count)?;
    writeln!(out, "     Scripts: {}", stats.script_count)?;
    writeln!(out, "     Stylesheets: {}", stats.css_count)?;
    writeln!(out, "     Packages: {}", stats.package_count)?;
    if stats.warning_count > 0 {
        writeln!(out, "     Warnings: {}", stats.warning_count)?;
    }
    Ok(())
}
