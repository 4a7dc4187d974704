//! snappy command line
//!
//! Offline tools around the recorder: repair or inspect the duration of a
//! saved WebM recording, run the extension build packaging step, and list
//! native audio inputs.

use anyhow::{anyhow, bail, Context, Result};
use snappy::{config::Config, container, packaging};
use std::path::Path;
use std::time::Duration;

fn main() -> Result<()> {
    let config = Config::from_env()?;
    snappy::init_tracing(&config.log_filter);

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    match args[0].as_str() {
        "repair" => repair(&args[1..]),
        "probe" => probe(&args[1..]),
        "package" => package(&args[1..]),
        "devices" => devices(),
        other => {
            print_help();
            bail!("Unknown command: {}", other)
        }
    }
}

fn repair(args: &[String]) -> Result<()> {
    let (input, output) = match args {
        [input, output, ..] => (input, output),
        _ => bail!("Usage: snappy repair <input> <output> --duration-ms <ms>"),
    };
    let millis: u64 = flag_value(args, "--duration-ms")
        .ok_or_else(|| anyhow!("--duration-ms is required"))?
        .parse()
        .context("--duration-ms must be a whole number of milliseconds")?;

    let data = std::fs::read(input).with_context(|| format!("Failed to read {}", input))?;
    let repaired = container::repair_duration(&data, Duration::from_millis(millis))?;
    std::fs::write(output, &repaired).with_context(|| format!("Failed to write {}", output))?;

    tracing::info!(
        "Wrote {} ({} bytes, duration {}ms)",
        output,
        repaired.len(),
        millis
    );
    Ok(())
}

fn probe(args: &[String]) -> Result<()> {
    let input = args
        .first()
        .ok_or_else(|| anyhow!("Usage: snappy probe <input>"))?;
    let data = std::fs::read(input).with_context(|| format!("Failed to read {}", input))?;

    match container::probe_duration(&data)? {
        Some(duration) => println!("{}: {}ms", input, duration.as_millis()),
        None => println!("{}: no duration", input),
    }
    Ok(())
}

fn package(args: &[String]) -> Result<()> {
    let build_dir = args.first().map(String::as_str).unwrap_or("build");
    let report = packaging::run(Path::new(build_dir))?;
    println!(
        "Linked {} ({} replacement(s))",
        report.css_path, report.replacements
    );
    Ok(())
}

#[cfg(feature = "native-audio")]
fn devices() -> Result<()> {
    let devices = snappy::capture::microphone::get_audio_input_devices();
    if devices.is_empty() {
        println!("No audio input devices found");
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}{}", device.name, marker);
    }
    Ok(())
}

#[cfg(not(feature = "native-audio"))]
fn devices() -> Result<()> {
    bail!("snappy was built without the native-audio feature")
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn print_help() {
    println!(
        r#"snappy

USAGE:
    snappy <COMMAND> [ARGS]

COMMANDS:
    repair <input> <output> --duration-ms <ms>
                        Write a copy of a WebM recording with its duration set
    probe <input>       Print the duration stored in a WebM recording
    package [build-dir] Link the hashed stylesheet into manifest.json and content.js
    devices             List audio input devices (native-audio builds)

OPTIONS:
    -h, --help          Print this help message

ENVIRONMENT:
    SNAPPY_CONFIG       Path to a JSON settings file
    RUST_LOG            Log filter (default: snappy=debug)
"#
    );
}
