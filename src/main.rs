//! vitalread - OCR value cleaning for medical device displays
//!
//! Reads OCR segment batches as JSON Lines and prints one cleaned reading per
//! field and frame.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use vitalread::config::{self, AppConfig};
use vitalread::fields::sample_value;
use vitalread::storage;
use vitalread::{Cleaner, DeviceType, OcrRequest, Segment};

/// vitalread - cleans noisy OCR readings of medical device displays
#[derive(Parser, Debug)]
#[command(name = "vitalread")]
#[command(about = "Disambiguates and validates OCR readings of medical device displays")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean JSON Lines of OCR requests from a file or stdin
    Clean {
        /// Input file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// List the field names of a device type
    Measurements {
        /// monitor, respirator or ivac
        device: DeviceType,
    },
    /// Generate noisy synthetic frames for a device and clean them
    Simulate {
        #[arg(short, long, default_value = "monitor")]
        device: DeviceType,
        #[arg(short, long, default_value = "10")]
        frames: usize,
        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_or_create_config(args.config.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = config.registry()?;
    info!("Loaded field catalog with {} fields", registry.len());

    match args.command {
        Command::Clean { input } => {
            let cleaner = Cleaner::with_config(registry, config.cleaner_config());
            run_clean(&cleaner, input.as_deref())
        }
        Command::Measurements { device } => {
            let names = registry.measurements(device);
            println!("{}", serde_json::to_string(&names)?);
            Ok(())
        }
        Command::Simulate { device, frames, seed } => {
            let cleaner = Cleaner::with_config(registry, config.cleaner_config());
            run_simulate(&cleaner, device, frames, seed)
        }
    }
}

/// Load configuration from an explicit path, the user config file, or defaults
fn load_or_create_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        let config = config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;
        return Ok(config);
    }
    if let Ok(config_path) = storage::default_config_path() {
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                debug!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
        }
    }
    Ok(AppConfig::default())
}

/// Clean every request line from a file or stdin
fn run_clean(cleaner: &Cleaner, input: Option<&Path>) -> Result<()> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let stdout = std::io::stdout();
    let cleaned = clean_lines(cleaner, reader, stdout.lock())?;
    info!("Cleaned {} frames", cleaned);
    Ok(())
}

/// Print one JSON array of cleaned segments per request line. Lines that do
/// not parse or fail validation are logged and skipped. Returns the number
/// of frames written.
fn clean_lines<R: BufRead, W: Write>(cleaner: &Cleaner, reader: R, mut out: W) -> Result<usize> {
    let mut cleaned = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: OcrRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Skipping line {}: {}", idx + 1, e);
                continue;
            }
        };
        match cleaner.clean(&request.segments, request.monitor_id.as_deref()) {
            Ok(output) => {
                if !output.diagnostics.overlaps.is_empty() {
                    debug!(
                        "Image {:?}: {} overlapping readings excluded",
                        request.image_id,
                        output.diagnostics.overlap_count()
                    );
                }
                writeln!(out, "{}", serde_json::to_string(&output.segments)?)?;
                cleaned += 1;
            }
            Err(e) => warn!("Skipping line {}: {}", idx + 1, e),
        }
    }
    Ok(cleaned)
}

/// Drive a simulated device through `frames` frames of OCR-like noise
fn run_simulate(cleaner: &Cleaner, device: DeviceType, frames: usize, seed: Option<u64>) -> Result<()> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let stdout = std::io::stdout();
    simulate(cleaner, device, frames, rng, stdout.lock())
}

fn simulate<R: Rng, W: Write>(
    cleaner: &Cleaner,
    device: DeviceType,
    frames: usize,
    mut rng: R,
    mut out: W,
) -> Result<()> {
    let monitor_id = format!("simulated {}", device);
    let names: Vec<String> = cleaner
        .registry()
        .measurements(device)
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut current: HashMap<String, String> = HashMap::new();

    info!("Simulating {} frames of {} ({} fields)", frames, device, names.len());

    for _ in 0..frames {
        let mut frame = Vec::new();
        for name in &names {
            let Some(spec) = cleaner.registry().lookup(name) else {
                continue;
            };
            let value = sample_value(spec, current.get(name).map(String::as_str), &mut rng);
            let readings = rng.gen_range(1..=3);
            for _ in 0..readings {
                frame.push(Segment::new(name, Some(corrupt(&value, &mut rng).as_str())));
            }
            current.insert(name.clone(), value);
        }

        let output = cleaner.clean(&frame, Some(monitor_id.as_str()))?;
        writeln!(out, "{}", serde_json::to_string(&output.segments)?)?;
    }
    Ok(())
}

/// Mimic typical OCR mistakes on a displayed value
fn corrupt<R: Rng + ?Sized>(value: &str, rng: &mut R) -> String {
    let mut chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    match rng.gen_range(0..6) {
        // dropped character
        0 => {
            chars.remove(rng.gen_range(0..chars.len()));
        }
        // stray glyph
        1 => {
            let noise = ['o', ' ', 'l', '.', '\''];
            chars.insert(rng.gen_range(0..=chars.len()), noise[rng.gen_range(0..noise.len())]);
        }
        // doubled character
        2 => {
            let idx = rng.gen_range(0..chars.len());
            chars.insert(idx, chars[idx]);
        }
        _ => {}
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalread::FieldRegistry;

    fn cleaner() -> Cleaner {
        Cleaner::new(FieldRegistry::builtin().unwrap())
    }

    #[test]
    fn test_clean_lines_skips_bad_lines() {
        let input = concat!(
            r#"{"monitorId":"m","segments":[{"name":"HR","value":"80"}]}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"monitorId":"m","segments":[{"name":"HR","value":"80","level":"crop"}]}"#,
            "\n",
            r#"{"segments":[{"name":"RR","value":"(15)"}]}"#,
            "\n",
        );
        let mut out = Vec::new();
        let cleaned = clean_lines(&cleaner(), input.as_bytes(), &mut out).unwrap();

        assert_eq!(cleaned, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![r#"[{"name":"HR","value":"80"}]"#, r#"[{"name":"RR","value":"15"}]"#]);
    }

    #[test]
    fn test_simulate_is_reproducible() {
        let run = |seed| {
            let mut out = Vec::new();
            simulate(&cleaner(), DeviceType::Monitor, 5, StdRng::seed_from_u64(seed), &mut out).unwrap();
            String::from_utf8(out).unwrap()
        };
        let first = run(3);
        assert_eq!(first, run(3));

        let lines: Vec<&str> = first.lines().collect();
        assert_eq!(lines.len(), 5);
        for line in lines {
            let segments: Vec<vitalread::CleanedSegment> = serde_json::from_str(line).unwrap();
            assert!(!segments.is_empty());
        }
    }

    #[test]
    fn test_corrupt_changes_at_most_one_char() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let noisy = corrupt("120", &mut rng);
            assert!((2..=4).contains(&noisy.chars().count()));
        }
        assert_eq!(corrupt("", &mut rng), "");
    }
}
