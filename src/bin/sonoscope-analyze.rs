//! Developer utility to decode a file and print its forensic analysis.

use std::path::PathBuf;

use sonoscope::config::EngineConfig;
use sonoscope::engine::Engine;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

struct Options {
    input: PathBuf,
    config: Option<PathBuf>,
    max_freq: Option<f64>,
    export: Option<ExportRange>,
}

struct ExportRange {
    out: PathBuf,
    start_s: f64,
    end_s: f64,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    sonoscope::logging::init().map_err(|err| err.to_string())?;

    let config = match &options.config {
        Some(path) => EngineConfig::load(path).map_err(|err| err.to_string())?,
        None => EngineConfig::default(),
    };
    let engine = Engine::with_config(config).map_err(|err| err.to_string())?;

    let track_info = engine
        .load_audio(&options.input)
        .map_err(|err| err.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&track_info).map_err(|err| err.to_string())?
    );

    let forensics = engine.analyze_forensics().map_err(|err| err.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&forensics).map_err(|err| err.to_string())?
    );

    if let Some(max_freq) = options.max_freq {
        let spectrogram = engine
            .compute_spectrogram(max_freq)
            .map_err(|err| err.to_string())?;
        println!(
            "Spectrogram: {} frames x {} bins up to {} Hz",
            spectrogram.data.len(),
            spectrogram.data.first().map(Vec::len).unwrap_or(0),
            spectrogram.max_freq
        );
    }

    if let Some(export) = &options.export {
        engine
            .export_audio(&export.out, export.start_s, export.end_s)
            .map_err(|err| err.to_string())?;
        println!("Exported {} to {}", options.input.display(), export.out.display());
    }

    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(None);
    }
    let mut input = None;
    let mut config = None;
    let mut max_freq = None;
    let mut export_out = None;
    let mut start_s = None;
    let mut end_s = None;
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let value = it
                    .next()
                    .ok_or_else(|| "Missing value for --config".to_string())?;
                config = Some(PathBuf::from(value));
            }
            "--max-freq" => {
                let value = it
                    .next()
                    .ok_or_else(|| "Missing value for --max-freq".to_string())?;
                max_freq = Some(parse_number(&value, "--max-freq")?);
            }
            "--export" => {
                let value = it
                    .next()
                    .ok_or_else(|| "Missing value for --export".to_string())?;
                export_out = Some(PathBuf::from(value));
            }
            "--start" => {
                let value = it
                    .next()
                    .ok_or_else(|| "Missing value for --start".to_string())?;
                start_s = Some(parse_number(&value, "--start")?);
            }
            "--end" => {
                let value = it
                    .next()
                    .ok_or_else(|| "Missing value for --end".to_string())?;
                end_s = Some(parse_number(&value, "--end")?);
            }
            other if input.is_none() && !other.starts_with('-') => {
                input = Some(PathBuf::from(other));
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    let input = input.ok_or_else(|| "Missing input file (see --help)".to_string())?;
    let export = match (export_out, start_s, end_s) {
        (Some(out), Some(start_s), Some(end_s)) => Some(ExportRange { out, start_s, end_s }),
        (None, None, None) => None,
        _ => return Err("--export requires --start and --end".to_string()),
    };
    Ok(Some(Options {
        input,
        config,
        max_freq,
        export,
    }))
}

fn parse_number(value: &str, flag: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|err| format!("Invalid value for {flag}: {err}"))
}

fn print_help() {
    println!(
        "Usage: sonoscope-analyze <FILE> [options]\n\
         \n\
         Options:\n\
         \x20 --config <PATH>     Engine config TOML\n\
         \x20 --max-freq <HZ>     Also compute a spectrogram up to HZ\n\
         \x20 --export <PATH>     Export a segment as 16-bit PCM WAV\n\
         \x20 --start <SECONDS>   Export range start (with --export)\n\
         \x20 --end <SECONDS>     Export range end (with --export)\n\
         \x20 -h, --help          Show this help"
    );
}
