//! yokotate - EPUB writing-mode converter

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use yokotate::{
    Direction, EpubProcessor, PunctuationPolicy, ScriptConversion, TransformConfig,
    collect_inputs,
};

#[derive(Parser)]
#[command(name = "yokotate")]
#[command(version, about = "Convert EPUB books between horizontal and vertical writing", long_about = None)]
#[command(after_help = "EXAMPLES:
    yokotate book.epub                    Make book.epub vertical
    yokotate --h book.epub                Make book.epub horizontal
    yokotate --convert s2t --ruby books/  Vertical, traditional script and pinyin for every book")]
struct Cli {
    /// EPUB file, or a directory searched recursively for them
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Convert to vertical writing (default)
    #[arg(long, visible_alias = "v", conflicts_with = "horizontal")]
    vertical: bool,

    /// Convert to horizontal writing
    #[arg(long, visible_alias = "h")]
    horizontal: bool,

    /// Chinese script conversion (s2t, t2s, s2tw, tw2s, s2hk, hk2s, s2twp,
    /// tw2sp, t2tw, hk2t, t2hk, t2jp, jp2t, tw2t)
    #[arg(long, value_name = "ID", value_parser = parse_script)]
    convert: Option<ScriptConversion>,

    /// Quotation mark conversion
    #[arg(long, value_name = "MODE", default_value = "auto", value_parser = parse_punctuation)]
    punctuation: PunctuationPolicy,

    /// Annotate text with readings
    #[arg(long)]
    ruby: bool,

    /// Read Chinese text as Cantonese (jyutping readings)
    #[arg(long)]
    cantonese: bool,

    /// Extra jyutping entries, one `word<TAB>reading` per line
    #[arg(long, value_name = "FILE")]
    jyutping_table: Option<PathBuf>,

    /// Leave out the parentheses printed around readings
    #[arg(long)]
    no_parentheses: bool,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    dest: PathBuf,

    /// Directory for temporary working copies
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Print a JSON report of produced and failed books
    #[arg(long)]
    json: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn parse_script(s: &str) -> Result<ScriptConversion, String> {
    s.parse().map_err(|e: yokotate::Error| e.to_string())
}

fn parse_punctuation(s: &str) -> Result<PunctuationPolicy, String> {
    s.parse().map_err(|e: yokotate::Error| e.to_string())
}

#[derive(Serialize, Default)]
struct Report {
    produced: Vec<Produced>,
    failed: Vec<Failed>,
}

#[derive(Serialize)]
struct Produced {
    source: PathBuf,
    output: PathBuf,
}

#[derive(Serialize)]
struct Failed {
    source: PathBuf,
    error: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let config = build_config(&cli);
    let inputs = match collect_inputs(&cli.input) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if inputs.is_empty() {
        log::warn!("no .epub files under {}", cli.input.display());
    }

    let processor = EpubProcessor::new(config);
    let mut report = Report::default();
    for outcome in processor.run_batch(&inputs, &cli.dest) {
        match outcome.result {
            Ok(output) => {
                if !cli.quiet && !cli.json {
                    println!("{}", output.display());
                }
                report.produced.push(Produced {
                    source: outcome.source,
                    output,
                });
            }
            Err(e) => {
                if !cli.json {
                    eprintln!("error: {}: {e}", outcome.source.display());
                }
                report.failed.push(Failed {
                    source: outcome.source,
                    error: e.to_string(),
                });
            }
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if report.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_config(cli: &Cli) -> TransformConfig {
    let direction = if cli.horizontal && !cli.vertical {
        Direction::Horizontal
    } else {
        Direction::Vertical
    };
    let mut config = TransformConfig::new(direction)
        .with_punctuation(cli.punctuation)
        .with_ruby(cli.ruby)
        .with_cantonese(cli.cantonese)
        .with_ruby_parentheses(!cli.no_parentheses);
    if let Some(script) = cli.convert {
        config = config.with_script(script);
    }
    if let Some(table) = &cli.jyutping_table {
        config = config.with_jyutping_table(table);
    }
    if let Some(work_dir) = &cli.work_dir {
        config = config.with_work_root(work_dir);
    }
    config
}
