use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use instrunet::analysis::result::Presence;
use instrunet::classes::InstrumentClass;
use instrunet::error::log_pipeline_error;
use instrunet::{
    AggregationStrategy, AppConfig, InferencePipeline, InferenceSettings, OnnxModel, ResultRecord,
};

#[derive(Parser, Debug)]
#[command(
    name = "instrunet_cli",
    about = "Musical instrument recognition over segmented log-mel features"
)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse a recording and emit the JSON report
    Analyze {
        /// Audio file (WAV, MP3, FLAC, OGG)
        #[arg(long)]
        audio: PathBuf,
        /// ONNX classifier artifact
        #[arg(long)]
        model: PathBuf,
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// mean | max | voting (overrides the config file)
        #[arg(long)]
        aggregation: Option<AggregationStrategy>,
        /// Display threshold in [0, 1] (overrides the config file)
        #[arg(long)]
        threshold: Option<f32>,
        /// Smoothing window in segments (overrides the config file)
        #[arg(long)]
        smoothing: Option<usize>,
        /// Identifier stored in the report (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the instrument classes in model output order
    Classes,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return Ok(match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::from(0),
                _ => ExitCode::from(1),
            });
        }
    };
    instrunet::init_logging(if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    });

    match cli.command {
        Commands::Analyze {
            audio,
            model,
            config,
            aggregation,
            threshold,
            smoothing,
            name,
            output,
        } => {
            let mut app_config = match config {
                Some(path) => AppConfig::load_from_file(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => AppConfig::default(),
            };
            if let Some(aggregation) = aggregation {
                app_config.inference.aggregation = aggregation;
            }
            if let Some(threshold) = threshold {
                app_config.inference.threshold = threshold;
            }
            if let Some(smoothing) = smoothing {
                app_config.inference.smoothing = smoothing;
            }
            app_config
                .inference
                .validate()
                .context("validating inference settings")?;

            run_analyze(&app_config, audio, model, name, output)
        }
        Commands::Classes => run_classes(),
    }
}

fn run_analyze(
    app_config: &AppConfig,
    audio: PathBuf,
    model_path: PathBuf,
    name: Option<String>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let model = OnnxModel::load(&model_path, &app_config.pipeline)
        .inspect_err(|err| log_pipeline_error(err, "model load"))
        .with_context(|| format!("loading model {}", model_path.display()))?;
    let pipeline = InferencePipeline::from_app_config(app_config, Arc::new(model))?;

    let waveform = pipeline
        .load(&audio)
        .inspect_err(|err| log_pipeline_error(err, "audio load"))
        .with_context(|| format!("decoding {}", audio.display()))?;
    let audio_file = name.unwrap_or_else(|| {
        audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| audio.display().to_string())
    });

    let record = pipeline
        .analyze(&waveform, &app_config.inference, &audio_file)
        .inspect_err(|err| log_pipeline_error(err, "inference"))
        .with_context(|| format!("analysing {}", audio_file))?;

    emit_summary(&record, &app_config.inference);

    let report = record.to_report();
    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        report
            .write_to(&path)
            .with_context(|| format!("writing report to {}", path.display()))?;
    } else {
        println!("{}", report.to_json_pretty()?);
    }

    Ok(ExitCode::from(0))
}

fn emit_summary(record: &ResultRecord, settings: &InferenceSettings) {
    eprintln!(
        "{} - {} segments, aggregation={}, threshold={:.2}",
        record.audio_file(),
        record.num_segments(),
        settings.aggregation,
        settings.threshold
    );

    let mut detections = record.detections();
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    for detection in detections {
        let marker = match detection.presence {
            Presence::Detected => "+",
            Presence::Borderline => "~",
            Presence::Absent => " ",
        };
        eprintln!(
            "  {} {:<16} {:>5.1}%  {}",
            marker,
            detection.display_name,
            detection.score * 100.0,
            detection.presence.as_str()
        );
    }
}

fn run_classes() -> Result<ExitCode> {
    for class in InstrumentClass::ALL {
        println!("{:>2}  {}  {}", class.index(), class.code(), class.display_name());
    }
    Ok(ExitCode::from(0))
}
