//! podgen - Turn a PDF into a two-host podcast

mod audio;
mod config;
mod pdf;
mod pipeline;
mod script;
mod text;
mod tts;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::PodgenConfig;
use llm_client::{CLEANUP_PROGRAM, ModelHandle, SCRIPT_PROGRAM};
use pipeline::PipelineOptions;
use script::{Script, UnlabeledLines};
use std::path::{Path, PathBuf};
use tts::{BackendKind, TtsOptions};

#[derive(Parser, Debug)]
#[command(name = "podgen")]
#[command(about = "Turn a PDF into a two-host podcast", long_about = None)]
#[command(version)]
struct Args {
    /// PDF to write a podcast about
    #[arg(long, conflicts_with = "script")]
    context: Option<PathBuf>,

    /// Pre-written script with `Chris:` / `Sam:` lines
    #[arg(long)]
    script: Option<PathBuf>,

    /// Playback speed of the final track (default 0.95)
    #[arg(long)]
    speed: Option<f64>,

    /// Directory for the script and audio (default: Output)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Words per cleanup chunk (default 350)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Voice-clone sample audio
    #[arg(long)]
    voice: Option<PathBuf>,

    /// Transcript of the voice-clone sample
    #[arg(long)]
    voice_text: Option<String>,

    /// Preset for per-chunk cleanup (see ~/.config/cli-programs/llm.toml)
    #[arg(long)]
    cleanup_model: Option<String>,

    /// Preset for script writing
    #[arg(long)]
    script_model: Option<String>,

    /// Keep models loaded after their stage finishes
    #[arg(long, default_value_t = false)]
    keep_models: bool,

    /// Stop after writing the script
    #[arg(long, default_value_t = false)]
    script_only: bool,

    /// Reject script lines without a speaker label
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize the reference dialogue to create a voice-clone sample
    Sample {
        /// Output WAV path
        output: PathBuf,

        /// Store the sample as the default voice clone
        #[arg(long)]
        set_default: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice-clone sample
    SetVoice {
        /// Path to sample audio
        path: PathBuf,
        /// Transcript of the sample, with [S1]/[S2] markers
        #[arg(long)]
        text: Option<String>,
    },
    /// Set default playback speed
    SetSpeed {
        /// Multiplier (> 0)
        value: f64,
    },
    /// Set default chunk size
    SetChunkSize {
        /// Words per chunk (>= 1)
        value: usize,
    },
    /// Set TTS backend
    SetBackend {
        /// dia or command
        backend: BackendKind,
        /// Program and arguments for the command backend
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match &args.command {
        Some(Commands::Config { action }) => {
            return handle_config_command(action);
        }
        Some(Commands::Sample {
            output,
            set_default,
        }) => {
            return create_sample(output, *set_default).await;
        }
        None => {}
    }

    let input = input_path(&args)?;

    let config = effective_config(&args)?;
    let options = pipeline_options(&args, &config, input)?;

    if args.debug {
        eprintln!("Input: {}", input.display());
        eprintln!("Output dir: {}", options.output_dir.display());
        eprintln!("Chunk size: {}", options.chunk_size);
        eprintln!("Speed: {}", options.speed);
        eprintln!("Voice clone: {:?}", options.tts.voice_clone);
    }

    let script = match &args.context {
        Some(pdf_path) => {
            let llm_config =
                llm_client::Config::load().context("Failed to load LLM configuration")?;
            let (preset, provider_config) =
                llm_config.resolve(CLEANUP_PROGRAM, args.cleanup_model.as_deref())?;
            let mut cleanup = ModelHandle::from_preset(preset, provider_config);
            let (preset, provider_config) =
                llm_config.resolve(SCRIPT_PROGRAM, args.script_model.as_deref())?;
            let mut writer = ModelHandle::from_preset(preset, provider_config);

            let (script, _) =
                pipeline::script_from_pdf(pdf_path, &mut cleanup, &mut writer, &options).await?;
            script
        }
        None => Script::load(input)?,
    };
    log::info!("Script has {} lines", script.line_count());

    if args.script_only {
        return Ok(());
    }

    let backend = tts::create_backend(&config.backend_settings())?;
    let output = pipeline::render_podcast(&script, backend.as_ref(), &options).await?;

    let metadata = std::fs::metadata(&output)?;
    let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
    eprintln!("Output: {} ({:.1} MB)", output.display(), size_mb);

    Ok(())
}

/// The PDF or script to process; one of the two is required.
fn input_path(args: &Args) -> Result<&Path> {
    args.context
        .as_deref()
        .or(args.script.as_deref())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Either --context <pdf> or --script <txt> is required. Run 'podgen --help' for usage."
            )
        })
}

/// Stored config with command-line overrides applied.
fn effective_config(args: &Args) -> Result<PodgenConfig> {
    let mut config = PodgenConfig::load().context("Failed to load configuration")?;

    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(size) = args.chunk_size {
        config.chunk_size = size;
    }
    if let Some(voice) = &args.voice {
        config.voice_clone_audio = Some(voice.clone());
    }
    if let Some(text) = &args.voice_text {
        config.voice_clone_text = text.clone();
    }
    if args.keep_models {
        config.clear_models = false;
    }

    config.validate()?;
    Ok(config)
}

fn pipeline_options(args: &Args, config: &PodgenConfig, input: &Path) -> Result<PipelineOptions> {
    let name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("Cannot derive a name from {}", input.display()))?;

    let mut tts = TtsOptions::new().with_clear(config.clear_models);
    if let Some(clone) = config.voice_clone() {
        if !clone.audio.exists() {
            anyhow::bail!("Voice sample not found: {}", clone.audio.display());
        }
        tts = tts.with_voice_clone(clone);
    }

    Ok(PipelineOptions {
        name,
        output_dir: config.output_dir.clone(),
        chunk_size: config.chunk_words()?,
        speed: config.speed,
        silence_ms: config.silence_ms,
        clear_models: config.clear_models,
        unlabeled: if args.strict {
            UnlabeledLines::Reject
        } else {
            UnlabeledLines::PassThrough
        },
        tts,
        show_progress: !args.debug,
    })
}

/// Synthesize the configured reference transcript without any cloning.
async fn create_sample(output: &Path, set_default: bool) -> Result<()> {
    let mut config = PodgenConfig::load().context("Failed to load configuration")?;
    let backend = tts::create_backend(&config.backend_settings())?;

    eprintln!("Synthesizing voice sample on {}...", backend.device());
    backend
        .synthesize(&config.voice_clone_text, output, &TtsOptions::new().with_clear(true))
        .await
        .context("Failed to synthesize voice sample")?;
    eprintln!("Sample: {}", output.display());

    if set_default {
        let path = std::path::absolute(output)?;
        config.voice_clone_audio = Some(path.clone());
        config.save()?;
        println!("Default voice sample set to: {}", path.display());
    }

    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = PodgenConfig::load()?;
            println!("Configuration file: {:?}", PodgenConfig::config_path()?);
            println!();
            println!("chunk_size = {}", config.chunk_size);
            println!("speed = {}", config.speed);
            println!("silence_ms = {}", config.silence_ms);
            println!("output_dir = \"{}\"", config.output_dir.display());
            println!("clear_models = {}", config.clear_models);
            if let Some(voice) = &config.voice_clone_audio {
                println!("voice_clone_audio = \"{}\"", voice.display());
            } else {
                println!("voice_clone_audio = (none)");
            }
            println!("voice_clone_text = \"{}\"", config.voice_clone_text);
            println!("tts_backend = \"{}\"", config.tts_backend);
            if let Some(device) = &config.device {
                println!("device = \"{}\"", device);
            } else {
                println!("device = (auto-detect)");
            }
            if !config.tts_command.is_empty() {
                println!("tts_command = {:?}", config.tts_command);
            }
        }
        ConfigAction::SetVoice { path, text } => {
            let mut config = PodgenConfig::load()?;
            config.voice_clone_audio = Some(path.clone());
            if let Some(text) = text {
                config.voice_clone_text = text.clone();
            }
            config.save()?;
            println!("Default voice sample set to: {}", path.display());
        }
        ConfigAction::SetSpeed { value } => {
            let mut config = PodgenConfig::load()?;
            config.speed = *value;
            config.save()?;
            println!("Default speed set to: {}", config.speed);
        }
        ConfigAction::SetChunkSize { value } => {
            let mut config = PodgenConfig::load()?;
            config.chunk_size = *value;
            config.save()?;
            println!("Default chunk size set to: {}", config.chunk_size);
        }
        ConfigAction::SetBackend { backend, command } => {
            let mut config = PodgenConfig::load()?;
            config.tts_backend = *backend;
            if !command.is_empty() {
                config.tts_command = command.clone();
            }
            config.save()?;
            println!("TTS backend set to: {}", config.tts_backend);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_context_and_script_conflict() {
        let result = Args::try_parse_from(["podgen", "--context", "a.pdf", "--script", "b.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let args = Args::try_parse_from(["podgen", "--speed", "1.0"]).unwrap();
        let err = input_path(&args).unwrap_err();
        assert!(err.to_string().contains("--context"));

        let args = Args::try_parse_from(["podgen"]).unwrap();
        assert!(input_path(&args).is_err());
    }

    #[test]
    fn test_input_path_prefers_given_flag() {
        let args = Args::try_parse_from(["podgen", "--script", "ep.txt"]).unwrap();
        assert_eq!(input_path(&args).unwrap(), Path::new("ep.txt"));
        let args = Args::try_parse_from(["podgen", "--context", "paper.pdf"]).unwrap();
        assert_eq!(input_path(&args).unwrap(), Path::new("paper.pdf"));
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "podgen",
            "--context",
            "papers/attention.pdf",
            "--speed",
            "1.1",
            "--chunk-size",
            "200",
            "--strict",
            "--keep-models",
        ])
        .unwrap();
        assert_eq!(args.context, Some(PathBuf::from("papers/attention.pdf")));
        assert_eq!(args.speed, Some(1.1));
        assert_eq!(args.chunk_size, Some(200));
        assert!(args.strict);
        assert!(args.keep_models);
    }

    #[test]
    fn test_pipeline_options_from_args() {
        let args = Args::try_parse_from(["podgen", "--script", "notes/episode.txt", "--strict"])
            .unwrap();
        let config = PodgenConfig::default();

        let options = pipeline_options(&args, &config, Path::new("notes/episode.txt")).unwrap();
        assert_eq!(options.name, "episode");
        assert_eq!(options.script_path(), PathBuf::from("Output/episode_script.txt"));
        assert_eq!(options.unlabeled, UnlabeledLines::Reject);
        assert!(options.tts.clear);
        assert!(options.tts.voice_clone.is_none());
    }

    #[test]
    fn test_missing_voice_sample_is_an_error() {
        let args = Args::try_parse_from(["podgen", "--script", "a.txt"]).unwrap();
        let config = PodgenConfig {
            voice_clone_audio: Some(PathBuf::from("/nonexistent/voice.wav")),
            ..Default::default()
        };
        assert!(pipeline_options(&args, &config, Path::new("a.txt")).is_err());
    }

    #[test]
    fn test_set_backend_with_command() {
        let args = Args::try_parse_from([
            "podgen",
            "config",
            "set-backend",
            "command",
            "dia-tts",
            "--out",
            "{output}",
        ])
        .unwrap();
        match args.command {
            Some(Commands::Config {
                action: ConfigAction::SetBackend { backend, command },
            }) => {
                assert_eq!(backend, BackendKind::Command);
                assert_eq!(command, vec!["dia-tts", "--out", "{output}"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
