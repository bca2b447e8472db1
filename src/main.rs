//! Prompt AutoTest - prompt template testing across LLM models
//!
//! A CLI tool that synthesizes test cases for a prompt template, runs every
//! test case against every selected model in rate-limited batches and scores
//! the outputs.
//!
//! ## Usage
//!
//! ```bash
//! # Test a prompt on two models
//! prompt-autotest run --prompt "Summarize {{topic}} for {{audience}}" -m gpt-4o-mini -m gpt-4o
//!
//! # LLM-judged scoring with slower pacing
//! prompt-autotest run --prompt-file prompt.txt --profile thorough
//!
//! # Dry run without a provider
//! prompt-autotest run --prompt "Hello {{name}}" --offline
//!
//! # Configuration
//! prompt-autotest config init
//! prompt-autotest models
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

mod cli;

use cli::Args;
use prompt_autotest::client::fakes::ScriptedClient;
use prompt_autotest::client::{CompletionClient, LlmScorer, OpenAiClient};
use prompt_autotest::config::{self, AppConfig, ConfigFile, EnvConfig, ProfileManager, CONFIG_KEYS};
use prompt_autotest::executor::{AutoTestRunner, RunRequest};
use prompt_autotest::models::{RunProgress, VariableSpec};
use prompt_autotest::output::{OutputFormat, ResultFormatter};
use prompt_autotest::results::{export, ExportFormat};
use prompt_autotest::template;
use prompt_autotest::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        match args.log_level.as_deref() {
            Some(name) => name.parse::<LogLevel>().map_err(anyhow::Error::msg)?,
            None => LogLevel::default(),
        }
    };
    init_logger(level);

    let config_path = args.config.as_deref();
    match args.command {
        cli::Command::Run(run_args) => {
            run_prompt(run_args, config_path).await?;
        }
        cli::Command::Models(models_args) => {
            list_models(models_args, config_path)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, config_path)?;
        }
    }

    Ok(())
}

/// Config file from `--config`, `PROMPT_AUTOTEST_CONFIG` or the search path
fn load_config(path: Option<&str>, env: &EnvConfig) -> Result<ConfigFile> {
    match path.map(str::to_string).or_else(|| env.config_file.clone()) {
        Some(path) => ConfigFile::load(&path),
        None => ConfigFile::load_default(),
    }
}

async fn run_prompt(args: cli::RunArgs, config_path: Option<&str>) -> Result<()> {
    let env = EnvConfig::load();
    if env.has_any() {
        info!("Applying {}_* environment overrides", config::env::ENV_PREFIX);
    }
    let file = load_config(config_path, &env)?;

    let mut app = file.app.clone();
    if let Some(name) = &args.profile {
        let profile = file
            .run_profile(name)
            .with_context(|| format!("Unknown run profile: {name}"))?;
        profile.apply(&mut app);
    }
    app.apply_env(&env);
    apply_run_flags(&mut app, &args);

    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file: {path}"))?,
        (None, None) => anyhow::bail!("Either --prompt or --prompt-file is required"),
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt template is empty");
    }

    let variables: Vec<VariableSpec> = if args.vars.is_empty() {
        template::placeholders(&prompt)
            .into_iter()
            .map(VariableSpec::new)
            .collect()
    } else {
        args.vars
            .iter()
            .map(|v| VariableSpec::parse(v).with_context(|| format!("Invalid --var: {v}")))
            .collect::<Result<_>>()?
    };

    let registry = file.model_registry();
    let selected = if args.models.is_empty() {
        app.default_models.clone()
    } else {
        args.models.clone()
    };
    for id in &selected {
        if registry.get(id).is_none() {
            warn!("Model '{}' is not in the registry; reporting it by id", id);
        }
    }

    let format_name = args
        .format
        .clone()
        .unwrap_or_else(|| env.format_or("table"));
    let format = OutputFormat::from_str(&format_name)
        .with_context(|| format!("Unknown output format: {format_name}"))?;

    let client: Arc<dyn CompletionClient> = if args.offline {
        info!("Offline mode: outputs echo the rendered prompt");
        Arc::new(offline_client())
    } else {
        let api_key = app.provider.api_key(&env);
        if api_key.is_none() {
            warn!(
                "No API key found in {} or PROMPT_AUTOTEST_API_KEY",
                app.provider.api_key_env
            );
        }
        let openai =
            OpenAiClient::with_config(api_key, &app.provider.base_url, app.provider.timeout())
                .context("Failed to create completion client")?;
        info!("Using completion endpoint {}", openai.base_url());
        Arc::new(openai)
    };

    let mut runner = AutoTestRunner::new(client.clone())
        .with_config(app.run_config())
        .with_samples(file.sample_table());
    if !app.fast_mode {
        let judge = app
            .judge_model
            .clone()
            .or_else(|| selected.first().cloned())
            .context("Accurate scoring needs a judge model")?;
        let scorer = LlmScorer::new(client.clone(), judge);
        info!("Scoring outputs with judge model {}", scorer.judge_model());
        runner = runner.with_scorer(Arc::new(scorer));
    }

    let mut progress = runner.subscribe();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot: RunProgress = progress.borrow_and_update().clone();
            info!("{}", snapshot.phase);
            if snapshot.state.is_terminal() {
                break;
            }
        }
    });

    let request = RunRequest::new(prompt)
        .with_variables(variables)
        .with_models(registry.models().to_vec())
        .select(selected)
        .with_temperature(app.temperature);

    let outcome = runner.run(request).await;
    drop(runner);
    if let Err(e) = watcher.await {
        warn!("Progress watcher stopped: {}", e);
    }
    let result = outcome?;

    let mut formatter = ResultFormatter::new(format);
    if args.no_color {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_run(&result));

    if let Some(output) = &args.output {
        let path = Path::new(output);
        let export_format = ExportFormat::from_extension(path).unwrap_or(ExportFormat::Json);
        match export(&result, path, export_format)? {
            Some(run_id) => println!("✓ Results exported to {output} (run {run_id})"),
            None => println!("✓ Results exported to {output}"),
        }
    }

    Ok(())
}

/// Command-line flags win over profile, file and environment
fn apply_run_flags(app: &mut AppConfig, args: &cli::RunArgs) {
    if let Some(temperature) = args.temperature {
        app.temperature = temperature;
    }
    if let Some(concurrency) = args.concurrency {
        app.concurrency = concurrency;
    }
    if let Some(delay) = args.batch_delay_ms {
        app.batch_delay_ms = delay;
    }
    if let Some(timeout) = args.timeout_ms {
        app.item_timeout_ms = timeout;
    }
    if args.accurate {
        app.fast_mode = false;
    }
    if let Some(judge) = &args.judge_model {
        app.judge_model = Some(judge.clone());
    }
    if let Some(model) = &args.synthesis_model {
        app.synthesis_model = Some(model.clone());
    }
}

/// Echo client for dry runs; synthesis always falls back to sample values
fn offline_client() -> ScriptedClient {
    ScriptedClient::new().respond_when("diverse test cases", "offline")
}

fn list_models(args: cli::ModelsArgs, config_path: Option<&str>) -> Result<()> {
    let env = EnvConfig::load();
    let file = load_config(config_path, &env)?;
    let mut app = file.app.clone();
    app.apply_env(&env);

    let profiles = file.model_profiles();

    println!("Models:");
    println!("{:-<60}", "");
    for profile in &profiles {
        let marker = if app.default_models.contains(&profile.id) {
            "*"
        } else {
            " "
        };
        println!("{} {:24} {}", marker, profile.id, profile.name);
        if args.detailed {
            if !profile.description.is_empty() {
                println!("    {}", profile.description);
            }
            if !profile.tags.is_empty() {
                println!("    Tags: {}", profile.tags.join(", "));
            }
        }
    }
    println!("\n* default selection");

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, config_path: Option<&str>) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { env, format } => {
            let env_config = EnvConfig::load();
            if env {
                env_config.print_summary();
            } else {
                let mut config = load_config(config_path, &env_config)?;
                config.app.apply_env(&env_config);
                let output = if format == "json" {
                    serde_json::to_string_pretty(&config)?
                } else {
                    serde_yaml::to_string(&config)?
                };
                println!("{output}");
                if env_config.has_any() {
                    eprintln!("note: environment overrides applied; see `config show --env`");
                }
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| config_path.map(str::to_string))
                .or_else(|| ConfigFile::find().map(|p| p.to_string_lossy().to_string()))
                .unwrap_or_else(|| config::file::DEFAULT_CONFIG_PATH.to_string());

            match ConfigFile::load(&path) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {path}");
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Profiles { detailed } => {
            let mut manager = ProfileManager::new();
            let env = EnvConfig::load();
            for profile in load_config(config_path, &env)?.run_profiles {
                manager.add_run_profile(profile);
            }

            println!("Run Profiles:");
            println!("{:-<60}", "");
            for profile in manager.list_run_profiles() {
                if detailed {
                    println!("  {}", profile.name);
                    println!("    Description: {}", profile.description);
                    println!(
                        "    Scoring: {}",
                        if profile.fast_mode { "fast" } else { "accurate" }
                    );
                    println!(
                        "    Concurrency: {}, Delay: {}ms, Timeout: {}ms",
                        profile.concurrency, profile.batch_delay_ms, profile.item_timeout_ms
                    );
                    println!();
                } else {
                    println!("  {:12} - {}", profile.name, profile.description);
                }
            }
        }

        cli::ConfigAction::Set { key, value, file } => {
            let path = file
                .or_else(|| config_path.map(str::to_string))
                .unwrap_or_else(|| config::file::DEFAULT_CONFIG_PATH.to_string());
            let mut config = if Path::new(&path).exists() {
                ConfigFile::load(&path)?
            } else {
                ConfigFile::default()
            };

            config.app.set(&key, &value).with_context(|| {
                format!("Supported keys: {}", CONFIG_KEYS.join(", "))
            })?;
            config.validate()?;
            config.save(&path)?;
            println!("✓ Set {key} = {value} in {path}");
        }

        cli::ConfigAction::Get { key, file } => {
            let config = match file.as_deref().or(config_path) {
                Some(path) => ConfigFile::load(path)?,
                None => ConfigFile::load_default()?,
            };

            println!("{}", config.app.get(&key)?);
        }

        cli::ConfigAction::Env => {
            config::env::print_env_help();
        }
    }

    Ok(())
}
