// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenPilot command-line entry point.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use openpilot::config::{self, CliOptions};
use openpilot::context::{ContextManager, IndexerOptions};
use openpilot::telemetry::{init_telemetry, TelemetryConfig};
use openpilot::types::{ChatContext, CompletionRequest, Message, RepositoryContext};
use openpilot::{AIEngine, VERSION};

/// Lines attached when `--file` is given without `--end`.
const DEFAULT_EXCERPT_LINES: usize = 200;

/// OpenPilot - repository-aware AI coding assistant.
#[derive(Parser)]
#[command(name = "openpilot")]
#[command(author, version, about = "Repository-aware AI coding assistant", long_about = None)]
struct Cli {
    /// AI provider (ollama, openai, grok, together, custom)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Base URL for the provider API
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Sampling temperature (0-2)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Maximum tokens to generate
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Repository root (defaults to the current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Suppress spinners
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the repository and summarize files, dependencies and git state
    Analyze {
        /// Additional exclude patterns (globs or regexes)
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Include patterns; replaces the default of every path
        #[arg(long = "include")]
        include: Vec<String>,

        /// Skip files larger than this many bytes
        #[arg(long)]
        max_file_size: Option<u64>,
    },

    /// Show a line range with its surroundings, imports and symbols
    Context {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        start: usize,
        #[arg(long)]
        end: Option<usize>,
    },

    /// Chunk a file and print the chunk boundaries
    Index {
        file: PathBuf,
        /// Lines per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Send a chat message, optionally enriched with a code excerpt
    Chat {
        prompt: String,
        /// File to attach as code context
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        start: usize,
        #[arg(long)]
        end: Option<usize>,
        /// Attach a repository summary
        #[arg(long)]
        repo: bool,
        /// Stream the response as it arrives
        #[arg(long)]
        stream: bool,
    },

    /// Ask for a completion of a code excerpt
    Complete {
        file: PathBuf,
        prompt: String,
        #[arg(long, default_value_t = 1)]
        start: usize,
        #[arg(long)]
        end: Option<usize>,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the merged configuration
    Show,
    /// List config file locations searched
    Paths,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // JSON output is read by tools; keep its logs plain.
    let telemetry = if cli.json && cli.verbose == 0 {
        TelemetryConfig::production()
    } else {
        TelemetryConfig::from_verbosity(cli.verbose)
    };
    let _telemetry = init_telemetry(&telemetry).context("failed to initialize logging")?;

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };

    match &cli.command {
        Commands::Analyze {
            exclude,
            include,
            max_file_size,
        } => {
            let mut options = IndexerOptions::new(&root);
            options.exclude_patterns.extend(exclude.iter().cloned());
            if !include.is_empty() {
                options.include_patterns = include.clone();
            }
            if let Some(bytes) = max_file_size {
                options.max_file_size = *bytes;
            }
            let manager = ContextManager::new(options).context("invalid indexer options")?;

            let spinner = spinner(cli.quiet, "Analyzing repository...");
            let repo = manager.analyze_repository().await;
            spinner.finish_and_clear();
            let repo = repo.with_context(|| format!("failed to analyze {}", root.display()))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&repo)?);
            } else {
                print_repository(&repo);
            }
        }

        Commands::Context { file, start, end } => {
            let manager = ContextManager::with_root(&root)?;
            let path = resolve(&root, file);
            let excerpt = manager
                .get_code_context(&path, *start, end.unwrap_or(*start))
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&excerpt)?);
            } else {
                println!(
                    "{} {} ({}) lines {}-{}",
                    "File:".bright_blue().bold(),
                    excerpt.file_path,
                    excerpt.language.bright_magenta(),
                    excerpt.line_start,
                    excerpt.line_end
                );
                println!("{}", excerpt.selected_code);
                if let Some(imports) = excerpt.imports.as_ref().filter(|i| !i.is_empty()) {
                    println!("\n{} {}", "Imports:".bright_blue(), imports.join(", "));
                }
                if let Some(symbols) = excerpt.symbols.as_ref().filter(|s| !s.is_empty()) {
                    println!("{}", "Symbols:".bright_blue());
                    for symbol in symbols {
                        let container = symbol
                            .container_name
                            .as_deref()
                            .map(|c| format!(" in {}", c))
                            .unwrap_or_default();
                        println!(
                            "  {:?} {}{} (line {})",
                            symbol.kind,
                            symbol.name.bright_white(),
                            container,
                            symbol.location.line + 1
                        );
                    }
                }
            }
        }

        Commands::Index { file, chunk_size } => {
            let mut options = IndexerOptions::new(&root);
            if let Some(lines) = chunk_size {
                options.chunk_size = *lines;
            }
            let manager = ContextManager::new(options)?;
            let path = resolve(&root, file);
            let indexed = manager
                .index_file(&path)
                .await
                .with_context(|| format!("failed to index {}", path.display()))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&indexed)?);
            } else {
                println!("{} {}", "Indexed".green().bold(), indexed.file_path);
                for (i, chunk) in indexed.chunks.iter().enumerate() {
                    println!(
                        "  chunk {}: lines {}-{} ({} lines)",
                        i,
                        chunk.start_line,
                        chunk.end_line,
                        chunk.line_count()
                    );
                }
            }
        }

        Commands::Chat {
            prompt,
            file,
            start,
            end,
            repo,
            stream,
        } => {
            let engine = build_engine(&cli, &root)?;
            let manager = ContextManager::with_root(&root)?;

            let mut context = ChatContext::new(vec![Message::user(prompt.clone())]);
            if let Some(file) = file {
                let path = resolve(&root, file);
                let excerpt = manager
                    .get_code_context(&path, *start, end.unwrap_or(*start + DEFAULT_EXCERPT_LINES - 1))
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                context = context.with_code_context(excerpt);
            }
            if *repo {
                let analysis = manager.analyze_repository().await?;
                context = context.with_repository_context(analysis);
            }

            if *stream {
                let response = engine
                    .stream_chat(
                        &context,
                        Box::new(|chunk: &str| {
                            print!("{}", chunk);
                            let _ = std::io::stdout().flush();
                        }),
                    )
                    .await
                    .context("streaming chat failed")?;
                println!();
                print_usage(&response, cli.quiet);
            } else {
                let spinner = spinner(cli.quiet, "Thinking...");
                let response = engine.chat(&context).await;
                spinner.finish_and_clear();
                let response = response.context("chat request failed")?;

                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                } else {
                    println!("{}", response.content);
                    print_usage(&response, cli.quiet);
                }
            }
        }

        Commands::Complete {
            file,
            prompt,
            start,
            end,
        } => {
            let engine = build_engine(&cli, &root)?;
            let manager = ContextManager::with_root(&root)?;
            let path = resolve(&root, file);
            let excerpt = manager
                .get_code_context(&path, *start, end.unwrap_or(*start + DEFAULT_EXCERPT_LINES - 1))
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            let spinner = spinner(cli.quiet, "Completing...");
            let response = engine
                .complete(&CompletionRequest::new(prompt.clone(), excerpt))
                .await;
            spinner.finish_and_clear();
            let response = response.context("completion request failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                for completion in &response.completions {
                    println!("{}", completion.text);
                }
            }
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                let config = config::load_config(&root, cli_options(&cli))?;
                let mut value = serde_json::to_value(&config)?;
                if let Some(key) = value.get_mut("apiKey") {
                    *key = serde_json::Value::from("<redacted>");
                }
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            Some(ConfigAction::Paths) => {
                if let Some(global) = config::get_global_config_path() {
                    println!("{} {}", "global:".bright_blue(), global.display());
                }
                for name in config::CONFIG_FILES {
                    println!("{} {}", "workspace:".bright_blue(), root.join(name).display());
                }
            }
        },

        Commands::Version => {
            println!("openpilot {}", VERSION);
        }
    }

    Ok(())
}

fn cli_options(cli: &Cli) -> CliOptions {
    CliOptions {
        provider: cli.provider.clone(),
        model: cli.model.clone(),
        api_url: cli.api_url.clone(),
        temperature: cli.temperature,
        max_tokens: cli.max_tokens,
        offline: None,
    }
}

fn build_engine(cli: &Cli, root: &Path) -> anyhow::Result<AIEngine> {
    let config = config::load_config(root, cli_options(cli)).context("invalid configuration")?;
    tracing::info!(provider = %config.provider, model = %config.model, "Using provider");
    AIEngine::new(config).context("failed to create provider client")
}

fn resolve(root: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_usage(response: &openpilot::AIResponse, quiet: bool) {
    if quiet {
        return;
    }
    if let Some(usage) = response.usage {
        eprintln!(
            "{}",
            format!(
                "[{}] {} prompt + {} completion = {} tokens",
                response.model, usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            )
            .dimmed()
        );
    }
}

fn print_repository(repo: &RepositoryContext) {
    println!("{} {}", "Repository:".bright_blue().bold(), repo.root_path);
    if let Some(git) = &repo.git_info {
        let commit: String = git.commit.chars().take(8).collect();
        let state = if git.detached { " (detached)" } else { "" };
        println!("{} {} {}{}", "Git:".bright_blue(), git.branch.bright_magenta(), commit, state);
    }

    println!("{} {}", "Files:".bright_blue(), repo.files.len());
    let mut languages: Vec<(&str, usize)> = Vec::new();
    for file in &repo.files {
        match languages.iter_mut().find(|(l, _)| *l == file.language) {
            Some((_, n)) => *n += 1,
            None => languages.push((file.language.as_str(), 1)),
        }
    }
    languages.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (language, count) in languages {
        println!("  {:<16} {}", language, count);
    }

    if !repo.dependencies.is_empty() {
        println!("{} {}", "Dependencies:".bright_blue(), repo.dependencies.len());
        for dep in &repo.dependencies {
            println!("  {} {} ({})", dep.name.bright_white(), dep.version, dep.ecosystem);
        }
    }
}
