use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};

use faultline_analysis::aggregate::Aggregator;
use faultline_analysis::engine::ChangeAnalyzer;
use faultline_analysis::hotspots::{HotspotTracker, ScanOptions};
use faultline_core::{FaultlineConfig, ImpactLevel, OutputFormat};
use faultline_git::{GitAccessor, LogOptions};

#[derive(Parser)]
#[command(
    name = "faultline",
    version,
    about = "Structural risk analysis for git history",
    long_about = "Faultline measures how the structural complexity of source files evolves\n\
                   across git history and turns those measurements into commit-level and\n\
                   change-set-level risk assessments.\n\n\
                   Examples:\n  \
                     faultline commit HEAD              Score the latest commit\n  \
                     faultline range main feature/x     Score a branch against its base\n  \
                     faultline pr 42                    Score a change set by identifier\n  \
                     faultline hotspots main HEAD       Rank the most volatile files\n  \
                     faultline analyze src/auth.ts      Run the bare analyzer on one file\n  \
                     faultline doctor                   Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Repository path (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Path to configuration file (default: .faultline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze the change introduced by one commit
    #[command(long_about = "Analyze the change introduced by one commit relative to its parent.\n\n\
        Each changed source file is scored on both sides of the commit; the root\n\
        commit is compared against the empty tree.\n\n\
        Examples:\n  faultline commit HEAD\n  faultline commit abc1234 --fail-on high")]
    Commit {
        /// Commit reference (id, branch, or tag)
        reference: String,

        /// Exit non-zero when the impact level meets this threshold
        #[arg(long)]
        fail_on: Option<ImpactLevel>,
    },
    /// Analyze a change set between two references
    #[command(long_about = "Analyze the full range between two references.\n\n\
        The aggregate compares base and head once; per-commit scores are reported\n\
        alongside, and hotspots are ranked over the range.\n\n\
        Examples:\n  faultline range main feature/login\n  faultline range v1.0 v1.1 --fail-on medium")]
    Range {
        /// Base reference
        base: String,

        /// Head reference
        head: String,

        /// Exit non-zero when the impact level meets this threshold
        #[arg(long)]
        fail_on: Option<ImpactLevel>,
    },
    /// Analyze a change set by identifier
    #[command(long_about = "Analyze a change set (pull-request-like range) by identifier.\n\n\
        With --base/--head the explicit references win; otherwise the identifier is\n\
        resolved from the remote-tracking convention origin/pr/<id>.\n\n\
        Examples:\n  faultline pr 42\n  faultline pr 42 --base main --head feature/x")]
    Pr {
        /// Change-set identifier
        identifier: String,

        /// Explicit base reference
        #[arg(long)]
        base: Option<String>,

        /// Explicit head reference
        #[arg(long)]
        head: Option<String>,

        /// Exit non-zero when the impact level meets this threshold
        #[arg(long)]
        fail_on: Option<ImpactLevel>,
    },
    /// Rank the most volatile files over a commit range
    #[command(long_about = "Rank files by change frequency and complexity trend over a range.\n\n\
        Long ranges are bounded by --max-commits and a deadline; when the deadline\n\
        elapses, partial results are returned and marked as such.\n\n\
        Examples:\n  faultline hotspots main HEAD\n  faultline hotspots v1.0 HEAD --top 5 --path src/core.ts")]
    Hotspots {
        /// Base reference
        base: String,

        /// Head reference
        head: String,

        /// Number of hotspots to return
        #[arg(long)]
        top: Option<usize>,

        /// Cap on commits scanned (most recent win)
        #[arg(long)]
        max_commits: Option<usize>,

        /// Scan deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Restrict the scan to these paths
        #[arg(long)]
        path: Vec<String>,
    },
    /// List commit metadata from history
    #[command(long_about = "List commit metadata with optional range, path, and count filters.\n\n\
        Examples:\n  faultline log --max-count 10\n  faultline log --range main..HEAD --path src/auth.ts")]
    Log {
        /// Restrict to base..head
        #[arg(long)]
        range: Option<String>,

        /// Restrict to commits touching this path
        #[arg(long)]
        path: Option<String>,

        /// Maximum commits to list
        #[arg(long)]
        max_count: Option<usize>,

        /// Only commits after this date
        #[arg(long)]
        since: Option<String>,

        /// Only commits before this date
        #[arg(long)]
        until: Option<String>,
    },
    /// Run the complexity analyzer on a single file
    #[command(long_about = "Run the bare complexity analyzer on a file from the working tree.\n\n\
        Examples:\n  faultline analyze src/auth.ts")]
    Analyze {
        /// File to analyze
        file: PathBuf,
    },
    /// Check your setup and environment
    Doctor,
    /// Create default configuration
    Init,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

struct Pipeline {
    git: Arc<GitAccessor>,
    aggregator: Aggregator,
    tracker: HotspotTracker,
}

fn build_pipeline(repo: &PathBuf, config: &FaultlineConfig) -> Pipeline {
    let permits = Arc::new(tokio::sync::Semaphore::new(config.git.max_concurrency.max(1)));
    let git = Arc::new(GitAccessor::new(repo, permits, &config.git.exclude));
    let engine = Arc::new(ChangeAnalyzer::new(Arc::clone(&git), &config.analysis));

    let scan_defaults = ScanOptions {
        paths: Vec::new(),
        max_commits: config.hotspots.max_commits,
        top_n: config.hotspots.top_n,
        timeout: Some(Duration::from_secs(config.hotspots.timeout_secs)),
    };

    let aggregator = Aggregator::new(
        Arc::clone(&git),
        Arc::clone(&engine),
        HotspotTracker::new(Arc::clone(&git), Arc::clone(&engine)),
        config.git.max_concurrency.max(1),
        scan_defaults,
    );
    let tracker = HotspotTracker::new(Arc::clone(&git), engine);

    Pipeline {
        git,
        aggregator,
        tracker,
    }
}

fn print_result<T: serde::Serialize>(
    result: &T,
    format: OutputFormat,
    text: impl FnOnce() -> String,
    markdown: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result).into_diagnostic()?);
        }
        OutputFormat::Markdown => print!("{}", markdown()),
        OutputFormat::Text => print!("{}", text()),
    }
    Ok(())
}

fn enforce_fail_on(level: ImpactLevel, fail_on: Option<ImpactLevel>) {
    if let Some(threshold) = fail_on {
        if level.meets_threshold(threshold) {
            std::process::exit(1);
        }
    }
}

fn scan_spinner() -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            .expect("valid template"),
    );
    pb.set_message("Scanning commit range...");
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

const DEFAULT_CONFIG: &str = r#"# Faultline configuration

[git]
# Maximum concurrent git subprocesses
# max_concurrency = 6
# Paths excluded from diff statistics entirely
# exclude = ["node_modules/**", "vendor/**", "dist/**", "target/**", "*.lock", "*.min.js"]

[analysis]
# Extensions analyzed in addition to the built-in source set
# extra_extensions = ["vue", "svelte"]
# Files larger than this are degraded instead of analyzed
# max_file_bytes = 1048576

[hotspots]
# top_n = 10
# max_commits = 200
# timeout_secs = 30
"#;

fn run_doctor(repo: &PathBuf, config_path_used: bool) -> Result<()> {
    let mut failures = 0u32;

    let git_version = std::process::Command::new("git").arg("--version").output();
    match git_version {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout);
            println!("  \u{2713} git binary          {}", version.trim());
        }
        _ => {
            println!("  \u{2717} git binary          not found on PATH");
            failures += 1;
        }
    }

    let mut dir = repo.canonicalize().unwrap_or_else(|_| repo.clone());
    let mut found_repo = false;
    loop {
        if dir.join(".git").exists() {
            println!("  \u{2713} git repository      detected at {}", dir.display());
            found_repo = true;
            break;
        }
        if !dir.pop() {
            break;
        }
    }
    if !found_repo {
        println!("  \u{2717} git repository      not a git repository");
        failures += 1;
    }

    if config_path_used || repo.join(".faultline.toml").exists() {
        println!("  \u{2713} config file         loaded");
    } else {
        println!("  ~ config file         not found (defaults in use; run 'faultline init')");
    }

    if failures > 0 {
        miette::bail!("{failures} check(s) failed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => FaultlineConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = cli.repo.join(".faultline.toml");
            if default_path.exists() {
                FaultlineConfig::from_file(&default_path).into_diagnostic()?
            } else {
                FaultlineConfig::default()
            }
        }
    };

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
            return Ok(());
        }
        Some(Command::Commit { ref reference, fail_on }) => {
            let pipeline = build_pipeline(&cli.repo, &config);
            let analysis = pipeline
                .aggregator
                .analyze_commit(reference)
                .await
                .into_diagnostic()?;
            print_result(
                &analysis,
                cli.format,
                || format!("{analysis}"),
                || analysis.to_markdown(),
            )?;
            enforce_fail_on(analysis.impact_level, fail_on);
        }
        Some(Command::Range {
            ref base,
            ref head,
            fail_on,
        }) => {
            let pipeline = build_pipeline(&cli.repo, &config);
            let analysis = pipeline
                .aggregator
                .analyze_change_set("range", Some(base), Some(head))
                .await
                .into_diagnostic()?;
            print_result(
                &analysis,
                cli.format,
                || format!("{analysis}"),
                || analysis.to_markdown(),
            )?;
            enforce_fail_on(analysis.impact_level, fail_on);
        }
        Some(Command::Pr {
            ref identifier,
            ref base,
            ref head,
            fail_on,
        }) => {
            let pipeline = build_pipeline(&cli.repo, &config);
            let analysis = pipeline
                .aggregator
                .analyze_change_set(identifier, base.as_deref(), head.as_deref())
                .await
                .into_diagnostic()?;
            print_result(
                &analysis,
                cli.format,
                || format!("{analysis}"),
                || analysis.to_markdown(),
            )?;
            enforce_fail_on(analysis.impact_level, fail_on);
        }
        Some(Command::Hotspots {
            ref base,
            ref head,
            top,
            max_commits,
            timeout,
            ref path,
        }) => {
            let pipeline = build_pipeline(&cli.repo, &config);
            let options = ScanOptions {
                paths: path.clone(),
                max_commits: max_commits.unwrap_or(config.hotspots.max_commits),
                top_n: top.unwrap_or(config.hotspots.top_n),
                timeout: Some(Duration::from_secs(
                    timeout.unwrap_or(config.hotspots.timeout_secs),
                )),
            };

            let spinner = scan_spinner();
            let report = pipeline.tracker.scan(base, head, &options).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            let report = report.into_diagnostic()?;

            print_result(
                &report,
                cli.format,
                || format!("{report}"),
                || report.to_markdown(),
            )?;
        }
        Some(Command::Log {
            ref range,
            ref path,
            max_count,
            ref since,
            ref until,
        }) => {
            let pipeline = build_pipeline(&cli.repo, &config);
            let options = LogOptions {
                range: range.clone(),
                path: path.clone(),
                max_count,
                since: since.clone(),
                until: until.clone(),
            };
            let commits = pipeline.git.log(&options).await.into_diagnostic()?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&commits).into_diagnostic()?
                    );
                }
                _ => {
                    for meta in &commits {
                        let date = chrono::DateTime::from_timestamp(meta.timestamp, 0)
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_default();
                        println!(
                            "{}  {}  {}  {}",
                            &meta.id[..meta.id.len().min(8)],
                            date,
                            meta.author,
                            meta.message,
                        );
                    }
                }
            }
        }
        Some(Command::Analyze { ref file }) => {
            let text = std::fs::read_to_string(file)
                .into_diagnostic()
                .wrap_err(format!("reading {}", file.display()))?;
            let metrics = faultline_metrics::analyze(&text);

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&metrics).into_diagnostic()?
                    );
                }
                _ => {
                    println!("{}", file.display());
                    println!("  cyclomatic:      {}", metrics.cyclomatic);
                    println!("  cognitive:       {}", metrics.cognitive);
                    if let Some(stats) = &metrics.token_stats {
                        println!("  volume:          {:.1}", stats.volume);
                        println!("  difficulty:      {:.1}", stats.difficulty);
                        println!("  effort:          {:.1}", stats.effort);
                    }
                    if let Some(mi) = metrics.maintainability {
                        println!("  maintainability: {mi:.1}");
                    }
                }
            }
        }
        Some(Command::Doctor) => {
            run_doctor(&cli.repo, cli.config.is_some())?;
        }
        Some(Command::Init) => {
            let path = cli.repo.join(".faultline.toml");
            if path.exists() {
                miette::bail!(".faultline.toml already exists");
            }
            std::fs::write(&path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .faultline.toml with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "faultline", &mut std::io::stdout());
        }
    }

    Ok(())
}
