use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::subscriber::set_global_default;
use tracing_subscriber::EnvFilter;

use crate::batch::DEFAULT_CONCURRENCY;
use crate::cli::args::{CliArgs, Command};
use crate::cli::validation;
use crate::client::{ClientConfig, DEFAULT_TIMEOUT_SECONDS};
use crate::config::{self, ConfigFile};
use crate::exploit::{ExploitHit, DEFAULT_XSS_PAYLOAD};
use crate::output::{self, OutputFormat, ScanReport};
use crate::prober::{ProbePolicy, DEFAULT_NEGATIVE_PHRASES};
use crate::runner::{Options, Scanner};
use crate::session::ParamFinding;
use crate::wordlist::{WordlistSource, DEFAULT_PARAM_WORDLIST, DEFAULT_PATH_WORDLIST};

const DEFAULT_DEPTH: usize = 2;

fn print_banner() {
    const BANNER: &str = r#"

   _________ _      ________________ _____
  / ___/ __ \ | /| / / ___/ ___/ __ `/ __ \
 / /__/ /_/ / |/ |/ (__  ) /__/ /_/ / / / /
 \___/\____/|__/|__/____/\___/\__,_/_/ /_/

       web application reconnaissance
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Task {
    Discover {
        wordlist: WordlistSource,
        filter_ext: Option<String>,
    },
    Crawl {
        depth: usize,
    },
    Mine {
        path: Option<String>,
        params: WordlistSource,
        discover_with: Option<WordlistSource>,
    },
    CommandInjection {
        path: String,
        param: String,
    },
    Xss {
        path: String,
        param: String,
        payload: String,
    },
    Recon {
        wordlist: WordlistSource,
        params: WordlistSource,
        depth: usize,
    },
}

impl Task {
    fn label(&self) -> String {
        match self {
            Task::Discover { wordlist, .. } => format!("discover wordlist={}", wordlist.describe()),
            Task::Crawl { depth } => format!("crawl depth={depth}"),
            Task::Mine { path, params, .. } => format!(
                "mine path={} params={}",
                path.as_deref().unwrap_or("<target>"),
                params.describe()
            ),
            Task::CommandInjection { path, param } => format!("cmdi path={path} param={param}"),
            Task::Xss { path, param, .. } => format!("xss path={path} param={param}"),
            Task::Recon { depth, .. } => format!("recon depth={depth}"),
        }
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    task: Task,
    output: Option<String>,
    output_format: Option<OutputFormat>,
    no_color: bool,
    verbose: u8,
}

fn wordlist_source(value: Option<String>, default: &str) -> WordlistSource {
    match value {
        Some(v) if !v.trim().is_empty() => WordlistSource::parse(&v),
        _ => WordlistSource::Url(default.to_string()),
    }
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let target = args
        .url
        .or(cfg.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "a target is required (--url or 'url' in the config file)".to_string())?;

    let concurrency = args
        .concurrency
        .or(cfg.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        return Err("invalid concurrency, expected positive integer".to_string());
    }
    let timeout_seconds = args
        .timeout
        .or(cfg.timeout)
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let rate = args.rate.or(cfg.rate);
    if rate == Some(0) {
        return Err("invalid rate, expected positive integer".to_string());
    }
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());
    let header = args.header.or(cfg.header).filter(|h| !h.trim().is_empty());
    let follow_redirects = args
        .follow_redirects
        .or(cfg.follow_redirects)
        .unwrap_or(true);

    let success_status = match args.success_status.or(cfg.success_status) {
        Some(raw) => crate::prober::parse_status_range(&raw)
            .map_err(|e| format!("invalid success-status '{raw}': {e}"))?,
        None => 200..=299,
    };
    let negative_phrases: Vec<String> = if !args.negative_phrase.is_empty() {
        args.negative_phrase
    } else {
        cfg.negative_phrases.unwrap_or_else(|| {
            DEFAULT_NEGATIVE_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect()
        })
    };

    let depth_or_default = |depth: Option<usize>| depth.or(cfg.depth).unwrap_or(DEFAULT_DEPTH);

    let task = match args.command {
        Command::Discover(d) => Task::Discover {
            wordlist: wordlist_source(d.wordlist.or(cfg.wordlist), DEFAULT_PATH_WORDLIST),
            filter_ext: d.filter_ext.filter(|e| !e.trim().is_empty()),
        },
        Command::Crawl(c) => Task::Crawl {
            depth: depth_or_default(c.depth),
        },
        Command::Mine(m) => {
            let discover_with = if m.discovered {
                Some(wordlist_source(
                    m.wordlist.or(cfg.wordlist),
                    DEFAULT_PATH_WORDLIST,
                ))
            } else {
                None
            };
            Task::Mine {
                path: m.path.filter(|p| !p.trim().is_empty()),
                params: wordlist_source(m.params.or(cfg.param_wordlist), DEFAULT_PARAM_WORDLIST),
                discover_with,
            }
        }
        Command::Cmdi(e) => Task::CommandInjection {
            path: e.path,
            param: e.param.trim().to_string(),
        },
        Command::Xss(x) => Task::Xss {
            path: x.target.path,
            param: x.target.param.trim().to_string(),
            payload: x
                .payload
                .unwrap_or_else(|| DEFAULT_XSS_PAYLOAD.to_string()),
        },
        Command::Recon(r) => Task::Recon {
            wordlist: wordlist_source(r.wordlist.or(cfg.wordlist), DEFAULT_PATH_WORDLIST),
            params: wordlist_source(r.params.or(cfg.param_wordlist), DEFAULT_PARAM_WORDLIST),
            depth: depth_or_default(r.depth),
        },
    };

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => Some(
            OutputFormat::parse(&raw)
                .ok_or_else(|| format!("invalid output-format '{raw}', expected text or json"))?,
        ),
        None => None,
    };

    Ok(RunConfig {
        options: Options {
            target,
            concurrency,
            client: ClientConfig {
                timeout_seconds,
                proxy,
                follow_redirects,
                header,
                rate,
            },
            policy: ProbePolicy::new(negative_phrases, success_status),
        },
        task,
        output,
        output_format,
        no_color,
        verbose: args.verbose,
    })
}

fn init_tracing(verbose: u8) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "warn,cowscan=info",
            _ => "warn,cowscan=debug",
        })
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    set_global_default(subscriber).map_err(|e| format!("failed to install log subscriber: {e}"))
}

fn progress_bar() -> Result<ProgressBar, String> {
    let pb = ProgressBar::new(0);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template(
            ":: Progress: [{pos}/{len}] :: {per_sec} :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );
    Ok(pb)
}

fn print_paths(paths: &[String]) {
    for p in paths {
        println!("{} {}", "[path]".green().bold(), p);
    }
}

fn print_findings(url: &str, findings: &[ParamFinding]) {
    for f in findings {
        let reflected = if f.reflected {
            " reflected".yellow().bold().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {} {} {}{}",
            "[param]".cyan().bold(),
            f.method,
            url,
            f.param.bold(),
            reflected
        );
    }
}

fn print_hits(hits: &[ExploitHit]) {
    for h in hits {
        println!(
            "{} {} {} {}={}",
            "[hit]".red().bold(),
            h.method,
            h.url,
            h.param,
            h.payload
        );
    }
}

async fn discover(scanner: &Scanner, wordlist: &WordlistSource) -> Vec<String> {
    let words = scanner.load_wordlist(wordlist).await;
    if words.is_empty() {
        println!("{} path wordlist is empty, nothing to probe", "[-]".yellow());
        return Vec::new();
    }
    scanner.discover_paths(&words).await
}

async fn mine_all_discovered(scanner: &Scanner, params: &WordlistSource) {
    if !scanner.session().has_paths() {
        println!("{} no discovered paths to mine", "[-]".yellow());
        return;
    }
    let params = scanner.load_wordlist(params).await;
    if params.is_empty() {
        println!("{} parameter wordlist is empty, nothing to mine", "[-]".yellow());
        return;
    }
    scanner.mine_discovered(&params).await;
    for (url, findings) in scanner.session().findings() {
        print_findings(&url, &findings);
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let scanner = Scanner::new(run.options.clone())
        .map_err(|e| e.to_string())?
        .with_progress(progress_bar()?);

    let opts = scanner.options();
    format_kv_line("Target", scanner.target().url());
    format_kv_line(
        "HTTP",
        &format!(
            "conc={} timeout={}s rate={} redirects={} proxy={}",
            opts.concurrency,
            opts.client.timeout_seconds,
            opts.client
                .rate
                .map(|r| r.to_string())
                .unwrap_or_else(|| "off".to_string()),
            format_bool(opts.client.follow_redirects),
            format_bool(opts.client.proxy.is_some()),
        ),
    );
    format_kv_line(
        "Match",
        &format!(
            "status={}-{} phrases={}",
            opts.policy.success_status().start(),
            opts.policy.success_status().end(),
            opts.policy.negative_phrases().len()
        ),
    );
    format_kv_line("Task", &run.task.label());
    println!();

    let now = Instant::now();
    let mut crawl = None;
    let mut hits: Vec<ExploitHit> = Vec::new();

    match &run.task {
        Task::Discover {
            wordlist,
            filter_ext,
        } => {
            let found = discover(&scanner, wordlist).await;
            match filter_ext {
                Some(ext) => print_paths(&scanner.session().paths_with_extension(ext)),
                None => print_paths(&found),
            }
        }
        Task::Crawl { depth } => {
            let summary = scanner.crawl(*depth).await;
            print_paths(&scanner.session().paths());
            println!(
                ":: Crawl     : visited={} probed={} found={}",
                summary.visited, summary.probed, summary.found
            );
            crawl = Some(summary);
        }
        Task::Mine {
            path,
            params,
            discover_with,
        } => match discover_with {
            Some(wordlist) => {
                let found = discover(&scanner, wordlist).await;
                print_paths(&found);
                mine_all_discovered(&scanner, params).await;
            }
            None => {
                let params = scanner.load_wordlist(params).await;
                if params.is_empty() {
                    println!("{} parameter wordlist is empty, nothing to mine", "[-]".yellow());
                } else {
                    let url = scanner.resolve(path.as_deref());
                    let findings = scanner.mine_params(&url, &params).await;
                    print_findings(&url, &findings);
                }
            }
        },
        Task::CommandInjection { path, param } => {
            let url = scanner.resolve(Some(path.as_str()));
            hits = scanner.test_command_injection(&url, param).await;
            print_hits(&hits);
        }
        Task::Xss {
            path,
            param,
            payload,
        } => {
            let url = scanner.resolve(Some(path.as_str()));
            hits = scanner.test_xss(&url, param, payload).await;
            print_hits(&hits);
        }
        Task::Recon {
            wordlist,
            params,
            depth,
        } => {
            let found = discover(&scanner, wordlist).await;
            print_paths(&found);
            let before = scanner.session().paths().len();
            let summary = scanner.crawl(*depth).await;
            print_paths(&scanner.session().paths()[before..]);
            crawl = Some(summary);
            mine_all_discovered(&scanner, params).await;
        }
    }

    if let Some(outfile_path) = run.output.as_ref() {
        let output_format = run
            .output_format
            .or_else(|| output::infer_format_from_path(outfile_path))
            .unwrap_or(OutputFormat::Text);

        let mut report = ScanReport::from_session(scanner.target().url(), scanner.session());
        report.crawl = crawl;
        report.hits = hits;
        let rendered = output::render(&report, output_format);

        let mut outfile = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(outfile_path)
            .await
            .map_err(|e| format!("failed to open output file: {e}"))?;
        outfile
            .write_all(&rendered)
            .await
            .map_err(|_| "failed to write output file".to_string())?;
    }

    let elapsed_time = now.elapsed();

    println!();
    println!(":: Completed :: scan took {}s ::", elapsed_time.as_secs());

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_deref() {
        Some("") => {
            let path = config::default_config_path()
                .ok_or_else(|| "could not determine home directory for config".to_string())?;
            config::load_config(&path, false)?
        }
        Some(p) => config::load_config(&config::expand_tilde(p), false)?,
        None => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
