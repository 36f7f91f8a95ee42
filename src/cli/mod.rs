//! CLI mode for precache - warm a store and resolve requests from it.

mod progress;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    AppConfig, CacheManager, CacheStore, DiskStore, Error, FetchPolicy, HttpFetcher, MemoryStore,
    PrecacheProgress, ServeSource, UrlList, cache_key,
};

use progress::{BarProgress, print_summary, print_url_list};

/// Subcommand selected on the command line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Precache the configured URL list into the store.
    Warm,
    /// Resolve a single request through the cache policy.
    Get { url: String },
}

/// Parsed command line.
#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    list_path: Option<PathBuf>,
    origin: Option<String>,
    store_dir: Option<PathBuf>,
    memory: bool,
    policy: Option<FetchPolicy>,
    offline_url: Option<String>,
    output: Option<PathBuf>,
    positionals: Vec<String>,
}

/// Reads a flag's value, erroring when it is missing.
fn flag_value(args: &[String], i: &mut usize, flag: &str) -> crate::Result<String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| Error::Config(format!("{flag} requires a value")))
}

fn parse_args(args: &[String]) -> crate::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => parsed.config_path = Some(flag_value(args, &mut i, "--config")?.into()),
            "--list" => parsed.list_path = Some(flag_value(args, &mut i, "--list")?.into()),
            "--origin" => parsed.origin = Some(flag_value(args, &mut i, "--origin")?),
            "--store-dir" => {
                parsed.store_dir = Some(flag_value(args, &mut i, "--store-dir")?.into());
            }
            "--memory" => parsed.memory = true,
            "--policy" => parsed.policy = Some(flag_value(args, &mut i, "--policy")?.parse()?),
            "--offline" => parsed.offline_url = Some(flag_value(args, &mut i, "--offline")?),
            "-o" | "--output" => parsed.output = Some(flag_value(args, &mut i, "--output")?.into()),
            flag if flag.starts_with('-') => {
                return Err(Error::Config(format!("unknown flag: {flag}")));
            }
            positional => parsed.positionals.push(positional.to_string()),
        }
        i += 1;
    }
    Ok(parsed)
}

impl CliArgs {
    fn command(&self) -> crate::Result<Command> {
        match self.positionals.first().map(String::as_str) {
            Some("warm") => Ok(Command::Warm),
            Some("get") => {
                let url = self
                    .positionals
                    .get(1)
                    .cloned()
                    .ok_or_else(|| Error::Config("get requires a URL".to_string()))?;
                Ok(Command::Get { url })
            }
            Some(other) => Err(Error::Config(format!("unknown command: {other}"))),
            None => Err(Error::Config("no command given".to_string())),
        }
    }

    /// Loads the app config and layers command-line overrides on top.
    fn effective_config(&self) -> crate::Result<AppConfig> {
        let mut config = match &self.config_path {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load()?,
        };
        if let Some(origin) = &self.origin {
            config.cache.origin.clone_from(origin);
        }
        if let Some(policy) = self.policy {
            config.cache.policy = policy;
        }
        if let Some(offline) = &self.offline_url {
            config.cache.offline_url.clone_from(offline);
        }
        if let Some(dir) = &self.store_dir {
            config.paths.store_dir.clone_from(dir);
        }
        Ok(config)
    }

    /// Builds the URL list from `--list` or the config file.
    fn url_list(&self, config: &AppConfig) -> crate::Result<UrlList> {
        match &self.list_path {
            Some(path) => UrlList::load(path),
            None => UrlList::from_entries(&config.urls),
        }
    }
}

/// Runs the CLI with arguments from the process environment.
///
/// # Errors
///
/// Returns an error on bad arguments, unreadable configuration, a failed
/// install, or an unservable request.
pub async fn run() -> crate::Result<()> {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = parse_args(&args)?;
    let command = parsed.command()?;
    let config = parsed.effective_config()?;
    let urls = parsed.url_list(&config)?;
    let fetcher = HttpFetcher::new(&config.cache.origin)?;

    if parsed.memory {
        let store = MemoryStore::new(&config.cache.cache_name);
        let manager = CacheManager::with_parts(config.cache, urls, store, fetcher);
        dispatch(&manager, command, parsed.output.as_deref()).await
    } else {
        let store = DiskStore::open(&config.paths.store_dir, &config.cache.cache_name).await?;
        let manager = CacheManager::with_parts(config.cache, urls, store, fetcher);
        dispatch(&manager, command, parsed.output.as_deref()).await
    }
}

async fn dispatch<S: CacheStore>(
    manager: &CacheManager<S, HttpFetcher>,
    command: Command,
    output: Option<&std::path::Path>,
) -> crate::Result<()> {
    match command {
        Command::Warm => run_warm(manager).await,
        Command::Get { url } => run_get(manager, &url, output).await,
    }
}

/// Precaches the configured URL list with progress reporting.
async fn run_warm<S: CacheStore>(manager: &CacheManager<S, HttpFetcher>) -> crate::Result<()> {
    let urls = manager.urls();
    if urls.is_empty() && !manager.config().precache_offline {
        println!("Nothing to precache: URL list is empty.");
        return Ok(());
    }

    let offline_extra =
        manager.config().precache_offline && !urls.contains(&manager.config().offline_url);
    print_url_list(urls, offline_extra);

    let total = urls.len() + usize::from(offline_extra);
    let bar = Arc::new(BarProgress::new(total));
    let progress: Arc<dyn PrecacheProgress> = bar.clone();

    let result = manager.install(&progress).await;
    bar.finish();

    match result {
        Ok(stats) => {
            print_summary(manager.store().name(), &stats);
            Ok(())
        }
        Err(e) => {
            eprintln!("Precache aborted: {e}");
            Err(e)
        }
    }
}

/// Resolves one request and reports where the response came from.
async fn run_get<S: CacheStore>(
    manager: &CacheManager<S, HttpFetcher>,
    url: &str,
    output: Option<&std::path::Path>,
) -> crate::Result<()> {
    let served = manager.resolve(url).await?;

    let source = match served.source {
        ServeSource::Cache => "cache",
        ServeSource::Network => "network",
        ServeSource::OfflineFallback => "offline fallback",
    };
    eprintln!(
        "{} -> {} ({}, {} bytes)",
        cache_key(url),
        served.response.status(),
        source,
        served.response.body_len()
    );

    match output {
        Some(path) => std::fs::write(path, served.response.body())?,
        None => std::io::stdout().write_all(served.response.body())?,
    }
    Ok(())
}
