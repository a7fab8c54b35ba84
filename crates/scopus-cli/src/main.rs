use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use scopus_core::config_file;
use scopus_core::{Config, ElsevierApi, ScopusSearch, SearchCache};

mod output;

use output::ColorMode;

/// Scopus search - query the Scopus Search API with a local result cache
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a search, using the cached result set when available
    Search {
        /// Scopus advanced-search query, e.g. "AUTHOR-NAME(Smith)"
        query: String,

        /// Ignore any cached result set and fetch again
        #[arg(long)]
        refresh: bool,

        /// Print only the EIDs, one per line
        #[arg(long)]
        ids_only: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Path to output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        #[command(flatten)]
        settings: Settings,
    },

    /// Show the cache file for a query and whether it exists
    CachePath {
        query: String,

        #[command(flatten)]
        settings: Settings,
    },

    /// Print the effective configuration
    Config {
        /// Write the given flags into the platform config file
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        settings: Settings,
    },
}

#[derive(clap::Args, Debug)]
struct Settings {
    /// Elsevier API key
    #[arg(long)]
    api_key: Option<String>,

    /// Directory holding cached search results
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Fail when a query reports more results than this
    #[arg(long)]
    max_entries: Option<usize>,
}

impl Settings {
    /// The flags that were given, as a config file overlay.
    fn to_config_file(&self) -> config_file::ConfigFile {
        config_file::ConfigFile {
            api: self.api_key.as_ref().map(|key| config_file::ApiConfig {
                api_key: Some(key.clone()),
                ..Default::default()
            }),
            cache: (self.cache_dir.is_some() || self.max_entries.is_some()).then(|| {
                config_file::CacheConfig {
                    dir: self.cache_dir.as_ref().map(|d| d.display().to_string()),
                    max_entries: self.max_entries,
                }
            }),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Search {
            query,
            refresh,
            ids_only,
            format,
            output,
            no_color,
            settings,
        } => {
            let config = resolve_config(settings);
            search(query, refresh, ids_only, format, output, no_color, config).await
        }
        Command::CachePath { query, settings } => {
            let config = resolve_config(settings);
            let cache = SearchCache::new(&config.cache_dir);
            let path = cache.path_for(&query);
            let state = if cache.contains(&query) {
                "cached"
            } else {
                "not cached"
            };
            println!("{} ({})", path.display(), state);
            Ok(())
        }
        Command::Config { save, settings } => {
            if save {
                let existing = config_file::config_path()
                    .and_then(|p| config_file::load_from_path(&p))
                    .unwrap_or_default();
                let merged = config_file::merge(existing, settings.to_config_file());
                let path = config_file::save_config(&merged).map_err(anyhow::Error::msg)?;
                println!("saved {}", path.display());
            }
            let config = resolve_config(settings);
            match config_file::config_path() {
                Some(p) => println!("config file: {}", p.display()),
                None => println!("config file: <no platform config directory>"),
            }
            println!("{:#?}", config);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "scopus_core=debug,scopus=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(settings: Settings) -> Config {
    let mut config = Config::default();
    config_file::load_config().apply(&mut config);

    if let Ok(key) = std::env::var("SCOPUS_API_KEY") {
        config.api_key = Some(key);
    }
    if let Ok(token) = std::env::var("SCOPUS_INST_TOKEN") {
        config.inst_token = Some(token);
    }
    if let Ok(dir) = std::env::var("SCOPUS_CACHE_DIR") {
        config.cache_dir = PathBuf::from(dir);
    }

    if let Some(key) = settings.api_key {
        config.api_key = Some(key);
    }
    if let Some(dir) = settings.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(max) = settings.max_entries {
        config.max_entries = max;
    }
    config
}

async fn search(
    query: String,
    refresh: bool,
    ids_only: bool,
    format: Format,
    output: Option<PathBuf>,
    no_color: bool,
    config: Config,
) -> anyhow::Result<()> {
    let cached = SearchCache::new(&config.cache_dir).contains(&query);
    if config.api_key.is_none() && (refresh || !cached) {
        anyhow::bail!(
            "No API key configured. Pass --api-key, set SCOPUS_API_KEY, or add api_key to the [api] section of {}",
            config_file::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".scopus.toml".to_string())
        );
    }

    let api = ElsevierApi::new(&config);
    let search = ScopusSearch::new(query, refresh, &api, &config)
        .await
        .context("search failed")?;
    tracing::debug!(
        documents = search.len(),
        from_cache = search.from_cache(),
        path = %search.cache_path().display(),
        "search complete"
    );

    let use_color = !no_color && output.is_none();
    let color = ColorMode(use_color);

    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(
            std::fs::File::create(output_path)
                .with_context(|| format!("creating {}", output_path.display()))?,
        )
    } else {
        Box::new(std::io::stdout())
    };

    if ids_only {
        for eid in search.identifiers() {
            writeln!(writer, "{}", eid)?;
        }
        return Ok(());
    }

    match format {
        Format::Text => output::print_summary(&mut writer, &search, color)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut writer, &search.records())?;
            writeln!(writer)?;
        }
        Format::Csv => output::write_csv(&mut writer, &search.records())?,
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_overlay_nothing() {
        let settings = Settings {
            api_key: None,
            cache_dir: None,
            max_entries: None,
        };
        assert_eq!(settings.to_config_file(), config_file::ConfigFile::default());
    }

    #[test]
    fn saved_flags_keep_existing_values() {
        let existing = config_file::ConfigFile {
            api: Some(config_file::ApiConfig {
                api_key: Some("old".into()),
                inst_token: Some("tok".into()),
                timeout_secs: None,
            }),
            cache: None,
        };
        let settings = Settings {
            api_key: Some("new".into()),
            cache_dir: None,
            max_entries: Some(100),
        };
        let merged = config_file::merge(existing, settings.to_config_file());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scopus").join("config.toml");
        config_file::save_to_path(&merged, &path).unwrap();
        let loaded = config_file::load_from_path(&path).unwrap();

        let api = loaded.api.unwrap();
        assert_eq!(api.api_key.as_deref(), Some("new"));
        assert_eq!(api.inst_token.as_deref(), Some("tok"));
        let cache = loaded.cache.unwrap();
        assert_eq!(cache.dir, None);
        assert_eq!(cache.max_entries, Some(100));
    }
}
