//! The `solorag` application: logging setup and command dispatch.

use std::sync::Arc;

use solorag_core::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::SoloragConfig;
use crate::{config_handlers, handlers};

/// Loaded configuration plus the dispatch logic for every command.
pub struct SoloragCli {
    config: Arc<SoloragConfig>,
    version: String,
}

impl SoloragCli {
    /// Create from CLI args, loading config from file and environment.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = SoloragConfig::load(args.config.as_deref())?;
        Ok(Self::new(config))
    }

    /// Create from an already-loaded config.
    pub fn new(config: SoloragConfig) -> Self {
        Self {
            config: Arc::new(config),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &SoloragConfig {
        &self.config
    }

    /// Choose the log filter.
    ///
    /// `RUST_LOG` wins when set; otherwise `quiet` and `verbose` pick
    /// `warn` and `debug`, defaulting to `info`.
    pub fn log_filter(verbose: bool, quiet: bool) -> EnvFilter {
        if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    }

    /// Initialise tracing to stderr, as JSON lines when `logging.json` is set.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = Self::log_filter(verbose, quiet);
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        // A subscriber may already be installed, e.g. by a test harness.
        let _ = if self.config.logging.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
    }

    /// Initialise plain stderr logging before any config is loaded.
    ///
    /// Lets a config load failure be logged; a later [`Self::init_logging`]
    /// call leaves this subscriber in place.
    pub fn init_default_logging(verbose: bool, quiet: bool) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(Self::log_filter(verbose, quiet))
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load config from `args` and run its command.
    ///
    /// Logging is initialised on both paths, so the caller can report the
    /// returned error through `tracing`.
    pub async fn execute(args: CliArgs) -> Result<()> {
        match Self::from_args(&args) {
            Ok(cli) => cli.run(args).await,
            Err(e) => {
                Self::init_default_logging(args.verbose, args.quiet);
                Err(e)
            }
        }
    }

    /// Run the command in `args`.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);
        let config = &*self.config;

        match args.command {
            Some(Command::Ask {
                question,
                stream,
                json,
            }) => {
                let service = handlers::build_service(config)?;
                if stream {
                    handlers::handle_ask_stream(&service, &question).await
                } else {
                    handlers::handle_ask(&service, &question, json).await
                }
            }
            Some(Command::Index { input, output }) => {
                handlers::handle_index(config, &input, output.as_deref()).await
            }
            Some(Command::Eval { dev_set, json }) => {
                let service = handlers::build_service(config)?;
                handlers::handle_eval(&service, &dev_set, json).await
            }
            Some(Command::Health) => handlers::handle_health(config).await,
            Some(Command::Version) => {
                println!("solorag {}", self.version);
                Ok(())
            }
            Some(Command::Config(cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), cmd.command)
            }
            None => {
                println!("solorag {}: use --help for usage", self.version);
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
