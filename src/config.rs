use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    /// Port the HTTP listener binds to.
    #[clap(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL of the Hiro indexing API.
    #[clap(long, env, default_value = "https://api.hiro.so")]
    pub hiro_api_url: String,

    /// Divide base-unit counts by 10^decimals before responding. Disable to
    /// reproduce the legacy behaviour of reporting raw base units.
    #[clap(long, env, default_value_t = true, action = clap::ArgAction::Set)]
    pub scale_by_decimals: bool,

    #[clap(flatten)]
    pub log: LogConfig,
}

#[derive(clap::Parser, Clone, Debug)]
pub struct LogConfig {
    /// Tracing filter directive, e.g. "info" or "welsh_supply=debug".
    #[clap(long, env, default_value = "info")]
    pub log_level: String,
}

impl LogConfig {
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}
