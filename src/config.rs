use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use dotenv::dotenv;
use env_logger::TimestampPrecision;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Parser)]
pub struct Config {
    /// Your `session` cookie
    #[clap(env = "SESSION")]
    session: String,
    /// Base URL of the dashboard server
    #[arg(short, long, default_value = "http://localhost:3000/")]
    server: Url,
    /// WebSocket URL of the live update broker
    #[arg(short, long)]
    live: Option<Url>,
    /// How many feed pages to fetch
    #[arg(short, long, default_value = "1")]
    pages: u32,
    /// Compose a post with this text
    #[arg(short, long)]
    message: Option<String>,
    /// Attach an image to the composed post
    #[arg(short, long)]
    image: Option<PathBuf>,
    /// Keep running and print live feed updates
    #[arg(short, long)]
    follow: bool,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Config {
    pub fn parse() -> Self {
        dotenv().ok();
        <Self as Parser>::parse()
    }

    pub fn init_logger(&self) {
        let verbose = self
            .verbose
            .log_level()
            .map_or(false, |level| level > log::Level::Info);

        env_logger::Builder::new()
            .format_timestamp(if verbose {
                Some(TimestampPrecision::Millis)
            } else {
                None
            })
            .format_target(verbose)
            .filter_level(self.verbose.log_level_filter())
            .init();
    }

    pub fn session(&self) -> String {
        if self.session.starts_with("session=") {
            self.session.clone()
        } else {
            format!("session={}", self.session)
        }
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn live(&self) -> Option<&Url> {
        self.live.as_ref()
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn follow(&self) -> bool {
        self.follow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Config {
        <Config as Parser>::try_parse_from(args).unwrap()
    }

    #[test]
    fn session_gains_cookie_prefix() {
        {
            let config = config(&["dashboard-client", "abc123"]);
            assert_eq!(config.session(), "session=abc123");
        }
        {
            let config = config(&["dashboard-client", "session=abc123"]);
            assert_eq!(config.session(), "session=abc123");
        }
    }

    #[test]
    fn defaults() {
        let config = config(&["dashboard-client", "abc123"]);
        assert_eq!(config.server().as_str(), "http://localhost:3000/");
        assert_eq!(config.pages(), 1);
        assert!(!config.follow());
        assert!(config.live().is_none());
    }
}
