use anyhow::{Context, Result};
use famcal_auth::{GoogleAuth, TokenStore};
use famcal_calendar::GoogleCalendarClient;
use famcal_core::Config;
use famcal_feeds::HttpFeedFetcher;
use famcal_sync::SyncWindow;

/// Long-lived process state shared by the CLI commands and the HTTP server.
pub struct App {
    config: Config,
    http: reqwest::Client,
    auth: GoogleAuth,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_token_store(config, TokenStore::default_location()?)
    }

    pub fn with_token_store(config: Config, store: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http.timeout())
            .user_agent(config.http.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;
        let auth = GoogleAuth::from_config(&config.google, http.clone(), store);

        Ok(Self { config, http, auth })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Calendar client with a current access token.
    ///
    /// Build one per command or request so long-running servers pick up refreshed
    /// tokens.
    pub async fn calendar(&self) -> Result<GoogleCalendarClient> {
        let token = self
            .auth
            .access_token()
            .await
            .context("Failed to obtain Google access token")?;

        Ok(GoogleCalendarClient::with_client(
            self.http.clone(),
            &token,
            &self.config.google.api_base_url,
        ))
    }

    pub fn fetcher(&self) -> HttpFeedFetcher {
        HttpFeedFetcher::new(self.http.clone())
    }

    /// Import window starting now.
    pub fn window(&self) -> SyncWindow {
        SyncWindow::upcoming(self.config.sync.window_months)
    }
}
