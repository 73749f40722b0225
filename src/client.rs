use std::sync::Arc;

use crate::{
    evaluation_client::EvaluationClient,
    horizon::{build_http_client, horizon_urls, Horizon},
    response_cache::ResponseCache,
    targeting::enrich,
    telemetry::TelemetryReporter,
    ClientConfig, Error, Evaluation, EvaluationContext, EvaluationResponse, Result,
};

/// A client for the Hyphen Toggle service.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// Every context passed to the client is scoped to the client's application and environment.
/// Contexts without a targeting key use the user id, or a random key if there is no user id
/// either. Random keys differ on every call, so anonymous contexts are never served from cache.
///
/// # Examples
/// ```no_run
/// # use hyphen_toggle::{ClientConfig, EvaluationContext};
/// let client = ClientConfig::from_public_key("public-key")
///     .application("web")
///     .environment("production")
///     .to_client()
///     .unwrap();
///
/// let context = EvaluationContext::builder().targeting_key("user-123").build();
/// let dark_mode = client
///     .get_evaluation("dark-mode", &context)
///     .ok()
///     .and_then(|evaluation| evaluation.value.as_boolean())
///     // default value
///     .unwrap_or(false);
/// ```
pub struct Client<'a> {
    application: String,
    environment: String,
    evaluation_client: EvaluationClient<'a>,
    telemetry: Option<TelemetryReporter>,
}

impl<'a> Client<'a> {
    /// Provider name reported to hosting frameworks.
    pub const PROVIDER_NAME: &'static str = "hyphen-toggle-rust";

    /// Create a new `Client` using the specified configuration.
    ///
    /// Starts the telemetry thread if toggle usage reporting is enabled.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if application or environment is missing or empty.
    /// - [`Error::InvalidHorizonUrl`] if one of horizon URLs cannot be parsed.
    /// - [`Error::HttpClient`] if the HTTP client could not be built.
    /// - [`Error::Io`] if the telemetry thread could not be started.
    pub fn new(config: ClientConfig<'a>) -> Result<Self> {
        let application = non_empty(config.application, "application is required")?;
        let environment = non_empty(config.environment, "environment is required")?;

        let urls = horizon_urls(&config.public_key, &config.horizon_urls)?;
        log::debug!(target: "hyphen",
            horizon_urls:serde = urls.iter().map(|url| url.as_str()).collect::<Vec<_>>();
            "configured horizon urls");

        let http_client = match config.http_client {
            Some(client) => client,
            None => build_http_client(config.connect_timeout, config.request_timeout)?,
        };
        let horizon = Arc::new(Horizon::new(http_client, config.public_key, urls));

        let telemetry = if config.enable_toggle_usage {
            Some(TelemetryReporter::start(
                horizon.clone(),
                application.clone(),
                environment.clone(),
                config.telemetry_queue_capacity,
            )?)
        } else {
            None
        };

        let evaluation_client = EvaluationClient::new(
            horizon,
            ResponseCache::new(config.cache_ttl, config.cache_capacity),
            config.cache_key_fn,
        );

        Ok(Client {
            application,
            environment,
            evaluation_client,
            telemetry,
        })
    }

    /// Provider name, [`Client::PROVIDER_NAME`].
    pub fn metadata_name(&self) -> &'static str {
        Self::PROVIDER_NAME
    }

    /// Application every context is scoped to.
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Environment every context is scoped to.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Evaluate all toggles for `context`.
    ///
    /// Responses are cached for the configured TTL. A cache hit makes no network request.
    ///
    /// Returns `Ok(None)` if the service responded with an empty body.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if every horizon URL failed. Holds the last URL's failure.
    /// - [`Error::Serialization`] if the context could not be encoded, or the last URL's response
    ///   could not be decoded.
    pub fn evaluate(
        &self,
        context: &EvaluationContext,
    ) -> Result<Option<Arc<EvaluationResponse>>> {
        let context = enrich(context, &self.application, &self.environment);
        self.evaluation_client.evaluate(&context)
    }

    /// Report usage of `evaluation` made for `context`.
    ///
    /// The report is delivered from a background thread. This function never blocks on network
    /// and never fails; delivery problems are logged. Does nothing if usage reporting is disabled.
    pub fn report_usage(&self, context: &EvaluationContext, evaluation: &Evaluation) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.report(context, evaluation);
        }
    }

    /// Evaluate toggle `flag_key` for `context` and report its usage.
    ///
    /// # Errors
    ///
    /// Same as [`Client::evaluate`], and additionally [`Error::EvaluationMissing`] if the response
    /// is empty, doesn't contain `flag_key`, or reports an error for it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn test(client: &hyphen_toggle::Client) {
    /// # use hyphen_toggle::EvaluationContext;
    /// let banner_title = client
    ///     .get_evaluation("banner", &EvaluationContext::builder().targeting_key("user-1").build())
    ///     .ok()
    ///     .and_then(|evaluation| evaluation.value.as_str().map(str::to_owned))
    ///     .unwrap_or_else(|| "Welcome".to_owned());
    /// # }
    /// ```
    pub fn get_evaluation(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<Evaluation> {
        let evaluation = match self.evaluate(context)? {
            Some(response) => response.require(flag_key)?.clone(),
            None => {
                return Err(Error::EvaluationMissing {
                    flag_key: flag_key.to_owned(),
                    message: None,
                })
            }
        };

        self.report_usage(context, &evaluation);

        Ok(evaluation)
    }

    /// Stop the telemetry thread and block until queued usage reports are delivered.
    ///
    /// Dropping the client also stops the telemetry thread, but does not wait for it.
    pub fn shutdown(self) -> Result<()> {
        match self.telemetry {
            Some(telemetry) => telemetry.shutdown(),
            None => Ok(()),
        }
    }
}

fn non_empty(value: Option<String>, message: &'static str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Configuration(message)),
    }
}
