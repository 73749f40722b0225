//! An HTTP client that POSTs JSON payloads to horizon URLs, falling back to the next URL on
//! failure.
use std::{sync::LazyLock, time::Duration};

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Url};
use serde::{de::DeserializeOwned, Serialize};

use crate::{Error, Result};

/// Host of the toggle service used when no organization id can be derived from the public key.
pub const DEFAULT_SERVICE_HOST: &str = "toggle.hyphen.cloud";

pub(crate) const EVALUATE_ENDPOINT: &str = "/toggle/evaluate";
pub(crate) const TELEMETRY_ENDPOINT: &str = "/toggle/telemetry";

const PUBLIC_KEY_PREFIX: &str = "public_";

static ORG_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9_-]+$").expect("org id pattern is valid"));

/// Standard alphabet, padding optional.
const PUBLIC_KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Compute the default horizon URL for `public_key`.
///
/// A public key is `"public_"` followed by base64 of `"{org_id}:..."`. If an organization id can
/// be extracted, the URL is `https://{org_id}.toggle.hyphen.cloud`. Otherwise (including any
/// decoding failure) it's `https://toggle.hyphen.cloud`.
///
/// ```
/// # use hyphen_toggle::default_horizon_url;
/// // "YWNtZTpyZXN0" is base64 of "acme:rest"
/// assert_eq!(default_horizon_url("public_YWNtZTpyZXN0"), "https://acme.toggle.hyphen.cloud");
/// assert_eq!(default_horizon_url("garbage!"), "https://toggle.hyphen.cloud");
/// ```
pub fn default_horizon_url(public_key: &str) -> String {
    match org_id_from_public_key(public_key) {
        Some(org_id) => format!("https://{org_id}.{DEFAULT_SERVICE_HOST}"),
        None => format!("https://{DEFAULT_SERVICE_HOST}"),
    }
}

fn org_id_from_public_key(public_key: &str) -> Option<String> {
    let encoded = public_key
        .strip_prefix(PUBLIC_KEY_PREFIX)
        .unwrap_or(public_key);
    let decoded = PUBLIC_KEY_ENGINE.decode(encoded).ok()?;
    let decoded = String::from_utf8_lossy(&decoded);
    let org_id = decoded.split(':').next()?;

    ORG_ID_REGEX
        .is_match(org_id)
        .then(|| org_id.to_owned())
}

/// Build the ordered list of base URLs: operator-supplied URLs in the given order, followed by the
/// default URL derived from `public_key`.
pub(crate) fn horizon_urls(public_key: &str, operator_urls: &[String]) -> Result<Vec<Url>> {
    operator_urls
        .iter()
        .cloned()
        .chain(std::iter::once(default_horizon_url(public_key)))
        .map(|url| {
            Url::parse(&url).map_err(|source| Error::InvalidHorizonUrl { url, source })
        })
        .collect()
}

/// Join `base` and `path` with exactly one slash between them.
fn endpoint_url(base: &Url, path: &str) -> Result<Url> {
    let url = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&url).map_err(|source| Error::InvalidHorizonUrl { url, source })
}

/// Build the HTTP client shared by evaluation and telemetry requests.
pub(crate) fn build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .user_agent(concat!("hyphen-toggle-rust/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| Error::HttpClient(std::sync::Arc::new(err)))
}

/// Sends requests to the toggle service.
pub(crate) struct Horizon {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    public_key: String,
    urls: Vec<Url>,
}

impl Horizon {
    pub fn new(client: reqwest::blocking::Client, public_key: String, urls: Vec<Url>) -> Horizon {
        Horizon {
            client,
            public_key,
            urls,
        }
    }

    /// POST `payload` as JSON to `path` of each horizon URL in order until one succeeds.
    ///
    /// A URL fails on connection error, timeout, non-2xx status or an undecodable body. Returns
    /// `Ok(None)` if the successful response has an empty body. If every URL fails, returns the
    /// error of the last one.
    pub fn post<T, R>(&self, path: &str, payload: &T) -> Result<Option<R>>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(payload)?;

        let mut last_error = None;
        for base_url in &self.urls {
            match self.post_to(base_url, path, &body) {
                Ok(response) => return Ok(response),
                Err(err) => {
                    log::debug!(target: "hyphen", url = base_url.as_str(), path; "horizon request failed: {err}");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(Error::Configuration("no horizon urls configured")))
    }

    fn post_to<R: DeserializeOwned>(
        &self,
        base_url: &Url,
        path: &str,
        body: &[u8],
    ) -> Result<Option<R>> {
        let url = endpoint_url(base_url, path)?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.public_key)
            .body(body.to_vec())
            .send()?
            .error_for_status()?;

        let body = response.bytes()?;
        if body.is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&body)?))
    }
}
