use std::sync::Arc;

use crate::{
    cache_key::CacheKeyFn,
    horizon::{Horizon, EVALUATE_ENDPOINT},
    response_cache::ResponseCache,
    EvaluationContext, EvaluationResponse, Result,
};

/// Fetches evaluation responses from the toggle service, caching successful responses.
pub(crate) struct EvaluationClient<'a> {
    horizon: Arc<Horizon>,
    cache: ResponseCache,
    cache_key_fn: Box<dyn CacheKeyFn + Send + Sync + 'a>,
}

impl<'a> EvaluationClient<'a> {
    pub fn new(
        horizon: Arc<Horizon>,
        cache: ResponseCache,
        cache_key_fn: Box<dyn CacheKeyFn + Send + Sync + 'a>,
    ) -> Self {
        EvaluationClient {
            horizon,
            cache,
            cache_key_fn,
        }
    }

    /// Evaluate all toggles for an already-enriched `context`.
    ///
    /// Returns a cached response if one is fresh. Otherwise requests the toggle service and
    /// caches the response. Returns `Ok(None)` if the service responded with an empty body; that
    /// outcome is not cached.
    pub fn evaluate(
        &self,
        context: &EvaluationContext,
    ) -> Result<Option<Arc<EvaluationResponse>>> {
        let cache_key = self.cache_key_fn.cache_key(context);

        if let Some(response) = self.cache.get(&cache_key) {
            log::trace!(target: "hyphen", targeting_key = context.targeting_key(); "evaluation cache hit");
            return Ok(Some(response));
        }

        log::debug!(target: "hyphen", targeting_key = context.targeting_key(); "fetching evaluation");
        let response = self
            .horizon
            .post::<_, EvaluationResponse>(EVALUATE_ENDPOINT, context)
            .inspect_err(|err| {
                log::warn!(target: "hyphen",
                    targeting_key = context.targeting_key();
                    "error occurred while evaluating toggles: {err}");
            })?;

        let Some(response) = response else {
            log::debug!(target: "hyphen", "toggle service returned an empty evaluation response");
            return Ok(None);
        };

        let response = Arc::new(response);
        self.cache.put(cache_key, response.clone());

        log::trace!(target: "hyphen",
            toggles:serde = response.toggles.keys().collect::<Vec<_>>();
            "evaluated toggles");

        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use httpmock::prelude::*;
    use serde_json::json;

    use super::EvaluationClient;
    use crate::{
        cache_key::{CacheKeyFn, SerializedCacheKey},
        horizon::{build_http_client, Horizon},
        response_cache::ResponseCache,
        Error, EvaluationContext,
    };

    fn client<'a>(
        urls: &[String],
        ttl: Duration,
        cache_key_fn: impl CacheKeyFn + Send + Sync + 'a,
    ) -> EvaluationClient<'a> {
        let horizon = Horizon::new(
            build_http_client(Duration::from_secs(2), Duration::from_secs(2)).unwrap(),
            "test-key".to_owned(),
            urls.iter().map(|url| url.parse().unwrap()).collect(),
        );
        EvaluationClient::new(
            Arc::new(horizon),
            ResponseCache::new(ttl, 1000),
            Box::new(cache_key_fn),
        )
    }

    fn context(targeting_key: &str) -> EvaluationContext {
        EvaluationContext::builder()
            .targeting_key(targeting_key)
            .application("web")
            .environment("production")
            .build()
    }

    fn toggles_body() -> serde_json::Value {
        json!({
            "toggles": {
                "dark-mode": {
                    "key": "dark-mode",
                    "value": true,
                    "type": "boolean",
                    "reason": "TARGETING_MATCH",
                }
            }
        })
    }

    #[test]
    fn cache_hit_skips_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(200).json_body(toggles_body());
        });
        let client = client(&[server.base_url()], Duration::from_secs(30), SerializedCacheKey);

        let first = client.evaluate(&context("user-1")).unwrap().unwrap();
        let second = client.evaluate(&context("user-1")).unwrap().unwrap();

        mock.assert_hits(1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.get("dark-mode").unwrap().value.as_boolean(),
            Some(true)
        );
    }

    #[test]
    fn different_contexts_are_cached_separately() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(200).json_body(toggles_body());
        });
        let client = client(&[server.base_url()], Duration::from_secs(30), SerializedCacheKey);

        client.evaluate(&context("user-1")).unwrap();
        client.evaluate(&context("user-2")).unwrap();

        mock.assert_hits(2);
    }

    #[test]
    fn expired_entry_triggers_new_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(200).json_body(toggles_body());
        });
        let client = client(&[server.base_url()], Duration::ZERO, SerializedCacheKey);

        client.evaluate(&context("user-1")).unwrap();
        client.evaluate(&context("user-1")).unwrap();

        mock.assert_hits(2);
    }

    #[test]
    fn empty_body_is_not_cached() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(200);
        });
        let client = client(&[server.base_url()], Duration::from_secs(30), SerializedCacheKey);

        assert_eq!(client.evaluate(&context("user-1")).unwrap(), None);
        assert_eq!(client.evaluate(&context("user-1")).unwrap(), None);

        mock.assert_hits(2);
    }

    #[test]
    fn failure_is_not_cached() {
        let server = MockServer::start();
        let mut failing = server.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(502);
        });
        let client = client(&[server.base_url()], Duration::from_secs(30), SerializedCacheKey);

        let err = client.evaluate(&context("user-1")).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        failing.assert_hits(1);
        failing.delete();

        let healthy = server.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(200).json_body(toggles_body());
        });

        assert!(client.evaluate(&context("user-1")).unwrap().is_some());
        healthy.assert_hits(1);
    }

    #[test]
    fn fallback_result_is_cached() {
        let failing = MockServer::start();
        let failing_mock = failing.mock(|when, then| {
            when.method(POST);
            then.status(500);
        });
        let healthy = MockServer::start();
        let healthy_mock = healthy.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(200).json_body(toggles_body());
        });
        let client = client(
            &[failing.base_url(), healthy.base_url()],
            Duration::from_secs(30),
            SerializedCacheKey,
        );

        client.evaluate(&context("user-1")).unwrap();
        client.evaluate(&context("user-1")).unwrap();

        failing_mock.assert_hits(1);
        healthy_mock.assert_hits(1);
    }

    #[test]
    fn custom_cache_key_fn_is_used() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/toggle/evaluate");
            then.status(200).json_body(toggles_body());
        });
        let client = client(
            &[server.base_url()],
            Duration::from_secs(30),
            |_: &EvaluationContext| "everyone".to_owned(),
        );

        client.evaluate(&context("user-1")).unwrap();
        client.evaluate(&context("user-2")).unwrap();

        mock.assert_hits(1);
    }
}
