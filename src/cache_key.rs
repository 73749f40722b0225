use crate::EvaluationContext;

/// Maps an enriched context to the key its evaluation response is cached under.
///
/// Implemented for any `Fn(&EvaluationContext) -> String`, so a closure can be passed to
/// [`ClientConfig::cache_key_fn`](crate::ClientConfig::cache_key_fn).
///
/// ```
/// # use hyphen_toggle::{ClientConfig, EvaluationContext};
/// let config = ClientConfig::from_public_key("public-key")
///     .cache_key_fn(|context: &EvaluationContext| {
///         context.targeting_key().unwrap_or_default().to_owned()
///     });
/// ```
pub trait CacheKeyFn {
    /// Compute cache key for `context`. Equal contexts must produce equal keys.
    fn cache_key(&self, context: &EvaluationContext) -> String;
}

impl<T: Fn(&EvaluationContext) -> String> CacheKeyFn for T {
    fn cache_key(&self, context: &EvaluationContext) -> String {
        self(context)
    }
}

/// Default cache key: the JSON serialization of the context.
///
/// Context fields and attribute maps serialize in a stable order, so equal contexts always produce
/// equal keys. If serialization fails, the `Debug` rendering of the context is used instead, which
/// may make distinct contexts share a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializedCacheKey;

impl CacheKeyFn for SerializedCacheKey {
    fn cache_key(&self, context: &EvaluationContext) -> String {
        match serde_json::to_string(context) {
            Ok(key) => key,
            Err(err) => {
                log::warn!(target: "hyphen", "failed to serialize context for cache key, using debug representation: {err}");
                format!("{context:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheKeyFn, SerializedCacheKey};
    use crate::{targeting::enrich, EvaluationContext, User};

    fn context() -> EvaluationContext {
        EvaluationContext::builder()
            .targeting_key("user-1")
            .user(User::with_id("user-1"))
            .custom_attribute("plan", "pro")
            .custom_attribute("age", 30.0)
            .build()
    }

    #[test]
    fn default_key_is_deterministic() {
        let first = SerializedCacheKey.cache_key(&enrich(&context(), "web", "production"));
        let second = SerializedCacheKey.cache_key(&enrich(&context(), "web", "production"));

        assert_eq!(first, second);
    }

    #[test]
    fn default_key_distinguishes_contexts() {
        let other = context().to_builder().custom_attribute("plan", "free").build();

        assert_ne!(
            SerializedCacheKey.cache_key(&context()),
            SerializedCacheKey.cache_key(&other)
        );
    }

    #[test]
    fn closures_are_cache_key_functions() {
        let by_targeting_key =
            |context: &EvaluationContext| context.targeting_key().unwrap_or_default().to_owned();

        assert_eq!(by_targeting_key.cache_key(&context()), "user-1");
    }
}
