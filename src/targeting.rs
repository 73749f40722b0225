//! Context enrichment and targeting key derivation.
use rand::{thread_rng, Rng};

use crate::EvaluationContext;

/// Upper bound (exclusive) of the random suffix of a synthesized targeting key.
const SYNTHETIC_SUFFIX_RANGE: u32 = 1 << 24;

/// Enrich `context` with provider-level application and environment, and make sure it has a
/// targeting key.
///
/// The input context is never modified. Application and environment are not caller-controlled:
/// whatever the caller put there is replaced.
///
/// If the context has no targeting key, see [`derive_targeting_key`].
pub fn enrich(
    context: &EvaluationContext,
    application: &str,
    environment: &str,
) -> EvaluationContext {
    let targeting_key = derive_targeting_key(context, application, environment);

    context
        .to_builder()
        .application(application)
        .environment(environment)
        .targeting_key(targeting_key)
        .build()
}

/// Pick a targeting key for `context`.
///
/// Preference order: the context's own targeting key, the user id, and finally a synthesized
/// `"{application}-{environment}-{random hex}"` key.
///
/// The synthesized key is different on every call. Anonymous contexts therefore never hit the
/// response cache and get no consistent bucketing across calls; callers that care must provide a
/// targeting key or a user id.
pub fn derive_targeting_key(
    context: &EvaluationContext,
    application: &str,
    environment: &str,
) -> String {
    if let Some(targeting_key) = context.targeting_key() {
        return targeting_key.to_owned();
    }

    if let Some(user_id) = context.user().and_then(|user| user.id.as_deref()) {
        return user_id.to_owned();
    }

    let suffix = thread_rng().gen_range(0..SYNTHETIC_SUFFIX_RANGE);
    let targeting_key = format!("{application}-{environment}-{suffix:x}");
    log::trace!(target: "hyphen", targeting_key = targeting_key.as_str(); "synthesized targeting key for anonymous context");
    targeting_key
}
