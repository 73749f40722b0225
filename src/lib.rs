//! The Rust client for Hyphen Toggle, a remotely-configured feature toggle service.
//!
//! # Overview
//!
//! The client revolves around a [`Client`] that evaluates toggles for an [`EvaluationContext`]:
//! a targeting key, an optional user, an IP address and custom attributes. Evaluation happens on
//! the toggle service. The client sends the context and receives an [`EvaluationResponse`]
//! holding an [`Evaluation`] for every toggle.
//!
//! Every context is scoped to the application and environment the client is configured with. If a
//! context has no targeting key, the user id is used. Contexts with neither get a random targeting
//! key on every call, so their evaluations are not cached and are not bucketed consistently.
//! Provide a targeting key or a user id whenever possible.
//!
//! ```no_run
//! # use hyphen_toggle::{ClientConfig, EvaluationContext, User};
//! let client = ClientConfig::from_public_key("public_YWNtZTpyZXN0")
//!     .application("web")
//!     .environment("production")
//!     .to_client()
//!     .unwrap();
//!
//! let context = EvaluationContext::builder()
//!     .user(User::with_id("user-123"))
//!     .custom_attribute("plan", "pro")
//!     .build();
//!
//! let dark_mode = client
//!     .get_evaluation("dark-mode", &context)
//!     .ok()
//!     .and_then(|evaluation| evaluation.value.as_boolean())
//!     .unwrap_or(false);
//! ```
//!
//! # Horizon URLs
//!
//! Requests go to the horizon URLs configured with [`ClientConfig::horizon_urls`], in order,
//! followed by a default URL derived from the public key (see [`default_horizon_url`]). The first
//! URL that responds successfully wins. There are no retries beyond that list.
//!
//! # Caching
//!
//! Successful responses are cached in memory for [`ClientConfig::DEFAULT_CACHE_TTL`] (configurable)
//! under a key computed from the enriched context. The key function can be replaced with
//! [`ClientConfig::cache_key_fn`]. The cache holds at most
//! [`ClientConfig::DEFAULT_CACHE_CAPACITY`] responses unless [`ClientConfig::cache_capacity`] says
//! otherwise.
//!
//! # Usage reporting
//!
//! [`Client::get_evaluation`] reports toggle usage to the service. Reports are sent from a
//! background thread and never delay or fail evaluation. Reporting can be turned off with
//! [`ClientConfig::enable_toggle_usage`].
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! In production, it is recommended to fall back to a default value on any error, as toggle
//! evaluation should not be critical enough to cause system crashes. However, the returned errors
//! are valuable for debugging.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `hyphen` target. Consider integrating a `log`-compatible logger implementation for better
//! visibility into client operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod cache_key;
mod client;
mod config;
mod context;
mod error;
mod evaluation;
mod evaluation_client;
mod horizon;
mod response_cache;
mod targeting;
mod telemetry;

pub use cache_key::{CacheKeyFn, SerializedCacheKey};
pub use client::Client;
pub use config::ClientConfig;
pub use context::{AttributeValue, Attributes, ContextBuilder, EvaluationContext, User};
pub use error::{Error, Result};
pub use evaluation::{Evaluation, EvaluationResponse, EvaluationValue, ValueType};
pub use horizon::{default_horizon_url, DEFAULT_SERVICE_HOST};
pub use response_cache::ResponseCache;
pub use targeting::{derive_targeting_key, enrich};
pub use telemetry::{TelemetryData, TelemetryPayload};
