//! Evaluation context sent to the toggle service.
use std::collections::BTreeMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// Custom attributes attached to a context or a user.
///
/// `BTreeMap` keeps keys sorted, so the serialized form of a context does not depend on insertion
/// order.
///
/// # Examples
/// ```
/// # use hyphen_toggle::{Attributes, AttributeValue};
/// let attributes = [
///     ("age".to_owned(), 30.0.into()),
///     ("is_premium_member".to_owned(), true.into()),
///     ("plan".to_owned(), "pro".into()),
/// ].into_iter().collect::<Attributes>();
/// ```
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A value of a custom attribute.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`, and `bool` types.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A null value or absence of value.
    Null,
}

impl AttributeValue {
    /// Returns the string value, if this is a string attribute.
    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// Convert a scalar JSON value. Arrays and objects have no attribute representation.
    fn from_json(value: &serde_json::Value) -> Option<AttributeValue> {
        match value {
            serde_json::Value::String(s) => Some(AttributeValue::String(s.clone())),
            serde_json::Value::Number(n) => n.as_f64().map(AttributeValue::Number),
            serde_json::Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
            serde_json::Value::Null => Some(AttributeValue::Null),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// A user the toggle is evaluated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier. Used as a targeting key when the context has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// User email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// User-level custom attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_attributes: Attributes,
}

impl User {
    /// Create a user with the given id.
    pub fn with_id(id: impl Into<String>) -> User {
        User {
            id: Some(id.into()),
            ..User::default()
        }
    }
}

/// Request-specific data the toggle service evaluates toggles against.
///
/// Contexts are immutable once built. Use [`ContextBuilder`] to construct one, or
/// [`EvaluationContext::to_builder`] to derive a modified copy.
///
/// ```
/// # use hyphen_toggle::{EvaluationContext, User};
/// let context = EvaluationContext::builder()
///     .targeting_key("user-123")
///     .ip_address("203.0.113.7")
///     .user(User::with_id("user-123"))
///     .custom_attribute("plan", "pro")
///     .build();
/// assert_eq!(context.targeting_key(), Some("user-123"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    targeting_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    custom_attributes: Attributes,
}

impl EvaluationContext {
    /// Start building a new context.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Create a builder pre-populated with a copy of this context.
    pub fn to_builder(&self) -> ContextBuilder {
        ContextBuilder {
            context: self.clone(),
        }
    }

    /// Normalize a loosely-typed attribute structure into a context.
    ///
    /// Recognized keys are `application`, `environment`, `ipAddress`, `user` (with `id`, `email`,
    /// `name` and `customAttributes`) and `customAttributes`. Any other scalar entry becomes a
    /// top-level custom attribute. Values of the wrong shape are skipped.
    ///
    /// ```
    /// # use hyphen_toggle::{AttributeValue, EvaluationContext};
    /// let context = EvaluationContext::from_attributes(
    ///     Some("user-123"),
    ///     &serde_json::json!({
    ///         "ipAddress": "203.0.113.7",
    ///         "user": { "id": "user-123", "email": "jane@example.com" },
    ///         "plan": "pro",
    ///     }),
    /// );
    /// assert_eq!(context.ip_address(), Some("203.0.113.7"));
    /// assert_eq!(context.custom_attributes()["plan"], AttributeValue::from("pro"));
    /// ```
    pub fn from_attributes(
        targeting_key: Option<&str>,
        attributes: &serde_json::Value,
    ) -> EvaluationContext {
        let mut builder = EvaluationContext::builder();
        if let Some(key) = targeting_key {
            builder = builder.targeting_key(key);
        }

        let Some(attributes) = attributes.as_object() else {
            return builder.build();
        };

        for (name, value) in attributes {
            match name.as_str() {
                "application" => {
                    if let Some(application) = value.as_str() {
                        builder = builder.application(application);
                    }
                }
                "environment" => {
                    if let Some(environment) = value.as_str() {
                        builder = builder.environment(environment);
                    }
                }
                "ipAddress" => {
                    if let Some(ip_address) = value.as_str() {
                        builder = builder.ip_address(ip_address);
                    }
                }
                "user" => {
                    if let Some(user) = value.as_object() {
                        builder = builder.user(user_from_json(user));
                    }
                }
                "customAttributes" => {
                    if let Some(custom) = value.as_object() {
                        builder = builder.custom_attributes(attributes_from_json(custom));
                    }
                }
                _ => match AttributeValue::from_json(value) {
                    Some(value) => builder = builder.custom_attribute(name.as_str(), value),
                    None => {
                        log::debug!(target: "hyphen", attribute = name.as_str(); "skipping non-scalar context attribute");
                    }
                },
            }
        }

        builder.build()
    }

    /// Key used by the toggle service for consistent bucketing.
    pub fn targeting_key(&self) -> Option<&str> {
        self.targeting_key.as_deref()
    }

    /// Application the context is evaluated in.
    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    /// Environment the context is evaluated in.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// IP address of the request, if known.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// User the toggle is evaluated for.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Top-level custom attributes.
    pub fn custom_attributes(&self) -> &Attributes {
        &self.custom_attributes
    }

    /// Serialize the context into its wire JSON form.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Builder for [`EvaluationContext`].
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    context: EvaluationContext,
}

impl ContextBuilder {
    /// Create an empty builder.
    pub fn new() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Set targeting key.
    pub fn targeting_key(mut self, targeting_key: impl Into<String>) -> Self {
        self.context.targeting_key = Some(targeting_key.into());
        self
    }

    /// Set application. Note that the client overrides it with its own application.
    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.context.application = Some(application.into());
        self
    }

    /// Set environment. Note that the client overrides it with its own environment.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.context.environment = Some(environment.into());
        self
    }

    /// Set IP address of the request.
    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.context.ip_address = Some(ip_address.into());
        self
    }

    /// Set user.
    pub fn user(mut self, user: User) -> Self {
        self.context.user = Some(user);
        self
    }

    /// Add a single custom attribute, replacing any previous value under the same name.
    pub fn custom_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.context
            .custom_attributes
            .insert(name.into(), value.into());
        self
    }

    /// Merge custom attributes into the context.
    pub fn custom_attributes(mut self, attributes: Attributes) -> Self {
        self.context.custom_attributes.extend(attributes);
        self
    }

    /// Finish building.
    pub fn build(self) -> EvaluationContext {
        self.context
    }
}

fn user_from_json(user: &serde_json::Map<String, serde_json::Value>) -> User {
    let string_field = |name: &str| user.get(name).and_then(|v| v.as_str()).map(str::to_owned);
    User {
        id: string_field("id"),
        email: string_field("email"),
        name: string_field("name"),
        custom_attributes: user
            .get("customAttributes")
            .and_then(|v| v.as_object())
            .map(attributes_from_json)
            .unwrap_or_default(),
    }
}

fn attributes_from_json(attributes: &serde_json::Map<String, serde_json::Value>) -> Attributes {
    attributes
        .iter()
        .filter_map(|(name, value)| {
            let value = AttributeValue::from_json(value);
            if value.is_none() {
                log::debug!(target: "hyphen", attribute = name.as_str(); "skipping non-scalar custom attribute");
            }
            Some((name.clone(), value?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AttributeValue, Attributes, EvaluationContext, User};

    fn full_context() -> EvaluationContext {
        EvaluationContext::builder()
            .targeting_key("user-123")
            .application("web")
            .environment("production")
            .ip_address("203.0.113.7")
            .user(User {
                id: Some("user-123".to_owned()),
                email: Some("jane@example.com".to_owned()),
                name: Some("Jane".to_owned()),
                custom_attributes: [("beta".to_owned(), true.into())].into(),
            })
            .custom_attribute("plan", "pro")
            .custom_attribute("seats", 12.0)
            .build()
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = full_context().to_json().unwrap();

        assert_eq!(
            json,
            json!({
                "targetingKey": "user-123",
                "application": "web",
                "environment": "production",
                "ipAddress": "203.0.113.7",
                "user": {
                    "id": "user-123",
                    "email": "jane@example.com",
                    "name": "Jane",
                    "customAttributes": { "beta": true },
                },
                "customAttributes": { "plan": "pro", "seats": 12.0 },
            })
        );
    }

    #[test]
    fn omits_absent_fields() {
        let context = EvaluationContext::builder().targeting_key("k").build();

        assert_eq!(context.to_json().unwrap(), json!({ "targetingKey": "k" }));
    }

    #[test]
    fn round_trips_through_json() {
        let context = full_context();

        let encoded = serde_json::to_string(&context).unwrap();
        let decoded: EvaluationContext = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, context);
    }

    #[test]
    fn serialization_does_not_depend_on_insertion_order() {
        let a = EvaluationContext::builder()
            .custom_attribute("a", 1.0)
            .custom_attribute("b", "x")
            .build();
        let b = EvaluationContext::builder()
            .custom_attribute("b", "x")
            .custom_attribute("a", 1.0)
            .build();

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn to_builder_leaves_original_untouched() {
        let original = full_context();

        let modified = original.to_builder().application("other").build();

        assert_eq!(original.application(), Some("web"));
        assert_eq!(modified.application(), Some("other"));
        assert_eq!(modified.user(), original.user());
    }

    #[test]
    fn normalizes_loosely_typed_attributes() {
        let context = EvaluationContext::from_attributes(
            Some("user-123"),
            &json!({
                "application": "web",
                "environment": "staging",
                "ipAddress": "203.0.113.7",
                "user": {
                    "id": "user-123",
                    "name": "Jane",
                    "customAttributes": { "beta": true, "tags": ["a", "b"] },
                },
                "customAttributes": { "region": "eu" },
                "plan": "pro",
                "nested": { "ignored": true },
            }),
        );

        assert_eq!(context.targeting_key(), Some("user-123"));
        assert_eq!(context.application(), Some("web"));
        assert_eq!(context.environment(), Some("staging"));
        assert_eq!(context.ip_address(), Some("203.0.113.7"));

        let user = context.user().unwrap();
        assert_eq!(user.id.as_deref(), Some("user-123"));
        assert_eq!(user.email, None);
        assert_eq!(
            user.custom_attributes,
            Attributes::from([("beta".to_owned(), AttributeValue::Boolean(true))])
        );

        assert_eq!(
            context.custom_attributes(),
            &Attributes::from([
                ("plan".to_owned(), AttributeValue::from("pro")),
                ("region".to_owned(), AttributeValue::from("eu")),
            ])
        );
    }

    #[test]
    fn non_object_attributes_only_keep_targeting_key() {
        let context = EvaluationContext::from_attributes(None, &json!("not an object"));

        assert_eq!(context, EvaluationContext::default());
    }
}
