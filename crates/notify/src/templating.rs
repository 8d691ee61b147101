//! Minijinja rendering of the due-date notification text.
//!
//! The default template reproduces the plain message
//! `Subscription due: {name} - Amount: {amount} - Due Date: {YYYY-MM-DD}`.
//! `NOTIFY_MESSAGE_TEMPLATE` may replace it; the replacement is parsed once
//! when the renderer is built so a broken template fails at startup rather
//! than on every delivery.

use serde::{Serialize, Serializer};

use crate::traits::NotifyError;

pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "Subscription due: {{ name }} - Amount: {{ amount }} - Due Date: {{ due_date }}";

/// Values available to message templates.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub name: String,
    pub amount: f64,
    /// Occurrence date as `YYYY-MM-DD`.
    pub due_date: String,
    /// Effective currency code (the `default` marker already resolved).
    pub currency: String,
    /// Rendered as an empty string when unset.
    #[serde(serialize_with = "empty_if_none")]
    pub account: Option<String>,
}

fn empty_if_none<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

/// Renders notification messages from a validated template.
#[derive(Debug, Clone)]
pub struct MessageRenderer {
    template: String,
}

impl MessageRenderer {
    /// Build a renderer for `template`, or the default template when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template has syntax errors.
    pub fn new(template: Option<String>) -> Result<Self, NotifyError> {
        let template = template.unwrap_or_else(|| DEFAULT_MESSAGE_TEMPLATE.to_string());
        Self::build_env()
            .template_from_str(&template)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(Self { template })
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env
    }

    pub fn render(&self, ctx: &MessageContext) -> Result<String, NotifyError> {
        Self::build_env()
            .render_str(&self.template, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self {
            template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }
}

/// Round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> MessageContext {
        MessageContext {
            name: "Netflix".to_string(),
            amount: 15.49,
            due_date: "2024-03-15".to_string(),
            currency: "EUR".to_string(),
            account: Some("Visa".to_string()),
        }
    }

    #[test]
    fn default_template_matches_plain_message() {
        let renderer = MessageRenderer::new(None).unwrap();
        assert_eq!(
            renderer.render(&sample_context()).unwrap(),
            "Subscription due: Netflix - Amount: 15.49 - Due Date: 2024-03-15"
        );
    }

    #[test]
    fn custom_template_sees_currency_and_account() {
        let renderer = MessageRenderer::new(Some(
            "{{ name }}: {{ amount | round(1) }} {{ currency }} via {{ account }}".to_string(),
        ))
        .unwrap();
        assert_eq!(
            renderer.render(&sample_context()).unwrap(),
            "Netflix: 15.5 EUR via Visa"
        );
    }

    #[test]
    fn missing_account_renders_empty() {
        let renderer =
            MessageRenderer::new(Some("[{{ account }}]".to_string())).unwrap();
        let mut ctx = sample_context();
        ctx.account = None;
        assert_eq!(renderer.render(&ctx).unwrap(), "[]");
    }

    #[test]
    fn invalid_template_rejected_at_construction() {
        match MessageRenderer::new(Some("{{ unclosed".to_string())) {
            Err(NotifyError::Template(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected Template error, got: {other:?}"),
        }
    }
}
