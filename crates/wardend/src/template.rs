//! Placeholder substitution for the server's main configuration template.
//!
//! Connector tokens are declared once per connector block, so only their first
//! occurrence is rewritten. Keystore tokens may appear in several handler
//! entries and every occurrence is rewritten. All substitution is literal:
//! values are never interpreted as patterns.

use crate::connectors::ConnectorRegistry;
use crate::keystore::KeystoreBindings;

/// Rewrites the enable and port tokens of every connector.
///
/// A disabled connector renders as `false` with its default port because the
/// server refuses a zero port even on an inactive handler.
#[must_use]
pub fn apply_connectors(text: &str, connectors: &ConnectorRegistry) -> String {
    let mut rendered = text.to_owned();
    for connector in connectors.iter() {
        let spec = connector.kind.spec();
        let enabled = if connector.is_enabled() { "true" } else { "false" };
        let port = connector.effective_port().to_string();
        rendered = rendered.replacen(spec.enable_variable, enabled, 1);
        rendered = rendered.replacen(spec.port_variable, &port, 1);
    }
    rendered
}

/// Rewrites every occurrence of the four tokens of each keystore binding.
///
/// An unconfigured store location renders as an empty string.
#[must_use]
pub fn apply_keystores(text: &str, keystores: &KeystoreBindings) -> String {
    let mut rendered = text.to_owned();
    for binding in keystores.iter() {
        let tokens = binding.kind().tokens();
        let location = binding
            .location()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let pin_location = binding.pin_path().display().to_string();
        rendered = rendered
            .replace(tokens.pin_location, &pin_location)
            .replace(tokens.location, &location)
            .replace(tokens.password, binding.password())
            .replace(tokens.store_type, binding.store_type());
    }
    rendered
}

/// Trims the template then applies connector and keystore substitution.
#[must_use]
pub fn render(text: &str, connectors: &ConnectorRegistry, keystores: &KeystoreBindings) -> String {
    let connected = apply_connectors(text.trim(), connectors);
    apply_keystores(&connected, keystores)
}
