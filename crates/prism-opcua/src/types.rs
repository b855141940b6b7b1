// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA connection types and configuration normalization.
//!
//! The PLC list carries security settings as free-form text; the
//! `normalize` constructors on [`SecurityPolicy`], [`SecurityMode`] and
//! [`AuthMode`] fold that text onto canonical values, with anything
//! unrecognized degrading to the unsecured/anonymous default.

use std::fmt;

use serde::{Deserialize, Serialize};

use prism_core::error::{ConfigError, ConfigResult};

// =============================================================================
// NodeId
// =============================================================================

/// The node identifier of the server's current-time variable, read once
/// after connect as a liveness probe.
pub const SERVER_TIME_NODE: &str = "ns=0;i=2258";

/// An OPC UA node identifier in its string form, e.g. `ns=3;i=1001`.
///
/// The bridge treats node identifiers as opaque keys: tag files provide
/// them as strings and data-change notifications are matched back by the
/// same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node identifier from its string form.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The server current-time node, `ns=0;i=2258`.
    pub fn server_time() -> Self {
        Self(SERVER_TIME_NODE.to_string())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// OPC UA security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No security policy (only valid with `SecurityMode::None`).
    #[default]
    None,

    /// Basic128Rsa15 (deprecated, kept for legacy servers).
    Basic128Rsa15,

    /// Basic256 (deprecated, kept for legacy servers).
    Basic256,

    /// Basic256Sha256.
    Basic256Sha256,

    /// Aes128-Sha256-RsaOaep.
    Aes128Sha256RsaOaep,

    /// Aes256-Sha256-RsaPss.
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Normalizes a PLC-list policy field.
    ///
    /// Matching is case-insensitive against the canonical spellings;
    /// anything else collapses to `None`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "basic128rsa15" => Self::Basic128Rsa15,
            "basic256" => Self::Basic256,
            "basic256sha256" => Self::Basic256Sha256,
            "aes128_sha256_rsaoaep" => Self::Aes128Sha256RsaOaep,
            "aes256_sha256_rsapss" => Self::Aes256Sha256RsaPss,
            _ => Self::None,
        }
    }

    /// Returns the canonical short name, as it appears in policy URIs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic128Rsa15 => "Basic128Rsa15",
            Self::Basic256 => "Basic256",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128_Sha256_RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256_Sha256_RsaPss",
        }
    }

    /// Returns the full OPC UA policy URI.
    pub fn uri(&self) -> String {
        format!("http://opcfoundation.org/UA/SecurityPolicy#{}", self.name())
    }

    /// Returns `true` for the unsecured policy.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// SecurityMode
// =============================================================================

/// OPC UA message security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Messages are neither signed nor encrypted.
    #[default]
    None,

    /// Messages are signed but not encrypted.
    Sign,

    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    /// Normalizes a PLC-list mode field; unrecognized text becomes `None`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "sign" => Self::Sign,
            "signandencrypt" => Self::SignAndEncrypt,
            _ => Self::None,
        }
    }

    /// Returns the canonical name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        }
    }

    /// Returns `true` for the unsecured mode.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// AuthMode
// =============================================================================

/// Authentication mode against the upstream server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Anonymous token.
    #[default]
    Anonymous,

    /// Username and password token.
    UserName,

    /// X.509 certificate token.
    Certificate,
}

impl AuthMode {
    /// Normalizes a PLC-list auth field; unrecognized text becomes
    /// `Anonymous`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "username" => Self::UserName,
            "certificate" => Self::Certificate,
            _ => Self::Anonymous,
        }
    }

    /// Returns the canonical name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::UserName => "UserName",
            Self::Certificate => "Certificate",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// UaConfig
// =============================================================================

/// Connection configuration for one upstream OPC UA server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UaConfig {
    /// Endpoint URL, e.g. `opc.tcp://10.0.0.5:4840`.
    pub endpoint: String,

    /// Security policy.
    pub policy: SecurityPolicy,

    /// Message security mode.
    pub mode: SecurityMode,

    /// Authentication mode.
    pub auth: AuthMode,

    /// Username for `AuthMode::UserName`.
    pub username: String,

    /// Password for `AuthMode::UserName`.
    pub password: String,
}

impl UaConfig {
    /// Creates a configuration from raw PLC-list fields, normalizing the
    /// security settings and applying the combination rules.
    ///
    /// # Errors
    ///
    /// - exactly one of policy/mode is `None` (a half-secured session is a
    ///   configuration mistake, not a downgrade)
    /// - `UserName` auth with an empty username or password
    pub fn from_raw(
        endpoint: impl Into<String>,
        policy: &str,
        mode: &str,
        auth: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ConfigResult<Self> {
        let config = Self {
            endpoint: endpoint.into(),
            policy: SecurityPolicy::normalize(policy),
            mode: SecurityMode::normalize(mode),
            auth: AuthMode::normalize(auth),
            username: username.into(),
            password: password.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Applies the security combination rules.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::validation("endpoint", "must not be empty"));
        }
        if self.policy.is_none() != self.mode.is_none() {
            return Err(ConfigError::validation(
                "security",
                format!(
                    "incompatible policy/mode combination: {} / {}",
                    self.policy, self.mode
                ),
            ));
        }
        if self.auth == AuthMode::UserName && (self.username.is_empty() || self.password.is_empty())
        {
            return Err(ConfigError::validation(
                "auth",
                "UserName authentication requires a username and password",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_normalization() {
        assert_eq!(
            SecurityPolicy::normalize("basic128rsa15"),
            SecurityPolicy::Basic128Rsa15
        );
        assert_eq!(SecurityPolicy::normalize("BASIC256"), SecurityPolicy::Basic256);
        assert_eq!(
            SecurityPolicy::normalize("Basic256Sha256"),
            SecurityPolicy::Basic256Sha256
        );
        assert_eq!(
            SecurityPolicy::normalize("aes128_sha256_rsaoaep"),
            SecurityPolicy::Aes128Sha256RsaOaep
        );
        assert_eq!(
            SecurityPolicy::normalize("AES256_SHA256_RSAPSS"),
            SecurityPolicy::Aes256Sha256RsaPss
        );
        assert_eq!(SecurityPolicy::normalize("tls"), SecurityPolicy::None);
        assert_eq!(SecurityPolicy::normalize(""), SecurityPolicy::None);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(SecurityPolicy::Basic256Sha256.name(), "Basic256Sha256");
        assert_eq!(
            SecurityPolicy::Aes128Sha256RsaOaep.name(),
            "Aes128_Sha256_RsaOaep"
        );
        assert_eq!(
            SecurityPolicy::None.uri(),
            "http://opcfoundation.org/UA/SecurityPolicy#None"
        );
    }

    #[test]
    fn test_mode_normalization() {
        assert_eq!(SecurityMode::normalize("sign"), SecurityMode::Sign);
        assert_eq!(SecurityMode::normalize("Sign"), SecurityMode::Sign);
        assert_eq!(
            SecurityMode::normalize("SignAndEncrypt"),
            SecurityMode::SignAndEncrypt
        );
        assert_eq!(SecurityMode::normalize("encrypt"), SecurityMode::None);
    }

    #[test]
    fn test_auth_normalization() {
        assert_eq!(AuthMode::normalize("username"), AuthMode::UserName);
        assert_eq!(AuthMode::normalize("UserName"), AuthMode::UserName);
        assert_eq!(AuthMode::normalize("certificate"), AuthMode::Certificate);
        assert_eq!(AuthMode::normalize("token"), AuthMode::Anonymous);
        assert_eq!(AuthMode::normalize(""), AuthMode::Anonymous);
    }

    #[test]
    fn test_config_half_secured_rejected() {
        let result = UaConfig::from_raw(
            "opc.tcp://localhost:4840",
            "basic256sha256",
            "unknown-mode",
            "",
            "",
            "",
        );
        assert!(result.is_err());

        let result = UaConfig::from_raw("opc.tcp://localhost:4840", "", "sign", "", "", "");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_username_requires_credentials() {
        let result = UaConfig::from_raw("opc.tcp://localhost:4840", "", "", "username", "op", "");
        assert!(result.is_err());

        let config =
            UaConfig::from_raw("opc.tcp://localhost:4840", "", "", "username", "op", "secret")
                .unwrap();
        assert_eq!(config.auth, AuthMode::UserName);
    }

    #[test]
    fn test_config_fully_secured_accepted() {
        let config = UaConfig::from_raw(
            "opc.tcp://plc:4840",
            "basic256sha256",
            "signandencrypt",
            "",
            "",
            "",
        )
        .unwrap();
        assert_eq!(config.policy, SecurityPolicy::Basic256Sha256);
        assert_eq!(config.mode, SecurityMode::SignAndEncrypt);
        assert_eq!(config.auth, AuthMode::Anonymous);
    }

    #[test]
    fn test_node_id() {
        let node = NodeId::new("ns=3;i=1001");
        assert_eq!(node.as_str(), "ns=3;i=1001");
        assert_eq!(node.to_string(), "ns=3;i=1001");
        assert_eq!(NodeId::server_time().as_str(), "ns=0;i=2258");
    }
}
