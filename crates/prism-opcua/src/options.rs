// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client option assembly.
//!
//! After endpoint discovery, the bridge builds an ordered option vector
//! describing how the session must be established. The order is fixed:
//! auto-reconnect, declared policy, declared mode, certificate material for
//! secured policies, the authentication token, and finally the security
//! binding taken from the selected endpoint.
//!
//! When no endpoint matches the declared policy/mode pair, the error carries
//! a summary of what the server actually offers so the PLC list can be
//! corrected from the log alone.

use std::path::PathBuf;

use prism_core::error::{DeviceError, DeviceResult};

use crate::types::{AuthMode, SecurityMode, SecurityPolicy, UaConfig};

/// Certificate file used for secured sessions, relative to the working
/// directory.
pub const CERTIFICATE_FILE: &str = "cert.pem";

/// Private key file used for secured sessions, relative to the working
/// directory.
pub const PRIVATE_KEY_FILE: &str = "key.pem";

// =============================================================================
// EndpointInfo
// =============================================================================

/// A discovered endpoint, reduced to the fields the bridge matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Full security policy URI.
    pub policy_uri: String,
    /// Message security mode.
    pub mode: SecurityMode,
    /// Token type names offered by this endpoint.
    pub token_types: Vec<String>,
}

impl EndpointInfo {
    /// Returns the policy URI suffix (the short policy name).
    pub fn policy_name(&self) -> &str {
        self.policy_uri
            .strip_prefix("http://opcfoundation.org/UA/SecurityPolicy#")
            .unwrap_or(&self.policy_uri)
    }
}

// =============================================================================
// ClientOption
// =============================================================================

/// One element of the ordered client option vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOption {
    /// Reconnect automatically on transient session loss.
    AutoReconnect(bool),
    /// Declared security policy.
    SecurityPolicy(SecurityPolicy),
    /// Declared security mode.
    SecurityMode(SecurityMode),
    /// Client certificate for secured policies.
    CertificateFile(PathBuf),
    /// Client private key for secured policies.
    PrivateKeyFile(PathBuf),
    /// Username/password authentication token.
    AuthUserName {
        /// The username.
        username: String,
        /// The password.
        password: String,
    },
    /// Certificate authentication token.
    AuthCertificate,
    /// Anonymous authentication token.
    AuthAnonymous,
    /// Security binding from the selected endpoint.
    SecurityFromEndpoint {
        /// The endpoint's policy URI.
        policy_uri: String,
        /// The endpoint's security mode.
        mode: SecurityMode,
        /// The chosen token type.
        token: AuthMode,
    },
}

// =============================================================================
// Assembly
// =============================================================================

/// Selects the endpoint matching the configured policy/mode and builds the
/// client option vector.
///
/// # Errors
///
/// [`DeviceError::NoMatchingEndpoint`] when the server offers no endpoint
/// for the declared policy/mode pair; the error carries a capability
/// summary of the offered combinations.
pub fn assemble_options(
    config: &UaConfig,
    endpoints: &[EndpointInfo],
) -> DeviceResult<Vec<ClientOption>> {
    let wanted_uri = config.policy.uri();
    let endpoint = endpoints
        .iter()
        .find(|e| e.policy_uri == wanted_uri && e.mode == config.mode)
        .ok_or_else(|| DeviceError::NoMatchingEndpoint {
            policy: config.policy.name().to_string(),
            mode: config.mode.name().to_string(),
            offered: capability_summary(endpoints),
        })?;

    let mut options = vec![
        ClientOption::AutoReconnect(true),
        ClientOption::SecurityPolicy(config.policy),
        ClientOption::SecurityMode(config.mode),
    ];

    if !config.policy.is_none() {
        options.push(ClientOption::CertificateFile(PathBuf::from(CERTIFICATE_FILE)));
        options.push(ClientOption::PrivateKeyFile(PathBuf::from(PRIVATE_KEY_FILE)));
    }

    match config.auth {
        AuthMode::UserName => options.push(ClientOption::AuthUserName {
            username: config.username.clone(),
            password: config.password.clone(),
        }),
        AuthMode::Certificate => options.push(ClientOption::AuthCertificate),
        AuthMode::Anonymous => options.push(ClientOption::AuthAnonymous),
    }

    options.push(ClientOption::SecurityFromEndpoint {
        policy_uri: endpoint.policy_uri.clone(),
        mode: endpoint.mode,
        token: config.auth,
    });

    Ok(options)
}

/// Summarizes the policies, modes and token types a server offers.
///
/// Used in the no-matching-endpoint error so an operator can correct the
/// PLC list without running a discovery tool.
pub fn capability_summary(endpoints: &[EndpointInfo]) -> String {
    let mut policies: Vec<String> = Vec::new();
    let mut modes: Vec<String> = Vec::new();
    let mut tokens: Vec<String> = Vec::new();

    for endpoint in endpoints {
        let policy = endpoint.policy_name().to_string();
        if !policies.contains(&policy) {
            policies.push(policy);
        }
        let mode = endpoint.mode.name().to_string();
        if !modes.contains(&mode) {
            modes.push(mode);
        }
        for token in &endpoint.token_types {
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
    }

    let mut parts = Vec::new();
    if !policies.is_empty() {
        parts.push(format!("policy: {}", policies.join("/")));
    }
    if !modes.is_empty() {
        parts.push(format!("mode: {}", modes.join("/")));
    }
    if !tokens.is_empty() {
        parts.push(format!("auth: {}", tokens.join("/")));
    }
    parts.join("; ")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(policy: SecurityPolicy, mode: SecurityMode) -> EndpointInfo {
        EndpointInfo {
            policy_uri: policy.uri(),
            mode,
            token_types: vec!["Anonymous".to_string(), "UserName".to_string()],
        }
    }

    fn config(policy: &str, mode: &str, auth: &str) -> UaConfig {
        UaConfig::from_raw("opc.tcp://plc:4840", policy, mode, auth, "op", "secret").unwrap()
    }

    #[test]
    fn test_option_order_unsecured_anonymous() {
        let endpoints = [endpoint(SecurityPolicy::None, SecurityMode::None)];
        let options = assemble_options(&config("", "", ""), &endpoints).unwrap();
        assert_eq!(
            options,
            vec![
                ClientOption::AutoReconnect(true),
                ClientOption::SecurityPolicy(SecurityPolicy::None),
                ClientOption::SecurityMode(SecurityMode::None),
                ClientOption::AuthAnonymous,
                ClientOption::SecurityFromEndpoint {
                    policy_uri: SecurityPolicy::None.uri(),
                    mode: SecurityMode::None,
                    token: AuthMode::Anonymous,
                },
            ]
        );
    }

    #[test]
    fn test_option_order_secured_username() {
        let endpoints = [
            endpoint(SecurityPolicy::None, SecurityMode::None),
            endpoint(SecurityPolicy::Basic256Sha256, SecurityMode::SignAndEncrypt),
        ];
        let options = assemble_options(
            &config("basic256sha256", "signandencrypt", "username"),
            &endpoints,
        )
        .unwrap();

        assert_eq!(options[0], ClientOption::AutoReconnect(true));
        assert_eq!(
            options[1],
            ClientOption::SecurityPolicy(SecurityPolicy::Basic256Sha256)
        );
        assert_eq!(options[2], ClientOption::SecurityMode(SecurityMode::SignAndEncrypt));
        assert_eq!(
            options[3],
            ClientOption::CertificateFile(PathBuf::from("cert.pem"))
        );
        assert_eq!(
            options[4],
            ClientOption::PrivateKeyFile(PathBuf::from("key.pem"))
        );
        assert_eq!(
            options[5],
            ClientOption::AuthUserName {
                username: "op".to_string(),
                password: "secret".to_string(),
            }
        );
        assert!(matches!(
            options[6],
            ClientOption::SecurityFromEndpoint {
                token: AuthMode::UserName,
                ..
            }
        ));
        assert_eq!(options.len(), 7);
    }

    #[test]
    fn test_no_matching_endpoint_reports_capabilities() {
        let endpoints = [endpoint(SecurityPolicy::None, SecurityMode::None)];
        let error = assemble_options(
            &config("basic256sha256", "signandencrypt", ""),
            &endpoints,
        )
        .unwrap_err();

        match error {
            DeviceError::NoMatchingEndpoint { policy, mode, offered } => {
                assert_eq!(policy, "Basic256Sha256");
                assert_eq!(mode, "SignAndEncrypt");
                assert!(offered.contains("policy: None"));
                assert!(offered.contains("auth: Anonymous/UserName"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_capability_summary_dedupes() {
        let endpoints = [
            endpoint(SecurityPolicy::None, SecurityMode::None),
            endpoint(SecurityPolicy::None, SecurityMode::None),
            endpoint(SecurityPolicy::Basic256, SecurityMode::Sign),
        ];
        let summary = capability_summary(&endpoints);
        assert_eq!(summary.matches("None").count(), 2);
        assert!(summary.contains("policy: None/Basic256"));
        assert!(summary.contains("mode: None/Sign"));
    }

    #[test]
    fn test_capability_summary_empty() {
        assert_eq!(capability_summary(&[]), "");
    }
}
