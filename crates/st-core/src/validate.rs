//! Tunnel property validation
//!
//! Validation checks a flat property map and normalizes it in place: values
//! of recognized properties are trimmed, the local and remote part kinds are
//! inferred when not given, and fields belonging to the other part kind are
//! pruned. Every check runs; errors accumulate per field.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::TunnelError;
use crate::model::{build_tunnel, Tunnel};
use crate::params::{self, is_valid_property_name, PartKind, Properties, MAX_PORT};
use crate::reference;
use crate::traits::KeyStore;

/// Field-level validation failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// True when the properties are valid
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one error
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Messages recorded for a field
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All messages without duplicates, in field order
    pub fn messages(&self) -> Vec<&str> {
        let mut messages: Vec<&str> = Vec::new();
        for message in self.0.values().flatten() {
            if !messages.contains(&message.as_str()) {
                messages.push(message);
            }
        }
        messages
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, messages)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", field, messages.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validates tunnel properties against the known keys
pub struct Validator<'a> {
    keys: &'a dyn KeyStore,
    is_reference: fn(&str) -> bool,
}

impl<'a> Validator<'a> {
    /// Create a validator recognizing `%name%` references
    pub fn new(keys: &'a dyn KeyStore) -> Self {
        Self {
            keys,
            is_reference: reference::is_reference,
        }
    }

    /// Replace the predicate deciding which values are deferred references
    pub fn with_reference_predicate(mut self, is_reference: fn(&str) -> bool) -> Self {
        self.is_reference = is_reference;
        self
    }

    /// Validate and normalize `properties`
    ///
    /// An empty result means the properties may be passed to
    /// [`build_tunnel`].
    pub fn validate(&self, properties: &mut Properties) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        for name in properties.keys() {
            if !is_valid_property_name(name) {
                errors.push(name, format!("Parameter '{}' is unknown", name));
            }
        }

        for (name, value) in properties.iter_mut() {
            if is_valid_property_name(name) && value.trim().len() != value.len() {
                *value = value.trim().to_string();
            }
        }

        if !given(properties, params::NAME) {
            errors.push(params::NAME, "Name must be specified");
        }

        if !given(properties, params::USER) {
            errors.push(params::USER, "User must be specified");
        }

        self.validate_key(properties, &mut errors);

        if !given(properties, params::HOST) {
            errors.push(params::HOST, "Host must be specified");
        }

        self.check_port(
            properties,
            params::PORT,
            "Port if given must be a number between 0 and 65535",
            &mut errors,
        );

        self.validate_local_part(properties, &mut errors);
        self.validate_remote_part(properties, &mut errors);

        errors
    }

    /// Validate and build the tunnel in one go
    pub fn build(&self, mut properties: Properties) -> Result<Tunnel, TunnelError> {
        let errors = self.validate(&mut properties);
        if !errors.is_empty() {
            return Err(TunnelError::Invalid(errors));
        }
        Ok(build_tunnel(&properties)?)
    }

    /// Human-readable description of the tunnel or of what is wrong with it
    pub fn describe(&self, properties: &mut Properties) -> String {
        let errors = self.validate(properties);
        if !errors.is_empty() {
            return format!(
                "Parameters are invalid:\n- {}",
                errors.messages().join("\n- ")
            );
        }
        match build_tunnel(properties) {
            Ok(tunnel) => tunnel.to_string(),
            Err(e) => format!("Parameters are invalid:\n- {}", e),
        }
    }

    fn validate_key(&self, properties: &Properties, errors: &mut ValidationErrors) {
        let Some(key_name) = value(properties, params::SSH_KEY) else {
            errors.push(params::SSH_KEY, "SSH key must be specified");
            return;
        };

        if !self.keys.is_valid_key_name(key_name) {
            errors.push(params::SSH_KEY, format!("SSH key '{}' not found", key_name));
            return;
        }

        let encrypted = match self.keys.is_encrypted(key_name) {
            Ok(encrypted) => encrypted,
            Err(e) => {
                tracing::warn!("Cannot inspect SSH key '{}': {}", key_name, e);
                errors.push(params::SSH_KEY, e.to_string());
                return;
            }
        };
        let passphrase_given = given(properties, params::SSH_KEY_PASSPHRASE);
        if encrypted && !passphrase_given {
            errors.push(
                params::SSH_KEY_PASSPHRASE,
                "SSH key passphrase must be specified for encrypted SSH key",
            );
        } else if !encrypted && passphrase_given {
            errors.push(
                params::SSH_KEY_PASSPHRASE,
                "SSH key passphrase must not be specified for unencrypted SSH key",
            );
        }
    }

    fn validate_local_part(&self, properties: &mut Properties, errors: &mut ValidationErrors) {
        let address_given = given(properties, params::LOCAL_ADDRESS);
        let port_given = given(properties, params::LOCAL_PORT);
        let socket_given = given(properties, params::LOCAL_SOCKET);

        if !given(properties, params::LOCAL_PART) {
            if (address_given || port_given) && socket_given {
                errors.push(params::LOCAL_PART, "Local part must be specified");
            } else if socket_given {
                set_kind(properties, params::LOCAL_PART, PartKind::Socket);
            } else {
                set_kind(properties, params::LOCAL_PART, PartKind::AddressPort);
            }
        }

        match settled_kind(properties, params::LOCAL_PART) {
            Ok(Some(PartKind::AddressPort)) => {
                properties.remove(params::LOCAL_SOCKET);
                if port_given {
                    self.check_port(
                        properties,
                        params::LOCAL_PORT,
                        "Local port if given must be a number between 0 and 65535",
                        errors,
                    );
                } else if !address_given {
                    // nothing configured, the model defaults the local part
                    properties.remove(params::LOCAL_PART);
                }
            }
            Ok(Some(PartKind::Socket)) => {
                properties.remove(params::LOCAL_ADDRESS);
                properties.remove(params::LOCAL_PORT);
                if !socket_given {
                    errors.push(params::LOCAL_SOCKET, "Local socket must be specified");
                }
            }
            Ok(None) => {}
            Err(()) => errors.push(params::LOCAL_PART, "Local part value is invalid"),
        }
    }

    fn validate_remote_part(&self, properties: &mut Properties, errors: &mut ValidationErrors) {
        let port_given = given(properties, params::REMOTE_PORT);
        let socket_given = given(properties, params::REMOTE_SOCKET);

        if !given(properties, params::REMOTE_PART) {
            if port_given == socket_given {
                errors.push(params::REMOTE_PART, "Remote part must be specified");
            } else if socket_given {
                set_kind(properties, params::REMOTE_PART, PartKind::Socket);
            } else {
                set_kind(properties, params::REMOTE_PART, PartKind::AddressPort);
            }
        }

        match settled_kind(properties, params::REMOTE_PART) {
            Ok(Some(PartKind::AddressPort)) => {
                properties.remove(params::REMOTE_SOCKET);
                if port_given {
                    self.check_port(
                        properties,
                        params::REMOTE_PORT,
                        "Remote port must be a number between 0 and 65535",
                        errors,
                    );
                } else {
                    errors.push(params::REMOTE_PORT, "Remote port must be specified");
                }
            }
            Ok(Some(PartKind::Socket)) => {
                properties.remove(params::REMOTE_ADDRESS);
                properties.remove(params::REMOTE_PORT);
                if !socket_given {
                    errors.push(params::REMOTE_SOCKET, "Remote socket must be specified");
                }
            }
            Ok(None) => {}
            Err(()) => errors.push(params::REMOTE_PART, "Remote part value is invalid"),
        }
    }

    fn check_port(
        &self,
        properties: &Properties,
        field: &str,
        message: &str,
        errors: &mut ValidationErrors,
    ) {
        if let Some(port) = value(properties, field) {
            if !(self.is_reference)(port) && !is_port_number(port) {
                errors.push(field, message);
            }
        }
    }
}

fn value<'p>(properties: &'p Properties, name: &str) -> Option<&'p str> {
    properties
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn given(properties: &Properties, name: &str) -> bool {
    value(properties, name).is_some()
}

fn set_kind(properties: &mut Properties, name: &str, kind: PartKind) {
    properties.insert(name.to_string(), kind.as_str().to_string());
}

fn settled_kind(properties: &Properties, name: &str) -> Result<Option<PartKind>, ()> {
    match value(properties, name) {
        None => Ok(None),
        Some(kind) => PartKind::from_name(kind).map(Some).ok_or(()),
    }
}

fn is_port_number(value: &str) -> bool {
    value
        .parse::<i128>()
        .map(|port| (0..=MAX_PORT).contains(&port))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeyError;
    use crate::keys::KeyRing;
    use crate::model::{AddressPort, Part};
    use std::collections::HashMap;

    struct Keys(HashMap<&'static str, bool>);

    impl KeyStore for Keys {
        fn is_valid_key_name(&self, name: &str) -> bool {
            self.0.contains_key(name)
        }

        fn is_encrypted(&self, name: &str) -> Result<bool, KeyError> {
            self.0
                .get(name)
                .copied()
                .ok_or_else(|| KeyError::NotFound(name.to_string()))
        }
    }

    fn keys() -> Keys {
        Keys(HashMap::from([("k1", false), ("enc", true)]))
    }

    fn properties(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> Properties {
        properties(&[
            ("name", "db"),
            ("user", "u"),
            ("teamcitySshKey", "k1"),
            ("host", "h"),
            ("remotePort", "5432"),
            ("remoteAddress", ""),
        ])
    }

    #[test]
    fn test_minimal_tunnel_is_valid() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();

        let errors = validator.validate(&mut props);
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(props.get("remotePart").map(String::as_str), Some("ADDRESS_PORT"));
        assert!(!props.contains_key("localPart"));

        let tunnel = build_tunnel(&props).unwrap();
        assert_eq!(
            tunnel.remote_part(),
            &Part::AddressPort(AddressPort::new(None, Some("5432".into())))
        );
        assert_eq!(tunnel.remote_part().to_string(), "127.0.0.1:5432");
        assert_eq!(tunnel.local_part().to_string(), "127.0.0.1:<random port>");
    }

    #[test]
    fn test_encrypted_key_requires_passphrase() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("teamcitySshKey".into(), "enc".into());

        let errors = validator.validate(&mut props);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get("secure:teamcitySshKeyPassphrase"),
            ["SSH key passphrase must be specified for encrypted SSH key"]
        );

        props.insert("secure:teamcitySshKeyPassphrase".into(), "secret".into());
        assert!(validator.validate(&mut props).is_empty());
    }

    #[test]
    fn test_unencrypted_key_rejects_passphrase() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("secure:teamcitySshKeyPassphrase".into(), "secret".into());

        let errors = validator.validate(&mut props);
        assert_eq!(
            errors.get("secure:teamcitySshKeyPassphrase"),
            ["SSH key passphrase must not be specified for unencrypted SSH key"]
        );
    }

    #[test]
    fn test_unreadable_key_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut ring = KeyRing::new();
        ring.insert("k1", dir.path().join("gone"), None);
        let validator = Validator::new(&ring);
        let mut props = base();

        let errors = validator.validate(&mut props);
        assert_eq!(errors.len(), 1);
        assert!(errors.get("teamcitySshKey")[0].starts_with("Failed to read SSH key 'k1'"));
        assert!(errors.get("secure:teamcitySshKeyPassphrase").is_empty());
    }

    #[test]
    fn test_unknown_key_and_missing_fields_accumulate() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = properties(&[
            ("name", "  "),
            ("teamcitySshKey", "nope"),
            ("remoteSocket", "/run/a.sock"),
        ]);

        let errors = validator.validate(&mut props);
        assert_eq!(errors.get("name"), ["Name must be specified"]);
        assert_eq!(errors.get("user"), ["User must be specified"]);
        assert_eq!(errors.get("host"), ["Host must be specified"]);
        assert_eq!(errors.get("teamcitySshKey"), ["SSH key 'nope' not found"]);
        assert_eq!(errors.len(), 4);
        assert_eq!(props["name"], "");
    }

    #[test]
    fn test_missing_key() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.remove("teamcitySshKey");

        let errors = validator.validate(&mut props);
        assert_eq!(errors.get("teamcitySshKey"), ["SSH key must be specified"]);
    }

    #[test]
    fn test_unknown_properties_are_reported_individually() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("colour".into(), "blue".into());
        props.insert("shape".into(), " round ".into());

        let errors = validator.validate(&mut props);
        assert_eq!(errors.get("colour"), ["Parameter 'colour' is unknown"]);
        assert_eq!(errors.get("shape"), ["Parameter 'shape' is unknown"]);
        assert_eq!(errors.len(), 2);
        assert_eq!(props["shape"], " round ");
    }

    #[test]
    fn test_values_are_trimmed() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("host".into(), "  bastion.example.com\n".into());

        assert!(validator.validate(&mut props).is_empty());
        assert_eq!(props["host"], "bastion.example.com");
    }

    #[test]
    fn test_ambiguous_local_part_reports_one_error() {
        let keys = keys();
        let validator = Validator::new(&keys);
        for extra in [("localPort", "8080"), ("localAddress", "0.0.0.0")] {
            let mut props = base();
            props.insert("localSocket".into(), "/tmp/l.sock".into());
            props.insert("localPart".into(), String::new());
            props.insert(extra.0.into(), extra.1.into());

            let errors = validator.validate(&mut props);
            assert_eq!(errors.len(), 1, "{}", errors);
            assert_eq!(errors.get("localPart"), ["Local part must be specified"]);
        }
    }

    #[test]
    fn test_local_socket_is_inferred_and_other_fields_pruned() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("localSocket".into(), "/tmp/l.sock".into());

        assert!(validator.validate(&mut props).is_empty());
        assert_eq!(props["localPart"], "SOCKET");

        let mut props = base();
        props.insert("localPart".into(), "SOCKET".into());
        props.insert("localSocket".into(), "/tmp/l.sock".into());
        props.insert("localPort".into(), "8080".into());
        assert!(validator.validate(&mut props).is_empty());
        assert!(!props.contains_key("localPort"));
    }

    #[test]
    fn test_explicit_local_socket_requires_path() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("localPart".into(), "SOCKET".into());

        let errors = validator.validate(&mut props);
        assert_eq!(errors.get("localSocket"), ["Local socket must be specified"]);
    }

    #[test]
    fn test_local_address_keeps_address_port_kind() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("localAddress".into(), "0.0.0.0".into());

        assert!(validator.validate(&mut props).is_empty());
        assert_eq!(props["localPart"], "ADDRESS_PORT");
        let tunnel = build_tunnel(&props).unwrap();
        assert_eq!(tunnel.local_part().to_string(), "0.0.0.0:<random port>");
    }

    #[test]
    fn test_invalid_part_kinds() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("localPart".into(), "PIPE".into());
        props.insert("remotePart".into(), "TUBE".into());

        let errors = validator.validate(&mut props);
        assert_eq!(errors.get("localPart"), ["Local part value is invalid"]);
        assert_eq!(errors.get("remotePart"), ["Remote part value is invalid"]);
    }

    #[test]
    fn test_remote_part_needs_exactly_one_endpoint() {
        let keys = keys();
        let validator = Validator::new(&keys);

        let mut both = base();
        both.insert("remoteSocket".into(), "/run/r.sock".into());
        let errors = validator.validate(&mut both);
        assert_eq!(errors.get("remotePart"), ["Remote part must be specified"]);

        let mut neither = base();
        neither.remove("remotePort");
        let errors = validator.validate(&mut neither);
        assert_eq!(errors.get("remotePart"), ["Remote part must be specified"]);

        let mut socket = base();
        socket.remove("remotePort");
        socket.insert("remoteSocket".into(), "/run/r.sock".into());
        assert!(validator.validate(&mut socket).is_empty());
        assert_eq!(socket["remotePart"], "SOCKET");
        assert!(!socket.contains_key("remoteAddress"));
    }

    #[test]
    fn test_explicit_remote_address_port_requires_port() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.remove("remotePort");
        props.insert("remotePart".into(), "ADDRESS_PORT".into());

        let errors = validator.validate(&mut props);
        assert_eq!(errors.get("remotePort"), ["Remote port must be specified"]);
    }

    #[test]
    fn test_port_ranges_apply_to_every_port_field() {
        let keys = keys();
        let validator = Validator::new(&keys);
        for bad in ["-1", "65536", "http", "1.5", "99999999999999999999999999999999999999999"] {
            for field in ["port", "localPort", "remotePort"] {
                let mut props = base();
                props.insert(field.into(), bad.into());
                let errors = validator.validate(&mut props);
                assert_eq!(errors.get(field).len(), 1, "{field}={bad}");
                assert_eq!(errors.len(), 1, "{field}={bad}: {errors}");
            }
        }
        for good in ["0", "22", "65535"] {
            for field in ["port", "localPort", "remotePort"] {
                let mut props = base();
                props.insert(field.into(), good.into());
                assert!(validator.validate(&mut props).is_empty(), "{field}={good}");
            }
        }
    }

    #[test]
    fn test_references_bypass_port_checks() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        props.insert("port".into(), "%ssh.port%".into());
        props.insert("localPort".into(), "%local.port%".into());
        props.insert("remotePort".into(), "%env.DB_PORT%".into());

        assert!(validator.validate(&mut props).is_empty());
        assert_eq!(props["localPart"], "ADDRESS_PORT");
    }

    #[test]
    fn test_custom_reference_predicate() {
        let keys = keys();
        let validator = Validator::new(&keys).with_reference_predicate(|v| v.starts_with('$'));
        let mut props = base();
        props.insert("remotePort".into(), "${port}".into());
        assert!(validator.validate(&mut props).is_empty());

        props.insert("remotePort".into(), "%port%".into());
        assert!(!validator.validate(&mut props).is_empty());
    }

    #[test]
    fn test_describe() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let mut props = base();
        assert_eq!(
            validator.describe(&mut props),
            "Open an SSH tunnel via 'u@h:22' identified by key 'k1' \
             from '127.0.0.1:<random port>' to '127.0.0.1:5432' with name 'db'"
        );

        let mut props = properties(&[("remotePort", "x")]);
        let description = validator.describe(&mut props);
        assert!(description.starts_with("Parameters are invalid:\n- "));
        assert!(description.contains("- Host must be specified"));
        assert!(description.contains("- Remote port must be a number between 0 and 65535"));
    }

    #[test]
    fn test_build_rejects_invalid_properties() {
        let keys = keys();
        let validator = Validator::new(&keys);
        let err = validator.build(Properties::new()).unwrap_err();
        assert!(matches!(err, TunnelError::Invalid(errors) if errors.get("name").len() == 1));

        let tunnel = validator.build(base()).unwrap();
        assert_eq!(tunnel.name(), "db");
    }
}
