//! Tunnel property names and part kinds

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

/// Flat tunnel definition as handed over by the host
pub type Properties = BTreeMap<String, String>;

pub const NAME: &str = "name";
pub const USER: &str = "user";
pub const SSH_KEY: &str = "teamcitySshKey";
pub const SSH_KEY_PASSPHRASE: &str = "secure:teamcitySshKeyPassphrase";
pub const HOST: &str = "host";
pub const PORT: &str = "port";
pub const LOCAL_PART: &str = "localPart";
pub const LOCAL_ADDRESS: &str = "localAddress";
pub const LOCAL_PORT: &str = "localPort";
pub const LOCAL_SOCKET: &str = "localSocket";
pub const REMOTE_PART: &str = "remotePart";
pub const REMOTE_ADDRESS: &str = "remoteAddress";
pub const REMOTE_PORT: &str = "remotePort";
pub const REMOTE_SOCKET: &str = "remoteSocket";

/// Prefix of every published configuration parameter
pub const PARAMETER_PREFIX: &str = "sshTunnel";

/// Largest valid port number
pub const MAX_PORT: i128 = 65_535;

const PROPERTY_NAMES: [&str; 14] = [
    NAME,
    USER,
    SSH_KEY,
    SSH_KEY_PASSPHRASE,
    HOST,
    PORT,
    LOCAL_PART,
    LOCAL_ADDRESS,
    LOCAL_PORT,
    LOCAL_SOCKET,
    REMOTE_PART,
    REMOTE_ADDRESS,
    REMOTE_PORT,
    REMOTE_SOCKET,
];

/// All recognized property names
pub fn valid_property_names() -> &'static HashSet<&'static str> {
    static NAMES: OnceLock<HashSet<&'static str>> = OnceLock::new();
    NAMES.get_or_init(|| PROPERTY_NAMES.into_iter().collect())
}

/// Whether `name` is a recognized property name
pub fn is_valid_property_name(name: &str) -> bool {
    valid_property_names().contains(name)
}

/// Shape of a tunnel endpoint as named in the properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    /// `ADDRESS_PORT`
    AddressPort,
    /// `SOCKET`
    Socket,
}

impl PartKind {
    /// Property value naming this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::AddressPort => "ADDRESS_PORT",
            PartKind::Socket => "SOCKET",
        }
    }

    /// Parse a property value into a part kind
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ADDRESS_PORT" => Some(PartKind::AddressPort),
            "SOCKET" => Some(PartKind::Socket),
            _ => None,
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replace every non-alphanumeric character with `_`
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
