//! Tunnel endpoints

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use crate::error::ModelError;
use crate::params::PartKind;

/// Address used when a part gives none
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// One endpoint of a tunnel
///
/// Plain display is the configured form; alternate display (`{:#}`) is the
/// form handed to `ssh -L`, with a dynamic port resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Part {
    /// TCP address and port
    AddressPort(AddressPort),
    /// File system socket
    Socket(SocketPart),
}

impl Part {
    pub fn kind(&self) -> PartKind {
        match self {
            Part::AddressPort(_) => PartKind::AddressPort,
            Part::Socket(_) => PartKind::Socket,
        }
    }

    /// The `-L` half for this part, allocating a dynamic port if needed
    pub fn forward_spec(&self) -> Result<String, ModelError> {
        match self {
            Part::AddressPort(part) => Ok(format_address_port(&part.address, part.port()?)),
            Part::Socket(part) => Ok(part.path.clone()),
        }
    }

    /// Configuration parameters under `prefix`
    ///
    /// In emulation mode no port is ever allocated; dynamic ports read `0`.
    pub fn config_parameters(
        &self,
        prefix: &str,
        emulation: bool,
    ) -> Result<BTreeMap<String, String>, ModelError> {
        match self {
            Part::AddressPort(part) => {
                let port = match (&part.port, emulation) {
                    (Some(port), true) => port.clone(),
                    (None, true) => "0".to_string(),
                    (_, false) => part.port()?.to_string(),
                };
                Ok(BTreeMap::from([
                    (format!("{prefix}address"), part.address.clone()),
                    (format!("{prefix}port"), port),
                ]))
            }
            Part::Socket(part) => Ok(BTreeMap::from([(
                format!("{prefix}socket"),
                part.path.clone(),
            )])),
        }
    }
}

impl Default for Part {
    fn default() -> Self {
        Part::AddressPort(AddressPort::default())
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::AddressPort(part) => {
                if f.alternate() {
                    // Unresolvable ports keep their configured form
                    if let Ok(port) = part.port() {
                        return f.write_str(&format_address_port(&part.address, port));
                    }
                }
                match &part.port {
                    Some(port) => write!(f, "{}:{}", part.address, port),
                    None => write!(f, "{}:<random port>", part.address),
                }
            }
            Part::Socket(part) => f.write_str(&part.path),
        }
    }
}

fn format_address_port(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}

/// TCP endpoint whose port may be allocated on first use
#[derive(Debug, Clone)]
pub struct AddressPort {
    address: String,
    port: Option<String>,
    // Shared between clones so every copy resolves to the same port.
    allocated: Arc<AtomicU16>,
}

impl AddressPort {
    /// Create an endpoint; blank values fall back to `127.0.0.1` and a dynamic port
    pub fn new(address: Option<String>, port: Option<String>) -> Self {
        Self {
            address: address
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            port: port.filter(|p| !p.trim().is_empty()),
            allocated: Arc::new(AtomicU16::new(0)),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The configured port, if any
    pub fn configured_port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// The effective port
    ///
    /// Without a configured port one is allocated once by binding an
    /// ephemeral listener on the address and releasing it; later calls
    /// return the same value.
    pub fn port(&self) -> Result<u16, ModelError> {
        match &self.port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| ModelError::InvalidPort(port.clone())),
            None => self.allocated_port(),
        }
    }

    fn allocated_port(&self) -> Result<u16, ModelError> {
        let current = self.allocated.load(Ordering::Acquire);
        if current != 0 {
            return Ok(current);
        }

        let port = allocate_port(&self.address)?;
        match self
            .allocated
            .compare_exchange(0, port, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                tracing::debug!("Allocated dynamic port {} on {}", port, self.address);
                Ok(port)
            }
            Err(winner) => Ok(winner),
        }
    }
}

impl Default for AddressPort {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl PartialEq for AddressPort {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.port == other.port
    }
}

impl Eq for AddressPort {}

impl Hash for AddressPort {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.port.hash(state);
    }
}

fn allocate_port(address: &str) -> Result<u16, ModelError> {
    let to_error = |source| ModelError::PortAllocation {
        address: address.to_string(),
        source,
    };
    let host = address.trim_start_matches('[').trim_end_matches(']');
    let listener = TcpListener::bind((host, 0)).map_err(to_error)?;
    let port = listener.local_addr().map_err(to_error)?.port();
    Ok(port)
}

/// File system socket endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketPart {
    path: String,
}

impl SocketPart {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
