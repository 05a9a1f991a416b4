//! Properties to model

use super::{AddressPort, Connection, Part, SocketPart, Tunnel};
use crate::error::ModelError;
use crate::params::{self, PartKind, Properties};

/// Build a tunnel from properties already normalized by the validator
///
/// No validation happens here. A remote part kind that the validator did
/// not settle is a contract violation and yields
/// [`ModelError::UnsettledPart`].
pub fn build_tunnel(properties: &Properties) -> Result<Tunnel, ModelError> {
    let get = |name: &str| properties.get(name).cloned();
    let kind = |name: &str| properties.get(name).map(String::as_str).unwrap_or("");

    let remote_part = match PartKind::from_name(kind(params::REMOTE_PART)) {
        Some(PartKind::AddressPort) => Part::AddressPort(AddressPort::new(
            get(params::REMOTE_ADDRESS),
            get(params::REMOTE_PORT),
        )),
        Some(PartKind::Socket) => Part::Socket(SocketPart::new(
            get(params::REMOTE_SOCKET).unwrap_or_default(),
        )),
        None => {
            return Err(ModelError::UnsettledPart {
                side: "remote",
                value: kind(params::REMOTE_PART).to_string(),
            })
        }
    };

    let local_part = match PartKind::from_name(kind(params::LOCAL_PART)) {
        Some(PartKind::AddressPort) => Some(Part::AddressPort(AddressPort::new(
            get(params::LOCAL_ADDRESS),
            get(params::LOCAL_PORT),
        ))),
        Some(PartKind::Socket) => Some(Part::Socket(SocketPart::new(
            get(params::LOCAL_SOCKET).unwrap_or_default(),
        ))),
        None => None,
    };

    let connection = Connection::new(
        get(params::USER).unwrap_or_default(),
        get(params::SSH_KEY).unwrap_or_default(),
        get(params::SSH_KEY_PASSPHRASE),
        get(params::HOST).unwrap_or_default(),
        get(params::PORT),
    );

    Ok(Tunnel::new(
        get(params::NAME).unwrap_or_default(),
        connection,
        local_part,
        remote_part,
    ))
}
