//! Tunnel model
//!
//! Pure data describing one tunnel: the connection used to reach the jump
//! host and the local and remote endpoints of the forward.

mod builder;
mod connection;
mod part;
mod tunnel;

pub use builder::build_tunnel;
pub use connection::{Connection, DEFAULT_SSH_PORT};
pub use part::{AddressPort, Part, SocketPart, DEFAULT_ADDRESS};
pub use tunnel::Tunnel;
