//! Port allocation service for locally spawned dev servers.
//!
//! Multiple CLI processes on one machine each start their own local dev server
//! and must not collide on TCP ports. One process runs the coordination server
//! (`server`), which owns the instance-id → port registry (`registry`) and asks
//! the OS which ports are actually free (`detect`). Everyone else talks to it
//! over the HTTP control plane on the fixed coordination port.

pub mod detect;
pub mod registry;
pub mod server;

/// Lowest port the service will hand out or accept as a requested port.
pub const MIN_PORT: u16 = 1024;

/// Highest valid TCP port.
pub const MAX_PORT: u16 = 65535;

/// Fixed local port the coordination server itself listens on.
/// Distinct from the range of ports it allocates to clients.
pub const COORDINATION_PORT: u16 = 8241;
