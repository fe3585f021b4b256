//! End-to-end suite for the object proxy bridge.

#[cfg(test)]
mod config_e2e;

#[cfg(test)]
mod session_e2e;
