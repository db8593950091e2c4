//! Test suites for the directory server supervisor.

mod daemon_behaviour;
pub(crate) mod support;
