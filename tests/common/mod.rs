//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Once;

use nukible::testing::{LockSimulator, LockSimulatorConfig, SimulatedLock};
use nukible::{AppType, ClientIdentity, LockCredential, SharedSecret};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialize test logging (call once per test module)
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::from_default_env().add_directive(
            "nukible=debug"
                .parse()
                .expect("static directive parses"),
        );
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

/// Identity used by most tests
pub fn identity() -> ClientIdentity {
    ClientIdentity::new(0x00C0_FFEE, AppType::Bridge, "integration")
}

/// A credential the simulated lock already knows
pub fn credential() -> LockCredential {
    LockCredential {
        lock_uuid: LockSimulatorConfig::default().lock_uuid,
        authorization_id: 3,
        shared_secret: SharedSecret::new([0x5C; 32]),
    }
}

/// A simulated lock paired with [`credential`]
pub fn paired_lock(config: LockSimulatorConfig) -> SimulatedLock {
    SimulatedLock::from_simulator(LockSimulator::new(config).paired_with(credential()))
}
