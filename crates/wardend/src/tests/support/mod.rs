//! Test harness utilities shared by the unit and behavioural suites.

mod backends;
mod bundle;
mod config_loader;
mod harness;
mod reporter;
mod signals;
mod supervisor;

pub use backends::{BackendEvent, BackendStep, RecordingBackends};
pub use bundle::{ResourceBundle, SEED_FILES};
pub use config_loader::TestConfigLoader;
pub use harness::ControllerHarness;
pub use reporter::{LifecycleEvent, RecordingReporter};
pub use signals::{ScriptStep, ScriptedSignals};
pub use supervisor::{RecordingSupervisor, SupervisorEvent};
