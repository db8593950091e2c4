//! Configuration loaders used by the daemon suites.

use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use warden_config::Config;

use crate::daemon::ConfigLoader;

/// Loader serving a configuration the test can replace between reloads.
#[derive(Debug, Clone)]
pub struct TestConfigLoader {
    config: Arc<Mutex<Result<Config, Vec<OsString>>>>,
}

impl TestConfigLoader {
    /// Serves defaults pointed at install root `data_path`.
    pub fn for_root(data_path: &Path) -> Self {
        let data_path =
            Utf8PathBuf::from_path_buf(data_path.to_path_buf()).expect("utf-8 install root");
        Self {
            config: Arc::new(Mutex::new(Ok(Config {
                data_path,
                ..Config::default()
            }))),
        }
    }

    /// Configuration the next load returns.
    pub fn current(&self) -> Config {
        match &*self.config.lock().expect("config loader mutex poisoned") {
            Ok(config) => config.clone(),
            Err(_) => panic!("loader is set to fail"),
        }
    }

    /// Edits the configuration returned by later loads.
    pub fn edit(&self, change: impl FnOnce(&mut Config)) {
        let mut config = self.current();
        change(&mut config);
        *self.config.lock().expect("config loader mutex poisoned") = Ok(config);
    }

    /// Makes later loads parse `args`, which must be rejected.
    pub fn fail_with_args(&self, args: &[&str]) {
        let args = std::iter::once("wardend")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect();
        *self.config.lock().expect("config loader mutex poisoned") = Err(args);
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let state = self
            .config
            .lock()
            .expect("config loader mutex poisoned")
            .clone();
        match state {
            Ok(config) => Ok(config),
            Err(args) => Config::load_from_iter(args),
        }
    }
}
