//! CLI configuration: thin wrapper around `gpuwatch_config`.
//!
//! Loads the file + env layers, then applies `watch` flag overrides on
//! top before translating into a `ReaderConfig`.

use std::path::PathBuf;

use gpuwatch_config::{Config, config_path, load_config_from};
use gpuwatch_core::ReaderConfig;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

/// The config file in effect: `--config` or the platform default.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load file + env. An explicit `--config` must exist; the default path
/// may be absent.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = effective_path(global);
    if global.config.is_some() && !path.exists() {
        return Err(CliError::NoConfig {
            path: path.display().to_string(),
        });
    }
    load_config_from(&path).map_err(|e| CliError::from_config(e, &path))
}

/// Flags win over file and env values.
pub fn apply_overrides(config: &mut Config, args: &WatchArgs) {
    if args.embedded {
        config.service.embedded = true;
    }
    if let Some(ref address) = args.address {
        config.service.address.clone_from(address);
        config.service.embedded = false;
    }

    let creds = &mut config.credentials;
    if args.unauth {
        creds.unauthenticated = true;
    }
    if args.root_ca.is_some() {
        creds.root_ca.clone_from(&args.root_ca);
    }
    if args.client_cert.is_some() {
        creds.client_cert.clone_from(&args.client_cert);
    }
    if args.client_key.is_some() {
        creds.client_key.clone_from(&args.client_key);
    }

    let watch = &mut config.watch;
    if args.fields.is_some() {
        watch.fields.clone_from(&args.fields);
    } else if args.fields_file.is_some() {
        // a file on the command line beats a list from the config file
        watch.fields = None;
        watch.fields_file.clone_from(&args.fields_file);
    }
    if args.devices.is_some() {
        watch.devices.clone_from(&args.devices);
    }
    if let Some(secs) = args.update_interval {
        watch.update_interval = secs;
    }
    if let Some(secs) = args.max_keep_age {
        watch.max_keep_age = secs;
    }
    if let Some(n) = args.max_keep_samples {
        watch.max_keep_samples = n;
    }
    if args.raw {
        config.unit_conversion.raw = true;
    }
}

/// Load, override, validate, translate.
pub fn resolve(global: &GlobalOpts, args: &WatchArgs) -> Result<ReaderConfig, CliError> {
    let mut config = load(global)?;
    apply_overrides(&mut config, args);
    config
        .to_reader_config()
        .map_err(|e| CliError::from_config(e, &effective_path(global)))
}
