//! CLI configuration: thin wrapper around `chemviz_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--server, --timeout, etc.).

use std::time::Duration;

use chemviz_core::{DashboardConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use chemviz_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, parse_server_url,
    resolve_password, save_config, store_password, token_path,
};

/// Everything a server command needs: the resolved profile name (for
/// the token file and keyring) and the dashboard settings.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub profile: Option<Profile>,
    pub dashboard: DashboardConfig,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Translate a `Profile` + global flags into a `DashboardConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    config: &Config,
    global: &GlobalOpts,
) -> Result<DashboardConfig, CliError> {
    let mut dashboard = chemviz_config::profile_to_dashboard_config(profile, &config.defaults)?;

    if let Some(ref server) = global.server {
        dashboard.base_url = parse_server_url(server)?;
    }
    if global.insecure {
        dashboard.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        dashboard.timeout = Duration::from_secs(secs.max(1));
    }
    Ok(dashboard)
}

/// Build the dashboard settings from the config file, profile, and CLI
/// overrides. Without a matching profile, `--server` alone is enough.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        let dashboard = resolve_profile(profile, &cfg, global)?;
        return Ok(Resolved {
            profile_name,
            profile: Some(profile.clone()),
            dashboard,
        });
    }

    // An explicitly requested profile must exist.
    if global.profile.is_some() {
        let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
        available.sort();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    }

    let server = global.server.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let profile = Profile::new(server);
    let dashboard = resolve_profile(&profile, &cfg, global)?;

    Ok(Resolved {
        profile_name,
        profile: None,
        dashboard,
    })
}
