//! Session commands: login, logout, status.

use std::io::IsTerminal;

use dialoguer::Input;
use secrecy::SecretString;
use serde::Serialize;

use chemviz_config::ConfigError;
use chemviz_core::{Dashboard, SessionStatus};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::{self, Profile, Resolved};
use crate::error::CliError;
use crate::output;

use super::util;

fn session_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Anonymous => "anonymous",
        SessionStatus::Authenticated => "authenticated",
        SessionStatus::Expired => "expired",
    }
}

// ── Login ───────────────────────────────────────────────────────────

fn resolve_username(args: &LoginArgs, profile: Option<&Profile>) -> Result<String, CliError> {
    if let Some(user) = args
        .username
        .clone()
        .or_else(|| profile.and_then(|p| p.username.clone()))
    {
        return Ok(user);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "username".into(),
            reason: "pass --username when not running interactively".into(),
        });
    }
    Input::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(util::prompt_err)
}

/// Stored credentials first, then an interactive prompt.
fn resolve_login_password(resolved: &Resolved) -> Result<SecretString, CliError> {
    let fallback = Profile::new(resolved.dashboard.base_url.as_str());
    let profile = resolved.profile.as_ref().unwrap_or(&fallback);

    match config::resolve_password(profile, &resolved.profile_name) {
        Ok(pw) => Ok(pw),
        Err(ConfigError::NoCredentials { profile }) => {
            if !std::io::stdin().is_terminal() {
                return Err(CliError::NoCredentials { profile });
            }
            let pass = rpassword::prompt_password("Password: ").map_err(util::prompt_err)?;
            Ok(SecretString::from(pass))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login(
    dashboard: &Dashboard,
    resolved: &Resolved,
    args: &LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let username = resolve_username(args, resolved.profile.as_ref())?;
    let password = resolve_login_password(resolved)?;

    let bar = util::spinner("Logging in…", global);
    let result = dashboard.login(&username, &password).await;
    bar.finish_and_clear();
    result?;

    let color = output::should_color(&global.color);
    output::print_output(
        &output::success(
            &format!(
                "Logged in as {username} (profile '{}')",
                resolved.profile_name
            ),
            color,
        ),
        global.quiet,
    );
    Ok(())
}

// ── Logout ──────────────────────────────────────────────────────────

pub fn logout(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    if !dashboard.session().is_authenticated() {
        output::print_output("Not logged in", global.quiet);
        return Ok(());
    }
    if !util::confirm("Log out and remove the stored token?", global.yes)? {
        return Ok(());
    }
    dashboard.logout();

    let color = output::should_color(&global.color);
    output::print_output(&output::success("Logged out", color), global.quiet);
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    server: String,
    profile: String,
    project: String,
    status: String,
    version: String,
    session: &'static str,
}

fn detail(view: &StatusView) -> String {
    [
        format!("Server:   {}", view.server),
        format!("Profile:  {}", view.profile),
        format!("Project:  {}", view.project),
        format!("Status:   {}", view.status),
        format!("Version:  {}", view.version),
        format!("Session:  {}", view.session),
    ]
    .join("\n")
}

pub async fn status(
    dashboard: &Dashboard,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = dashboard.server_status().await?;

    let view = StatusView {
        server: resolved.dashboard.base_url.to_string(),
        profile: resolved.profile_name.clone(),
        project: api.project,
        status: api.status,
        version: api.version,
        session: session_label(dashboard.session().status()),
    };
    let out = output::render_single(&global.output, &view, detail, |v| v.status.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
