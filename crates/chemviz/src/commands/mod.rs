//! Command handlers, one module per command group.

pub mod auth;
pub mod config_cmd;
pub mod datasets;
pub mod equipment;
pub mod transfer;
pub mod util;

use chemviz_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Route a server-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(dashboard, resolved, &args, global).await,
        Command::Logout => auth::logout(dashboard, global),
        Command::Status => auth::status(dashboard, resolved, global).await,
        Command::Equipment(args) => equipment::handle(dashboard, args, global).await,
        Command::Datasets(args) => datasets::handle(dashboard, args, global).await,
        Command::Upload(args) => transfer::upload(dashboard, args, global).await,
        Command::Export(args) => transfer::export(dashboard, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Config {
            message: "command does not need a server connection".into(),
        }),
    }
}
