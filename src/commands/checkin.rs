//! Implementation of the `tokenlock checkin` command.

use super::Session;
use crate::cli::CheckinArgs;
use crate::error::Result;
use crate::events::EventAction;
use serde_json::json;
use std::path::PathBuf;

/// Execute the `tokenlock checkin` command.
pub fn cmd_checkin(session: &Session, args: CheckinArgs) -> Result<()> {
    let resource = run_checkin(session, &args)?;

    println!("Checked in {} from {}", resource.display(), args.target.display());

    Ok(())
}

pub(super) fn run_checkin(session: &Session, args: &CheckinArgs) -> Result<PathBuf> {
    session.ctx.ensure_reachable()?;

    let mut pool = session.pool(session.settings())?;
    let resource = pool.checkin(&args.target)?;

    session.record(
        session
            .event(EventAction::Checkin)
            .with_resource(&resource)
            .with_details(json!({
                "target": args.target.display().to_string(),
                "strategy": pool.strategy_name(),
            })),
    );

    Ok(resource)
}
