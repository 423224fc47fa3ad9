//! Implementation of the `tokenlock checkout` command.

use super::Session;
use crate::cli::CheckoutArgs;
use crate::error::Result;
use crate::events::EventAction;
use crate::pool::{Checkout, CheckoutCriteria};
use serde_json::json;

/// Execute the `tokenlock checkout` command.
pub fn cmd_checkout(session: &Session, args: CheckoutArgs) -> Result<()> {
    let checkout = run_checkout(session, &args)?;

    println!(
        "Checked out {} to {}",
        checkout.resource.display(),
        checkout.target.display()
    );
    println!("Run `tokenlock checkin --target {}` when done.", args.target.display());

    Ok(())
}

pub(super) fn run_checkout(session: &Session, args: &CheckoutArgs) -> Result<Checkout> {
    session.ctx.ensure_reachable()?;

    let mut settings = session.settings();
    if let Some(retry_count) = args.retry_count {
        settings.retry.retry_count = retry_count;
    }

    let criteria = match &args.token {
        Some(name) => CheckoutCriteria::specific(name.as_str(), args.force),
        None => CheckoutCriteria::any(),
    };

    // The pool is dropped on return; the claim it made is persistent and
    // stays until a later `checkin`.
    let mut pool = session.pool(settings)?;
    let checkout = pool.checkout(&criteria, &args.target)?;

    session.record(
        session
            .event(EventAction::Checkout)
            .with_resource(&checkout.resource)
            .with_details(json!({
                "target": checkout.target.display().to_string(),
                "requested": args.token,
                "force": args.force,
                "strategy": pool.strategy_name(),
            })),
    );

    Ok(checkout)
}
