//! Command implementations for tokenlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, and the [`Session`] every command runs in: the loaded
//! config, the resolved token folder and this process's identity factory.

mod checkin;
mod checkout;
mod journal;
mod lock;
mod status;


use crate::cli::{Cli, Command, JournalAction, LockAction};
use crate::config::{Config, SelectionMode};
use crate::context::{TokenContext, owner_string};
use crate::error::{Result, TokenError};
use crate::events::{Event, EventAction, append_event};
use crate::locks::IdentityFactory;
use crate::pool::{DirectoryScan, JournalStrategy, LockSettings, ResourcePool};
use std::path::Path;
use std::sync::Arc;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(cli: Cli) -> Result<()> {
    let session = Session::open(cli.config.as_deref(), cli.folder.as_deref())?;

    match cli.command {
        Command::Checkout(args) => checkout::cmd_checkout(&session, args),
        Command::Checkin(args) => checkin::cmd_checkin(&session, args),
        Command::Status => status::cmd_status(&session),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List => lock::cmd_lock_list(&session),
            LockAction::Clear(args) => lock::cmd_lock_clear(&session, args),
        },
        Command::Journal(journal_cmd) => match journal_cmd.action {
            JournalAction::Init => journal::cmd_journal_init(&session),
            JournalAction::Show => journal::cmd_journal_show(&session),
        },
    }
}

/// Everything a command needs to touch the token folder.
pub struct Session {
    pub config: Config,
    pub ctx: TokenContext,
    factory: Arc<IdentityFactory>,
}

impl Session {
    /// Load the config and resolve the token folder from the current
    /// working directory.
    pub fn open(config_path: Option<&Path>, folder: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            TokenError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        let config = Config::load_or_default(config_path, &cwd)?;
        let ctx = TokenContext::resolve_from(&cwd, &config, folder)?;

        Ok(Self::new(config, ctx, IdentityFactory::new()))
    }

    pub fn new(config: Config, ctx: TokenContext, factory: IdentityFactory) -> Self {
        Self {
            config,
            ctx,
            factory: Arc::new(factory),
        }
    }

    pub fn factory(&self) -> &IdentityFactory {
        &self.factory
    }

    /// Owner string recorded in journal claims and events.
    pub fn owner(&self) -> String {
        owner_string(self.factory.host())
    }

    /// Lock settings from the config.
    pub fn settings(&self) -> LockSettings {
        LockSettings {
            factory: Arc::clone(&self.factory),
            mask: self.config.mask(),
            create_mode: self.config.create_mode,
            retry: self.config.retry_policy(),
        }
    }

    /// Pool over the token folder using the configured strategy.
    pub fn pool(&self, settings: LockSettings) -> Result<ResourcePool> {
        match self.ctx.mode {
            SelectionMode::Scan => ResourcePool::new(
                &self.ctx.pool_dir,
                self.config.extension.as_str(),
                Box::new(DirectoryScan::new(settings)),
            ),
            SelectionMode::Journal => ResourcePool::new(
                &self.ctx.pool_dir,
                self.config.extension.as_str(),
                Box::new(self.journal_strategy(settings)),
            ),
        }
    }

    pub fn journal_strategy(&self, settings: LockSettings) -> JournalStrategy {
        JournalStrategy::new(settings, &self.ctx.journal_path, self.owner())
    }

    /// Append an event to the audit log if enabled.
    ///
    /// Best-effort: the state change already happened, so a failed append
    /// is only reported as a warning.
    pub fn record(&self, event: Event) {
        if !self.config.events_enabled {
            return;
        }
        if let Err(e) = append_event(&self.ctx.events_file, &event) {
            eprintln!("Warning: failed to log {} event: {}", event.action, e);
        }
    }

    pub fn event(&self, action: EventAction) -> Event {
        Event::new(action, self.owner())
    }
}
