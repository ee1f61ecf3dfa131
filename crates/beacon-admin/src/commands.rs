//! Maps parsed commands onto store operations and prints the results.

use std::io::{BufRead, Write};

use beacon_store::{Database, Entity, NewTier, StoreError, TierChange, TierLimits};
use tracing::debug;

use crate::cli::{Command, TierCommand, TierFlags, UserCommand};
use crate::error::{AdminError, Result};
use crate::render;

/// Source of new passwords: a preset value (`BEACON_PASSWORD`), the
/// terminal with echo turned off, or two lines read from `input` with
/// prompts written to `prompt`.
pub struct PasswordReader<R, P> {
    preset: Option<String>,
    input: R,
    prompt: P,
    tty: bool,
}

impl<R: BufRead, P: Write> PasswordReader<R, P> {
    pub fn new(preset: Option<String>, input: R, prompt: P) -> Self {
        Self {
            preset,
            input,
            prompt,
            tty: false,
        }
    }

    /// Read from the controlling terminal without echo instead of `input`.
    pub fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Read a password and its confirmation.
    pub fn read_new(&mut self) -> Result<String> {
        if let Some(password) = &self.preset {
            if password.is_empty() {
                return Err(AdminError::EmptyPassword);
            }
            return Ok(password.clone());
        }

        let password = self.read_line("password: ")?;
        if password.is_empty() {
            return Err(AdminError::EmptyPassword);
        }
        let confirm = self.read_line("confirm: ")?;
        if password != confirm {
            return Err(AdminError::PasswordMismatch);
        }
        Ok(password)
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        if self.tty {
            return Ok(rpassword::prompt_password(prompt)?);
        }

        write!(self.prompt, "{prompt}")?;
        self.prompt.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        writeln!(self.prompt)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Run one admin command against `db`, writing results to `out`.
pub fn run<R: BufRead, P: Write>(
    command: Command,
    db: &Database,
    passwords: &mut PasswordReader<R, P>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::User { command } => run_user(command, db, passwords, out),
        Command::Tier { command } => run_tier(command, db, out),
    }
}

fn run_user<R: BufRead, P: Write>(
    command: UserCommand,
    db: &Database,
    passwords: &mut PasswordReader<R, P>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        UserCommand::Add { role, username } => {
            // Fail before prompting if the name is taken.
            if db.get_user(&username).is_ok() {
                return Err(StoreError::AlreadyExists {
                    entity: Entity::User,
                    key: username,
                }
                .into());
            }
            let password = passwords.read_new()?;
            let user = db.add_user(&username, &password, role)?;
            writeln!(out, "user {} added with role {}", user.username, user.role)?;
        }
        UserCommand::List => {
            for user in db.list_users()? {
                render::write_user(out, &user)?;
            }
        }
        UserCommand::Del { username } => {
            db.delete_user(&username)?;
            writeln!(out, "user {username} removed")?;
        }
        UserCommand::ChangePass { username } => {
            db.get_user(&username)?;
            let password = passwords.read_new()?;
            db.change_password(&username, &password)?;
            writeln!(out, "changed password for user {username}")?;
        }
        UserCommand::ChangeRole { username, role } => {
            db.change_role(&username, role)?;
            writeln!(out, "changed role for user {username} to {role}")?;
        }
        UserCommand::ChangeTier { username, tier } => {
            if tier == "none" {
                db.change_user_tier(&username, None)?;
                writeln!(out, "removed tier from user {username}")?;
            } else {
                db.change_user_tier(&username, Some(&tier))?;
                writeln!(out, "changed tier for user {username} to {tier}")?;
            }
        }
    }
    Ok(())
}

fn run_tier(command: TierCommand, db: &Database, out: &mut impl Write) -> Result<()> {
    match command {
        TierCommand::Add { flags, code } => {
            let tier = db.add_tier(&new_tier(code, flags))?;
            writeln!(out, "tier added\n")?;
            render::write_tier(out, &tier)?;
        }
        TierCommand::Change { flags, code } => {
            let change = tier_change(flags);
            if change.is_empty() {
                debug!(code = %code, "tier change without fields");
            }
            let tier = db.change_tier(&code, &change)?;
            writeln!(out, "tier updated\n")?;
            render::write_tier(out, &tier)?;
        }
        TierCommand::Remove { code } => {
            db.remove_tier(&code)?;
            writeln!(out, "tier {code} removed")?;
        }
        TierCommand::List => {
            for (i, tier) in db.list_tiers()?.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                render::write_tier(out, tier)?;
            }
        }
    }
    Ok(())
}

fn new_tier(code: String, flags: TierFlags) -> NewTier {
    NewTier {
        name: flags.name.unwrap_or_else(|| code.clone()),
        code,
        limits: TierLimits {
            message_limit: flags.message_limit.unwrap_or(0),
            message_expiry_duration: flags.message_expiry_duration.unwrap_or(0),
            email_limit: flags.email_limit.unwrap_or(0),
            reservation_limit: flags.reservation_limit.unwrap_or(0),
            attachment_file_size_limit: flags.attachment_file_size_limit.unwrap_or(0),
            attachment_total_size_limit: flags.attachment_total_size_limit.unwrap_or(0),
            attachment_expiry_duration: flags.attachment_expiry_duration.unwrap_or(0),
            attachment_bandwidth_limit: flags.attachment_bandwidth_limit.unwrap_or(0),
        },
        stripe_monthly_price_id: flags.stripe_monthly_price_id,
        stripe_yearly_price_id: flags.stripe_yearly_price_id,
    }
}

fn tier_change(flags: TierFlags) -> TierChange {
    TierChange {
        name: flags.name,
        message_limit: flags.message_limit,
        message_expiry_duration: flags.message_expiry_duration,
        email_limit: flags.email_limit,
        reservation_limit: flags.reservation_limit,
        attachment_file_size_limit: flags.attachment_file_size_limit,
        attachment_total_size_limit: flags.attachment_total_size_limit,
        attachment_expiry_duration: flags.attachment_expiry_duration,
        attachment_bandwidth_limit: flags.attachment_bandwidth_limit,
        stripe_monthly_price_id: flags.stripe_monthly_price_id,
        stripe_yearly_price_id: flags.stripe_yearly_price_id,
    }
}
