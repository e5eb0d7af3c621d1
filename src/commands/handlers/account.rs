//! Registration, login/logout and credential management.

use std::time::Duration;

use chrono::Utc;
use log::info;

use crate::commands::helpers::{check_args, require_logged_out, resolve_room, Access, ArgCheck, RoomRef};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::logutil::{escape_log, sec_log};
use crate::server::credentials::password_problem;
use crate::validation::{validate_username, UsernameRules};
use crate::world::{UserRecord, WorldError};

use super::info::show_room;

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("register", Category::Account, register)
            .usage("register <name> <password>")
            .describe("Create a new account."),
        CommandSpec::new("login", Category::Account, login)
            .usage("login <name> <password>")
            .describe("Log in to an existing account."),
        CommandSpec::new("logout", Category::Account, logout)
            .aliases(&["quit"])
            .describe("Log out."),
        CommandSpec::new("password", Category::Account, password)
            .usage("password <old> <new>")
            .describe("Change your password."),
        CommandSpec::new("recover", Category::Account, recover)
            .usage("recover <name> <recovery code> <new password>")
            .describe("Reset a forgotten password with your recovery code."),
    ]
}

fn cooldown(ctx: &CommandContext<'_>) -> Duration {
    Duration::from_millis(ctx.config.security.login_cooldown_ms)
}

fn register(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !require_logged_out(ctx) || !check_args(ctx, args, ArgCheck::new().exact(2)) {
        return Ok(false);
    }
    let rules = UsernameRules::user(&ctx.config.world.root_user);
    let name = match validate_username(&args[0], &rules) {
        Ok(name) => name,
        Err(e) => {
            ctx.send(format!("{}.", e));
            return Ok(false);
        }
    };
    if ctx.world.nick_taken(&name, "") {
        ctx.send("That name is already taken.");
        return Ok(false);
    }
    if let Some(problem) = password_problem(&args[1]) {
        ctx.send(problem);
        return Ok(false);
    }

    let (code, recovery_hash) = ctx.new_recovery_code()?;
    let mut user = UserRecord::new(&name, &ctx.hash_secret(&args[1])?);
    user.recovery_hash = Some(recovery_hash);
    ctx.world.upsert_user(user)?;
    info!("Registered new user {}", name.to_ascii_lowercase());

    ctx.send(format!(
        "Welcome, {}! Your account is ready; log in with 'login {} <password>'.",
        name, name
    ));
    ctx.send(format!(
        "Your recovery code is {}. Keep it somewhere safe; it is shown only once.",
        code
    ));
    Ok(true)
}

fn login(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !require_logged_out(ctx) || !check_args(ctx, args, ArgCheck::new().exact(2)) {
        return Ok(false);
    }
    if ctx.console.cooling_down() {
        ctx.send("Please wait a moment before trying again.");
        return Ok(false);
    }
    let user = ctx
        .world
        .get_user(&args[0])
        .filter(|u| ctx.verify_secret(&u.password_hash, &args[1]));
    let Some(user) = user else {
        let wait = cooldown(ctx);
        ctx.console.arm_cooldown(wait);
        sec_log!(
            "Failed login for '{}' on session {}",
            escape_log(&args[0]),
            ctx.console.id()
        );
        ctx.send("Invalid name or password.");
        return Ok(false);
    };
    if ctx.world.is_online(&user.name) {
        ctx.send("That account is already logged in from another session.");
        return Ok(false);
    }
    sign_in(ctx, user)?;
    Ok(true)
}

/// Mark `user` online on this console, announce them and show their surroundings.
pub fn sign_in(ctx: &mut CommandContext<'_>, mut user: UserRecord) -> Result<(), WorldError> {
    let name = user.name.clone();
    let nick = user.nick.clone();
    let autolook = user.settings.autolook;
    user.last_login = Some(Utc::now());
    user.posture = None;
    ctx.world.upsert_user(user)?;
    ctx.world.set_online(&name, true)?;
    ctx.console.set_user(Some(&name));
    ctx.router.bind_user(ctx.console.id(), Some(&name));
    info!("User {} logged in on session {}", name, ctx.console.id());

    ctx.send(format!("Welcome, {}.", nick));
    if let Some(room) = resolve_room(ctx, RoomRef::Current, Access::any())? {
        ctx.broadcast_room(room.id, &format!("{} has connected.", nick), Some(&name));
        if autolook {
            show_room(ctx, &room);
        }
    }
    Ok(())
}

/// Announce the departure and mark the console's user offline. No-op when logged out.
pub fn sign_out(ctx: &mut CommandContext<'_>) -> Result<(), WorldError> {
    let Some(name) = ctx.actor_name() else {
        return Ok(());
    };
    if let Some(user) = ctx.world.get_user(&name) {
        ctx.broadcast_room(
            user.room,
            &format!("{} has disconnected.", user.nick),
            Some(&name),
        );
    }
    ctx.world.set_online(&name, false)?;
    ctx.console.set_user(None);
    ctx.router.bind_user(ctx.console.id(), None);
    info!("User {} logged out of session {}", name, ctx.console.id());
    Ok(())
}

fn logout(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(0).login()) {
        return Ok(false);
    }
    sign_out(ctx)?;
    ctx.send("Goodbye.");
    Ok(true)
}

fn password(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    if !ctx.verify_secret(&user.password_hash, &args[0]) {
        sec_log!("Failed password change for {}", user.name);
        ctx.send("Incorrect password.");
        return Ok(false);
    }
    if let Some(problem) = password_problem(&args[1]) {
        ctx.send(problem);
        return Ok(false);
    }
    user.password_hash = ctx.hash_secret(&args[1])?;
    ctx.world.upsert_user(user)?;
    ctx.send("Password changed.");
    Ok(true)
}

fn recover(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !require_logged_out(ctx) || !check_args(ctx, args, ArgCheck::new().exact(3)) {
        return Ok(false);
    }
    if ctx.console.cooling_down() {
        ctx.send("Please wait a moment before trying again.");
        return Ok(false);
    }
    let user = ctx.world.get_user(&args[0]).filter(|u| {
        u.recovery_hash
            .as_deref()
            .map(|h| ctx.verify_secret(h, &args[1]))
            .unwrap_or(false)
    });
    let Some(mut user) = user else {
        let wait = cooldown(ctx);
        ctx.console.arm_cooldown(wait);
        sec_log!(
            "Failed recovery for '{}' on session {}",
            escape_log(&args[0]),
            ctx.console.id()
        );
        ctx.send("Recovery failed.");
        return Ok(false);
    };
    if let Some(problem) = password_problem(&args[2]) {
        ctx.send(problem);
        return Ok(false);
    }
    let (code, recovery_hash) = ctx.new_recovery_code()?;
    user.password_hash = ctx.hash_secret(&args[2])?;
    user.recovery_hash = Some(recovery_hash);
    let name = user.name.clone();
    ctx.world.upsert_user(user)?;
    sec_log!("Password for {} reset through recovery code", name);
    ctx.send(format!(
        "Password reset. Your new recovery code is {}. The old one no longer works.",
        code
    ));
    Ok(true)
}
