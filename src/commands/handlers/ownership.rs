//! Owner list management for rooms, exits and items.
//!
//! `grant` appends a secondary owner, `revoke` removes a secondary owner and
//! `transfer` promotes a user to primary, pushing the previous primary down to
//! the first secondary slot.

use log::info;

use crate::commands::helpers::{
    check_args, parse_id, resolve_exit, resolve_item, resolve_room, resolve_user, Access,
    ArgCheck, RoomRef, UserQuery,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::world::{Owners, UserRecord, WorldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Grant,
    Revoke,
    Transfer,
}

impl Change {
    fn access(self) -> Access {
        match self {
            Change::Grant => Access::owner(),
            Change::Revoke | Change::Transfer => Access::primary(),
        }
    }
}

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("grant room", Category::Ownership, grant_room)
            .usage("grant room <id> <user>")
            .describe("Add a secondary owner to a room."),
        CommandSpec::new("grant exit", Category::Ownership, grant_exit)
            .usage("grant exit <index> <user>")
            .describe("Add a secondary owner to an exit here."),
        CommandSpec::new("grant item", Category::Ownership, grant_item)
            .usage("grant item <id> <user>")
            .describe("Add a secondary owner to an item."),
        CommandSpec::new("revoke room", Category::Ownership, revoke_room)
            .usage("revoke room <id> <user>")
            .describe("Remove a secondary owner from a room."),
        CommandSpec::new("revoke exit", Category::Ownership, revoke_exit)
            .usage("revoke exit <index> <user>")
            .describe("Remove a secondary owner from an exit here."),
        CommandSpec::new("revoke item", Category::Ownership, revoke_item)
            .usage("revoke item <id> <user>")
            .describe("Remove a secondary owner from an item."),
        CommandSpec::new("transfer room", Category::Ownership, transfer_room)
            .usage("transfer room <id> <user>")
            .describe("Make another user the primary owner of a room."),
        CommandSpec::new("transfer exit", Category::Ownership, transfer_exit)
            .usage("transfer exit <index> <user>")
            .describe("Make another user the primary owner of an exit here."),
        CommandSpec::new("transfer item", Category::Ownership, transfer_item)
            .usage("transfer item <id> <user>")
            .describe("Make another user the primary owner of an item."),
    ]
}

/// Apply `change` for `user` to `owners`, reporting refusals. Returns whether anything changed.
fn apply(ctx: &CommandContext<'_>, change: Change, owners: &mut Owners, user: &UserRecord, what: &str) -> bool {
    match change {
        Change::Grant => {
            if !owners.add(&user.name) {
                ctx.send(format!("{} already owns that {}.", user.nick, what));
                return false;
            }
        }
        Change::Revoke => {
            if owners.is_primary(&user.name) {
                ctx.send("The primary owner cannot be revoked; transfer the ownership first.");
                return false;
            }
            if !owners.remove(&user.name) {
                ctx.send(format!("{} does not own that {}.", user.nick, what));
                return false;
            }
        }
        Change::Transfer => {
            if owners.is_primary(&user.name) {
                ctx.send(format!("{} is already the primary owner.", user.nick));
                return false;
            }
            owners.promote(&user.name);
        }
    }
    true
}

fn announce(ctx: &CommandContext<'_>, change: Change, user: &UserRecord, subject: &str) {
    let (mine, theirs) = match change {
        Change::Grant => (
            format!("{} now co-owns {}.", user.nick, subject),
            format!("You are now an owner of {}.", subject),
        ),
        Change::Revoke => (
            format!("{} no longer owns {}.", user.nick, subject),
            format!("You no longer own {}.", subject),
        ),
        Change::Transfer => (
            format!("{} is now the primary owner of {}.", user.nick, subject),
            format!("You are now the primary owner of {}.", subject),
        ),
    };
    info!(
        "{:?} of {} to {} by {:?}",
        change,
        subject,
        user.name,
        ctx.console.user()
    );
    ctx.send(mine);
    if ctx.actor_name().as_deref() != Some(user.name.as_str()) {
        ctx.tell_user(&user.name, &theirs);
    }
}

fn room_owners(ctx: &mut CommandContext<'_>, args: &[String], change: Change) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(id) = parse_id(ctx, &args[0], "room id") else {
        return Ok(false);
    };
    let Some(mut room) = resolve_room(ctx, RoomRef::Id(id), change.access())? else {
        return Ok(false);
    };
    let Some(user) = resolve_user(ctx, &args[1], UserQuery::any())? else {
        return Ok(false);
    };
    if !apply(ctx, change, &mut room.owners, &user, "room") {
        return Ok(false);
    }
    let subject = format!("room #{} ({})", room.id, room.name);
    ctx.world.upsert_room(room)?;
    announce(ctx, change, &user, &subject);
    Ok(true)
}

fn exit_owners(ctx: &mut CommandContext<'_>, args: &[String], change: Change) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some((mut room, idx)) = resolve_exit(ctx, &args[0], RoomRef::Current, change.access())? else {
        return Ok(false);
    };
    let Some(user) = resolve_user(ctx, &args[1], UserQuery::any())? else {
        return Ok(false);
    };
    if !apply(ctx, change, &mut room.exits[idx].owners, &user, "exit") {
        return Ok(false);
    }
    let subject = format!("exit {} in {}", room.exits[idx].name, room.name);
    ctx.world.upsert_room(room)?;
    announce(ctx, change, &user, &subject);
    Ok(true)
}

fn item_owners(ctx: &mut CommandContext<'_>, args: &[String], change: Change) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], change.access())? else {
        return Ok(false);
    };
    let Some(user) = resolve_user(ctx, &args[1], UserQuery::any())? else {
        return Ok(false);
    };
    if !apply(ctx, change, &mut item.owners, &user, "item") {
        return Ok(false);
    }
    let subject = format!("item #{} ({})", item.id, item.name);
    ctx.world.upsert_item(item)?;
    announce(ctx, change, &user, &subject);
    Ok(true)
}

fn grant_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    room_owners(ctx, args, Change::Grant)
}

fn grant_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    exit_owners(ctx, args, Change::Grant)
}

fn grant_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    item_owners(ctx, args, Change::Grant)
}

fn revoke_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    room_owners(ctx, args, Change::Revoke)
}

fn revoke_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    exit_owners(ctx, args, Change::Revoke)
}

fn revoke_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    item_owners(ctx, args, Change::Revoke)
}

fn transfer_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    room_owners(ctx, args, Change::Transfer)
}

fn transfer_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    exit_owners(ctx, args, Change::Transfer)
}

fn transfer_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    item_owners(ctx, args, Change::Transfer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_revoke_need_different_rights() {
        assert_eq!(Change::Grant.access(), Access::owner());
        assert_eq!(Change::Revoke.access(), Access::primary());
        assert_eq!(Change::Transfer.access(), Access::primary());
        assert_ne!(Access::owner(), Access::primary());
    }
}
