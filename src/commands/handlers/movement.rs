use log::error;

use crate::commands::helpers::{
    check_args, find_exit, parse_id, relocate, resolve_room, Access, ArgCheck, RoomRef,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::world::{substitute, Exit, RoomRecord, UserRecord, WorldError, ROOT_ROOM_ID};

use super::info::autolook;

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("go", Category::Movement, go)
            .aliases(&["move", "walk"])
            .usage("go <exit>")
            .describe("Leave through an exit."),
        CommandSpec::new("teleport", Category::Movement, teleport)
            .aliases(&["tp"])
            .usage("teleport <room id>")
            .describe("Jump straight to a room."),
        CommandSpec::new("xyzzy", Category::Movement, xyzzy)
            .aliases(&["home"])
            .describe("Return to the root room."),
    ]
}

/// Owners of the exit or its room, wizards and key holders pass a locked exit.
fn may_pass(user: &UserRecord, room: &RoomRecord, exit: &Exit) -> bool {
    !exit.locked
        || user.wizard
        || exit.owners.is_owner(&user.name)
        || room.owners.is_owner(&user.name)
        || exit.key.map(|k| user.holds(k)).unwrap_or(false)
}

fn go(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(room) = resolve_room(ctx, RoomRef::Current, Access::any())? else {
        return Ok(false);
    };
    let Some(idx) = find_exit(ctx, &room, &args.join(" ")) else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    let exit = &room.exits[idx];

    if !may_pass(&user, &room, exit) {
        let text = match &exit.actions.locked {
            Some(t) => substitute(t, &user.nick, &user.pronouns),
            None => format!("{} tries the {}, but it is locked.", user.nick, exit.name),
        };
        ctx.send(format!("The {} is locked.", exit.name));
        ctx.broadcast_room(room.id, &text, Some(&user.name));
        return Ok(false);
    }

    if ctx.world.room(exit.dest).is_none() {
        error!(
            "Exit '{}' in room {} leads to missing room {}",
            exit.name, room.id, exit.dest
        );
        ctx.send("That exit leads nowhere. The problem has been logged.");
        return Ok(false);
    }

    let departure = match &exit.actions.go {
        Some(t) => substitute(t, &user.nick, &user.pronouns),
        None => format!("{} leaves through the {}.", user.nick, exit.name),
    };
    let arrival = match &exit.actions.entrance {
        Some(t) => substitute(t, &user.nick, &user.pronouns),
        None => format!("{} arrives.", user.nick),
    };
    ctx.send(format!("You go through the {}.", exit.name));
    let dest = exit.dest;
    relocate(ctx, user, dest, &departure, &arrival)?;
    autolook(ctx)?;
    Ok(true)
}

fn teleport(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(id) = parse_id(ctx, &args[0], "room id") else {
        return Ok(false);
    };
    let Some(target) = resolve_room(ctx, RoomRef::Id(id), Access::any())? else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    if target.sealed.inbound && !user.wizard && !target.owners.is_owner(&user.name) {
        ctx.send("That room is sealed.");
        return Ok(false);
    }
    if user.room == target.id {
        ctx.send("You are already there.");
        return Ok(false);
    }
    let departure = format!("{} vanishes.", user.nick);
    let arrival = format!("{} appears out of thin air.", user.nick);
    relocate(ctx, user, target.id, &departure, &arrival)?;
    autolook(ctx)?;
    Ok(true)
}

fn xyzzy(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(0).login()) {
        return Ok(false);
    }
    if ctx.world.room(ROOT_ROOM_ID).is_none() {
        return Err(WorldError::Integrity(format!(
            "root room {} is missing",
            ROOT_ROOM_ID
        )));
    }
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    let departure = format!(
        "{} utters a strange word and vanishes in a puff of smoke.",
        user.nick
    );
    let arrival = format!("{} appears in a puff of smoke.", user.nick);
    ctx.send("Nothing happens... then everything happens at once.");
    relocate(ctx, user, ROOT_ROOM_ID, &departure, &arrival)?;
    autolook(ctx)?;
    Ok(true)
}
