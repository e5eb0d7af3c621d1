//! Talking to the room, the world and single users, plus posture.

use crate::commands::helpers::{
    check_args, find_item, resolve_user, ArgCheck, ItemScope, UserQuery,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::world::{Posture, PostureKind, WorldError};

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("say", Category::Social, say)
            .special('"')
            .usage("say <text>")
            .describe("Speak to everyone in the room."),
        CommandSpec::new("action", Category::Social, action)
            .aliases(&["emote"])
            .special(':')
            .usage("action <text>")
            .describe("Show the room what you are doing."),
        CommandSpec::new("chat", Category::Social, chat)
            .special('#')
            .usage("chat <text>")
            .describe("Talk on the world-wide chat channel."),
        CommandSpec::new("message", Category::Social, message)
            .aliases(&["tell"])
            .usage("message <user> <text>")
            .describe("Send a private message to someone online."),
        CommandSpec::new("sit", Category::Social, sit)
            .usage("sit [item]")
            .describe("Sit down, optionally on something in the room."),
        CommandSpec::new("lay", Category::Social, lay)
            .usage("lay [item]")
            .describe("Lie down, optionally on something in the room."),
        CommandSpec::new("stand", Category::Social, stand).describe("Get back on your feet."),
    ]
}

fn say(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    let text = args.join(" ");
    ctx.send(format!("You say, \"{}\"", text));
    ctx.broadcast_room(
        user.room,
        &format!("{} says, \"{}\"", user.nick, text),
        Some(&user.name),
    );
    Ok(true)
}

fn action(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    let line = format!("{} {}", user.nick, args.join(" "));
    ctx.broadcast_room(user.room, &line, None);
    Ok(true)
}

fn chat(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    if !user.settings.chat {
        ctx.send("Your chat is turned off. Use 'set chat on' first.");
        return Ok(false);
    }
    let line = format!("[chat] {}: {}", user.nick, args.join(" "));
    let sender = user.name.clone();
    ctx.router.broadcast_where(&*ctx.world, &line, |u| {
        u.settings.chat && !u.settings.ignore.contains(&sender)
    });
    Ok(true)
}

fn message(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let Some(target) = resolve_user(ctx, &args[0], UserQuery::any().online())? else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    if target.settings.ignore.contains(&user.name) {
        ctx.send(format!("{} is not accepting your messages.", target.nick));
        return Ok(false);
    }
    let text = args[1..].join(" ");
    ctx.tell_user(&target.name, &format!("{} tells you, \"{}\"", user.nick, text));
    ctx.send(format!("You tell {}, \"{}\"", target.nick, text));
    Ok(true)
}

fn take_posture(
    ctx: &mut CommandContext<'_>,
    args: &[String],
    kind: PostureKind,
) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().login()) {
        return Ok(false);
    }
    let anchor = if args.is_empty() {
        None
    } else {
        match find_item(ctx, &args.join(" "), ItemScope::Room)? {
            Some(item) => Some(item.name),
            None => return Ok(false),
        }
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    let wanted = Posture { kind, item: anchor };
    if user.posture.as_ref() == Some(&wanted) {
        ctx.send(format!("You are already {}.", kind.verb()));
        return Ok(false);
    }
    let place = match &wanted.item {
        Some(item) => format!(" on the {}", item),
        None => String::new(),
    };
    let verb = match kind {
        PostureKind::Sitting => ("sit", "sits"),
        PostureKind::Laying => ("lay", "lays"),
    };
    user.posture = Some(wanted);
    let (room, name, nick) = (user.room, user.name.clone(), user.nick.clone());
    ctx.world.upsert_user(user)?;
    ctx.send(format!("You {} down{}.", verb.0, place));
    ctx.broadcast_room(room, &format!("{} {} down{}.", nick, verb.1, place), Some(&name));
    Ok(true)
}

fn sit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    take_posture(ctx, args, PostureKind::Sitting)
}

fn lay(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    take_posture(ctx, args, PostureKind::Laying)
}

fn stand(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(0).login()) {
        return Ok(false);
    }
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    if user.posture.take().is_none() {
        ctx.send("You are already standing.");
        return Ok(false);
    }
    let (room, name, nick) = (user.room, user.name.clone(), user.nick.clone());
    ctx.world.upsert_user(user)?;
    ctx.send("You stand up.");
    ctx.broadcast_room(room, &format!("{} stands up.", nick), Some(&name));
    Ok(true)
}
