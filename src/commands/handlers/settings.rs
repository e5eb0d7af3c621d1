use crate::commands::helpers::{check_args, parse_toggle, resolve_user, ArgCheck, UserQuery};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::validation::{validate_username, UsernameRules};
use crate::world::{Pronouns, UserSettings, WorldError};

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("set nickname", Category::Settings, set_nickname)
            .aliases(&["nick"])
            .usage("set nickname <nickname>")
            .describe("Change the name others see."),
        CommandSpec::new("set pronouns", Category::Settings, set_pronouns)
            .usage("set pronouns <female|male|neutral|custom <they> <them> <their> <theirs> <themself>>")
            .describe("Choose the pronouns used in action texts."),
        CommandSpec::new("set autolook", Category::Settings, set_autolook)
            .usage("set autolook <on|off>")
            .describe("Look around automatically after moving."),
        CommandSpec::new("set chat", Category::Settings, set_chat)
            .usage("set chat <on|off>")
            .describe("Send and receive global chat."),
        CommandSpec::new("set echo", Category::Settings, set_echo)
            .usage("set echo <on|off>")
            .describe("Echo each command back before running it."),
        CommandSpec::new("ignore", Category::Settings, ignore)
            .usage("ignore <user>")
            .describe("Stop receiving chat and messages from a user."),
        CommandSpec::new("unignore", Category::Settings, unignore)
            .usage("unignore <user>")
            .describe("Receive chat and messages from a user again."),
    ]
}

fn set_nickname(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    let rules = UsernameRules::user(&ctx.config.world.root_user);
    let nick = match validate_username(&args[0], &rules) {
        Ok(n) => n,
        Err(e) => {
            ctx.send(format!("{}.", e).replace("Username", "Nickname"));
            return Ok(false);
        }
    };
    if ctx.world.nick_taken(&nick, &user.name) {
        ctx.send("That nickname is already in use.");
        return Ok(false);
    }
    let old = std::mem::replace(&mut user.nick, nick.clone());
    let (room, name) = (user.room, user.name.clone());
    ctx.world.upsert_user(user)?;
    ctx.send(format!("You are now known as {}.", nick));
    ctx.broadcast_room(room, &format!("{} is now known as {}.", old, nick), Some(&name));
    Ok(true)
}

fn set_pronouns(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let pronouns = if args[0].eq_ignore_ascii_case("custom") {
        if args.len() != 6 {
            ctx.usage();
            return Ok(false);
        }
        Pronouns::Custom([
            args[1].to_ascii_lowercase(),
            args[2].to_ascii_lowercase(),
            args[3].to_ascii_lowercase(),
            args[4].to_ascii_lowercase(),
            args[5].to_ascii_lowercase(),
        ])
    } else {
        match (args.len(), Pronouns::parse_fixed(&args[0])) {
            (1, Some(p)) => p,
            _ => {
                ctx.usage();
                return Ok(false);
            }
        }
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    ctx.send(format!("Your pronouns are now {}.", pronouns));
    user.pronouns = pronouns;
    ctx.world.upsert_user(user)?;
    Ok(true)
}

fn toggle(
    ctx: &mut CommandContext<'_>,
    args: &[String],
    label: &str,
    field: fn(&mut UserSettings) -> &mut bool,
) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(value) = parse_toggle(ctx, &args[0]) else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    *field(&mut user.settings) = value;
    ctx.world.upsert_user(user)?;
    ctx.send(format!("{} is now {}.", label, if value { "on" } else { "off" }));
    Ok(true)
}

fn autolook_field(s: &mut UserSettings) -> &mut bool {
    &mut s.autolook
}

fn chat_field(s: &mut UserSettings) -> &mut bool {
    &mut s.chat
}

fn echo_field(s: &mut UserSettings) -> &mut bool {
    &mut s.echo
}

fn set_autolook(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    toggle(ctx, args, "Autolook", autolook_field)
}

fn set_chat(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    toggle(ctx, args, "Chat", chat_field)
}

fn set_echo(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    toggle(ctx, args, "Echo", echo_field)
}

fn ignore(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(target) = resolve_user(ctx, &args[0], UserQuery::any())? else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    if target.name == user.name {
        ctx.send("You can't ignore yourself.");
        return Ok(false);
    }
    if !user.settings.ignore.insert(target.name.clone()) {
        ctx.send(format!("You are already ignoring {}.", target.nick));
        return Ok(false);
    }
    ctx.world.upsert_user(user)?;
    ctx.send(format!("You are now ignoring {}.", target.nick));
    Ok(true)
}

fn unignore(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(target) = resolve_user(ctx, &args[0], UserQuery::any())? else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    if !user.settings.ignore.remove(&target.name) {
        ctx.send(format!("You are not ignoring {}.", target.nick));
        return Ok(false);
    }
    ctx.world.upsert_user(user)?;
    ctx.send(format!("You are no longer ignoring {}.", target.nick));
    Ok(true)
}
