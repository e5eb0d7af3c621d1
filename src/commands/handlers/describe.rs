use crate::commands::helpers::{
    check_args, resolve_exit, resolve_item, resolve_room, Access, ArgCheck, RoomRef,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::validation::{validate_description, validate_entity_name};
use crate::world::WorldError;

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("describe room", Category::Building, describe_room)
            .usage("describe room <text>")
            .describe("Set the description of this room."),
        CommandSpec::new("describe exit", Category::Building, describe_exit)
            .usage("describe exit <index> <text>")
            .describe("Set the description of an exit here."),
        CommandSpec::new("describe item", Category::Building, describe_item)
            .usage("describe item <id> <text>")
            .describe("Set the description of an item."),
        CommandSpec::new("describe self", Category::Building, describe_self)
            .usage("describe self <text>")
            .describe("Set what others see when they look at you."),
        CommandSpec::new("rename room", Category::Building, rename_room)
            .usage("rename room <name>")
            .describe("Rename this room."),
        CommandSpec::new("rename exit", Category::Building, rename_exit)
            .usage("rename exit <index> <name>")
            .describe("Rename an exit here."),
        CommandSpec::new("rename item", Category::Building, rename_item)
            .usage("rename item <id> <name>")
            .describe("Rename an item."),
        CommandSpec::new("decorate exit", Category::Building, decorate_exit)
            .usage("decorate exit <index> <go|locked|entrance> [text]")
            .describe("Set the text shown when someone uses an exit; no text clears it."),
        CommandSpec::new("decorate item", Category::Building, decorate_item)
            .usage("decorate item <id> [text]")
            .describe("Set the text shown when someone uses an item; no text clears it."),
    ]
}

fn description(ctx: &CommandContext<'_>, words: &[String]) -> Option<String> {
    match validate_description(&words.join(" "), ctx.config.world.max_description_length) {
        Ok(text) => Some(text),
        Err(e) => {
            ctx.send(format!("{}.", e));
            None
        }
    }
}

fn name(ctx: &CommandContext<'_>, words: &[String]) -> Option<String> {
    match validate_entity_name(&words.join(" "), ctx.config.world.max_name_length) {
        Ok(text) => Some(text),
        Err(e) => {
            ctx.send(format!("{}.", e));
            None
        }
    }
}

fn describe_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(mut room) = resolve_room(ctx, RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    let Some(text) = description(ctx, args) else {
        return Ok(false);
    };
    room.description = text;
    ctx.world.upsert_room(room)?;
    ctx.send("Room description updated.");
    Ok(true)
}

fn describe_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let Some((mut room, idx)) = resolve_exit(ctx, &args[0], RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    let Some(text) = description(ctx, &args[1..]) else {
        return Ok(false);
    };
    room.exits[idx].description = text;
    ctx.world.upsert_room(room)?;
    ctx.send("Exit description updated.");
    Ok(true)
}

fn describe_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    let Some(text) = description(ctx, &args[1..]) else {
        return Ok(false);
    };
    item.description = text;
    ctx.world.upsert_item(item)?;
    ctx.send("Item description updated.");
    Ok(true)
}

fn describe_self(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(text) = description(ctx, args) else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    user.description = text;
    ctx.world.upsert_user(user)?;
    ctx.send("Your description has been updated.");
    Ok(true)
}

fn rename_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(mut room) = resolve_room(ctx, RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    let Some(new_name) = name(ctx, args) else {
        return Ok(false);
    };
    let old = std::mem::replace(&mut room.name, new_name.clone());
    let id = room.id;
    ctx.world.upsert_room(room)?;
    ctx.send(format!("Room #{} renamed from {} to {}.", id, old, new_name));
    Ok(true)
}

fn rename_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let Some((mut room, idx)) = resolve_exit(ctx, &args[0], RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    let Some(new_name) = name(ctx, &args[1..]) else {
        return Ok(false);
    };
    // The exit's own name may be recased.
    if room.exit_index(&new_name).map(|other| other != idx).unwrap_or(false) {
        ctx.send("Another exit here already has that name.");
        return Ok(false);
    }
    let old = std::mem::replace(&mut room.exits[idx].name, new_name.clone());
    ctx.world.upsert_room(room)?;
    ctx.send(format!("Exit {} renamed to {}.", old, new_name));
    Ok(true)
}

fn rename_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    let Some(new_name) = name(ctx, &args[1..]) else {
        return Ok(false);
    };
    if ctx.world.item_name_taken(&new_name, Some(item.id)) {
        ctx.send("An item with that name already exists.");
        return Ok(false);
    }
    let old = std::mem::replace(&mut item.name, new_name.clone());
    ctx.world.upsert_item(item)?;
    ctx.send(format!("{} renamed to {}.", old, new_name));
    Ok(true)
}

fn decorate_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let kind = args[1].to_ascii_lowercase();
    if !matches!(kind.as_str(), "go" | "locked" | "entrance") {
        ctx.usage();
        return Ok(false);
    }
    let Some((mut room, idx)) = resolve_exit(ctx, &args[0], RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    let Some(text) = description(ctx, &args[2..]) else {
        return Ok(false);
    };
    let value = (!text.is_empty()).then_some(text);
    let cleared = value.is_none();
    let actions = &mut room.exits[idx].actions;
    match kind.as_str() {
        "go" => actions.go = value,
        "locked" => actions.locked = value,
        _ => actions.entrance = value,
    }
    ctx.world.upsert_room(room)?;
    if cleared {
        ctx.send(format!("The {} text has been cleared.", kind));
    } else {
        ctx.send(format!("The {} text has been set.", kind));
    }
    Ok(true)
}

fn decorate_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    let Some(text) = description(ctx, &args[1..]) else {
        return Ok(false);
    };
    item.action = (!text.is_empty()).then_some(text);
    let cleared = item.action.is_none();
    ctx.world.upsert_item(item)?;
    ctx.send(if cleared {
        "The use text has been cleared."
    } else {
        "The use text has been set."
    });
    Ok(true)
}
