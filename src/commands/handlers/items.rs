//! Carrying, using and configuring items.
//!
//! Duplified items copy instead of moving when their owner hands them out,
//! and a non-owner's copy simply disappears when dropped, given or loaded.
//! Glued items cannot be picked up and cursed items cannot be let go of by
//! anyone but their owners (and wizards).

use log::{info, warn};

use crate::commands::helpers::{
    check_args, find_item, parse_id, relocate, resolve_item, resolve_item_id, resolve_room,
    resolve_user, Access, ArgCheck, ItemScope, RoomRef, UserQuery,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::world::{substitute, ItemId, ItemRecord, UserRecord, WorldError};

use super::building::inbound_allowed;
use super::info::autolook;

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("get", Category::Items, get)
            .aliases(&["take"])
            .usage("get <item>")
            .describe("Pick up an item in this room."),
        CommandSpec::new("drop", Category::Items, drop_item)
            .usage("drop <item>")
            .describe("Put down an item you carry."),
        CommandSpec::new("give", Category::Items, give)
            .usage("give <user> <item>")
            .describe("Hand an item to someone in this room."),
        CommandSpec::new("use", Category::Items, use_item)
            .usage("use <item>")
            .describe("Use an item you carry or one in this room."),
        CommandSpec::new("read", Category::Items, read)
            .usage("read <item>")
            .describe("Read an item; books teach their language."),
        CommandSpec::new("duplify item", Category::Items, duplify_item)
            .usage("duplify item <id>")
            .describe("Let an item exist in many inventories at once."),
        CommandSpec::new("unduplify item", Category::Items, unduplify_item)
            .usage("unduplify item <id>")
            .describe("Make an item unique again; stray copies return to the owner."),
        CommandSpec::new("glue item", Category::Items, glue_item)
            .usage("glue item <id>")
            .describe("Stop others from picking an item up."),
        CommandSpec::new("unglue item", Category::Items, unglue_item)
            .usage("unglue item <id>")
            .describe("Let others pick an item up again."),
        CommandSpec::new("curse item", Category::Items, curse_item)
            .usage("curse item <id>")
            .describe("Stop others from dropping or giving away an item."),
        CommandSpec::new("uncurse item", Category::Items, uncurse_item)
            .usage("uncurse item <id>")
            .describe("Lift the curse from an item."),
        CommandSpec::new("hide item", Category::Items, hide_item)
            .usage("hide item <id>")
            .describe("Toggle whether an item is listed in rooms."),
        CommandSpec::new("truehide item", Category::Items, truehide_item)
            .usage("truehide item <id>")
            .describe("Toggle whether an item is listed even to its owners."),
        CommandSpec::new("chance item", Category::Items, chance_item)
            .usage("chance item <id> <n>")
            .describe("List an item only one time in n; 1 always lists it."),
        CommandSpec::new("container item", Category::Items, container_item)
            .usage("container item <id>")
            .describe("Toggle whether an item can hold other items."),
        CommandSpec::new("telekey item", Category::Items, telekey_item)
            .usage("telekey item <id> <room id|none>")
            .describe("Make using an item carry its holder to a room."),
        CommandSpec::new("book item", Category::Items, book_item)
            .usage("book item <id> <language|none>")
            .describe("Make reading an item teach a language."),
        CommandSpec::new("load item", Category::Items, load_item)
            .usage("load item <item id> <container id>")
            .describe("Put an item you carry into a container."),
        CommandSpec::new("unload item", Category::Items, unload_item)
            .usage("unload item <item id> <container id>")
            .describe("Take an item out of a container."),
    ]
}

fn privileged(user: &UserRecord, item: &ItemRecord) -> bool {
    user.wizard || item.owners.is_owner(&user.name)
}

fn get(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(item) = find_item(ctx, &args.join(" "), ItemScope::Room)? else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    let owner = privileged(&user, &item);
    if item.glued && !owner {
        ctx.send(format!("The {} won't budge.", item.name));
        return Ok(false);
    }
    if user.holds(item.id) {
        ctx.send(format!("You already carry the {}.", item.name));
        return Ok(false);
    }
    // A non-owner takes a copy of a duplified item and leaves the original.
    if !(item.duplified && !owner) {
        if let Some(mut room) = ctx.world.get_room(user.room) {
            room.items.retain(|i| *i != item.id);
            ctx.world.upsert_room(room)?;
        }
    }
    user.inventory.push(item.id);
    let (room, name, nick) = (user.room, user.name.clone(), user.nick.clone());
    ctx.world.upsert_user(user)?;
    ctx.send(format!("You pick up the {}.", item.name));
    ctx.broadcast_room(room, &format!("{} picks up the {}.", nick, item.name), Some(&name));
    Ok(true)
}

fn drop_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(item) = find_item(ctx, &args.join(" "), ItemScope::Inventory)? else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    let owner = privileged(&user, &item);
    if item.cursed.enabled && !owner {
        ctx.send(format!("The {} clings to your hand.", item.name));
        return Ok(false);
    }
    user.inventory.retain(|i| *i != item.id);
    let (room_id, name, nick) = (user.room, user.name.clone(), user.nick.clone());
    ctx.world.upsert_user(user)?;

    if item.duplified && !owner {
        ctx.send(format!("The {} fades away as it leaves your hand.", item.name));
        return Ok(true);
    }
    if let Some(mut room) = ctx.world.get_room(room_id) {
        if !room.items.contains(&item.id) {
            room.items.push(item.id);
            ctx.world.upsert_room(room)?;
        }
    }
    ctx.send(format!("You drop the {}.", item.name));
    ctx.broadcast_room(room_id, &format!("{} drops the {}.", nick, item.name), Some(&name));
    Ok(true)
}

fn give(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let Some(target) = resolve_user(ctx, &args[0], UserQuery::any().same_room())? else {
        return Ok(false);
    };
    let Some(item) = find_item(ctx, &args[1..].join(" "), ItemScope::Inventory)? else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    if target.name == user.name {
        ctx.send("You already have it.");
        return Ok(false);
    }
    let owner = privileged(&user, &item);
    if item.cursed.enabled && !owner {
        ctx.send(format!("The {} refuses to leave your hand.", item.name));
        return Ok(false);
    }
    let Some(mut receiver) = ctx.world.get_user(&target.name) else {
        return Ok(false);
    };
    if receiver.holds(item.id) {
        ctx.send(format!("{} already has the {}.", receiver.nick, item.name));
        return Ok(false);
    }
    // Owners hand out copies of duplified items and keep their own.
    if !(item.duplified && owner) {
        user.inventory.retain(|i| *i != item.id);
        ctx.world.upsert_user(user.clone())?;
    }
    receiver.inventory.push(item.id);
    let receiver_name = receiver.name.clone();
    let receiver_nick = receiver.nick.clone();
    ctx.world.upsert_user(receiver)?;
    ctx.send(format!("You give the {} to {}.", item.name, receiver_nick));
    ctx.tell_user(&receiver_name, &format!("{} gives you the {}.", user.nick, item.name));
    Ok(true)
}

fn use_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(item) = find_item(ctx, &args.join(" "), ItemScope::Anywhere)? else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    let mut acted = false;
    if let Some(text) = &item.action {
        let line = substitute(text, &user.nick, &user.pronouns);
        ctx.send(line.clone());
        ctx.broadcast_room(user.room, &line, Some(&user.name));
        acted = true;
    }
    if let Some(dest) = item.telekey {
        if !user.holds(item.id) {
            ctx.send(format!("You must be carrying the {} to travel with it.", item.name));
            return Ok(acted);
        }
        if ctx.world.room(dest).is_none() {
            warn!("Telekey item {} points at missing room {}", item.id, dest);
            ctx.send(format!("The {} flickers, but nothing happens.", item.name));
            return Ok(acted);
        }
        if dest != user.room {
            let departure = format!("{} vanishes with a flash of the {}.", user.nick, item.name);
            let arrival = format!("{} appears in a flash of light.", user.nick);
            relocate(ctx, user, dest, &departure, &arrival)?;
            autolook(ctx)?;
            return Ok(true);
        }
        acted = true;
    }
    if !acted {
        ctx.send(format!("Nothing happens when you use the {}.", item.name));
    }
    Ok(true)
}

fn read(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(item) = find_item(ctx, &args.join(" "), ItemScope::Anywhere)? else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    if !item.description.is_empty() {
        ctx.send(item.description.clone());
    }
    match &item.language {
        Some(language) => {
            if user.settings.language.as_deref() == Some(language.as_str()) {
                ctx.send(format!("You already know {}.", language));
                return Ok(true);
            }
            user.settings.language = Some(language.clone());
            ctx.world.upsert_user(user)?;
            ctx.send(format!("You study the {} and learn {}.", item.name, language));
        }
        None if item.description.is_empty() => {
            ctx.send(format!("There is nothing to read on the {}.", item.name));
        }
        None => {}
    }
    Ok(true)
}

/// Set an item flag with owner access, reporting no-op requests.
fn set_item_flag(
    ctx: &mut CommandContext<'_>,
    args: &[String],
    field: fn(&mut ItemRecord) -> &mut bool,
    value: bool,
    done: &str,
) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    let flag = field(&mut item);
    if *flag == value {
        ctx.send(format!("Nothing changes; the {} is already {}.", item.name, done));
        return Ok(false);
    }
    *flag = value;
    let msg = format!("The {} is now {}.", item.name, done);
    ctx.world.upsert_item(item)?;
    ctx.send(msg);
    Ok(true)
}

fn duplified(i: &mut ItemRecord) -> &mut bool {
    &mut i.duplified
}

fn glued(i: &mut ItemRecord) -> &mut bool {
    &mut i.glued
}

fn cursed(i: &mut ItemRecord) -> &mut bool {
    &mut i.cursed.enabled
}

fn duplify_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_item_flag(ctx, args, duplified, true, "duplified")
}

/// Number of places (rooms, inventories, containers) that list `id`.
fn copies(ctx: &CommandContext<'_>, id: ItemId) -> usize {
    ctx.world.all_rooms().filter(|r| r.items.contains(&id)).count()
        + ctx.world.holders(id).len()
        + ctx
            .world
            .all_items()
            .filter(|i| i.container.items.contains(&id))
            .count()
}

fn unduplify_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    let id = args.first().and_then(|a| a.trim_start_matches('#').parse::<ItemId>().ok());
    if !set_item_flag(ctx, args, duplified, false, "unique")? {
        return Ok(false);
    }
    // Collapse the outstanding copies into one.
    if let Some(id) = id {
        if copies(ctx, id) > 1 {
            ctx.world.return_item(id)?;
            ctx.send("Its copies have been gathered back to the primary owner.");
        }
    }
    Ok(true)
}

fn glue_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_item_flag(ctx, args, glued, true, "glued")
}

fn unglue_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_item_flag(ctx, args, glued, false, "unglued")
}

fn curse_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_item_flag(ctx, args, cursed, true, "cursed")
}

fn uncurse_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_item_flag(ctx, args, cursed, false, "uncursed")
}

fn hide_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    item.hidden = !item.hidden;
    let msg = format!(
        "The {} is now {}.",
        item.name,
        if item.hidden { "hidden" } else { "visible" }
    );
    ctx.world.upsert_item(item)?;
    ctx.send(msg);
    Ok(true)
}

fn truehide_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    item.truehide = !item.truehide;
    let msg = if item.truehide {
        format!("The {} is now hidden from everyone, you included.", item.name)
    } else {
        format!("The {} is no longer truly hidden.", item.name)
    };
    ctx.world.upsert_item(item)?;
    ctx.send(msg);
    Ok(true)
}

fn chance_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let chance = match args[1].parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => {
            ctx.send("The chance must be a whole number of at least 1.");
            return Ok(false);
        }
    };
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    item.chance = chance;
    let msg = if chance == 1 {
        format!("The {} is always listed.", item.name)
    } else {
        format!("The {} is listed one time in {}.", item.name, chance)
    };
    ctx.world.upsert_item(item)?;
    ctx.send(msg);
    Ok(true)
}

fn container_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    if item.container.enabled && !item.container.items.is_empty() {
        ctx.send(format!("Empty the {} first.", item.name));
        return Ok(false);
    }
    item.container.enabled = !item.container.enabled;
    let msg = if item.container.enabled {
        format!("The {} can now hold other items.", item.name)
    } else {
        format!("The {} is no longer a container.", item.name)
    };
    ctx.world.upsert_item(item)?;
    ctx.send(msg);
    Ok(true)
}

fn telekey_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    if args[1].eq_ignore_ascii_case("none") {
        item.telekey = None;
        let msg = format!("The {} no longer leads anywhere.", item.name);
        ctx.world.upsert_item(item)?;
        ctx.send(msg);
        return Ok(true);
    }
    let Some(target) = RoomRef::from_arg(ctx, args.get(1)) else {
        return Ok(false);
    };
    let Some(room) = resolve_room(ctx, target, Access::any())? else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    if !inbound_allowed(ctx, &user, &room) {
        return Ok(false);
    }
    item.telekey = Some(room.id);
    let msg = format!("The {} now leads to {} (#{}).", item.name, room.name, room.id);
    ctx.world.upsert_item(item)?;
    ctx.send(msg);
    Ok(true)
}

fn book_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(mut item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    let language = args[1].to_ascii_lowercase();
    let msg = if language == "none" {
        item.language = None;
        format!("The {} is no longer a book.", item.name)
    } else if !language.chars().all(|c| c.is_ascii_alphabetic()) {
        ctx.send("A language name may only contain letters.");
        return Ok(false);
    } else {
        let msg = format!("The {} now teaches {}.", item.name, language);
        item.language = Some(language);
        msg
    };
    ctx.world.upsert_item(item)?;
    ctx.send(msg);
    Ok(true)
}

/// A container the caller can reach: carried, or lying in the current room.
fn reachable_container(
    ctx: &mut CommandContext<'_>,
    id: &str,
) -> Result<Option<ItemRecord>, WorldError> {
    let Some(container) = resolve_item(ctx, id, Access::any())? else {
        return Ok(None);
    };
    let Some(user) = ctx.actor() else {
        return Ok(None);
    };
    let in_room = ctx
        .world
        .room(user.room)
        .map(|r| r.items.contains(&container.id))
        .unwrap_or(false);
    if !user.holds(container.id) && !in_room && !user.wizard {
        ctx.send(format!("The {} is out of reach.", container.name));
        return Ok(None);
    }
    if !container.container.enabled {
        ctx.send(format!("The {} is not a container.", container.name));
        return Ok(None);
    }
    Ok(Some(container))
}

fn load_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(item) = resolve_item(ctx, &args[0], Access::any().holding())? else {
        return Ok(false);
    };
    let Some(mut container) = reachable_container(ctx, &args[1])? else {
        return Ok(false);
    };
    if ctx.world.contains_nested(item.id, container.id) {
        ctx.send(format!("The {} cannot go inside itself.", item.name));
        return Ok(false);
    }
    if container.container.items.contains(&item.id) {
        ctx.send(format!("The {} is already inside the {}.", item.name, container.name));
        return Ok(false);
    }
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    let owner = privileged(&user, &item);
    if item.cursed.enabled && !owner {
        ctx.send(format!("The {} refuses to leave your hand.", item.name));
        return Ok(false);
    }
    if item.duplified && owner {
        // the owner keeps their copy
    } else if user.holds(item.id) {
        user.inventory.retain(|i| *i != item.id);
        ctx.world.upsert_user(user)?;
    } else {
        // wizard moving an item it does not carry
        ctx.world.remove_item_everywhere(item.id)?;
    }
    container.container.items.push(item.id);
    let msg = format!("You put the {} into the {}.", item.name, container.name);
    ctx.world.upsert_item(container)?;
    ctx.send(msg);
    Ok(true)
}

fn unload_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(mut container) = reachable_container(ctx, &args[1])? else {
        return Ok(false);
    };
    let Some(item_id) = parse_id(ctx, &args[0], "item id") else {
        return Ok(false);
    };
    if !container.container.items.contains(&item_id) {
        ctx.send(format!("That is not inside the {}.", container.name));
        return Ok(false);
    }
    let Some(item) = resolve_item_id(ctx, item_id, Access::any())? else {
        return Ok(false);
    };
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    container.container.items.retain(|i| *i != item.id);
    ctx.world.upsert_item(container.clone())?;
    if !user.holds(item.id) {
        user.inventory.push(item.id);
        ctx.world.upsert_user(user)?;
    }
    info!(
        "{} took item {} out of container {}",
        ctx.console.user().unwrap_or("?"),
        item.id,
        container.id
    );
    ctx.send(format!("You take the {} out of the {}.", item.name, container.name));
    Ok(true)
}
