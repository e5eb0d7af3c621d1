//! Creating, destroying and restructuring rooms, exits and items.

use log::info;

use crate::commands::helpers::{
    check_args, outbound_seal_allows, parse_id, relocate, resolve_exit, resolve_item,
    resolve_room, Access, ArgCheck, RoomRef,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::validation::validate_entity_name;
use crate::world::{
    Exit, ItemRecord, RoomId, RoomRecord, Sealing, UserRecord, WorldError, ROOT_ROOM_ID,
};

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("make room", Category::Building, make_room)
            .usage("make room <name>")
            .describe("Create a new room that you own."),
        CommandSpec::new("make exit", Category::Building, make_exit)
            .usage("make exit <destination room id> <name>")
            .describe("Create an exit from here to another room."),
        CommandSpec::new("make item", Category::Building, make_item)
            .usage("make item <name>")
            .describe("Create a new item in your inventory."),
        CommandSpec::new("break room", Category::Building, break_room)
            .usage("break room <id>")
            .describe("Destroy a room; its items go back to their owners."),
        CommandSpec::new("break exit", Category::Building, break_exit)
            .usage("break exit <index>")
            .describe("Remove an exit from this room."),
        CommandSpec::new("break item", Category::Building, break_item)
            .usage("break item <id>")
            .describe("Destroy an item and every copy of it."),
        CommandSpec::new("relink exit", Category::Building, relink_exit)
            .usage("relink exit <index> <destination room id>")
            .describe("Point an exit at a different room."),
        CommandSpec::new("purge exits", Category::Building, purge_exits)
            .usage("purge exits [room id]")
            .describe("Remove every exit of a room."),
        CommandSpec::new("remake room", Category::Building, remake_room)
            .usage("remake room <id>")
            .describe("Reset a room: clear its description, exits, seals and items."),
        CommandSpec::new("return room", Category::Building, return_room)
            .usage("return room [id]")
            .describe("Send every item in a room back to its primary owner."),
        CommandSpec::new("return item", Category::Building, return_item)
            .usage("return item <id>")
            .describe("Send an item back to its primary owner."),
    ]
}

fn entity_name(ctx: &CommandContext<'_>, words: &[String]) -> Option<String> {
    match validate_entity_name(&words.join(" "), ctx.config.world.max_name_length) {
        Ok(name) => Some(name),
        Err(e) => {
            ctx.send(format!("{}.", e));
            None
        }
    }
}

/// A new exit into `dest` needs it unsealed inbound, unless the principal owns it.
pub fn inbound_allowed(ctx: &CommandContext<'_>, user: &UserRecord, dest: &RoomRecord) -> bool {
    if dest.sealed.inbound && !user.wizard && !dest.owners.is_owner(&user.name) {
        ctx.send("That room is sealed against new entrances.");
        return false;
    }
    true
}

fn make_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(name) = entity_name(ctx, args) else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    let id = ctx.world.next_room_id()?;
    ctx.world.upsert_room(RoomRecord::new(id, &name, &user.name))?;
    info!("{} created room {} '{}'", user.name, id, name);
    ctx.send(format!("Created room #{}: {}.", id, name));
    Ok(true)
}

fn make_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(2).login()) {
        return Ok(false);
    }
    let Some(dest_id) = parse_id(ctx, &args[0], "destination room id") else {
        return Ok(false);
    };
    let Some(mut here) = resolve_room(ctx, RoomRef::Current, Access::any())? else {
        return Ok(false);
    };
    let Some(dest) = resolve_room(ctx, RoomRef::Id(dest_id), Access::any())? else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    if !outbound_seal_allows(ctx, &Access::owner(), &here) {
        return Ok(false);
    }
    if !inbound_allowed(ctx, &user, &dest) {
        return Ok(false);
    }
    let Some(name) = entity_name(ctx, &args[1..]) else {
        return Ok(false);
    };
    if here.exit_index(&name).is_some() {
        ctx.send("An exit with that name already exists here.");
        return Ok(false);
    }
    here.exits.push(Exit::new(&name, dest.id, &user.name));
    let idx = here.exits.len() - 1;
    ctx.world.upsert_room(here)?;
    ctx.send(format!(
        "Created exit [{}] {} leading to {} (#{}).",
        idx, name, dest.name, dest.id
    ));
    Ok(true)
}

fn make_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().min(1).login()) {
        return Ok(false);
    }
    let Some(name) = entity_name(ctx, args) else {
        return Ok(false);
    };
    if ctx.world.item_name_taken(&name, None) {
        ctx.send("An item with that name already exists.");
        return Ok(false);
    }
    let Some(mut user) = ctx.actor() else {
        return Ok(false);
    };
    let id = ctx.world.next_item_id();
    ctx.world.upsert_item(ItemRecord::new(id, &name, &user.name))?;
    user.inventory.push(id);
    ctx.world.upsert_user(user)?;
    ctx.send(format!("Created item #{}: {}.", id, name));
    Ok(true)
}

/// Return every item listed in the room to its primary owner. Returns how many moved.
fn return_room_items(ctx: &mut CommandContext<'_>, room: RoomId) -> Result<usize, WorldError> {
    let items = ctx.world.room(room).map(|r| r.items.clone()).unwrap_or_default();
    for id in &items {
        ctx.world.return_item(*id)?;
    }
    Ok(items.len())
}

fn break_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(id) = parse_id(ctx, &args[0], "room id") else {
        return Ok(false);
    };
    if id == ROOT_ROOM_ID {
        ctx.send("The root room cannot be broken.");
        return Ok(false);
    }
    let Some(room) = resolve_room(ctx, RoomRef::Id(id), Access::primary())? else {
        return Ok(false);
    };

    return_room_items(ctx, id)?;

    // Exits elsewhere that lead here.
    for source in room.entrances.iter().copied().filter(|s| *s != id) {
        if let Some(mut other) = ctx.world.get_room(source) {
            other.exits.retain(|e| e.dest != id);
            ctx.world.upsert_room(other)?;
        }
    }

    let residents: Vec<UserRecord> = ctx.world.all_users().filter(|u| u.room == id).cloned().collect();
    for mut resident in residents {
        if ctx.world.is_online(&resident.name) {
            ctx.tell_user(&resident.name, "The room dissolves around you.");
            let departure = format!("{} is swept away.", resident.nick);
            let arrival = format!("{} is dropped here from a collapsing room.", resident.nick);
            relocate(ctx, resident, ROOT_ROOM_ID, &departure, &arrival)?;
        } else {
            resident.room = ROOT_ROOM_ID;
            ctx.world.upsert_user(resident)?;
        }
    }

    ctx.world.delete_room(id)?;
    info!("Room {} '{}' broken by {:?}", id, room.name, ctx.console.user());
    ctx.send(format!("Room #{} ({}) has been broken.", id, room.name));
    Ok(true)
}

fn break_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some((mut room, idx)) = resolve_exit(ctx, &args[0], RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    let exit = room.exits.remove(idx);
    ctx.world.upsert_room(room)?;
    ctx.send(format!("Exit {} removed.", exit.name));
    Ok(true)
}

fn break_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(item) = resolve_item(ctx, &args[0], Access::primary())? else {
        return Ok(false);
    };
    for inner in &item.container.items {
        ctx.world.return_item(*inner)?;
    }
    ctx.world.remove_item_everywhere(item.id)?;
    ctx.world.delete_item(item.id)?;
    ctx.send(format!("{} has been destroyed.", item.name));
    Ok(true)
}

fn relink_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let Some(dest_id) = parse_id(ctx, &args[1], "destination room id") else {
        return Ok(false);
    };
    let Some((mut room, idx)) = resolve_exit(ctx, &args[0], RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    let Some(dest) = resolve_room(ctx, RoomRef::Id(dest_id), Access::any())? else {
        return Ok(false);
    };
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    if !inbound_allowed(ctx, &user, &dest) {
        return Ok(false);
    }
    room.exits[idx].dest = dest.id;
    let name = room.exits[idx].name.clone();
    ctx.world.upsert_room(room)?;
    ctx.send(format!("Exit {} now leads to {} (#{}).", name, dest.name, dest.id));
    Ok(true)
}

fn purge_exits(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().max(1).login()) {
        return Ok(false);
    }
    let Some(target) = RoomRef::from_arg(ctx, args.first()) else {
        return Ok(false);
    };
    let Some(room) = resolve_room(ctx, target, Access::owner())? else {
        return Ok(false);
    };
    // Indices shift on removal, so remove from the back.
    let count = room.exits.len();
    let mut current = room;
    for idx in (0..count).rev() {
        current.exits.remove(idx);
        ctx.world.upsert_room(current.clone())?;
    }
    ctx.send(format!("Removed {} exit(s).", count));
    Ok(true)
}

fn remake_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(id) = parse_id(ctx, &args[0], "room id") else {
        return Ok(false);
    };
    let Some(_) = resolve_room(ctx, RoomRef::Id(id), Access::primary())? else {
        return Ok(false);
    };
    let returned = return_room_items(ctx, id)?;
    let Some(mut room) = ctx.world.get_room(id) else {
        return Ok(false);
    };
    room.description.clear();
    room.exits.clear();
    room.sealed = Sealing::default();
    ctx.world.upsert_room(room)?;
    ctx.send(format!(
        "Room #{} has been remade; {} item(s) returned to their owners.",
        id, returned
    ));
    Ok(true)
}

fn return_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().max(1).login()) {
        return Ok(false);
    }
    let Some(target) = RoomRef::from_arg(ctx, args.first()) else {
        return Ok(false);
    };
    let Some(room) = resolve_room(ctx, target, Access::owner())? else {
        return Ok(false);
    };
    let returned = return_room_items(ctx, room.id)?;
    ctx.send(format!("Returned {} item(s) to their owners.", returned));
    Ok(true)
}

fn return_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(item) = resolve_item(ctx, &args[0], Access::owner())? else {
        return Ok(false);
    };
    match ctx.world.return_item(item.id)? {
        Some(owner) => {
            if ctx.actor_name().as_deref() != Some(owner.as_str()) {
                ctx.tell_user(&owner, &format!("{} has been returned to you.", item.name));
            }
            ctx.send(format!("{} returned to {}.", item.name, owner));
        }
        None => ctx.send(format!("{} returned to the root room.", item.name)),
    }
    Ok(true)
}
