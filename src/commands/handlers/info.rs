//! Read-only commands: help, look, exits, inventory, who and the `info` family.

use log::error;
use rand::Rng;

use crate::commands::helpers::{
    check_args, resolve_exit, resolve_item, resolve_room, resolve_user, Access, ArgCheck, RoomRef,
    UserQuery,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::resolver::{resolve_name, Candidate, ResolveResult};
use crate::commands::CommandContext;
use crate::world::{Exit, ItemLocation, ItemRecord, Owners, RoomRecord, UserRecord, WorldError};

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("help", Category::Info, help)
            .aliases(&["?"])
            .usage("help [command]")
            .describe("List commands, or show how to use one."),
        CommandSpec::new("look", Category::Info, look)
            .aliases(&["l"])
            .usage("look [target]")
            .describe("Describe your surroundings or something in them."),
        CommandSpec::new("exits", Category::Info, exits).describe("List the exits of this room."),
        CommandSpec::new("inventory", Category::Info, inventory)
            .aliases(&["inv", "i"])
            .describe("List what you are carrying."),
        CommandSpec::new("who", Category::Info, who).describe("List who is online."),
        CommandSpec::new("info room", Category::Info, info_room)
            .usage("info room [id]")
            .describe("Show details about a room."),
        CommandSpec::new("info exit", Category::Info, info_exit)
            .usage("info exit <index>")
            .describe("Show details about an exit here."),
        CommandSpec::new("info item", Category::Info, info_item)
            .usage("info item <id>")
            .describe("Show details about an item."),
        CommandSpec::new("info user", Category::Info, info_user)
            .usage("info user <name>")
            .describe("Show details about a user."),
    ]
}

/// Roll a 1-in-`chance` appearance.
fn appears(chance: u32) -> bool {
    chance <= 1 || rand::thread_rng().gen_range(0..chance) == 0
}

/// Whether the viewer sees owner-only markers for an entity with these owners.
fn privileged(viewer: Option<&UserRecord>, owners: &Owners) -> bool {
    viewer
        .map(|v| v.wizard || owners.is_owner(&v.name))
        .unwrap_or(false)
}

fn exit_label(idx: usize, exit: &Exit, marked: bool) -> String {
    let mut label = format!("[{}] {}", idx, exit.name);
    if marked {
        let mut flags = Vec::new();
        if exit.hidden {
            flags.push("hidden".to_string());
        }
        if exit.chance > 1 {
            flags.push(format!("1/{}", exit.chance));
        }
        if exit.locked {
            flags.push("locked".to_string());
        }
        if !flags.is_empty() {
            label.push_str(&format!(" ({})", flags.join(", ")));
        }
    }
    label
}

/// Exits the viewer sees right now, with owner markers where applicable.
fn visible_exits(room: &RoomRecord, viewer: Option<&UserRecord>) -> Vec<String> {
    room.exits
        .iter()
        .enumerate()
        .filter_map(|(idx, exit)| {
            let owner = privileged(viewer, &exit.owners) || privileged(viewer, &room.owners);
            if owner {
                Some(exit_label(idx, exit, true))
            } else if !exit.hidden && appears(exit.chance) {
                Some(exit_label(idx, exit, false))
            } else {
                None
            }
        })
        .collect()
}

fn visible_items(ctx: &CommandContext<'_>, ids: &[u64], viewer: Option<&UserRecord>) -> Vec<String> {
    let mut out = Vec::new();
    for id in ids {
        let Some(item) = ctx.world.item(*id) else {
            error!("Room lists missing item {}", id);
            ctx.send(format!("Warning: item #{} is missing.", id));
            continue;
        };
        if item.truehide {
            continue;
        }
        if privileged(viewer, &item.owners) {
            let mut label = item.name.clone();
            if item.hidden {
                label.push_str(" (hidden)");
            } else if item.chance > 1 {
                label.push_str(&format!(" (1/{})", item.chance));
            }
            out.push(label);
        } else if !item.hidden && appears(item.chance) {
            out.push(item.name.clone());
        }
    }
    out
}

/// Print the full description of `room` to the caller.
pub fn show_room(ctx: &CommandContext<'_>, room: &RoomRecord) {
    let viewer = ctx.actor();
    let mut lines = vec![format!("{} (#{})", room.name, room.id)];
    if !room.description.is_empty() {
        lines.push(room.description.clone());
    }
    let exits = visible_exits(room, viewer.as_ref());
    if !exits.is_empty() {
        lines.push(format!("Exits: {}", exits.join(", ")));
    }
    let items = visible_items(ctx, &room.items, viewer.as_ref());
    if !items.is_empty() {
        lines.push(format!("You see: {}", items.join(", ")));
    }
    let here: Vec<String> = ctx
        .world
        .online_users()
        .filter(|u| u.room == room.id)
        .filter(|u| viewer.as_ref().map(|v| v.name != u.name).unwrap_or(true))
        .map(UserRecord::presence)
        .collect();
    if !here.is_empty() {
        lines.push(format!("Here: {}", here.join(", ")));
    }
    ctx.send(lines.join("\n"));
}

/// Show the caller's room if their autolook setting is on.
pub fn autolook(ctx: &mut CommandContext<'_>) -> Result<(), WorldError> {
    let enabled = ctx.actor().map(|u| u.settings.autolook).unwrap_or(false);
    if enabled {
        if let Some(room) = resolve_room(ctx, RoomRef::Current, Access::any())? {
            show_room(ctx, &room);
        }
    }
    Ok(())
}

fn help(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if args.is_empty() {
        let mut lines = vec!["Commands:".to_string()];
        for category in Category::ALL {
            let names: Vec<&str> = ctx
                .registry
                .iter()
                .filter(|c| c.category == category)
                .map(|c| c.name)
                .collect();
            lines.push(format!("  {}: {}", category.label(), names.join(", ")));
        }
        lines.push("Type 'help <command>' for details.".to_string());
        ctx.send(lines.join("\n"));
        return Ok(true);
    }
    let registry = ctx.registry;
    let Some((spec, _)) = registry.resolve(args) else {
        ctx.send(format!("No help for '{}'.", args.join(" ")));
        return Ok(false);
    };
    let mut lines = vec![format!("Usage: {}", spec.usage)];
    if !spec.description.is_empty() {
        lines.push(spec.description.to_string());
    }
    if !spec.aliases.is_empty() {
        lines.push(format!("Aliases: {}", spec.aliases.join(", ")));
    }
    if let Some(c) = spec.special {
        lines.push(format!("Shortcut: {}<text>", c));
    }
    ctx.send(lines.join("\n"));
    Ok(true)
}

fn look(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().login()) {
        return Ok(false);
    }
    let Some(room) = resolve_room(ctx, RoomRef::Current, Access::any())? else {
        return Ok(false);
    };
    if args.is_empty() {
        show_room(ctx, &room);
        return Ok(true);
    }
    let query = args.join(" ");
    let Some(viewer) = ctx.actor() else {
        return Ok(false);
    };

    if let Some(other) = ctx.world.online_users().find(|u| {
        u.room == room.id && (u.nick.eq_ignore_ascii_case(&query) || u.name.eq_ignore_ascii_case(&query))
    }) {
        let mut text = other.presence();
        text.push('\n');
        text.push_str(if other.description.is_empty() {
            "You see nothing special."
        } else {
            &other.description
        });
        ctx.send(text);
        return Ok(true);
    }

    // Item ids and exit indices overlap, so keep them apart by list position.
    let mut candidates: Vec<Candidate> = Vec::new();
    for (location, ids) in [("inventory", &viewer.inventory), ("room", &room.items)] {
        for id in ids.iter() {
            if let Some(item) = ctx.world.item(*id) {
                candidates.push(Candidate::new(item.id, &item.name, location, item.hidden || item.truehide));
            }
        }
    }
    for (idx, exit) in room.exits.iter().enumerate() {
        candidates.push(Candidate::new(idx as u64, &exit.name, "exit", exit.hidden));
    }

    match resolve_name(&query, &candidates) {
        ResolveResult::Found(c) if c.location == "exit" => {
            let exit = &room.exits[c.id as usize];
            ctx.send(if exit.description.is_empty() {
                format!("{}: you see nothing special.", exit.name)
            } else {
                format!("{}: {}", exit.name, exit.description)
            });
            Ok(true)
        }
        ResolveResult::Found(c) => match ctx.world.get_item(c.id) {
            Some(item) => {
                ctx.send(describe_item_brief(&item));
                Ok(true)
            }
            None => {
                ctx.send("You don't see that here.");
                Ok(false)
            }
        },
        ResolveResult::Ambiguous(list) => {
            let mut lines = vec![format!("'{}' could mean:", query)];
            lines.extend(list.iter().enumerate().map(|(i, c)| c.format_for_display(i + 1)));
            ctx.send(lines.join("\n"));
            Ok(false)
        }
        ResolveResult::NotFound => {
            ctx.send("You don't see that here.");
            Ok(false)
        }
    }
}

fn describe_item_brief(item: &ItemRecord) -> String {
    if item.description.is_empty() {
        format!("{}: you see nothing special.", item.name)
    } else {
        format!("{}: {}", item.name, item.description)
    }
}

fn exits(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(0).login()) {
        return Ok(false);
    }
    let Some(room) = resolve_room(ctx, RoomRef::Current, Access::any())? else {
        return Ok(false);
    };
    let viewer = ctx.actor();
    let mut lines = Vec::new();
    for (idx, exit) in room.exits.iter().enumerate() {
        let owner = privileged(viewer.as_ref(), &exit.owners) || privileged(viewer.as_ref(), &room.owners);
        if !owner && (exit.hidden || !appears(exit.chance)) {
            continue;
        }
        let dest = match ctx.world.room(exit.dest) {
            Some(r) => r.name.clone(),
            None => {
                error!("Exit {} in room {} leads to missing room {}", idx, room.id, exit.dest);
                "(nowhere)".to_string()
            }
        };
        lines.push(format!("{} -> {}", exit_label(idx, exit, owner), dest));
    }
    if lines.is_empty() {
        ctx.send("There are no obvious exits.");
    } else {
        ctx.send(lines.join("\n"));
    }
    Ok(true)
}

fn inventory(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(0).login()) {
        return Ok(false);
    }
    let Some(user) = ctx.actor() else {
        return Ok(false);
    };
    let mut lines = Vec::new();
    for id in &user.inventory {
        match ctx.world.item(*id) {
            Some(item) => lines.push(format!("#{} {}", item.id, item.name)),
            None => {
                error!("User {} carries missing item {}", user.name, id);
                ctx.send(format!("Warning: item #{} is missing.", id));
            }
        }
    }
    if lines.is_empty() {
        ctx.send("You are empty-handed.");
    } else {
        ctx.send(format!("You are carrying:\n{}", lines.join("\n")));
    }
    Ok(true)
}

fn who(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(0)) {
        return Ok(false);
    }
    let lines: Vec<String> = ctx
        .world
        .online_users()
        .map(|u| {
            let room = ctx
                .world
                .room(u.room)
                .map(|r| r.name.as_str())
                .unwrap_or("(nowhere)");
            let badge = if u.wizard { " [wizard]" } else { "" };
            format!("{}{} - {}", u.nick, badge, room)
        })
        .collect();
    ctx.send(format!("{} online:\n{}", lines.len(), lines.join("\n")));
    Ok(true)
}

fn flag_list(flags: &[(&str, bool)]) -> String {
    let set: Vec<&str> = flags.iter().filter(|(_, on)| *on).map(|(n, _)| *n).collect();
    if set.is_empty() {
        "none".to_string()
    } else {
        set.join(", ")
    }
}

fn info_room(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().max(1).login()) {
        return Ok(false);
    }
    let Some(target) = RoomRef::from_arg(ctx, args.first()) else {
        return Ok(false);
    };
    let Some(room) = resolve_room(ctx, target, Access::any())? else {
        return Ok(false);
    };
    let viewer = ctx.actor();
    let mut lines = vec![
        format!("Room #{}: {}", room.id, room.name),
        format!("Primary owner: {}", room.owners.primary().unwrap_or("nobody")),
    ];
    if privileged(viewer.as_ref(), &room.owners) {
        lines.push(format!("Owners: {}", room.owners));
        lines.push(format!(
            "Sealed: {}",
            flag_list(&[("inbound", room.sealed.inbound), ("outbound", room.sealed.outbound)])
        ));
        lines.push(format!("Exits: {}", room.exits.len()));
        let entrances: Vec<String> = room.entrances.iter().map(|id| format!("#{}", id)).collect();
        lines.push(format!(
            "Entrances from: {}",
            if entrances.is_empty() { "none".to_string() } else { entrances.join(", ") }
        ));
        lines.push(format!("Created: {}", room.created_at.format("%Y-%m-%d %H:%M UTC")));
    }
    ctx.send(lines.join("\n"));
    Ok(true)
}

fn info_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some((room, idx)) = resolve_exit(ctx, &args[0], RoomRef::Current, Access::any())? else {
        return Ok(false);
    };
    let exit = &room.exits[idx];
    let viewer = ctx.actor();
    let owner = privileged(viewer.as_ref(), &exit.owners) || privileged(viewer.as_ref(), &room.owners);
    if exit.hidden && !owner {
        ctx.send("No such exit.");
        return Ok(false);
    }
    let dest = ctx
        .world
        .room(exit.dest)
        .map(|r| format!("{} (#{})", r.name, r.id))
        .unwrap_or_else(|| format!("missing room #{}", exit.dest));
    let mut lines = vec![format!("Exit [{}] {} -> {}", idx, exit.name, dest)];
    if exit.locked {
        lines.push("It is locked.".to_string());
    }
    if owner {
        lines.push(format!("Owners: {}", exit.owners));
        lines.push(format!(
            "Flags: {}",
            flag_list(&[("locked", exit.locked), ("hidden", exit.hidden), ("key hidden", exit.key_hidden)])
        ));
        lines.push(format!("Chance: 1/{}", exit.chance));
        lines.push(format!(
            "Key: {}",
            exit.key.map(|k| format!("#{}", k)).unwrap_or_else(|| "none".to_string())
        ));
        for (label, text) in [
            ("go", &exit.actions.go),
            ("locked", &exit.actions.locked),
            ("entrance", &exit.actions.entrance),
        ] {
            if let Some(text) = text {
                lines.push(format!("Action ({}): {}", label, text));
            }
        }
    } else if let (Some(key), false) = (exit.key, exit.key_hidden) {
        if let Some(item) = ctx.world.item(key) {
            lines.push(format!("It opens with: {}", item.name));
        }
    }
    ctx.send(lines.join("\n"));
    Ok(true)
}

fn info_item(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(item) = resolve_item(ctx, &args[0], Access::any())? else {
        return Ok(false);
    };
    let viewer = ctx.actor();
    let mut lines = vec![
        format!("Item #{}: {}", item.id, item.name),
        format!("Primary owner: {}", item.owners.primary().unwrap_or("nobody")),
    ];
    if !item.description.is_empty() {
        lines.push(item.description.clone());
    }
    if privileged(viewer.as_ref(), &item.owners) {
        lines.push(format!("Owners: {}", item.owners));
        lines.push(format!(
            "Flags: {}",
            flag_list(&[
                ("duplified", item.duplified),
                ("glued", item.glued),
                ("hidden", item.hidden),
                ("truehide", item.truehide),
                ("container", item.container.enabled),
                ("cursed", item.cursed.enabled),
            ])
        ));
        lines.push(format!("Chance: 1/{}", item.chance));
        if let Some(action) = &item.action {
            lines.push(format!("Action: {}", action));
        }
        if let Some(lang) = &item.language {
            lines.push(format!("Book language: {}", lang));
        }
        if let Some(dest) = item.telekey {
            lines.push(format!("Telekey to room #{}", dest));
        }
        lines.push(match ctx.world.locate_item(item.id) {
            ItemLocation::Room(id) => format!("Location: room #{}", id),
            ItemLocation::Inventory(holders) => format!("Carried by: {}", holders.join(", ")),
            ItemLocation::Container(id) => format!("Inside item #{}", id),
            ItemLocation::Nowhere => "Location: nowhere".to_string(),
        });
    }
    if item.container.enabled {
        let contents: Vec<String> = item
            .container
            .items
            .iter()
            .filter_map(|id| ctx.world.item(*id))
            .map(|i| format!("#{} {}", i.id, i.name))
            .collect();
        lines.push(format!(
            "Contains: {}",
            if contents.is_empty() { "nothing".to_string() } else { contents.join(", ") }
        ));
    }
    ctx.send(lines.join("\n"));
    Ok(true)
}

fn info_user(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    let Some(user) = resolve_user(ctx, &args[0], UserQuery::any())? else {
        return Ok(false);
    };
    let online = ctx.world.is_online(&user.name);
    let mut lines = vec![
        format!("{} ({})", user.nick, user.name),
        format!("Pronouns: {}", user.pronouns),
    ];
    if !user.description.is_empty() {
        lines.push(user.description.clone());
    }
    if user.wizard {
        lines.push("A wizard.".to_string());
    }
    if online {
        let room = ctx
            .world
            .room(user.room)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| "(nowhere)".to_string());
        lines.push(format!("Online, in {}.", room));
        if ctx.is_wizard() {
            let transport = ctx
                .router
                .session_of(&user.name)
                .and_then(|id| ctx.router.transport_of(id));
            if let Some(kind) = transport {
                lines.push(format!("Connected via {:?}.", kind));
            }
        }
    } else {
        lines.push(match user.last_login {
            Some(t) => format!("Offline. Last seen {}.", t.format("%Y-%m-%d %H:%M UTC")),
            None => "Offline. Never logged in.".to_string(),
        });
    }
    ctx.send(lines.join("\n"));
    Ok(true)
}
