//! Exit locks, keys, visibility and room seals.

use crate::commands::helpers::{
    check_args, resolve_exit, resolve_item, resolve_room, Access, ArgCheck, RoomRef,
};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::world::{Exit, Sealing, WorldError};

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("lock exit", Category::Locking, lock_exit)
            .usage("lock exit <index>")
            .describe("Lock an exit; only owners and key holders pass."),
        CommandSpec::new("unlock exit", Category::Locking, unlock_exit)
            .usage("unlock exit <index>")
            .describe("Unlock an exit."),
        CommandSpec::new("key exit", Category::Locking, key_exit)
            .usage("key exit <index> <item id|none>")
            .describe("Pair an exit with a key item, or remove the pairing."),
        CommandSpec::new("hide exit", Category::Locking, hide_exit)
            .usage("hide exit <index>")
            .describe("Toggle whether an exit is listed."),
        CommandSpec::new("hide key", Category::Locking, hide_key)
            .usage("hide key <index>")
            .describe("Toggle whether an exit's key is shown in its info."),
        CommandSpec::new("chance exit", Category::Locking, chance_exit)
            .usage("chance exit <index> <n>")
            .describe("List an exit only one time in n; 1 always lists it."),
        CommandSpec::new("seal inbound", Category::Locking, seal_inbound)
            .usage("seal inbound [room id]")
            .describe("Refuse new exits and teleports into a room."),
        CommandSpec::new("seal outbound", Category::Locking, seal_outbound)
            .usage("seal outbound [room id]")
            .describe("Refuse new exits out of a room."),
        CommandSpec::new("unseal inbound", Category::Locking, unseal_inbound)
            .usage("unseal inbound [room id]")
            .describe("Allow new exits and teleports into a room again."),
        CommandSpec::new("unseal outbound", Category::Locking, unseal_outbound)
            .usage("unseal outbound [room id]")
            .describe("Allow new exits out of a room again."),
    ]
}

/// Resolve an exit with owner access, let `edit` change it and persist the room.
/// `edit` reports its own refusals and returns false to abort.
fn edit_exit<F>(ctx: &mut CommandContext<'_>, index: &str, edit: F) -> Result<bool, WorldError>
where
    F: FnOnce(&CommandContext<'_>, &mut Exit) -> bool,
{
    let Some((mut room, idx)) = resolve_exit(ctx, index, RoomRef::Current, Access::owner())? else {
        return Ok(false);
    };
    if !edit(&*ctx, &mut room.exits[idx]) {
        return Ok(false);
    }
    ctx.world.upsert_room(room)?;
    Ok(true)
}

fn set_locked(ctx: &mut CommandContext<'_>, args: &[String], locked: bool) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    edit_exit(ctx, &args[0], |ctx, exit| {
        if exit.locked == locked {
            ctx.send(format!(
                "The {} is already {}.",
                exit.name,
                if locked { "locked" } else { "unlocked" }
            ));
            return false;
        }
        exit.locked = locked;
        ctx.send(format!(
            "You {} the {}.",
            if locked { "lock" } else { "unlock" },
            exit.name
        ));
        true
    })
}

fn lock_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_locked(ctx, args, true)
}

fn unlock_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_locked(ctx, args, false)
}

fn key_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(2).login()) {
        return Ok(false);
    }
    let key = if args[1].eq_ignore_ascii_case("none") {
        None
    } else {
        match resolve_item(ctx, &args[1], Access::any())? {
            Some(item) => Some((item.id, item.name)),
            None => return Ok(false),
        }
    };
    edit_exit(ctx, &args[0], |ctx, exit| {
        match &key {
            Some((id, name)) => {
                exit.key = Some(*id);
                ctx.send(format!("{} now opens the {}.", name, exit.name));
            }
            None => {
                exit.key = None;
                ctx.send(format!("The {} no longer has a key.", exit.name));
            }
        }
        true
    })
}

fn hide_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    edit_exit(ctx, &args[0], |ctx, exit| {
        exit.hidden = !exit.hidden;
        ctx.send(format!(
            "The {} is now {}.",
            exit.name,
            if exit.hidden { "hidden" } else { "visible" }
        ));
        true
    })
}

fn hide_key(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).login()) {
        return Ok(false);
    }
    edit_exit(ctx, &args[0], |ctx, exit| {
        exit.key_hidden = !exit.key_hidden;
        ctx.send(format!(
            "The key of the {} is now {}.",
            exit.name,
            if exit.key_hidden { "hidden" } else { "shown" }
        ));
        true
    })
}

fn chance_exit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
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
    edit_exit(ctx, &args[0], |ctx, exit| {
        exit.chance = chance;
        if chance == 1 {
            ctx.send(format!("The {} is always listed.", exit.name));
        } else {
            ctx.send(format!("The {} is listed one time in {}.", exit.name, chance));
        }
        true
    })
}

fn set_seal(
    ctx: &mut CommandContext<'_>,
    args: &[String],
    side: fn(&mut Sealing) -> &mut bool,
    label: &str,
    sealed: bool,
) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().max(1).login()) {
        return Ok(false);
    }
    let Some(target) = RoomRef::from_arg(ctx, args.first()) else {
        return Ok(false);
    };
    let Some(mut room) = resolve_room(ctx, target, Access::owner())? else {
        return Ok(false);
    };
    let flag = side(&mut room.sealed);
    if *flag == sealed {
        ctx.send(format!(
            "{} is already {} {}.",
            room.name,
            if sealed { "sealed" } else { "unsealed" },
            label
        ));
        return Ok(false);
    }
    *flag = sealed;
    let msg = format!(
        "{} is now {} {}.",
        room.name,
        if sealed { "sealed" } else { "unsealed" },
        label
    );
    ctx.world.upsert_room(room)?;
    ctx.send(msg);
    Ok(true)
}

fn inbound(s: &mut Sealing) -> &mut bool {
    &mut s.inbound
}

fn outbound(s: &mut Sealing) -> &mut bool {
    &mut s.outbound
}

fn seal_inbound(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_seal(ctx, args, inbound, "inbound", true)
}

fn seal_outbound(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_seal(ctx, args, outbound, "outbound", true)
}

fn unseal_inbound(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_seal(ctx, args, inbound, "inbound", false)
}

fn unseal_outbound(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    set_seal(ctx, args, outbound, "outbound", false)
}
