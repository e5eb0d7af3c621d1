use log::info;

use crate::commands::helpers::{check_args, resolve_user, ArgCheck, UserQuery};
use crate::commands::registry::{Category, CommandSpec};
use crate::commands::CommandContext;
use crate::logutil::sec_log;
use crate::world::{UserRecord, WorldError};

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("wizard grant", Category::Wizard, wizard_grant)
            .usage("wizard grant <user>")
            .describe("Give a user wizard powers."),
        CommandSpec::new("wizard revoke", Category::Wizard, wizard_revoke)
            .usage("wizard revoke <user>")
            .describe("Take wizard powers away from a user."),
    ]
}

/// Online targets are edited through their live record so the change takes effect at once.
fn target(ctx: &mut CommandContext<'_>, name: &str, wizard: bool) -> Result<Option<UserRecord>, WorldError> {
    let online = ctx
        .world
        .user(name)
        .map(|u| u.name.clone())
        .or_else(|| ctx.world.get_user_by_nick(name).map(|u| u.name))
        .map(|n| ctx.world.is_online(&n))
        .unwrap_or(false);
    let query = if online {
        UserQuery::any().live()
    } else {
        UserQuery::any()
    };
    resolve_user(ctx, name, query.wizard(wizard))
}

fn wizard_grant(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).wizard()) {
        return Ok(false);
    }
    let Some(mut user) = target(ctx, &args[0], false)? else {
        return Ok(false);
    };
    user.wizard = true;
    let (name, nick) = (user.name.clone(), user.nick.clone());
    ctx.world.upsert_user(user)?;
    sec_log!("Wizard powers granted to {} by {:?}", name, ctx.console.user());
    info!("{} is now a wizard", name);
    ctx.send(format!("{} is now a wizard.", nick));
    ctx.tell_user(&name, "You have been granted wizard powers.");
    Ok(true)
}

fn wizard_revoke(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<bool, WorldError> {
    if !check_args(ctx, args, ArgCheck::new().exact(1).wizard()) {
        return Ok(false);
    }
    let Some(mut user) = target(ctx, &args[0], true)? else {
        return Ok(false);
    };
    if user.name.eq_ignore_ascii_case(&ctx.config.world.root_user) {
        ctx.send("The root user is always a wizard.");
        return Ok(false);
    }
    user.wizard = false;
    let (name, nick) = (user.name.clone(), user.nick.clone());
    ctx.world.upsert_user(user)?;
    sec_log!("Wizard powers revoked from {} by {:?}", name, ctx.console.user());
    ctx.send(format!("{} is no longer a wizard.", nick));
    if ctx.actor_name().as_deref() != Some(name.as_str()) {
        ctx.tell_user(&name, "Your wizard powers have been revoked.");
    }
    Ok(true)
}
