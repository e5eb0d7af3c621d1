//! Shared argument, permission and reference-resolution checks.
//!
//! Handlers never restate ownership logic; they call one of the `resolve_*`
//! functions with an [`Access`] describing what the acting principal needs.
//! Every failure is reported to the console here and surfaces to the handler
//! as `Ok(None)` (or `false`), so the handler only has to return `Ok(false)`.

use log::{error, info};

use super::resolver::{resolve_name, Candidate, ResolveResult};
use super::{CommandContext, INTERNAL_ERROR};
use crate::world::{
    ItemId, ItemRecord, Owners, RoomId, RoomRecord, UserRecord, WorldError, ROOT_ROOM_ID,
};

// ----- argument checks -----------------------------------------------------

/// Argument-count and session requirements for [`check_args`]. At most one of
/// `exact`, `min` and `max` may be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgCheck {
    exact: Option<usize>,
    min: Option<usize>,
    max: Option<usize>,
    login: bool,
    wizard: bool,
}

impl ArgCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(mut self, n: usize) -> Self {
        self.exact = Some(n);
        self
    }

    pub fn min(mut self, n: usize) -> Self {
        self.min = Some(n);
        self
    }

    pub fn max(mut self, n: usize) -> Self {
        self.max = Some(n);
        self
    }

    pub fn login(mut self) -> Self {
        self.login = true;
        self
    }

    pub fn wizard(mut self) -> Self {
        self.wizard = true;
        self
    }
}

pub fn check_args(ctx: &CommandContext<'_>, args: &[String], check: ArgCheck) -> bool {
    let constraints = [check.exact, check.min, check.max]
        .iter()
        .filter(|c| c.is_some())
        .count();
    if constraints > 1 {
        error!(
            "check_args for '{}' given conflicting count constraints: {:?}",
            ctx.command_name(),
            check
        );
        ctx.send(INTERNAL_ERROR);
        return false;
    }
    if (check.login || check.wizard) && !ctx.console.is_logged_in() {
        ctx.send("You must be logged in to do that.");
        return false;
    }
    if check.wizard && !ctx.is_wizard() {
        ctx.send("Only wizards can do that.");
        return false;
    }
    let n = args.len();
    let count_ok = match (check.exact, check.min, check.max) {
        (Some(e), _, _) => n == e,
        (_, Some(m), _) => n >= m,
        (_, _, Some(m)) => n <= m,
        _ => true,
    };
    if !count_ok {
        ctx.usage();
        return false;
    }
    true
}

/// Require an unauthenticated session (register, login, recover).
pub fn require_logged_out(ctx: &CommandContext<'_>) -> bool {
    if ctx.console.is_logged_in() {
        ctx.send("You are already logged in.");
        return false;
    }
    true
}

/// Parse a numeric id argument, reporting a bad one.
pub fn parse_id(ctx: &CommandContext<'_>, text: &str, what: &str) -> Option<u64> {
    match text.trim_start_matches('#').parse::<u64>() {
        Ok(id) => Some(id),
        Err(_) => {
            ctx.send(format!("The {} must be a number.", what));
            None
        }
    }
}

/// Parse `on`/`off` style toggles.
pub fn parse_toggle(ctx: &CommandContext<'_>, text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => {
            ctx.usage();
            None
        }
    }
}

// ----- permission model ----------------------------------------------------

/// What the acting principal must satisfy when resolving an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Access {
    owner: bool,
    primary: bool,
    no_wizard_bypass: bool,
    holding: bool,
    on_behalf: Option<String>,
}

impl Access {
    /// Existence only.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn owner() -> Self {
        Self {
            owner: true,
            ..Self::default()
        }
    }

    /// Only the primary owner (owners[0]) passes.
    pub fn primary() -> Self {
        Self {
            owner: true,
            primary: true,
            ..Self::default()
        }
    }

    /// Items only: the principal must carry the item.
    pub fn holding(mut self) -> Self {
        self.holding = true;
        self
    }

    pub fn no_wizard_bypass(mut self) -> Self {
        self.no_wizard_bypass = true;
        self
    }

    /// Check another user's rights instead of the caller's.
    pub fn on_behalf_of(mut self, user: &str) -> Self {
        self.on_behalf = Some(user.to_ascii_lowercase());
        self
    }

    fn needs_principal(&self) -> bool {
        self.owner || self.holding
    }
}

/// The user whose rights are checked: the named target or the caller.
fn principal(ctx: &CommandContext<'_>, access: &Access) -> Option<UserRecord> {
    match &access.on_behalf {
        Some(name) => ctx.world.get_user(name),
        None => ctx.actor(),
    }
}

fn bypasses(principal: &UserRecord, access: &Access) -> bool {
    principal.wizard && !access.no_wizard_bypass
}

/// Ownership against any of `owner_lists` (an exit also accepts its room's owners).
fn check_ownership(
    ctx: &CommandContext<'_>,
    access: &Access,
    owner_lists: &[&Owners],
    what: &str,
) -> bool {
    if !access.owner {
        return true;
    }
    let Some(p) = principal(ctx, access) else {
        report_missing_principal(ctx, access);
        return false;
    };
    if bypasses(&p, access) {
        return true;
    }
    let passes = if access.primary {
        owner_lists.iter().any(|o| o.is_primary(&p.name))
    } else {
        owner_lists.iter().any(|o| o.is_owner(&p.name))
    };
    if passes {
        return true;
    }
    let subject = if access.on_behalf.is_some() {
        format!("{} does not", p.nick)
    } else {
        "You do not".to_string()
    };
    if access.primary {
        ctx.send(format!("{} hold primary ownership of that {}.", subject, what));
    } else {
        ctx.send(format!("{} own that {}.", subject, what));
    }
    false
}

fn report_missing_principal(ctx: &CommandContext<'_>, access: &Access) {
    match &access.on_behalf {
        Some(name) => ctx.send(format!("No such user: {}.", name)),
        None => ctx.send("You must be logged in to do that."),
    }
}

// ----- rooms ---------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum RoomRef {
    /// The acting user's current room.
    Current,
    Id(RoomId),
    Resolved(RoomRecord),
}

impl RoomRef {
    /// `None` argument means the current room; otherwise a numeric id.
    pub fn from_arg(ctx: &CommandContext<'_>, arg: Option<&String>) -> Option<RoomRef> {
        match arg {
            None => Some(RoomRef::Current),
            Some(text) if text.eq_ignore_ascii_case("here") => Some(RoomRef::Current),
            Some(text) => parse_id(ctx, text, "room id").map(RoomRef::Id),
        }
    }
}

pub fn resolve_room(
    ctx: &mut CommandContext<'_>,
    room: RoomRef,
    access: Access,
) -> Result<Option<RoomRecord>, WorldError> {
    let record = match room {
        RoomRef::Current => {
            let Some(user) = ctx.actor() else {
                ctx.send("You must be logged in to do that.");
                return Ok(None);
            };
            match ctx.world.get_room(user.room) {
                Some(r) => r,
                None => {
                    recover_lost_user(ctx, user)?;
                    return Ok(None);
                }
            }
        }
        RoomRef::Id(id) => match ctx.world.get_room(id) {
            Some(r) => r,
            None => {
                ctx.send("No such room.");
                return Ok(None);
            }
        },
        RoomRef::Resolved(r) => r,
    };
    if !check_ownership(ctx, &access, &[&record.owners], "room") {
        return Ok(None);
    }
    Ok(Some(record))
}

/// The caller stands in a room that no longer exists: send them home.
fn recover_lost_user(ctx: &mut CommandContext<'_>, mut user: UserRecord) -> Result<(), WorldError> {
    error!(
        "User {} is located in missing room {}; returning them to room {}",
        user.name, user.room, ROOT_ROOM_ID
    );
    user.room = ROOT_ROOM_ID;
    user.posture = None;
    let nick = user.nick.clone();
    let name = user.name.clone();
    ctx.world.upsert_user(user)?;
    ctx.send("The world shimmers and you find yourself somewhere familiar. Try that again.");
    ctx.broadcast_room(
        ROOT_ROOM_ID,
        &format!("{} tumbles out of nowhere.", nick),
        Some(&name),
    );
    info!("Returned {} to room {}", name, ROOT_ROOM_ID);
    Ok(())
}

// ----- exits ---------------------------------------------------------------

/// Resolve `index` within a room. Returns the containing room and the index so
/// the caller can edit `room.exits[idx]` and upsert the room.
pub fn resolve_exit(
    ctx: &mut CommandContext<'_>,
    index: &str,
    room: RoomRef,
    access: Access,
) -> Result<Option<(RoomRecord, usize)>, WorldError> {
    let Some(record) = resolve_room(ctx, room, Access::any())? else {
        return Ok(None);
    };
    let Ok(idx) = index.trim_start_matches('#').parse::<usize>() else {
        ctx.send("The exit index must be a number.");
        return Ok(None);
    };
    if idx >= record.exits.len() {
        ctx.send("No such exit.");
        return Ok(None);
    }
    if !outbound_seal_allows(ctx, &access, &record) {
        return Ok(None);
    }
    let exit_owners = &record.exits[idx].owners;
    if !check_ownership(ctx, &access, &[exit_owners, &record.owners], "exit") {
        return Ok(None);
    }
    Ok(Some((record, idx)))
}

/// In an outbound-sealed room only the room's owners may change its exits;
/// owning the exit alone is not enough.
pub fn outbound_seal_allows(ctx: &CommandContext<'_>, access: &Access, room: &RoomRecord) -> bool {
    if !access.owner || !room.sealed.outbound {
        return true;
    }
    let Some(p) = principal(ctx, access) else {
        report_missing_principal(ctx, access);
        return false;
    };
    if bypasses(&p, access) || room.owners.is_owner(&p.name) {
        return true;
    }
    ctx.send("This room is sealed; only its owners may change its exits.");
    false
}

// ----- items ---------------------------------------------------------------

pub fn resolve_item(
    ctx: &mut CommandContext<'_>,
    id: &str,
    access: Access,
) -> Result<Option<ItemRecord>, WorldError> {
    let Some(id) = parse_id(ctx, id, "item id") else {
        return Ok(None);
    };
    resolve_item_id(ctx, id, access)
}

pub fn resolve_item_id(
    ctx: &mut CommandContext<'_>,
    id: ItemId,
    access: Access,
) -> Result<Option<ItemRecord>, WorldError> {
    let Some(item) = ctx.world.get_item(id) else {
        ctx.send("No such item.");
        return Ok(None);
    };
    if access.needs_principal() {
        let Some(p) = principal(ctx, &access) else {
            report_missing_principal(ctx, &access);
            return Ok(None);
        };
        if access.holding && !p.holds(item.id) && !bypasses(&p, &access) {
            ctx.send("You are not holding that item.");
            return Ok(None);
        }
    }
    if !check_ownership(ctx, &access, &[&item.owners], "item") {
        return Ok(None);
    }
    Ok(Some(item))
}

/// Where [`find_item`] looks for a named item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemScope {
    Inventory,
    Room,
    /// Inventory first, then the current room.
    Anywhere,
}

/// Resolve a free-text item name (or `#id`) among the caller's inventory
/// and/or current room.
pub fn find_item(
    ctx: &mut CommandContext<'_>,
    query: &str,
    scope: ItemScope,
) -> Result<Option<ItemRecord>, WorldError> {
    let Some(user) = ctx.actor() else {
        ctx.send("You must be logged in to do that.");
        return Ok(None);
    };
    let room = if scope == ItemScope::Inventory {
        None
    } else {
        match resolve_room(ctx, RoomRef::Current, Access::any())? {
            Some(r) => Some(r),
            None => return Ok(None),
        }
    };

    let mut candidates = Vec::new();
    if scope != ItemScope::Room {
        candidates.extend(item_candidates(ctx, &user.inventory, "inventory"));
    }
    if let Some(room) = &room {
        candidates.extend(item_candidates(ctx, &room.items, "room"));
    }

    if let Some(id) = query.strip_prefix('#').and_then(|s| s.parse::<u64>().ok()) {
        return match candidates.iter().find(|c| c.id == id) {
            Some(_) => Ok(ctx.world.get_item(id)),
            None => {
                ctx.send("You don't see that here.");
                Ok(None)
            }
        };
    }

    match resolve_name(query, &candidates) {
        ResolveResult::Found(c) => Ok(ctx.world.get_item(c.id)),
        ResolveResult::Ambiguous(list) => {
            report_ambiguous(ctx, query, &list);
            Ok(None)
        }
        ResolveResult::NotFound => {
            ctx.send(match scope {
                ItemScope::Inventory => "You aren't carrying that.",
                _ => "You don't see that here.",
            });
            Ok(None)
        }
    }
}

fn item_candidates(ctx: &CommandContext<'_>, ids: &[ItemId], location: &'static str) -> Vec<Candidate> {
    let mut out = Vec::new();
    for id in ids {
        match ctx.world.item(*id) {
            Some(item) => out.push(Candidate::new(
                item.id,
                &item.name,
                location,
                item.hidden || item.truehide,
            )),
            None => {
                error!("Item {} listed in {} no longer exists", id, location);
                ctx.send(format!("Warning: item #{} is missing; skipping it.", id));
            }
        }
    }
    out
}

/// Resolve a free-text exit name in `room`. Returns the exit index.
pub fn find_exit(ctx: &CommandContext<'_>, room: &RoomRecord, query: &str) -> Option<usize> {
    if let Ok(idx) = query.parse::<usize>() {
        if idx < room.exits.len() {
            return Some(idx);
        }
    }
    let candidates: Vec<Candidate> = room
        .exits
        .iter()
        .enumerate()
        .map(|(i, e)| Candidate::new(i as u64, &e.name, "exit", e.hidden))
        .collect();
    match resolve_name(query, &candidates) {
        ResolveResult::Found(c) => Some(c.id as usize),
        ResolveResult::Ambiguous(list) => {
            report_ambiguous(ctx, query, &list);
            None
        }
        ResolveResult::NotFound => {
            ctx.send("You can't go that way.");
            None
        }
    }
}

fn report_ambiguous(ctx: &CommandContext<'_>, query: &str, list: &[Candidate]) {
    let mut lines = vec![format!("'{}' could mean:", query)];
    lines.extend(
        list.iter()
            .enumerate()
            .map(|(i, c)| c.format_for_display(i + 1)),
    );
    ctx.send(lines.join("\n"));
}

// ----- users ---------------------------------------------------------------

/// Requirements for [`resolve_user`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserQuery {
    online: bool,
    same_room: bool,
    wizard: Option<bool>,
    live: bool,
}

impl UserQuery {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn online(mut self) -> Self {
        self.online = true;
        self
    }

    /// The target must stand in the caller's room (implies online).
    pub fn same_room(mut self) -> Self {
        self.online = true;
        self.same_room = true;
        self
    }

    pub fn wizard(mut self, state: bool) -> Self {
        self.wizard = Some(state);
        self
    }

    /// Use the in-memory record of a connected user (implies online).
    pub fn live(mut self) -> Self {
        self.online = true;
        self.live = true;
        self
    }
}

/// Look a user up by username, then by nickname, case-insensitively.
pub fn resolve_user(
    ctx: &mut CommandContext<'_>,
    name: &str,
    query: UserQuery,
) -> Result<Option<UserRecord>, WorldError> {
    let username = ctx
        .world
        .user(name)
        .map(|u| u.name.clone())
        .or_else(|| ctx.world.get_user_by_nick(name).map(|u| u.name));
    let Some(username) = username else {
        ctx.send(format!("No such user: {}.", name));
        return Ok(None);
    };

    let user = if query.live {
        ctx.world.get_user(&username)
    } else {
        ctx.world.store().get::<UserRecord>(&username)?
    };
    let Some(user) = user else {
        ctx.send(format!("No such user: {}.", name));
        return Ok(None);
    };

    if query.online && !ctx.world.is_online(&user.name) {
        ctx.send(format!("{} is not online.", user.nick));
        return Ok(None);
    }
    if query.same_room {
        let here = ctx.actor().map(|a| a.room);
        if here != Some(user.room) {
            ctx.send(format!("{} is not here.", user.nick));
            return Ok(None);
        }
    }
    match query.wizard {
        Some(true) if !user.wizard => {
            ctx.send(format!("{} is not a wizard.", user.nick));
            return Ok(None);
        }
        Some(false) if user.wizard => {
            ctx.send(format!("{} is already a wizard.", user.nick));
            return Ok(None);
        }
        _ => {}
    }
    Ok(Some(user))
}

// ----- movement ------------------------------------------------------------

/// Move `user` to `dest`, announcing departure and arrival. The caller has
/// already checked permissions; posture is cleared.
pub fn relocate(
    ctx: &mut CommandContext<'_>,
    mut user: UserRecord,
    dest: RoomId,
    departure: &str,
    arrival: &str,
) -> Result<(), WorldError> {
    let from = user.room;
    let name = user.name.clone();
    if from != dest {
        ctx.broadcast_room(from, departure, Some(&name));
    }
    user.room = dest;
    user.posture = None;
    ctx.world.upsert_user(user)?;
    if from != dest {
        ctx.broadcast_room(dest, arrival, Some(&name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Registry;
    use crate::config::Config;
    use crate::server::{Console, Credentials, Router, TransportKind};
    use crate::world::{Exit, World, WorldStoreBuilder};
    use tempfile::TempDir;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    struct Fixture {
        world: World,
        router: Router,
        registry: Registry,
        config: Config,
        credentials: Credentials,
        console: Console,
        rx: UnboundedReceiver<String>,
        _dir: TempDir,
    }

    /// Room 1 "Den" belongs to alice; bob is a wizard; carol has no rights.
    fn fixture(actor: &str) -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        let store = WorldStoreBuilder::new(dir.path()).open().expect("store");
        let mut world = World::load(store).expect("load");
        for name in ["alice", "bob", "carol"] {
            let mut user = UserRecord::new(name, "");
            user.wizard = name == "bob";
            world.upsert_user(user).expect("user");
        }
        let mut den = RoomRecord::new(1, "Den", "alice");
        den.exits.push(Exit::new("hatch", ROOT_ROOM_ID, "carol"));
        world.upsert_room(den).expect("room");
        world
            .upsert_item(ItemRecord::new(7, "lamp", "alice"))
            .expect("item");

        let router = Router::new();
        let (tx, rx) = unbounded_channel();
        let id = router.register(TransportKind::Local, tx.clone());
        let mut console = Console::new(id, TransportKind::Local, tx);
        console.set_user(Some(actor));
        Fixture {
            world,
            router,
            registry: Registry::standard(),
            config: Config::default(),
            credentials: Credentials::default(),
            console,
            rx,
            _dir: dir,
        }
    }

    impl Fixture {
        fn ctx(&mut self) -> CommandContext<'_> {
            CommandContext::new(
                &mut self.console,
                &mut self.world,
                &self.router,
                &self.registry,
                &self.config,
                &self.credentials,
            )
        }

        fn output(&mut self) -> String {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out.join("\n")
        }

        fn seal_den(&mut self) {
            let mut den = self.world.get_room(1).expect("den");
            den.sealed.outbound = true;
            self.world.upsert_room(den).expect("seal");
        }
    }

    #[test]
    fn arg_check_builder_sets_fields() {
        let check = ArgCheck::new().min(1).login();
        assert_eq!(check.min, Some(1));
        assert!(check.login);
        assert!(!check.wizard);
        assert_eq!(check.exact, None);
    }

    #[test]
    fn conflicting_count_constraints_are_an_internal_error() {
        let mut fx = fixture("alice");
        let args = vec!["one".to_string()];
        let ok = check_args(&fx.ctx(), &args, ArgCheck::new().exact(1).min(1));
        assert!(!ok);
        assert_eq!(fx.output(), INTERNAL_ERROR);

        assert!(check_args(&fx.ctx(), &args, ArgCheck::new().exact(1).login()));
        assert!(!check_args(&fx.ctx(), &args, ArgCheck::new().wizard()));
        assert_eq!(fx.output(), "Only wizards can do that.");
    }

    #[test]
    fn access_presets() {
        assert!(!Access::any().needs_principal());
        assert!(Access::owner().needs_principal());
        let a = Access::primary().no_wizard_bypass().on_behalf_of("Bob");
        assert!(a.primary && a.owner && a.no_wizard_bypass);
        assert_eq!(a.on_behalf.as_deref(), Some("bob"));
        assert!(Access::any().holding().needs_principal());
    }

    #[test]
    fn on_behalf_of_checks_the_named_user() {
        let mut fx = fixture("bob");
        let denied = resolve_room(&mut fx.ctx(), RoomRef::Id(1), Access::owner().on_behalf_of("carol"))
            .expect("resolve");
        assert!(denied.is_none());
        assert_eq!(fx.output(), "carol does not own that room.");

        let granted = resolve_room(&mut fx.ctx(), RoomRef::Id(1), Access::owner().on_behalf_of("alice"))
            .expect("resolve");
        assert_eq!(granted.map(|r| r.id), Some(1));

        let missing = resolve_room(&mut fx.ctx(), RoomRef::Id(1), Access::owner().on_behalf_of("zed"))
            .expect("resolve");
        assert!(missing.is_none());
        assert_eq!(fx.output(), "No such user: zed.");

        let item = resolve_item(&mut fx.ctx(), "7", Access::any().holding().on_behalf_of("carol"))
            .expect("resolve");
        assert!(item.is_none());
        assert_eq!(fx.output(), "You are not holding that item.");
    }

    #[test]
    fn wizards_bypass_ownership_unless_told_not_to() {
        let mut fx = fixture("bob");
        let room = resolve_room(&mut fx.ctx(), RoomRef::Id(1), Access::primary()).expect("resolve");
        assert!(room.is_some());
        let item = resolve_item(&mut fx.ctx(), "7", Access::owner().holding()).expect("resolve");
        assert!(item.is_some());

        let room = resolve_room(&mut fx.ctx(), RoomRef::Id(1), Access::owner().no_wizard_bypass())
            .expect("resolve");
        assert!(room.is_none());
        assert_eq!(fx.output(), "You do not own that room.");
        let item = resolve_item(&mut fx.ctx(), "#7", Access::owner().no_wizard_bypass())
            .expect("resolve");
        assert!(item.is_none());
        assert_eq!(fx.output(), "You do not own that item.");
    }

    #[test]
    fn outbound_seal_overrides_exit_ownership() {
        let mut fx = fixture("carol");
        let exit = resolve_exit(&mut fx.ctx(), "0", RoomRef::Id(1), Access::owner()).expect("resolve");
        assert_eq!(exit.map(|(_, idx)| idx), Some(0));

        fx.seal_den();
        let exit = resolve_exit(&mut fx.ctx(), "0", RoomRef::Id(1), Access::owner()).expect("resolve");
        assert!(exit.is_none());
        assert_eq!(fx.output(), "This room is sealed; only its owners may change its exits.");

        // Looking at a sealed exit needs no rights.
        let exit = resolve_exit(&mut fx.ctx(), "0", RoomRef::Id(1), Access::any()).expect("resolve");
        assert!(exit.is_some());

        let mut fx = fixture("alice");
        fx.seal_den();
        let exit = resolve_exit(&mut fx.ctx(), "0", RoomRef::Id(1), Access::owner()).expect("resolve");
        assert!(exit.is_some());
    }

    #[test]
    fn user_query_implications() {
        let q = UserQuery::any().live();
        assert!(q.online && q.live);
        let q = UserQuery::any().same_room();
        assert!(q.online && q.same_room);
    }
}
