mod common;

use common::{account, assert_entrances_consistent, TestWorld, PASSWORD};
use meshmush::world::{Exit, RoomRecord, ROOT_ROOM_ID};

#[test]
fn build_walk_and_break_a_room() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");

    let out = tw.ok(&mut alice, "make room Cellar");
    let cellar = tw.room_named("Cellar");
    assert!(out.contains(&format!("Created room #{}: Cellar.", cellar.id)));
    assert_eq!(cellar.owners.primary(), Some("alice"));
    assert!(cellar.exits.is_empty());

    tw.ok(&mut alice, &format!("make exit {} trapdoor", cellar.id));
    let cellar = tw.room_named("Cellar");
    assert!(cellar.entrances.contains(&ROOT_ROOM_ID));
    tw.world(assert_entrances_consistent);

    tw.ok(&mut alice, "go trapdoor");
    assert_eq!(tw.user("alice").room, cellar.id);
    assert!(tw.room(cellar.id).unwrap().users.contains("alice"));
    assert!(!tw.room(ROOT_ROOM_ID).unwrap().users.contains("alice"));
    assert!(bob.transcript().contains("alice leaves through the trapdoor."));

    let out = tw.fail(&mut bob, &format!("break room {}", cellar.id));
    assert!(out.contains("You do not hold primary ownership of that room."));
    assert!(tw.room(cellar.id).is_some());

    tw.ok(&mut alice, &format!("break room {}", cellar.id));
    assert!(tw.room(cellar.id).is_none());
    assert_eq!(tw.user("alice").room, ROOT_ROOM_ID);
    let root = tw.room(ROOT_ROOM_ID).unwrap();
    assert!(root.exits.iter().all(|e| e.dest != cellar.id));
    assert!(root.users.contains("alice"));
    tw.world(assert_entrances_consistent);
}

#[test]
fn root_room_cannot_be_broken() {
    let tw = TestWorld::with_accounts(&[("merlin", true)]);
    let mut merlin = tw.player("merlin");
    let out = tw.fail(&mut merlin, "break room 0");
    assert!(out.contains("The root room cannot be broken."));
}

#[test]
fn duplified_gift_and_destruction() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");

    tw.ok(&mut alice, "make item lantern");
    let id = tw.item_id("lantern");
    assert!(tw.user("alice").holds(id));

    tw.ok(&mut alice, &format!("duplify item {}", id));
    tw.ok(&mut alice, "give bob lantern");
    assert!(tw.user("alice").holds(id));
    assert!(tw.user("bob").holds(id));
    assert!(bob.transcript().contains("lantern"));

    tw.ok(&mut alice, &format!("break item {}", id));
    assert!(tw.world(|w| w.get_item(id)).is_none());
    assert!(!tw.user("alice").holds(id));
    assert!(!tw.user("bob").holds(id));
}

#[test]
fn plain_gift_moves_the_item() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let _bob = tw.player("bob");

    tw.ok(&mut alice, "make item stone");
    let id = tw.item_id("stone");
    tw.ok(&mut alice, "give bob stone");
    assert!(!tw.user("alice").holds(id));
    assert!(tw.user("bob").holds(id));
    assert_eq!(tw.world(|w| w.holders(id)), vec!["bob".to_string()]);
}

#[test]
fn locked_exit_stops_strangers_until_they_carry_the_key() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");

    tw.ok(&mut alice, "make room Vault");
    let vault = tw.room_named("Vault");
    tw.ok(&mut alice, &format!("make exit {} door", vault.id));
    tw.ok(&mut alice, "lock exit 0");
    bob.drain();

    let out = tw.fail(&mut bob, "go door");
    assert!(out.contains("The door is locked."));
    assert_eq!(tw.user("bob").room, ROOT_ROOM_ID);
    assert!(alice.transcript().contains("bob tries the door, but it is locked."));

    tw.ok(&mut alice, "make item brasskey");
    let key = tw.item_id("brasskey");
    tw.ok(&mut alice, &format!("key exit 0 {}", key));
    tw.ok(&mut alice, "give bob brasskey");

    tw.ok(&mut bob, "go door");
    assert_eq!(tw.user("bob").room, vault.id);
}

#[test]
fn exit_owner_passes_own_lock() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    tw.ok(&mut alice, "make room Study");
    let study = tw.room_named("Study");
    tw.ok(&mut alice, &format!("make exit {} arch", study.id));
    tw.ok(&mut alice, "lock exit 0");
    tw.ok(&mut alice, "go arch");
    assert_eq!(tw.user("alice").room, study.id);
}

#[test]
fn transfer_demotes_previous_primary() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let _bob = tw.player("bob");

    tw.ok(&mut alice, "make item compass");
    let id = tw.item_id("compass");
    tw.ok(&mut alice, &format!("transfer item {} bob", id));

    let item = tw.world(|w| w.get_item(id)).unwrap();
    assert_eq!(item.owners.primary(), Some("bob"));
    assert!(item.owners.is_owner("alice"));
    assert!(!item.owners.is_primary("alice"));

    let out = tw.fail(&mut alice, &format!("transfer item {} alice", id));
    assert!(out.contains("You do not hold primary ownership of that item."));
}

#[test]
fn primary_owner_cannot_be_revoked() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let _bob = tw.player("bob");
    tw.ok(&mut alice, "make room Attic");
    let attic = tw.room_named("Attic");

    tw.ok(&mut alice, &format!("grant room {} bob", attic.id));
    assert!(tw.room(attic.id).unwrap().owners.is_owner("bob"));
    let out = tw.fail(&mut alice, &format!("revoke room {} alice", attic.id));
    assert!(out.contains("The primary owner cannot be revoked"));
    tw.ok(&mut alice, &format!("revoke room {} bob", attic.id));
    assert!(!tw.room(attic.id).unwrap().owners.is_owner("bob"));
}

#[test]
fn rename_exit_allows_recasing_but_not_collisions() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    tw.ok(&mut alice, "make room Garden");
    let garden = tw.room_named("Garden");
    tw.ok(&mut alice, &format!("make exit {} door", garden.id));
    tw.ok(&mut alice, &format!("make exit {} hatch", garden.id));

    let out = tw.fail(&mut alice, &format!("make exit {} DOOR", garden.id));
    assert!(out.contains("An exit with that name already exists here."));
    tw.fail(&mut alice, "rename exit 1 door");
    tw.ok(&mut alice, "rename exit 0 DOOR");

    let root = tw.room(ROOT_ROOM_ID).unwrap();
    assert_eq!(root.exits[0].name, "DOOR");
    assert_eq!(root.exits[1].name, "hatch");
}

#[test]
fn loading_requires_holding_unless_wizard() {
    let tw = TestWorld::with_accounts(&[("merlin", true)]);
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");
    let mut merlin = tw.player("merlin");

    tw.ok(&mut alice, "make item pebble");
    tw.ok(&mut alice, "make item crate");
    let pebble = tw.item_id("pebble");
    let crate_id = tw.item_id("crate");
    tw.ok(&mut alice, &format!("container item {}", crate_id));
    tw.ok(&mut alice, "drop crate");

    let out = tw.fail(&mut bob, &format!("load item {} {}", pebble, crate_id));
    assert!(out.contains("You are not holding that item."));
    assert!(tw.user("alice").holds(pebble));

    tw.ok(&mut merlin, &format!("load item {} {}", pebble, crate_id));
    let crate_item = tw.world(|w| w.get_item(crate_id)).unwrap();
    assert_eq!(crate_item.container.items, vec![pebble]);
    assert!(!tw.user("alice").holds(pebble));

    tw.fail(&mut merlin, &format!("load item {} {}", crate_id, crate_id));
}

#[test]
fn glued_items_stay_put_for_strangers() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");

    tw.ok(&mut alice, "make item statue");
    let id = tw.item_id("statue");
    tw.ok(&mut alice, "drop statue");
    tw.ok(&mut alice, &format!("glue item {}", id));

    tw.fail(&mut bob, "get statue");
    assert!(tw.room(ROOT_ROOM_ID).unwrap().items.contains(&id));
    tw.ok(&mut alice, "get statue");
    assert!(tw.user("alice").holds(id));
}

#[test]
fn entrances_follow_exit_changes() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    tw.ok(&mut alice, "make room North");
    tw.ok(&mut alice, "make room South");
    let north = tw.room_named("North").id;
    let south = tw.room_named("South").id;

    tw.ok(&mut alice, &format!("make exit {} up", north));
    tw.ok(&mut alice, &format!("make exit {} down", south));
    tw.world(assert_entrances_consistent);

    tw.ok(&mut alice, &format!("relink exit 0 {}", south));
    tw.world(assert_entrances_consistent);
    assert!(tw.room(north).unwrap().entrances.is_empty());

    tw.ok(&mut alice, "break exit 1");
    tw.world(assert_entrances_consistent);
    assert!(tw.room(south).unwrap().entrances.contains(&ROOT_ROOM_ID));

    tw.ok(&mut alice, "go up");
    tw.ok(&mut alice, &format!("make exit {} back", ROOT_ROOM_ID));
    tw.ok(&mut alice, "purge exits");
    assert!(tw.room(south).unwrap().exits.is_empty());
    tw.world(assert_entrances_consistent);
}

#[test]
fn inbound_seal_blocks_new_exits_from_strangers() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");
    tw.ok(&mut alice, "make room Keep");
    let keep = tw.room_named("Keep").id;
    tw.ok(&mut alice, &format!("seal inbound {}", keep));

    tw.ok(&mut bob, "make room Shack");
    tw.ok(&mut bob, &format!("teleport {}", tw.room_named("Shack").id));
    let out = tw.fail(&mut bob, &format!("make exit {} sneak", keep));
    assert!(out.contains("sealed"));
    tw.fail(&mut bob, &format!("teleport {}", keep));
}

#[test]
fn say_reaches_the_room_and_chat_respects_ignore() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");
    let mut carol = tw.player("carol");
    alice.drain();
    bob.drain();

    let out = tw.ok(&mut alice, "\"hello there");
    assert!(out.contains("You say, \"hello there\""));
    assert!(bob.transcript().contains("alice says, \"hello there\""));
    carol.drain();

    tw.ok(&mut bob, "ignore alice");
    tw.ok(&mut alice, "#anyone around?");
    assert!(!bob.transcript().contains("[chat] alice"));
    assert!(carol.transcript().contains("[chat] alice: anyone around?"));

    let out = tw.fail(&mut alice, "message bob psst");
    assert!(out.contains("bob is not accepting your messages."));
}

#[test]
fn posture_is_tracked_and_cleared() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    tw.ok(&mut alice, "make item bench");
    tw.ok(&mut alice, "drop bench");

    tw.ok(&mut alice, "sit bench");
    assert_eq!(tw.user("alice").presence(), "alice (sitting on bench)");
    let out = tw.fail(&mut alice, "sit bench");
    assert!(out.contains("You are already sitting."));
    tw.ok(&mut alice, "lay");
    tw.ok(&mut alice, "stand");
    tw.fail(&mut alice, "stand");

    tw.ok(&mut alice, "sit");
    tw.ok(&mut alice, "xyzzy");
    assert!(tw.user("alice").posture.is_none());
}

#[test]
fn second_login_is_refused() {
    let tw = TestWorld::new();
    let _alice = tw.player("alice");
    let mut other = tw.client();
    let out = tw.fail(&mut other, &format!("login alice {}", common::PASSWORD));
    assert!(out.contains("already logged in from another session"));
}

#[test]
fn failed_login_arms_cooldown() {
    let tw = TestWorld::new();
    let _ = tw.player("alice");
    let mut client = tw.client();
    let out = tw.fail(&mut client, "login alice wrong-password");
    assert!(out.contains("Invalid name or password."));
    let out = tw.fail(&mut client, &format!("login alice {}", common::PASSWORD));
    assert!(out.contains("Please wait a moment"));
}

#[test]
fn credentials_are_not_echoed() {
    let tw = TestWorld::new();
    let mut client = tw.client();
    let out = tw.ok(&mut client, &format!("register dana {}", common::PASSWORD));
    assert!(!out.contains(common::PASSWORD));
    assert!(out.contains("recovery code"));
}

#[test]
fn disabled_commands_are_refused_except_to_wizards() {
    let tw = TestWorld::custom(
        |c| c.world.disabled_commands = vec!["make room".into()],
        &[("merlin", true)],
    );
    let mut alice = tw.player("alice");
    let mut merlin = tw.player("merlin");
    let out = tw.fail(&mut alice, "make room Nope");
    assert!(out.contains("Command disabled."));
    tw.ok(&mut merlin, "make room Allowed");
}

#[test]
fn unknown_command_offers_suggestions() {
    let tw = TestWorld::new();
    let mut client = tw.client();
    let out = tw.fail(&mut client, "maek room x");
    assert!(out.starts_with("Unknown command."));
}

#[test]
fn disconnect_logs_the_user_out() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");
    bob.drain();

    tw.engine.disconnect(&mut alice.console);
    assert!(!tw.world(|w| w.is_online("alice")));
    assert!(!tw.room(ROOT_ROOM_ID).unwrap().users.contains("alice"));
    assert!(bob.transcript().contains("alice has disconnected."));
}

#[test]
fn wizard_grant_and_root_protection() {
    let tw = TestWorld::with_accounts(&[("merlin", true)]);
    let mut merlin = tw.player("merlin");
    let mut alice = tw.player("alice");

    tw.fail(&mut alice, "wizard grant alice");
    tw.ok(&mut merlin, "wizard grant alice");
    assert!(tw.user("alice").wizard);
    tw.ok(&mut alice, "wizard revoke merlin");
    assert!(!tw.user("merlin").wizard);

    let root = tw.engine.config().world.root_user.clone();
    tw.fail(&mut alice, &format!("wizard revoke {}", root));
    assert!(tw.user(&root).wizard);
}

#[test]
fn outbound_seal_leaves_exit_edits_to_room_owners() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");
    tw.ok(&mut alice, "make room Den");
    let den = tw.room_named("Den").id;
    tw.ok(&mut alice, &format!("teleport {}", den));
    tw.ok(&mut bob, &format!("teleport {}", den));
    tw.ok(&mut bob, &format!("make exit {} hatch", ROOT_ROOM_ID));
    tw.ok(&mut alice, "seal outbound");

    let out = tw.fail(&mut bob, &format!("relink exit 0 {}", den));
    assert!(out.contains("This room is sealed; only its owners may change its exits."));
    tw.fail(&mut bob, "break exit 0");
    tw.fail(&mut bob, "rename exit 0 trapdoor");
    tw.fail(&mut bob, "lock exit 0");
    tw.fail(&mut bob, "describe exit 0 A small hatch.");
    tw.fail(&mut bob, "purge exits");
    tw.fail(&mut bob, &format!("make exit {} chute", ROOT_ROOM_ID));
    let room = tw.room(den).unwrap();
    assert_eq!(room.exits.len(), 1);
    assert_eq!(room.exits[0].name, "hatch");
    assert_eq!(room.exits[0].dest, ROOT_ROOM_ID);

    tw.ok(&mut alice, "rename exit 0 trapdoor");
    tw.ok(&mut alice, "unseal outbound");
    tw.ok(&mut bob, "break exit 0");
    assert!(tw.room(den).unwrap().exits.is_empty());
    tw.world(assert_entrances_consistent);
}

#[test]
fn user_in_a_vanished_room_is_sent_home() {
    let tw = TestWorld::seeded(|store| {
        let mut wanderer = account("wanderer");
        wanderer.room = 99;
        store.upsert(&wanderer).expect("seed wanderer");
    });
    let mut client = tw.client();
    let out = tw.ok(&mut client, &format!("login wanderer {}", PASSWORD));
    assert!(out.contains("somewhere familiar"));

    let user = tw.user("wanderer");
    assert_eq!(user.room, ROOT_ROOM_ID);
    assert!(tw.room(ROOT_ROOM_ID).unwrap().users.contains("wanderer"));
    tw.ok(&mut client, "look");
}

#[test]
fn exit_to_a_missing_room_leads_nowhere() {
    let tw = TestWorld::seeded(|store| {
        let mut hall = RoomRecord::new(50, "Crumbling Hall", "world");
        hall.exits.push(Exit::new("void", 99, "world"));
        store.upsert(&hall).expect("seed hall");
    });
    let mut alice = tw.player("alice");
    tw.ok(&mut alice, "teleport 50");
    let out = tw.fail(&mut alice, "go void");
    assert!(out.contains("That exit leads nowhere."));
    assert_eq!(tw.user("alice").room, 50);
}

#[test]
fn missing_inventory_entries_are_skipped_with_a_warning() {
    let tw = TestWorld::seeded(|store| {
        let mut hoarder = account("hoarder");
        hoarder.inventory.push(777);
        store.upsert(&hoarder).expect("seed hoarder");
    });
    let mut hoarder = tw.player("hoarder");
    tw.ok(&mut hoarder, "make item trinket");
    let trinket = tw.item_id("trinket");

    let out = tw.ok(&mut hoarder, "drop trinket");
    assert!(out.contains("Warning: item #777 is missing; skipping it."));
    assert!(tw.room(ROOT_ROOM_ID).unwrap().items.contains(&trinket));
}

#[test]
fn telekey_carries_its_holder_away() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");
    tw.ok(&mut alice, "make room Tower");
    let tower = tw.room_named("Tower").id;
    tw.ok(&mut alice, "make item orb");
    let orb = tw.item_id("orb");
    tw.ok(&mut alice, &format!("telekey item {} {}", orb, tower));
    bob.drain();

    tw.ok(&mut alice, "use orb");
    assert_eq!(tw.user("alice").room, tower);
    assert!(bob.transcript().contains("alice vanishes with a flash of the orb."));

    tw.ok(&mut alice, &format!("teleport {}", ROOT_ROOM_ID));
    tw.ok(&mut alice, "drop orb");
    let out = tw.fail(&mut bob, "use orb");
    assert!(out.contains("You must be carrying the orb"));
    assert_eq!(tw.user("bob").room, ROOT_ROOM_ID);
}

#[test]
fn unduplify_gathers_outstanding_copies() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let _bob = tw.player("bob");
    tw.ok(&mut alice, "make item coin");
    let coin = tw.item_id("coin");
    tw.ok(&mut alice, &format!("duplify item {}", coin));
    tw.ok(&mut alice, "give bob coin");
    tw.ok(&mut alice, "drop coin");
    assert!(tw.user("bob").holds(coin));

    let out = tw.ok(&mut alice, &format!("unduplify item {}", coin));
    assert!(out.contains("gathered back"));
    assert_eq!(tw.world(|w| w.holders(coin)), vec!["alice".to_string()]);
    assert!(!tw.room(ROOT_ROOM_ID).unwrap().items.contains(&coin));
    assert!(!tw.world(|w| w.get_item(coin)).unwrap().duplified);
}

#[test]
fn unload_takes_an_item_back_out() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    tw.ok(&mut alice, "make item gem");
    tw.ok(&mut alice, "make item box");
    let gem = tw.item_id("gem");
    let chest = tw.item_id("box");
    tw.ok(&mut alice, &format!("container item {}", chest));
    tw.ok(&mut alice, &format!("load item {} {}", gem, chest));
    assert!(!tw.user("alice").holds(gem));

    let out = tw.fail(&mut alice, &format!("unload item {} {}", chest, chest));
    assert!(out.contains("That is not inside the box."));
    tw.ok(&mut alice, &format!("unload item {} {}", gem, chest));
    assert!(tw.user("alice").holds(gem));
    assert!(tw.world(|w| w.get_item(chest)).unwrap().container.items.is_empty());
}

#[test]
fn remake_room_resets_it_and_returns_items() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    tw.ok(&mut alice, "make room Hall");
    let hall = tw.room_named("Hall").id;
    tw.ok(&mut alice, &format!("teleport {}", hall));
    tw.ok(&mut alice, "describe room A long hall.");
    tw.ok(&mut alice, &format!("make exit {} out", ROOT_ROOM_ID));
    tw.ok(&mut alice, "seal inbound");
    tw.ok(&mut alice, "make item rug");
    let rug = tw.item_id("rug");
    tw.ok(&mut alice, "drop rug");

    let out = tw.ok(&mut alice, &format!("remake room {}", hall));
    assert!(out.contains("1 item(s) returned"));
    let room = tw.room(hall).unwrap();
    assert!(room.description.is_empty());
    assert!(room.exits.is_empty());
    assert!(room.items.is_empty());
    assert!(!room.sealed.inbound);
    assert_eq!(room.name, "Hall");
    assert!(tw.user("alice").holds(rug));
    tw.world(assert_entrances_consistent);
}

#[test]
fn return_room_sends_items_to_their_owners() {
    let tw = TestWorld::new();
    let mut alice = tw.player("alice");
    let mut bob = tw.player("bob");
    tw.ok(&mut alice, "make room Yard");
    let yard = tw.room_named("Yard").id;
    tw.ok(&mut alice, &format!("teleport {}", yard));
    tw.ok(&mut bob, &format!("teleport {}", yard));
    tw.ok(&mut bob, "make item rake");
    let rake = tw.item_id("rake");
    tw.ok(&mut bob, "drop rake");

    let out = tw.fail(&mut bob, "return room");
    assert!(out.contains("You do not own that room."));
    let out = tw.ok(&mut alice, "return room");
    assert!(out.contains("Returned 1 item(s) to their owners."));
    assert!(tw.room(yard).unwrap().items.is_empty());
    assert!(tw.user("bob").holds(rake));
}

fn recovery_code(transcript: &str) -> String {
    let start = transcript
        .find("recovery code is ")
        .map(|i| i + "recovery code is ".len())
        .expect("recovery code in output");
    transcript[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[test]
fn password_change_and_recovery_code() {
    let tw = TestWorld::new();
    let mut client = tw.client();
    let out = tw.ok(&mut client, &format!("register erin {}", PASSWORD));
    let code = recovery_code(&out);
    tw.ok(&mut client, &format!("login erin {}", PASSWORD));

    let out = tw.fail(&mut client, "password wrong-horse stable-horse");
    assert!(out.contains("Incorrect password."));
    tw.ok(&mut client, &format!("password {} stable-horse", PASSWORD));
    tw.ok(&mut client, "logout");

    let mut guesser = tw.client();
    let out = tw.fail(&mut guesser, "recover erin not-the-code fresh-horse");
    assert!(out.contains("Recovery failed."));

    let mut owner = tw.client();
    let out = tw.ok(&mut owner, &format!("recover erin {} fresh-horse", code));
    let new_code = recovery_code(&out);
    assert_ne!(new_code, code);
    tw.fail(&mut owner, "login erin stable-horse");

    let mut again = tw.client();
    tw.ok(&mut again, "login erin fresh-horse");
    let mut late = tw.client();
    tw.fail(&mut late, &format!("recover erin {} other-horse", code));
}
