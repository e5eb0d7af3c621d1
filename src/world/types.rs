use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ROOM_SCHEMA_VERSION: u8 = 1;
pub const ITEM_SCHEMA_VERSION: u8 = 1;
pub const USER_SCHEMA_VERSION: u8 = 1;

/// Id of the root room every user falls back to.
pub const ROOT_ROOM_ID: RoomId = 0;

pub type RoomId = u64;
pub type ItemId = u64;

/// Ordered owner list. Index 0 is the primary owner, everyone after it is secondary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Owners(Vec<String>);

impl Owners {
    pub fn new(primary: &str) -> Self {
        Self(vec![primary.to_ascii_lowercase()])
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn is_owner(&self, username: &str) -> bool {
        self.0.iter().any(|o| o.eq_ignore_ascii_case(username))
    }

    pub fn is_primary(&self, username: &str) -> bool {
        self.primary()
            .map(|p| p.eq_ignore_ascii_case(username))
            .unwrap_or(false)
    }

    /// Append a secondary owner. Returns false when already an owner.
    pub fn add(&mut self, username: &str) -> bool {
        if self.is_owner(username) {
            return false;
        }
        self.0.push(username.to_ascii_lowercase());
        true
    }

    /// Remove an owner. The primary owner can only be replaced through [`Owners::promote`].
    pub fn remove(&mut self, username: &str) -> bool {
        if self.is_primary(username) {
            return false;
        }
        let before = self.0.len();
        self.0.retain(|o| !o.eq_ignore_ascii_case(username));
        before != self.0.len()
    }

    /// Make `username` the primary owner; the previous primary drops to index 1.
    pub fn promote(&mut self, username: &str) {
        if self.is_primary(username) {
            return;
        }
        self.0.retain(|o| !o.eq_ignore_ascii_case(username));
        self.0.insert(0, username.to_ascii_lowercase());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Owners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "nobody");
        }
        write!(f, "{}", self.0.join(", "))
    }
}

/// Optional flavor text for the three ways a user can meet an exit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitActions {
    pub go: Option<String>,
    pub locked: Option<String>,
    pub entrance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exit {
    pub name: String,
    pub description: String,
    pub dest: RoomId,
    pub owners: Owners,
    pub locked: bool,
    pub key: Option<ItemId>,
    pub key_hidden: bool,
    pub hidden: bool,
    /// Appears once in `chance` looks. 1 means always.
    pub chance: u32,
    pub actions: ExitActions,
}

impl Exit {
    pub fn new(name: &str, dest: RoomId, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            dest,
            owners: Owners::new(owner),
            locked: false,
            key: None,
            key_hidden: false,
            hidden: false,
            chance: 1,
            actions: ExitActions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sealing {
    /// No new exits may target this room, except from its owners.
    pub inbound: bool,
    /// Only the room's owners may create, remove or edit exits in this room.
    pub outbound: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomRecord {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub owners: Owners,
    /// Online occupants. Derived from user locations; maintained by the world state.
    #[serde(default)]
    pub users: BTreeSet<String>,
    pub exits: Vec<Exit>,
    pub items: Vec<ItemId>,
    /// Rooms with at least one exit leading here. Derived; maintained by the world state.
    #[serde(default)]
    pub entrances: BTreeSet<RoomId>,
    pub sealed: Sealing,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl RoomRecord {
    pub fn new(id: RoomId, name: &str, owner: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            owners: Owners::new(owner),
            users: BTreeSet::new(),
            exits: Vec::new(),
            items: Vec::new(),
            entrances: BTreeSet::new(),
            sealed: Sealing::default(),
            created_at: Utc::now(),
            schema_version: ROOM_SCHEMA_VERSION,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Index of the exit whose name matches case-insensitively.
    pub fn exit_index(&self, name: &str) -> Option<usize> {
        self.exits
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Whether any exit of this room leads to `dest`.
    pub fn leads_to(&self, dest: RoomId) -> bool {
        self.exits.iter().any(|e| e.dest == dest)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerState {
    pub enabled: bool,
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursedState {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub owners: Owners,
    pub duplified: bool,
    pub glued: bool,
    pub hidden: bool,
    pub truehide: bool,
    pub chance: u32,
    /// Custom text shown when the item is used.
    pub action: Option<String>,
    pub container: ContainerState,
    pub cursed: CursedState,
    /// Marks a book; reading it switches the reader's language.
    pub language: Option<String>,
    /// Using the item teleports the holder to this room.
    pub telekey: Option<RoomId>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ItemRecord {
    pub fn new(id: ItemId, name: &str, owner: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            owners: Owners::new(owner),
            duplified: false,
            glued: false,
            hidden: false,
            truehide: false,
            chance: 1,
            action: None,
            container: ContainerState::default(),
            cursed: CursedState::default(),
            language: None,
            telekey: None,
            created_at: Utc::now(),
            schema_version: ITEM_SCHEMA_VERSION,
        }
    }
}

/// Pronoun sets a user can pick. Custom holds subject, object, possessive,
/// possessive pronoun, reflexive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Pronouns {
    Female,
    Male,
    Neutral,
    Custom([String; 5]),
}

impl Default for Pronouns {
    fn default() -> Self {
        Self::Neutral
    }
}

impl Pronouns {
    /// Parse one of the fixed set names.
    pub fn parse_fixed(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "female" | "she" => Some(Self::Female),
            "male" | "he" => Some(Self::Male),
            "neutral" | "they" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn words(&self) -> [&str; 5] {
        match self {
            Self::Female => ["she", "her", "her", "hers", "herself"],
            Self::Male => ["he", "him", "his", "his", "himself"],
            Self::Neutral => ["they", "them", "their", "theirs", "themself"],
            Self::Custom(w) => [
                w[0].as_str(),
                w[1].as_str(),
                w[2].as_str(),
                w[3].as_str(),
                w[4].as_str(),
            ],
        }
    }
}

impl fmt::Display for Pronouns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words().join("/"))
    }
}

/// Replace `%player%` and the pronoun tokens in action text.
pub fn substitute(template: &str, player: &str, pronouns: &Pronouns) -> String {
    let [subject, object, possessive, possessive_pronoun, reflexive] = pronouns.words();
    template
        .replace("%player%", player)
        .replace("%they%", subject)
        .replace("%them%", object)
        .replace("%theirs%", possessive_pronoun)
        .replace("%their%", possessive)
        .replace("%themself%", reflexive)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostureKind {
    Sitting,
    Laying,
}

impl PostureKind {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Sitting => "sitting",
            Self::Laying => "laying",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Posture {
    pub kind: PostureKind,
    /// Name of the room item the posture is anchored to.
    pub item: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSettings {
    pub autolook: bool,
    pub chat: bool,
    pub echo: bool,
    pub ignore: BTreeSet<String>,
    pub language: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            autolook: true,
            chat: true,
            echo: true,
            ignore: BTreeSet::new(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    /// Lowercase, immutable.
    pub name: String,
    pub nick: String,
    pub description: String,
    pub password_hash: String,
    pub recovery_hash: Option<String>,
    pub room: RoomId,
    pub inventory: Vec<ItemId>,
    pub wizard: bool,
    pub online: bool,
    pub pronouns: Pronouns,
    pub posture: Option<Posture>,
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(name: &str, password_hash: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            nick: name.to_string(),
            description: String::new(),
            password_hash: password_hash.to_string(),
            recovery_hash: None,
            room: ROOT_ROOM_ID,
            inventory: Vec::new(),
            wizard: false,
            online: false,
            pronouns: Pronouns::default(),
            posture: None,
            settings: UserSettings::default(),
            created_at: Utc::now(),
            last_login: None,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    pub fn holds(&self, item: ItemId) -> bool {
        self.inventory.contains(&item)
    }

    /// Nickname with the posture suffix used in room listings.
    pub fn presence(&self) -> String {
        match &self.posture {
            None => self.nick.clone(),
            Some(Posture { kind, item: None }) => format!("{} ({})", self.nick, kind.verb()),
            Some(Posture {
                kind,
                item: Some(item),
            }) => format!("{} ({} on {})", self.nick, kind.verb(), item),
        }
    }
}
