//! Command handler catalog. Each module exports `commands()`.

pub mod account;
pub mod building;
pub mod describe;
pub mod info;
pub mod items;
pub mod locking;
pub mod movement;
pub mod ownership;
pub mod settings;
pub mod social;
pub mod wizard;

use super::registry::CommandSpec;

pub fn all() -> Vec<CommandSpec> {
    let mut specs = Vec::new();
    specs.extend(account::commands());
    specs.extend(settings::commands());
    specs.extend(info::commands());
    specs.extend(movement::commands());
    specs.extend(building::commands());
    specs.extend(describe::commands());
    specs.extend(ownership::commands());
    specs.extend(locking::commands());
    specs.extend(items::commands());
    specs.extend(social::commands());
    specs.extend(wizard::commands());
    specs
}
