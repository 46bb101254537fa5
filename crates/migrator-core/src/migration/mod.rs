//! Migrations: definitions, parsing, target resolution and the runner.

mod change;
mod definition;
mod parse;
mod resolver;
mod runner;

pub use change::MigrationChange;
pub use definition::{Migration, MigrationSpec, PatchKind, PatchSpec, TargetDescriptor};
pub use parse::{parse_directory, parse_file, parse_json_str, parse_str};
pub use resolver::resolve;
pub use runner::{
    calculate_changes, migrate_down, migrate_up, Direction, InvalidDirection, Migrator,
    MigratorConfig, Mode,
};
