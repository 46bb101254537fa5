//! Optional libraries that callers register explicitly.

pub mod directory;

pub use directory::{DirectoryLibrary, DirectoryResolver, StaticDirectory};
