//! Protocol catalog: protocol identifiers, per-type defaults and seeding.

mod catalog;
mod names;

pub use catalog::{ProtocolCatalog, ProtocolEntry};
pub use names::{ProtocolName, TerminalType, UnknownVariant};
