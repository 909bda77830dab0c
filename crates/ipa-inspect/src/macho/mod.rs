pub mod arch;
pub mod parser;

pub use arch::{arch_name, architectures_from_bytes, inspect_architectures, ArchitectureSet};
pub use parser::{ArchSlice, MachOFile};
