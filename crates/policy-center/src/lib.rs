pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;

pub use defaults::default_tables;
pub use errors::PolicyError;
pub use loader::{load_tables, load_tables_with_options, LoadOptions};
pub use model::{
    CapacityPolicy, PolicyProvenance, PolicySource, PolicyTables, UnresolvedCoursePolicy,
    ALL_PERMISSION,
};

#[cfg(test)]
mod tests;
