pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use deps::SessionDeps;
pub use traits::*;
