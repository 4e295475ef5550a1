pub mod inspect;
pub mod manifest;
pub mod model;

pub use inspect::inspect_folder;
pub use model::{Origin, Package, PackageFile};
