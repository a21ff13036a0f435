//! Domain logic - pure value types independent of git and registry access

pub mod branch;
pub mod image;
pub mod revision;
pub mod selector;
pub mod version;

pub use branch::{BranchContext, MAIN_BRANCH_CANDIDATES};
pub use image::{Image, ImageReference, ImageTarget};
pub use revision::{Revision, UNTAGGED_VERSION};
pub use selector::{Requirement, Selector};
pub use version::SemVer;
