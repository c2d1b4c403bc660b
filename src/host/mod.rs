//! Facts about the machine the benchmark ran on.

pub mod metadata;
pub mod resource_group;

pub use metadata::{HostMetadata, gather_metadata, kernel_release};
pub use resource_group::resource_group;
