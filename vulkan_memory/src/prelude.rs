use thiserror::Error;

pub type VulkanResult<T> = Result<T, VulkanError>;

/// Failures detected by the framework itself, before (or instead of)
/// reaching a native vulkan entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    /// No memory type in the compatibility mask carries the requested
    /// property flags, even after dropping the device-local preference.
    #[error("no memory type satisfies the requested properties")]
    NoSuitableMemoryTypeFound,

    /// The device refused to allocate a new memory chunk.
    #[error("the device is out of memory for a new chunk")]
    OutOfDeviceMemory,

    /// No chunk could serve the requested size and alignment.
    #[error("cannot reserve the requested range")]
    MallocFail,

    /// Binding a resource to its committed range failed.
    #[error("failed to bind the resource to its committed range")]
    BindFail(Option<String>),

    /// A second mapping was requested on a chunk that already has a live one.
    #[error("the owning chunk is already mapped")]
    InvalidMapState,

    /// The device returned a null host pointer for a mapped range.
    #[error("error mapping device memory into the host address space")]
    MapMemoryError,

    #[error("cannot load the vulkan runtime")]
    CannotLoadVulkan,

    #[error("cannot create the vulkan instance")]
    CannotCreateVulkanInstance,

    #[error("no suitable physical device found")]
    NoSuitableDeviceFound,

    #[error("invalid user input")]
    UserInput(Option<String>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VulkanError {
    #[error("framework error: {0}")]
    Framework(#[from] FrameworkError),

    #[error("vulkan error ({}): {}", .0, .1.as_deref().unwrap_or("no further details"))]
    Vulkan(i32, Option<String>),
}
