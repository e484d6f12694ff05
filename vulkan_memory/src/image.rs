use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    device::{Device, DeviceOwned},
    instance::InstanceOwned,
    memory_requiring::{MemoryBindable, MemoryRequirements, MemoryRequiring},
    prelude::{VulkanError, VulkanResult},
};

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    B8G8R8A8Srgb,
    R16G16B16A16Sfloat,
    R32G32B32A32Sfloat,
    D32Sfloat,
    D24UnormS8Uint,
}

impl ImageFormat {
    pub(crate) fn ash_format(&self) -> ash::vk::Format {
        match self {
            Self::R8G8B8A8Unorm => ash::vk::Format::R8G8B8A8_UNORM,
            Self::R8G8B8A8Srgb => ash::vk::Format::R8G8B8A8_SRGB,
            Self::B8G8R8A8Srgb => ash::vk::Format::B8G8R8A8_SRGB,
            Self::R16G16B16A16Sfloat => ash::vk::Format::R16G16B16A16_SFLOAT,
            Self::R32G32B32A32Sfloat => ash::vk::Format::R32G32B32A32_SFLOAT,
            Self::D32Sfloat => ash::vk::Format::D32_SFLOAT,
            Self::D24UnormS8Uint => ash::vk::Format::D24_UNORM_S8_UINT,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum ImageDimensions {
    Image1D { width: u32 },
    Image2D { width: u32, height: u32 },
    Image3D { width: u32, height: u32, depth: u32 },
}

impl ImageDimensions {
    pub(crate) fn ash_image_type(&self) -> ash::vk::ImageType {
        match self {
            Self::Image1D { .. } => ash::vk::ImageType::TYPE_1D,
            Self::Image2D { .. } => ash::vk::ImageType::TYPE_2D,
            Self::Image3D { .. } => ash::vk::ImageType::TYPE_3D,
        }
    }

    pub(crate) fn ash_extent(&self) -> ash::vk::Extent3D {
        match *self {
            Self::Image1D { width } => ash::vk::Extent3D {
                width,
                height: 1,
                depth: 1,
            },
            Self::Image2D { width, height } => ash::vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            Self::Image3D {
                width,
                height,
                depth,
            } => ash::vk::Extent3D {
                width,
                height,
                depth,
            },
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum ImageUsageFlag {
    TransferSrc,
    TransferDst,
    Sampled,
    Storage,
    ColorAttachment,
    DepthStencilAttachment,
}

impl ImageUsageFlag {
    pub(crate) fn ash_flags(&self) -> ash::vk::ImageUsageFlags {
        match self {
            Self::TransferSrc => ash::vk::ImageUsageFlags::TRANSFER_SRC,
            Self::TransferDst => ash::vk::ImageUsageFlags::TRANSFER_DST,
            Self::Sampled => ash::vk::ImageUsageFlags::SAMPLED,
            Self::Storage => ash::vk::ImageUsageFlags::STORAGE,
            Self::ColorAttachment => ash::vk::ImageUsageFlags::COLOR_ATTACHMENT,
            Self::DepthStencilAttachment => ash::vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

/// Image usage as either framework-managed flags or a raw vulkan bitmask.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageUsage {
    Managed(SmallVec<[ImageUsageFlag; 4]>),
    Unmanaged(u32),
}

impl ImageUsage {
    pub fn from_flags(flags: &[ImageUsageFlag]) -> Self {
        Self::Managed(flags.into())
    }

    pub fn from_raw(flags: u32) -> Self {
        Self::Unmanaged(flags)
    }

    pub(crate) fn ash_usage(&self) -> ash::vk::ImageUsageFlags {
        match self {
            Self::Managed(flags) => flags
                .iter()
                .fold(ash::vk::ImageUsageFlags::empty(), |usage, flag| {
                    usage | flag.ash_flags()
                }),
            Self::Unmanaged(raw) => ash::vk::ImageUsageFlags::from_raw(*raw),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConcreteImageDescriptor {
    dimensions: ImageDimensions,
    usage: ImageUsage,
    format: ImageFormat,
    mip_levels: u32,
    array_layers: u32,
}

impl ConcreteImageDescriptor {
    pub fn new(
        dimensions: ImageDimensions,
        usage: ImageUsage,
        format: ImageFormat,
        mip_levels: u32,
        array_layers: u32,
    ) -> Self {
        Self {
            dimensions,
            usage,
            format,
            mip_levels: mip_levels.max(1),
            array_layers: array_layers.max(1),
        }
    }

    pub fn dimensions(&self) -> ImageDimensions {
        self.dimensions
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

pub struct Image {
    device: Arc<Device>,
    descriptor: ConcreteImageDescriptor,
    image: ash::vk::Image,
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_image(
                self.image,
                self.device.get_parent_instance().get_alloc_callbacks(),
            )
        }
    }
}

impl DeviceOwned for Image {
    fn get_parent_device(&self) -> Arc<Device> {
        self.device.clone()
    }
}

impl Image {
    pub fn native_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.image)
    }

    pub fn descriptor(&self) -> &ConcreteImageDescriptor {
        &self.descriptor
    }

    pub fn new(device: Arc<Device>, descriptor: ConcreteImageDescriptor) -> VulkanResult<Self> {
        let create_info = ash::vk::ImageCreateInfo::default()
            .image_type(descriptor.dimensions.ash_image_type())
            .extent(descriptor.dimensions.ash_extent())
            .format(descriptor.format.ash_format())
            .usage(descriptor.usage.ash_usage())
            .mip_levels(descriptor.mip_levels)
            .array_layers(descriptor.array_layers)
            .samples(ash::vk::SampleCountFlags::TYPE_1)
            .tiling(ash::vk::ImageTiling::OPTIMAL)
            .sharing_mode(ash::vk::SharingMode::EXCLUSIVE)
            .initial_layout(ash::vk::ImageLayout::UNDEFINED);

        let image = match unsafe {
            device.ash_handle().create_image(
                &create_info,
                device.get_parent_instance().get_alloc_callbacks(),
            )
        } {
            Ok(image) => image,
            Err(err) => {
                return Err(VulkanError::Vulkan(
                    err.as_raw(),
                    Some(format!("Error creating the image: {err}")),
                ))
            }
        };

        Ok(Self {
            device,
            descriptor,
            image,
        })
    }
}

impl MemoryRequiring for Image {
    fn memory_requirements(&self) -> MemoryRequirements {
        let requirements = unsafe {
            self.device
                .ash_handle()
                .get_image_memory_requirements(self.image)
        };

        MemoryRequirements::from(requirements)
    }
}

impl MemoryBindable for Image {
    fn bind_memory(&self, memory: ash::vk::DeviceMemory, offset: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .ash_handle()
                .bind_image_memory(self.image, memory, offset)
        }
        .map_err(|err| {
            VulkanError::Vulkan(
                err.as_raw(),
                Some(format!("Error binding the image to its memory: {err}")),
            )
        })
    }
}
