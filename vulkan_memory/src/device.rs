use std::ptr::NonNull;
use std::sync::Arc;

use crate::{
    instance::{Instance, InstanceOwned},
    memory_properties::MemoryProperties,
    prelude::{FrameworkError, VulkanError, VulkanResult},
};

pub trait DeviceOwned {
    fn get_parent_device(&self) -> Arc<Device>;
}

/// The native memory primitives the allocator consumes.
///
/// [`Device`] implements it over the real driver; anything implementing it
/// can back a memory manager.
pub trait MemoryDeviceTrait: Send + Sync {
    /// The hardware memory-type/heap table. Queried once per manager.
    fn memory_properties(&self) -> MemoryProperties;

    /// vkAllocateMemory.
    fn allocate_memory(&self, type_index: u32, size: u64) -> VulkanResult<ash::vk::DeviceMemory>;

    /// vkFreeMemory.
    fn free_memory(&self, memory: ash::vk::DeviceMemory);

    /// vkMapMemory, with an offset absolute within `memory`. May block until
    /// prior device work completes.
    fn map_memory(
        &self,
        memory: ash::vk::DeviceMemory,
        offset: u64,
        size: u64,
    ) -> VulkanResult<NonNull<u8>>;

    /// vkUnmapMemory.
    fn unmap_memory(&self, memory: ash::vk::DeviceMemory);
}

pub struct Device {
    instance: Arc<Instance>,
    physical_device: ash::vk::PhysicalDevice,
    device: ash::Device,
    memory_properties: ash::vk::PhysicalDeviceMemoryProperties,
}

impl InstanceOwned for Device {
    fn get_parent_instance(&self) -> Arc<Instance> {
        self.instance.clone()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(self.instance.get_alloc_callbacks());
        }
    }
}

impl Device {
    pub(crate) fn ash_handle(&self) -> &ash::Device {
        &self.device
    }

    pub fn native_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.device.handle())
    }

    pub fn physical_device_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.physical_device)
    }

    fn score(device_type: ash::vk::PhysicalDeviceType) -> u16 {
        match device_type {
            ash::vk::PhysicalDeviceType::DISCRETE_GPU => 3,
            ash::vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
            ash::vk::PhysicalDeviceType::VIRTUAL_GPU | ash::vk::PhysicalDeviceType::CPU => 1,
            _ => 0,
        }
    }

    /// Opens the best-scoring physical device with a single queue.
    pub fn new(instance: Arc<Instance>) -> VulkanResult<Arc<Self>> {
        let physical_devices = match unsafe { instance.ash_handle().enumerate_physical_devices() }
        {
            Ok(physical_devices) => physical_devices,
            Err(err) => {
                return Err(VulkanError::Vulkan(
                    err.as_raw(),
                    Some(format!("Error enumerating physical devices: {err}")),
                ))
            }
        };

        let physical_device = physical_devices
            .into_iter()
            .max_by_key(|physical_device| {
                let properties = unsafe {
                    instance
                        .ash_handle()
                        .get_physical_device_properties(*physical_device)
                };
                Self::score(properties.device_type)
            })
            .ok_or(FrameworkError::NoSuitableDeviceFound)?;

        let queue_priorities = [1.0f32];
        let queue_create_info = ash::vk::DeviceQueueCreateInfo::default()
            .queue_family_index(0)
            .queue_priorities(queue_priorities.as_slice());

        let create_info = ash::vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_create_info));

        let device = match unsafe {
            instance.ash_handle().create_device(
                physical_device,
                &create_info,
                instance.get_alloc_callbacks(),
            )
        } {
            Ok(device) => device,
            Err(err) => {
                return Err(VulkanError::Vulkan(
                    err.as_raw(),
                    Some(format!("Error creating the logical device: {err}")),
                ))
            }
        };

        let memory_properties = unsafe {
            instance
                .ash_handle()
                .get_physical_device_memory_properties(physical_device)
        };

        Ok(Arc::new(Self {
            instance,
            physical_device,
            device,
            memory_properties,
        }))
    }
}

impl MemoryDeviceTrait for Device {
    fn memory_properties(&self) -> MemoryProperties {
        MemoryProperties::from(&self.memory_properties)
    }

    fn allocate_memory(&self, type_index: u32, size: u64) -> VulkanResult<ash::vk::DeviceMemory> {
        let create_info = ash::vk::MemoryAllocateInfo::default()
            .allocation_size(size)
            .memory_type_index(type_index);

        match unsafe {
            self.device
                .allocate_memory(&create_info, self.instance.get_alloc_callbacks())
        } {
            Ok(memory) => Ok(memory),
            Err(err) => Err(VulkanError::Vulkan(
                err.as_raw(),
                Some(format!("Error allocating {size} bytes of device memory: {err}")),
            )),
        }
    }

    fn free_memory(&self, memory: ash::vk::DeviceMemory) {
        unsafe {
            self.device
                .free_memory(memory, self.instance.get_alloc_callbacks())
        }
    }

    fn map_memory(
        &self,
        memory: ash::vk::DeviceMemory,
        offset: u64,
        size: u64,
    ) -> VulkanResult<NonNull<u8>> {
        let address = match unsafe {
            self.device
                .map_memory(memory, offset, size, ash::vk::MemoryMapFlags::empty())
        } {
            Ok(address) => address,
            Err(err) => {
                return Err(VulkanError::Vulkan(
                    err.as_raw(),
                    Some(format!("Error mapping device memory: {err}")),
                ))
            }
        };

        NonNull::new(address.cast::<u8>()).ok_or_else(|| FrameworkError::MapMemoryError.into())
    }

    fn unmap_memory(&self, memory: ash::vk::DeviceMemory) {
        unsafe { self.device.unmap_memory(memory) }
    }
}
