use std::ffi::CString;
use std::sync::Arc;

use crate::prelude::{FrameworkError, VulkanResult};

pub enum InstanceAPIVersion {
    Version1_0,
    Version1_1,
    Version1_2,
    Version1_3,
}

impl InstanceAPIVersion {
    pub(crate) fn ash_version(&self) -> u32 {
        match self {
            Self::Version1_0 => ash::vk::API_VERSION_1_0,
            Self::Version1_1 => ash::vk::API_VERSION_1_1,
            Self::Version1_2 => ash::vk::API_VERSION_1_2,
            Self::Version1_3 => ash::vk::API_VERSION_1_3,
        }
    }
}

pub trait InstanceOwned {
    fn get_parent_instance(&self) -> Arc<Instance>;
}

pub struct Instance {
    entry: ash::Entry,
    instance: ash::Instance,
    validation_layers: bool,
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(self.get_alloc_callbacks());
        }
    }
}

impl Instance {
    pub(crate) fn ash_handle(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn ash_entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn native_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.instance.handle())
    }

    pub fn get_alloc_callbacks(&self) -> Option<&ash::vk::AllocationCallbacks<'_>> {
        None
    }

    pub fn is_debugging_enabled(&self) -> bool {
        self.validation_layers
    }

    pub fn new(
        app_name: &str,
        engine_name: &str,
        api_version: &InstanceAPIVersion,
        enable_debugging: bool,
    ) -> VulkanResult<Arc<Self>> {
        let entry = match unsafe { ash::Entry::load() } {
            Ok(entry) => entry,
            Err(_err) => {
                #[cfg(debug_assertions)]
                println!("Error loading the vulkan runtime: {_err}");

                return Err(FrameworkError::CannotLoadVulkan.into());
            }
        };

        let app_name_bytes = CString::new(app_name).map_err(|_| {
            FrameworkError::UserInput(Some("application name contains a NUL byte".to_owned()))
        })?;
        let engine_name_bytes = CString::new(engine_name).map_err(|_| {
            FrameworkError::UserInput(Some("engine name contains a NUL byte".to_owned()))
        })?;

        let application_info = ash::vk::ApplicationInfo::default()
            .application_name(app_name_bytes.as_c_str())
            .engine_name(engine_name_bytes.as_c_str())
            .api_version(api_version.ash_version());

        let enabled_layers: Vec<*const std::os::raw::c_char> = match enable_debugging {
            true => vec![c"VK_LAYER_KHRONOS_validation".as_ptr()],
            false => vec![],
        };

        let create_info = ash::vk::InstanceCreateInfo::default()
            .application_info(&application_info)
            .enabled_layer_names(enabled_layers.as_slice());

        let instance = match unsafe { entry.create_instance(&create_info, None) } {
            Ok(instance) => instance,
            Err(_err) => {
                #[cfg(debug_assertions)]
                println!("Error creating the vulkan instance: {_err}");

                return Err(FrameworkError::CannotCreateVulkanInstance.into());
            }
        };

        Ok(Arc::new(Self {
            entry,
            instance,
            validation_layers: enable_debugging,
        }))
    }
}
