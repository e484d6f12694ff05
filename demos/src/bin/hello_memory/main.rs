use vulkan_memory::{
    buffer::*, device::*, image::*, instance::*, memory_manager::*, memory_requiring::*,
};

fn main() {
    let engine_name = "None";
    let app_name = "hello_memory";

    let Ok(instance) = Instance::new(app_name, engine_name, &InstanceAPIVersion::Version1_1, false)
    else {
        panic!("Error creating vulkan instance");
    };

    println!("Vulkan instance created");

    let Ok(device) = Device::new(instance) else {
        panic!("Error opening a suitable device");
    };

    println!("Device opened successfully");

    let mut memory_manager = MemoryManager::new(device.clone());

    let Ok(staging_buffer) = Buffer::new(
        device.clone(),
        ConcreteBufferDescriptor::new(
            BufferUsage::from_flags(&[BufferUsageFlag::TransferSrc, BufferUsageFlag::TransferDst]),
            4096,
        ),
    ) else {
        panic!("Error creating the staging buffer");
    };

    let requirements = staging_buffer.memory_requirements();
    println!(
        "Staging buffer wants {} bytes aligned to {}",
        requirements.size(),
        requirements.alignment()
    );

    let staging_commit = match memory_manager.commit_resource(&staging_buffer, true) {
        Ok(commit) => commit,
        Err(err) => panic!("Error committing memory for the staging buffer: {err}"),
    };

    println!(
        "Committed {} bytes at offset {}",
        staging_commit.size(),
        staging_commit.offset()
    );

    {
        let mut mapping = match staging_commit.map_whole() {
            Ok(mapping) => mapping,
            Err(err) => panic!("Error mapping the staging commit: {err}"),
        };

        mapping.span_mut().fill(0x5a);
        println!("Wrote {} bytes through the mapping", mapping.len());
    }

    let mapping = match staging_commit.map(0, 16) {
        Ok(mapping) => mapping,
        Err(err) => panic!("Error re-mapping the staging commit: {err}"),
    };
    println!("First mapped byte reads back {:#04x}", mapping.span()[0]);
    mapping.release();

    let Ok(texture) = Image::new(
        device.clone(),
        ConcreteImageDescriptor::new(
            ImageDimensions::Image2D {
                width: 512,
                height: 512,
            },
            ImageUsage::from_flags(&[ImageUsageFlag::TransferDst, ImageUsageFlag::Sampled]),
            ImageFormat::R8G8B8A8Srgb,
            1,
            1,
        ),
    ) else {
        panic!("Error creating the texture image");
    };

    let texture_commit = match memory_manager.commit_resource(&texture, false) {
        Ok(commit) => commit,
        Err(err) => panic!("Error committing memory for the texture: {err}"),
    };

    println!("Texture committed at offset {}", texture_commit.offset());
    println!(
        "Memory manager now holds {} chunk(s)",
        memory_manager.allocation_count()
    );
}
