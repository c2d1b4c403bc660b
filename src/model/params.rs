use crate::host::HostMetadata;
use std::path::PathBuf;

/// What is known about one benchmark run apart from its measurements.
///
/// The command line fills the first half; `host`, `patch_version` and
/// `resource_group` are stamped afterwards from the machine itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub accel_net: bool,
    pub msg_size: u32,
    pub vm_sender: String,
    pub vm_receiver: String,
    pub input_file: PathBuf,
    pub placement_mode: String,

    pub host: HostMetadata,
    pub patch_version: String,
    pub resource_group: String,
}

impl RunParameters {
    pub fn new(
        accel_net: bool,
        msg_size: u32,
        vm_sender: String,
        vm_receiver: String,
        input_file: PathBuf,
        placement_mode: String,
    ) -> Self {
        Self {
            accel_net,
            msg_size,
            vm_sender,
            vm_receiver,
            input_file,
            placement_mode,
            host: HostMetadata::default(),
            patch_version: String::new(),
            resource_group: String::new(),
        }
    }
}
