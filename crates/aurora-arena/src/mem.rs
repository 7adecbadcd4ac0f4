//! Residency tags and address spaces.

use std::fmt;

/// Which address spaces a buffer allocates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemType {
    /// Host allocation only.
    #[default]
    HostOnly,
    /// Mirrored host and device allocations, synchronised explicitly.
    HostDevice,
    /// One unified allocation visible from both spaces.
    DeviceManaged,
    /// Device allocation only.
    DeviceOnly,
}

/// An address space a kernel or accessor can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemSpace {
    /// Host memory.
    Host,
    /// Accelerator memory.
    Device,
}

impl MemType {
    /// True if host code may access the buffer.
    pub fn has_host(self) -> bool {
        !matches!(self, Self::DeviceOnly)
    }

    /// True if device kernels may access the buffer.
    pub fn has_device(self) -> bool {
        !matches!(self, Self::HostOnly)
    }

    /// True if `space` is accessible under this tag.
    pub fn has(self, space: MemSpace) -> bool {
        match space {
            MemSpace::Host => self.has_host(),
            MemSpace::Device => self.has_device(),
        }
    }

    /// True if host and device are two separate allocations.
    pub fn is_mirrored(self) -> bool {
        matches!(self, Self::HostDevice)
    }
}

impl fmt::Display for MemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HostOnly => "host_only",
            Self::HostDevice => "host_device",
            Self::DeviceManaged => "device_managed",
            Self::DeviceOnly => "device_only",
        };
        f.write_str(s)
    }
}

impl fmt::Display for MemSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Device => f.write_str("device"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residency_table() {
        assert!(MemType::HostOnly.has_host() && !MemType::HostOnly.has_device());
        assert!(MemType::HostDevice.has_host() && MemType::HostDevice.has_device());
        assert!(MemType::DeviceManaged.has_host() && MemType::DeviceManaged.has_device());
        assert!(!MemType::DeviceOnly.has_host() && MemType::DeviceOnly.has_device());
        assert!(MemType::HostDevice.is_mirrored());
        assert!(!MemType::DeviceManaged.is_mirrored());
    }
}
