//! Host capacity and identity discovery.
use dxf_model::Slots;

use crate::error::CoreError;

/// Total CPU and memory of the node, fixed for the lifetime of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapacity {
    pub cpu: Slots,
    pub mem_bytes: u64,
}

impl HostCapacity {
    /// Build an explicit capacity, rejecting empty values.
    pub fn new(cpu: Slots, mem_bytes: u64) -> Result<Self, CoreError> {
        if cpu == 0 || mem_bytes == 0 {
            return Err(CoreError::InvalidCapacity { cpu, mem_bytes });
        }
        Ok(Self { cpu, mem_bytes })
    }

    /// Discover the capacity of the current host.
    ///
    /// CPU honours cgroup quotas where `num_cpus` can see them.
    pub fn discover() -> Result<Self, CoreError> {
        let cpu = num_cpus::get();
        let mem_bytes = total_memory()?;
        Self::new(cpu, mem_bytes)
    }
}

/// Default node identity: `<hostname>:<port>`.
pub fn default_exec_id(port: u16) -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{host}:{port}")
}

#[cfg(unix)]
fn total_memory() -> Result<u64, CoreError> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let (pages, page_size) = unsafe {
        (
            libc::sysconf(libc::_SC_PHYS_PAGES),
            libc::sysconf(libc::_SC_PAGESIZE),
        )
    };
    if pages <= 0 || page_size <= 0 {
        return Err(CoreError::CapacityDiscovery(format!(
            "sysconf returned pages={pages}, page_size={page_size}"
        )));
    }
    Ok(pages as u64 * page_size as u64)
}

#[cfg(not(unix))]
fn total_memory() -> Result<u64, CoreError> {
    Err(CoreError::CapacityDiscovery(
        "physical memory discovery is only supported on unix".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_capacity() {
        assert!(matches!(
            HostCapacity::new(0, 1024),
            Err(CoreError::InvalidCapacity { cpu: 0, .. })
        ));
        assert!(HostCapacity::new(4, 0).is_err());
        assert!(HostCapacity::new(4, 1024).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn discovers_current_host() {
        let cap = HostCapacity::discover().expect("host capacity");
        assert!(cap.cpu > 0);
        assert!(cap.mem_bytes > 0);
    }

    #[test]
    fn exec_id_has_port() {
        let id = default_exec_id(4000);
        assert!(id.ends_with(":4000"));
        assert!(id.len() > ":4000".len());
    }
}
