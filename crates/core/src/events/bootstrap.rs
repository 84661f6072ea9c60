use std::thread;

/// Host observations reported once per process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemInfo {
    pub cpu_count: usize,
    /// Total memory in megabytes, when the platform exposes it.
    pub memory_mb: Option<u64>,
}

impl SystemInfo {
    pub fn probe() -> Self {
        Self {
            cpu_count: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            memory_mb: total_memory_mb(),
        }
    }
}

#[cfg(target_os = "linux")]
fn total_memory_mb() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_mem_total_kb(&meminfo).map(|kb| kb / 1000)
}

#[cfg(not(target_os = "linux"))]
fn total_memory_mb() -> Option<u64> {
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mem_total_kb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}
