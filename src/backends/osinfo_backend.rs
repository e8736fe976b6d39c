//! System-info backend ([MODULE J]) — a static snapshot of the host
//! environment, built once at construction and served from the same
//! in-memory tree used for tests elsewhere in the crate. Takes no file
//! argument; selected by a dedicated entry point rather than an extension.

use crate::backend::{MemoryBackend, MemoryNode};

#[cfg(unix)]
extern "C" {
    fn getuid() -> u32;
}

pub fn build() -> MemoryBackend {
    let mut system = sysinfo::System::new();
    system.refresh_cpu_all();

    let platform = MemoryNode::dir([
        (
            "system",
            MemoryNode::text(sysinfo::System::name().unwrap_or_else(|| "unknown".to_string())),
        ),
        (
            "release",
            MemoryNode::text(
                sysinfo::System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            ),
        ),
        (
            "version",
            MemoryNode::text(sysinfo::System::os_version().unwrap_or_else(|| "unknown".to_string())),
        ),
        ("machine", MemoryNode::text(std::env::consts::ARCH)),
        (
            "processor",
            MemoryNode::text(
                system
                    .cpus()
                    .first()
                    .map(|cpu| cpu.brand().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        ),
        (
            "interpreter_version",
            MemoryNode::text(env!("CARGO_PKG_VERSION")),
        ),
        (
            "node",
            MemoryNode::text(sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string())),
        ),
    ]);

    let env_entries: Vec<(String, MemoryNode)> = std::env::vars()
        .map(|(k, v)| (k, MemoryNode::text(v)))
        .collect();
    let env_dir = MemoryNode::Dir(env_entries.into_iter().collect());

    let cpu = MemoryNode::dir([(
        "count",
        MemoryNode::text(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .to_string(),
        ),
    )]);

    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let mut entries: Vec<(&'static str, MemoryNode)> = vec![
        ("platform", platform),
        ("cpu", cpu),
        ("cwd", MemoryNode::text(cwd)),
        ("pid", MemoryNode::text(std::process::id().to_string())),
    ];

    #[cfg(unix)]
    let uid = unsafe { getuid() };
    #[cfg(unix)]
    entries.push(("uid", MemoryNode::text(uid.to_string())));

    let mut root = MemoryNode::dir(entries);
    if let MemoryNode::Dir(ref mut map) = root {
        map.insert("env".to_string(), env_dir);
    }

    MemoryBackend::new(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;

    #[test]
    fn platform_and_cpu_are_directories() {
        let backend = build();
        assert!(backend.info(&vec!["platform".to_string()]).unwrap().is_dir);
        assert!(backend.info(&vec!["cpu".to_string()]).unwrap().is_dir);
    }

    #[test]
    fn cwd_and_pid_are_scalar_files() {
        let backend = build();
        assert!(!backend.info(&vec!["pid".to_string()]).unwrap().is_dir);
        let pid = backend.get(&vec!["pid".to_string()]).unwrap();
        assert_eq!(String::from_utf8(pid).unwrap(), std::process::id().to_string());
    }

    #[test]
    fn env_vars_are_exposed_under_env() {
        std::env::set_var("DAVALL_TEST_VAR", "present");
        let backend = build();
        let path = vec!["env".to_string(), "DAVALL_TEST_VAR".to_string()];
        assert_eq!(backend.get(&path).unwrap(), b"present");
    }
}
