//! Build-scoped state registry
//!
//! Every map is keyed by build identity or process identity. Removal is the
//! ownership transfer: whoever removes an entry is the only one processing
//! it, so no tunnel starts twice and no cleanup runs twice.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use st_core::error::RegistryError;
use st_core::{BuildId, BuildState, Connection, Tunnel};
use tokio::process::Child;

/// Identity of one spawned `ssh` process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc-{}", self.0)
    }
}

/// A spawned tunnel process and the connection it serves
#[derive(Debug)]
pub struct TunnelProcess {
    pub id: ProcessId,
    pub connection: Connection,
    pub child: Child,
}

/// Captured output files of one process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFiles {
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

/// Concurrent per-build bookkeeping for tunnels, processes and temp files
pub struct BuildRegistry {
    /// Tunnels computed at registration, waiting for establishment
    tunnels: DashMap<BuildId, Vec<Tunnel>>,
    /// Processes started for a build, in connection order
    processes: DashMap<BuildId, Vec<TunnelProcess>>,
    /// Files to delete at teardown
    temp_files: DashMap<BuildId, Vec<PathBuf>>,
    stdout_files: DashMap<ProcessId, PathBuf>,
    stderr_files: DashMap<ProcessId, PathBuf>,
    states: DashMap<BuildId, BuildState>,
    next_process_id: AtomicU64,
}

impl BuildRegistry {
    pub fn new() -> Self {
        Self {
            tunnels: DashMap::new(),
            processes: DashMap::new(),
            temp_files: DashMap::new(),
            stdout_files: DashMap::new(),
            stderr_files: DashMap::new(),
            states: DashMap::new(),
            next_process_id: AtomicU64::new(1),
        }
    }

    /// Register a build with its tunnels
    ///
    /// Fails if the build identity is already live.
    pub fn register(&self, build_id: &BuildId, tunnels: Vec<Tunnel>) -> Result<(), RegistryError> {
        match self.states.entry(build_id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(build_id.to_string())),
            Entry::Vacant(entry) => {
                self.tunnels.insert(build_id.clone(), tunnels);
                entry.insert(BuildState::Registered);
                Ok(())
            }
        }
    }

    /// Take the build's registered tunnels; later calls get an empty list
    pub fn take_tunnels(&self, build_id: &BuildId) -> Vec<Tunnel> {
        self.tunnels
            .remove(build_id)
            .map(|(_, tunnels)| tunnels)
            .unwrap_or_default()
    }

    /// Allocate a fresh process identity
    pub fn next_process_id(&self) -> ProcessId {
        ProcessId(self.next_process_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Record a started process for the build
    pub fn add_process(&self, build_id: &BuildId, process: TunnelProcess) {
        self.processes
            .entry(build_id.clone())
            .or_default()
            .push(process);
    }

    /// Take the build's processes; `None` if the build never started any
    pub fn take_processes(&self, build_id: &BuildId) -> Option<Vec<TunnelProcess>> {
        self.processes.remove(build_id).map(|(_, processes)| processes)
    }

    /// Number of processes tracked for the build
    pub fn process_count(&self, build_id: &BuildId) -> usize {
        self.processes.get(build_id).map(|p| p.len()).unwrap_or(0)
    }

    /// Track a file for deletion at teardown
    pub fn track_file(&self, build_id: &BuildId, path: PathBuf) {
        self.temp_files
            .entry(build_id.clone())
            .or_default()
            .push(path);
    }

    /// Take the build's tracked files
    pub fn take_files(&self, build_id: &BuildId) -> Vec<PathBuf> {
        self.temp_files
            .remove(build_id)
            .map(|(_, files)| files)
            .unwrap_or_default()
    }

    /// Associate captured output files with a process
    pub fn set_output(&self, process_id: ProcessId, stdout: PathBuf, stderr: PathBuf) {
        self.stdout_files.insert(process_id, stdout);
        self.stderr_files.insert(process_id, stderr);
    }

    /// Take a process' output file associations
    pub fn take_output(&self, process_id: ProcessId) -> OutputFiles {
        OutputFiles {
            stdout: self.stdout_files.remove(&process_id).map(|(_, p)| p),
            stderr: self.stderr_files.remove(&process_id).map(|(_, p)| p),
        }
    }

    /// Move a live build to `state`; unknown builds are ignored
    pub fn set_state(&self, build_id: &BuildId, state: BuildState) {
        if let Some(mut current) = self.states.get_mut(build_id) {
            tracing::debug!("Build {} is {} -> {}", build_id, *current, state);
            *current = state;
        }
    }

    /// Lifecycle state of a live build
    pub fn state(&self, build_id: &BuildId) -> Option<BuildState> {
        self.states.get(build_id).map(|s| *s)
    }

    /// Forget a build entirely
    pub fn close(&self, build_id: &BuildId) {
        self.set_state(build_id, BuildState::Closed);
        self.states.remove(build_id);
    }

    /// Number of live builds
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for BuildRegistry {
    fn default() -> Self {
        Self::new()
    }
}
