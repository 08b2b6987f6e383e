use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// Wall time of one pipeline phase.
#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub phase: String,
    pub elapsed: Duration,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy)]
pub struct ProcessStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

/// Records per-phase timings and, with the `cli` feature, process memory.
pub struct PhaseMonitor {
    enabled: bool,
    started: Instant,
    phases: Mutex<Vec<PhaseTiming>>,
    #[cfg(feature = "cli")]
    system: Option<Mutex<(System, Pid)>>,
    #[cfg(feature = "cli")]
    peak_memory_mb: Mutex<u64>,
}

impl PhaseMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
            phases: Mutex::new(Vec::new()),
            #[cfg(feature = "cli")]
            system: enabled.then(Self::current_process).flatten(),
            #[cfg(feature = "cli")]
            peak_memory_mb: Mutex::new(0),
        }
    }

    #[cfg(feature = "cli")]
    fn current_process() -> Option<Mutex<(System, Pid)>> {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                tracing::warn!("Process stats unavailable: {}", e);
                return None;
            }
        };
        let mut system = System::new_with_specifics(RefreshKind::everything());
        system.refresh_all();
        Some(Mutex::new((system, pid)))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Closes a phase that started at `since`.
    pub fn record_phase(&self, phase: &str, since: Instant) {
        if !self.enabled {
            return;
        }
        let elapsed = since.elapsed();
        if let Ok(mut phases) = self.phases.lock() {
            phases.push(PhaseTiming {
                phase: phase.to_string(),
                elapsed,
            });
        }
        self.log_phase(phase, elapsed);
    }

    #[cfg(feature = "cli")]
    fn log_phase(&self, phase: &str, elapsed: Duration) {
        match self.process_stats() {
            Some(stats) => tracing::info!(
                "📊 {} - {:?}, CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                phase,
                elapsed,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb
            ),
            None => tracing::info!("📊 {} - {:?}", phase, elapsed),
        }
    }

    #[cfg(not(feature = "cli"))]
    fn log_phase(&self, phase: &str, elapsed: Duration) {
        tracing::info!("📊 {} - {:?}", phase, elapsed);
    }

    #[cfg(feature = "cli")]
    pub fn process_stats(&self) -> Option<ProcessStats> {
        let mut guard = self.system.as_ref()?.lock().ok()?;
        let (system, pid) = &mut *guard;
        system.refresh_all();
        let process = system.process(*pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory_mb.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(ProcessStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
        })
    }

    pub fn timings(&self) -> Vec<PhaseTiming> {
        self.phases
            .lock()
            .map(|phases| phases.clone())
            .unwrap_or_default()
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        tracing::info!("📊 Final Stats - Total Time: {:?}", self.started.elapsed());
    }
}

impl Default for PhaseMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
