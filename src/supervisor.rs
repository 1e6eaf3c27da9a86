use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::loader::BatchLoader;

// ---------------------------------------------------------------------------
// Cycle state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Launching,
    Running,
    Importing,
    Cooldown,
}

/// All supervisor bookkeeping funnels through this machine, and the machine
/// has a single owner (the run loop), so the "already running" guard and the
/// termination handling can never interleave.
#[derive(Debug)]
pub struct CycleStateMachine {
    state: CycleState,
}

impl CycleStateMachine {
    pub fn new() -> Self {
        Self { state: CycleState::Idle }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// The only guarded transition: a launch is accepted only from Idle or
    /// Cooldown. A request arriving mid-cycle is rejected, not queued.
    pub fn begin_launch(&mut self) -> bool {
        match self.state {
            CycleState::Idle | CycleState::Cooldown => {
                self.state = CycleState::Launching;
                true
            }
            _ => false,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = CycleState::Running;
    }

    /// Failed-to-start: back to Idle without ever reaching Running.
    pub fn abort_launch(&mut self) {
        self.state = CycleState::Idle;
    }

    pub fn begin_import(&mut self) {
        self.state = CycleState::Importing;
    }

    pub fn begin_cooldown(&mut self) {
        self.state = CycleState::Cooldown;
    }
}

impl Default for CycleStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Producer outcome classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerOutcome {
    /// Exit status 0.
    Succeeded,
    /// Normal termination with a non-zero status.
    FailedExit(i32),
    /// Abnormal termination (killed by a signal).
    CrashExit,
}

impl ProducerOutcome {
    pub fn classify(code: Option<i32>) -> Self {
        match code {
            Some(0) => ProducerOutcome::Succeeded,
            Some(code) => ProducerOutcome::FailedExit(code),
            None => ProducerOutcome::CrashExit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEnd {
    Continue,
    Shutdown,
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Drives the repeating produce-import cycle: launch the external producer,
/// wait for it to terminate, import whatever it wrote, cool down, repeat.
/// The import runs after every termination — a crashed or failing producer
/// may still have written partial usable output.
pub struct Supervisor {
    cfg: Config,
    loader: BatchLoader,
    machine: CycleStateMachine,
}

impl Supervisor {
    pub fn new(cfg: Config, loader: BatchLoader) -> Self {
        Self { cfg, loader, machine: CycleStateMachine::new() }
    }

    /// Runs until the shutdown signal flips. An in-flight producer gets a
    /// graceful termination request, a bounded grace period, then a kill.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting the produce-import cycle");
        loop {
            if *shutdown.borrow() {
                break;
            }
            if self.run_cycle(&mut shutdown).await == CycleEnd::Shutdown {
                break;
            }
            let cooldown = Duration::from_millis(self.cfg.cooldown_ms);
            tokio::select! {
                _ = sleep(cooldown) => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Supervisor stopped");
    }

    /// One full cycle: launch → wait → classify → import. Returns Shutdown
    /// only when the shutdown signal arrived while the producer was running.
    pub(crate) async fn run_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> CycleEnd {
        if !self.machine.begin_launch() {
            warn!("Producer launch requested while a cycle is still active — rejected");
            return CycleEnd::Continue;
        }

        info!(
            "Launching producer: {} {} (cwd: {})",
            self.cfg.producer_program, self.cfg.producer_script, self.cfg.producer_dir,
        );
        let mut child = match self.spawn_producer() {
            Ok(child) => child,
            Err(e) => {
                // Nothing new can have been written; skip the import and let
                // the normal cooldown reschedule the next attempt.
                error!("Failed to start producer: {e}");
                self.machine.abort_launch();
                return CycleEnd::Continue;
            }
        };
        self.machine.mark_running();

        // Drain stderr concurrently so a chatty producer cannot fill the pipe
        // and deadlock against our wait().
        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf).await;
                buf
            })
        });

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        self.terminate(&mut child).await;
                        return CycleEnd::Shutdown;
                    }
                }
            }
        };

        let stderr_text = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let outcome = match status {
            Ok(status) => ProducerOutcome::classify(status.code()),
            Err(e) => {
                error!("Failed to reap producer: {e}");
                ProducerOutcome::CrashExit
            }
        };
        log_outcome(outcome, stderr_text.trim());

        // All outcomes converge here: the import always runs.
        self.machine.begin_import();
        info!("Importing data after producer completion");
        if let Err(e) = self.loader.import_all().await {
            error!("Batch import failed: {e}");
        }
        self.machine.begin_cooldown();
        CycleEnd::Continue
    }

    fn spawn_producer(&self) -> std::io::Result<Child> {
        Command::new(&self.cfg.producer_program)
            .arg(&self.cfg.producer_script)
            .current_dir(&self.cfg.producer_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    /// Ask the producer to stop, give it `kill_grace_ms`, then kill it.
    async fn terminate(&self, child: &mut Child) {
        info!("Terminating running producer process");
        let grace = Duration::from_millis(self.cfg.kill_grace_ms);

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
            if timeout(grace, child.wait()).await.is_ok() {
                return;
            }
            warn!("Producer ignored SIGTERM after {}ms — killing", self.cfg.kill_grace_ms);
        }

        #[cfg(not(unix))]
        let _ = grace;

        if let Err(e) = child.kill().await {
            error!("Failed to kill producer: {e}");
        }
    }
}

fn log_outcome(outcome: ProducerOutcome, stderr: &str) {
    match outcome {
        ProducerOutcome::Succeeded => info!("Producer process finished successfully"),
        ProducerOutcome::FailedExit(code) => {
            warn!("Producer process finished with exit code {code}");
            if !stderr.is_empty() {
                warn!("Producer stderr: {stderr}");
            }
        }
        ProducerOutcome::CrashExit => {
            error!("Producer process crashed");
            if !stderr.is_empty() {
                error!("Producer stderr: {stderr}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SportRow;
    use crate::db::Sink;
    use crate::ids::IdAllocator;
    use std::path::Path;

    #[test]
    fn classification_covers_all_terminations() {
        assert_eq!(ProducerOutcome::classify(Some(0)), ProducerOutcome::Succeeded);
        assert_eq!(ProducerOutcome::classify(Some(3)), ProducerOutcome::FailedExit(3));
        assert_eq!(ProducerOutcome::classify(None), ProducerOutcome::CrashExit);
    }

    #[test]
    fn launch_is_rejected_while_a_cycle_is_active() {
        let mut machine = CycleStateMachine::new();
        assert!(machine.begin_launch());
        assert!(!machine.begin_launch(), "Launching must reject");
        machine.mark_running();
        assert!(!machine.begin_launch(), "Running must reject");
        machine.begin_import();
        assert!(!machine.begin_launch(), "Importing must reject");
        machine.begin_cooldown();
        assert!(machine.begin_launch(), "Cooldown must accept the next cycle");
    }

    #[test]
    fn failed_start_returns_to_a_launchable_state() {
        let mut machine = CycleStateMachine::new();
        assert!(machine.begin_launch());
        machine.abort_launch();
        assert_eq!(machine.state(), CycleState::Idle);
        assert!(machine.begin_launch());
    }

    async fn test_sink() -> Sink {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations");
        Sink::new(pool)
    }

    fn test_config(producer_dir: &Path, data_dir: &Path, program: &str, script: &str) -> Config {
        Config {
            log_level: "info".into(),
            db_path: ":memory:".into(),
            producer_program: program.into(),
            producer_script: script.into(),
            producer_dir: producer_dir.display().to_string(),
            data_dir: data_dir.display().to_string(),
            cooldown_ms: 10,
            kill_grace_ms: 200,
            match_id_seed: 100_000,
            event_id_seed: 1_000_000,
        }
    }

    fn loader_for(sink: Sink, data_dir: &Path) -> BatchLoader {
        BatchLoader::new(sink, IdAllocator::new(100_000, 1_000_000), data_dir.to_path_buf())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_still_imports_producer_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().join("data");

        // Producer stand-in: writes one valid document, then fails.
        let script = dir.path().join("produce.sh");
        std::fs::write(
            &script,
            r#"mkdir -p data
cat > data/football.json <<'EOF'
{ "sport": { "sportId": 1, "sportName": "Football", "championships": [
  { "championshipId": 10, "championshipName": "Premier League", "matches": [
    { "eventId": "555", "team1": "A", "team2": "B", "odds": { "1": 1.5 } }
  ] }
] } }
EOF
echo "scrape failed halfway" >&2
exit 3
"#,
        )
        .expect("write script");

        let cfg = test_config(dir.path(), &data_dir, "sh", "produce.sh");
        let loader = loader_for(test_sink().await, &data_dir);
        let mut supervisor = Supervisor::new(cfg, loader);

        let (_tx, mut shutdown) = watch::channel(false);
        let end = supervisor.run_cycle(&mut shutdown).await;
        assert_eq!(end, CycleEnd::Continue);
        assert_eq!(supervisor.machine.state(), CycleState::Cooldown);

        let matches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches")
            .fetch_one(supervisor.loader.sink().pool())
            .await
            .expect("count");
        assert_eq!(matches, 1, "non-zero exit must not block the import");
    }

    #[tokio::test]
    async fn failed_start_skips_import_and_stays_launchable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).expect("data dir");

        let sink = test_sink().await;
        sink.add_sport(&SportRow { id: 7, name: "Survivor".into() })
            .await
            .expect("seed row");

        let cfg = test_config(dir.path(), &data_dir, "/nonexistent/interpreter", "none.py");
        let loader = loader_for(sink, &data_dir);
        let mut supervisor = Supervisor::new(cfg, loader);

        let (_tx, mut shutdown) = watch::channel(false);
        let end = supervisor.run_cycle(&mut shutdown).await;
        assert_eq!(end, CycleEnd::Continue);
        // The attempt ended without importing — no wipe happened.
        let sports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sports")
            .fetch_one(supervisor.loader.sink().pool())
            .await
            .expect("count");
        assert_eq!(sports, 1);
        // And the cycle can be rescheduled.
        assert!(supervisor.machine.begin_launch());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_terminates_a_running_producer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).expect("data dir");

        let script = dir.path().join("sleepy.sh");
        std::fs::write(&script, "sleep 30\n").expect("write script");

        let cfg = test_config(dir.path(), &data_dir, "sh", "sleepy.sh");
        let loader = loader_for(test_sink().await, &data_dir);
        let mut supervisor = Supervisor::new(cfg, loader);

        let (tx, mut shutdown) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let end = tokio::time::timeout(
            Duration::from_secs(5),
            supervisor.run_cycle(&mut shutdown),
        )
        .await
        .expect("cycle must end promptly after shutdown");
        assert_eq!(end, CycleEnd::Shutdown);
    }
}
