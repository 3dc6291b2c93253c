/// The polling loop
///
/// Owns the schedule the engine runs on: one tick per interval, a clean
/// `stop` on interrupt or when a bounded run expires. The engine itself
/// never blocks on anything but the collaborators, so the loop stays
/// single-threaded.
use crate::error::Result;
use earguard_core::{LevelProbe, VolumeActuator};
use earguard_limiter::{FrameReport, LimiterEngine, ProtectionPhase};
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::info;

/// How a running monitor reports what it sees
pub struct Display {
    mode: DisplayMode,
    every: Duration,
    last_emit: Option<Instant>,
}

enum DisplayMode {
    Logs,
    Meter,
}

impl Display {
    /// Periodic status lines through tracing; a zero interval disables them
    pub fn logs(every: Duration) -> Self {
        Self {
            mode: DisplayMode::Logs,
            every,
            last_emit: None,
        }
    }

    /// Console bar meter redrawn in place, for `simulate`
    pub fn meter() -> Self {
        Self {
            mode: DisplayMode::Meter,
            every: Duration::from_millis(100),
            last_emit: None,
        }
    }

    fn observe(&mut self, report: &FrameReport, hold_secs: f64) {
        if self.every.is_zero() {
            return;
        }

        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.every {
                return;
            }
        }
        self.last_emit = Some(now);

        match self.mode {
            DisplayMode::Logs => log_status(report),
            DisplayMode::Meter => {
                print!("\r{:<60}", render_meter(report, hold_secs));
                let _ = std::io::stdout().flush();
            }
        }
    }

    fn finish(&self) {
        if matches!(self.mode, DisplayMode::Meter) {
            println!();
        }
    }
}

fn log_status(report: &FrameReport) {
    let Some(loudest) = report.loudest() else {
        return;
    };

    let protected = report
        .sources
        .iter()
        .filter(|s| s.phase.is_protected())
        .count();

    if protected > 0 {
        info!(
            "Status: {} source(s), {} protected; loudest {} at {:.0}% ({})",
            report.sources.len(),
            protected,
            loudest.name,
            loudest.loudness * 100.0,
            loudest.phase
        );
    } else {
        info!(
            "Status: {} source(s); loudest {} at {:.0}% ({})",
            report.sources.len(),
            loudest.name,
            loudest.loudness * 100.0,
            loudest.phase
        );
    }
}

/// One meter line for the most interesting source: a protected one if any,
/// otherwise the loudest
fn render_meter(report: &FrameReport, hold_secs: f64) -> String {
    let Some(source) = report
        .sources
        .iter()
        .find(|s| s.phase.is_protected())
        .or_else(|| report.loudest())
    else {
        return "[--] No sources".to_string();
    };

    match source.phase {
        ProtectionPhase::Idle => format!(
            "[OK] Level: [{}] {:.1}%",
            bar(source.loudness),
            source.loudness * 100.0
        ),
        ProtectionPhase::Triggered | ProtectionPhase::Holding | ProtectionPhase::Checking => {
            let trigger = source.trigger_loudness.unwrap_or(source.loudness);
            let wait = (hold_secs - source.held_secs.unwrap_or(0.0)).max(0.0);
            format!(
                "[!!] Too Loud ({:.1}%) | Wait: {:.1}s",
                trigger * 100.0,
                wait
            )
        }
        ProtectionPhase::Restoring => format!(
            "[^^] Restoring {} toward {:.0}%",
            source.name,
            source.baseline_volume * 100.0
        ),
    }
}

fn bar(level: f64) -> String {
    const CELLS: usize = 10;
    let filled = ((level.clamp(0.0, 1.0) * CELLS as f64) as usize).min(CELLS);
    format!("{}{}", "█".repeat(filled), "-".repeat(CELLS - filled))
}

/// Drive the engine until interrupted (or until `run_for` elapses), then
/// restore every source
///
/// # Errors
/// Returns the engine's shutdown error when the final restore fails; this
/// is the monitor's only failing exit once the loop has started.
pub async fn run_until_shutdown<P, A>(
    mut engine: LimiterEngine<P, A>,
    mut display: Display,
    run_for: Option<Duration>,
) -> Result<()>
where
    P: LevelProbe,
    A: VolumeActuator,
{
    let config = engine.config();
    info!(
        "Monitoring every {}ms (threshold {:.0}%, safe level {:.0}%)",
        config.poll_interval().as_millis(),
        config.threshold * 100.0,
        config.safe_level * 100.0
    );

    let hold_secs = config.hold_secs;
    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = run_for
        .filter(|d| !d.is_zero())
        .map(|d| tokio::time::Instant::now() + d);

    loop {
        tokio::select! {
            // Advance the protection loop by one tick
            _ = ticker.tick() => {
                let report = engine.tick();
                display.observe(&report, hold_secs);
            }
            // Restore everything before exiting
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; restoring sources before exit");
                break;
            }
            // Bounded runs stop on their own
            _ = deadline_reached(deadline) => {
                info!("Run duration reached; restoring sources before exit");
                break;
            }
        }
    }

    display.finish();
    engine.stop()?;
    info!("All sources restored");

    Ok(())
}

async fn deadline_reached(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
