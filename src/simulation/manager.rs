//! Simulation manager
//!
//! Frame-driven session around a [`BackendSwitcher`]: it applies input
//! edits, paces generations against the frame clock and rebuilds both
//! backends when the grid is resized.

use super::cpu::SerialBackend;
use super::gpu::ParallelBackend;
use super::grid::{self, GridShape};
use super::patterns::LifePattern;
use super::publication::PublicationHandle;
use super::switcher::BackendSwitcher;
use super::traits::{BackendKind, SimulationBackend};
use crate::compute::ComputeContext;
use crate::config::{SimulationConfig, StepRate};
use crate::error::BackendError;
use std::sync::Arc;
use std::time::Duration;

/// Cell toggle coming from the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEdit {
    pub col: u32,
    pub row: u32,
    pub alive: bool,
}

/// Fixed-rate accumulator deciding whether a frame runs a generation
#[derive(Debug, Clone)]
pub struct StepClock {
    period: Option<Duration>,
    accumulated: Duration,
}

impl StepClock {
    pub fn new(rate: StepRate) -> Self {
        Self {
            period: rate.period(),
            accumulated: Duration::ZERO,
        }
    }

    pub fn set_rate(&mut self, rate: StepRate) {
        self.period = rate.period();
        self.accumulated = Duration::ZERO;
    }

    /// Time banked towards the next generation
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Feed one frame's elapsed time, returns whether a generation is due
    ///
    /// At most one generation runs per frame. Only the part of a period left
    /// over after it carries to the next frame; a stall is not caught up.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(period) = self.period else {
            return false;
        };
        if period.is_zero() {
            return true;
        }

        self.accumulated += dt;
        if self.accumulated < period {
            return false;
        }
        self.accumulated -= period;
        let remainder = self.accumulated.as_nanos() % period.as_nanos();
        self.accumulated = Duration::from_nanos(remainder as u64);
        true
    }
}

pub struct SimulationManager {
    config: SimulationConfig,
    context: Option<Arc<ComputeContext>>,
    switcher: BackendSwitcher,
    clock: StepClock,
    generation: u64,
}

impl SimulationManager {
    /// Start a session on the process-wide compute context
    ///
    /// Falls back to the serial backend alone when no GPU can be used.
    pub fn new(config: SimulationConfig) -> Result<Self, BackendError> {
        let context = match ComputeContext::shared() {
            Ok(context) => Some(context),
            Err(err) => {
                log::warn!("Parallel backend unavailable, running serial only: {}", err);
                None
            }
        };
        Self::with_context(config, context)
    }

    /// Start a session on an explicit context, or serial only with `None`
    pub fn with_context(
        mut config: SimulationConfig,
        context: Option<Arc<ComputeContext>>,
    ) -> Result<Self, BackendError> {
        config.validate()?;
        let switcher = build_switcher(&config, context.as_ref())?;
        config.backend = switcher.active();
        log::info!(
            "Simulation ready: {}x{} grid on the {} backend",
            config.rows,
            config.cols,
            switcher.active()
        );

        Ok(Self {
            clock: StepClock::new(config.step_rate),
            config,
            context,
            switcher,
            generation: 0,
        })
    }

    /// Advance the session by one frame of `dt`
    ///
    /// Returns whether a generation ran. Nothing runs unless auto-run is on,
    /// and never more than one generation per frame.
    pub fn frame(&mut self, dt: Duration) -> Result<bool, BackendError> {
        if !self.config.auto_run || !self.clock.tick(dt) {
            return Ok(false);
        }
        self.step_once()?;
        Ok(true)
    }

    /// Run exactly one generation regardless of the clock
    pub fn step_once(&mut self) -> Result<(), BackendError> {
        self.switcher.step()?;
        self.generation += 1;
        Ok(())
    }

    pub fn apply_edit(&mut self, edit: CellEdit) -> Result<(), BackendError> {
        self.switcher
            .set_cell(edit.col, edit.row, u8::from(edit.alive))
    }

    pub fn clear(&mut self) -> Result<(), BackendError> {
        self.load_pattern(LifePattern::Clear)
    }

    /// Reseed the grid from the configured seed
    pub fn randomize(&mut self) -> Result<(), BackendError> {
        self.load_pattern(LifePattern::Random)
    }

    pub fn load_pattern(&mut self, pattern: LifePattern) -> Result<(), BackendError> {
        pattern.stamp(&mut self.switcher, self.config.seed)?;
        self.generation = 0;
        log::debug!("Loaded pattern: {}", pattern);
        Ok(())
    }

    pub fn set_backend(&mut self, kind: BackendKind) -> Result<(), BackendError> {
        self.switcher.switch_to(kind)?;
        self.config.backend = kind;
        Ok(())
    }

    pub fn toggle_backend(&mut self) -> Result<BackendKind, BackendError> {
        let kind = self.switcher.toggle()?;
        self.config.backend = kind;
        Ok(kind)
    }

    /// Rebuild both backends for a new grid size
    ///
    /// The new grid starts empty. The old backends are dropped only once the
    /// new ones exist, so a failed resize leaves the session untouched.
    pub fn resize(&mut self, rows: u32, cols: u32) -> Result<(), BackendError> {
        let mut config = self.config.clone().with_size(rows, cols);
        config.validate()?;
        let switcher = build_switcher(&config, self.context.as_ref())?;

        log::info!(
            "Resized grid {}x{} -> {}x{}",
            self.config.rows,
            self.config.cols,
            rows,
            cols
        );
        config.backend = switcher.active();
        self.switcher = switcher;
        self.config = config;
        self.generation = 0;
        Ok(())
    }

    pub fn set_step_rate(&mut self, rate: StepRate) {
        self.config.step_rate = rate;
        self.clock.set_rate(rate);
    }

    pub fn set_auto_run(&mut self, auto_run: bool) {
        self.config.auto_run = auto_run;
    }

    pub fn auto_run(&self) -> bool {
        self.config.auto_run
    }

    /// Current cells, `rows * cols` bytes
    pub fn grid(&mut self) -> Result<&[u8], BackendError> {
        self.switcher.grid()
    }

    pub fn population(&mut self) -> Result<usize, BackendError> {
        Ok(grid::population(self.switcher.grid()?))
    }

    /// Renderer handle, `None` when running serial only
    ///
    /// A resize replaces the publication buffer; fetch a new handle after it.
    pub fn publication(&self) -> Option<PublicationHandle> {
        self.switcher.publication()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_backend(&self) -> BackendKind {
        self.switcher.active()
    }

    pub fn shape(&self) -> GridShape {
        self.switcher.shape()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

/// Both backends for `config`, the serial one alone if the parallel one fails
fn build_switcher(
    config: &SimulationConfig,
    context: Option<&Arc<ComputeContext>>,
) -> Result<BackendSwitcher, BackendError> {
    let (rows, cols) = (config.rows, config.cols);
    let parallel = match context {
        Some(context) => {
            match ParallelBackend::with_own_publication(Arc::clone(context), rows, cols) {
                Ok(parallel) => Some(parallel),
                Err(err) => {
                    log::warn!("Parallel backend failed to start, using serial: {}", err);
                    None
                }
            }
        }
        None => None,
    };

    let active = match (config.backend, &parallel) {
        (BackendKind::Parallel, None) => BackendKind::Serial,
        (kind, _) => kind,
    };
    BackendSwitcher::new(SerialBackend::new(rows, cols), parallel, active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::context::tests::test_context;

    fn serial_manager(config: SimulationConfig) -> SimulationManager {
        SimulationManager::with_context(config, None).unwrap()
    }

    #[test]
    fn test_clock_carries_remainder() {
        let mut clock = StepClock::new(StepRate::PerSecond(5));
        assert!(!clock.tick(Duration::from_millis(150)));
        assert!(clock.tick(Duration::from_millis(150)));
        assert_eq!(clock.accumulated(), Duration::from_millis(100));
        assert!(clock.tick(Duration::from_millis(100)));
        assert_eq!(clock.accumulated(), Duration::ZERO);
    }

    #[test]
    fn test_clock_long_frame_runs_one_generation() {
        let mut clock = StepClock::new(StepRate::PerSecond(10));
        assert!(clock.tick(Duration::from_millis(530)));
        assert_eq!(clock.accumulated(), Duration::from_millis(30));

        // The skipped periods are gone, only the 30ms remainder was kept
        assert!(!clock.tick(Duration::from_millis(60)));
        assert_eq!(clock.accumulated(), Duration::from_millis(90));
        assert!(clock.tick(Duration::from_millis(10)));
        assert_eq!(clock.accumulated(), Duration::ZERO);
    }

    #[test]
    fn test_clock_rate_edge_cases() {
        let mut never = StepClock::new(StepRate::PerSecond(0));
        assert!(!never.tick(Duration::from_secs(100)));

        let mut every_frame = StepClock::new(StepRate::Unbounded);
        assert!(every_frame.tick(Duration::ZERO));
        assert!(every_frame.tick(Duration::from_secs(1)));
    }

    #[test]
    fn test_parallel_request_falls_back_to_serial() {
        let manager = serial_manager(SimulationConfig::new().with_size(10, 10));
        assert_eq!(manager.active_backend(), BackendKind::Serial);
        assert_eq!(manager.config().backend, BackendKind::Serial);
        assert!(manager.publication().is_none());
    }

    #[test]
    fn test_invalid_size_is_rejected() {
        let result = SimulationManager::with_context(SimulationConfig::new().with_size(0, 4), None);
        assert!(matches!(result, Err(BackendError::Config(_))));

        let mut manager = serial_manager(SimulationConfig::new().with_size(4, 4));
        assert!(manager.resize(4, 0).is_err());
        assert_eq!(manager.shape(), GridShape::new(4, 4));
    }

    #[test]
    fn test_frame_respects_auto_run() {
        let config = SimulationConfig::new()
            .with_size(8, 8)
            .with_step_rate(StepRate::Unbounded);
        let mut manager = serial_manager(config);
        manager.load_pattern(LifePattern::Blinker).unwrap();

        assert!(!manager.frame(Duration::from_millis(16)).unwrap());
        assert_eq!(manager.generation(), 0);

        manager.set_auto_run(true);
        assert!(manager.frame(Duration::from_millis(16)).unwrap());
        assert!(manager.frame(Duration::from_millis(16)).unwrap());
        assert_eq!(manager.generation(), 2);
        assert_eq!(manager.population().unwrap(), 3);
    }

    #[test]
    fn test_slow_frame_advances_one_generation() {
        let config = SimulationConfig::new()
            .with_size(8, 8)
            .with_step_rate(StepRate::PerSecond(10))
            .with_auto_run(true);
        let mut manager = serial_manager(config);
        manager.load_pattern(LifePattern::Glider).unwrap();

        assert!(manager.frame(Duration::from_millis(500)).unwrap());
        assert_eq!(manager.generation(), 1);
        assert!(!manager.frame(Duration::from_millis(50)).unwrap());
        assert_eq!(manager.generation(), 1);
    }

    #[test]
    fn test_edits_and_reset() {
        let mut manager = serial_manager(SimulationConfig::new().with_size(5, 7));
        manager
            .apply_edit(CellEdit { col: 6, row: 4, alive: true })
            .unwrap();
        manager
            .apply_edit(CellEdit { col: 7, row: 4, alive: true })
            .unwrap();
        assert_eq!(manager.grid().unwrap()[4 * 7 + 6], 1);
        assert_eq!(manager.population().unwrap(), 1);

        manager
            .apply_edit(CellEdit { col: 6, row: 4, alive: false })
            .unwrap();
        assert_eq!(manager.population().unwrap(), 0);

        manager.randomize().unwrap();
        manager.step_once().unwrap();
        manager.clear().unwrap();
        assert_eq!(manager.population().unwrap(), 0);
        assert_eq!(manager.generation(), 0);
    }

    #[test]
    fn test_resize_starts_empty() {
        let mut manager = serial_manager(SimulationConfig::new().with_size(6, 6));
        manager.randomize().unwrap();
        manager.resize(12, 20).unwrap();
        assert_eq!(manager.shape(), GridShape::new(12, 20));
        assert_eq!(manager.grid().unwrap().len(), 240);
        assert_eq!(manager.population().unwrap(), 0);
    }

    #[test]
    fn test_toggle_keeps_pattern_running() {
        let Some(context) = test_context() else {
            return;
        };
        let config = SimulationConfig::new()
            .with_size(32, 32)
            .with_backend(BackendKind::Serial);
        let mut manager = SimulationManager::with_context(config, Some(context)).unwrap();
        manager.load_pattern(LifePattern::Glider).unwrap();

        for _ in 0..4 {
            manager.step_once().unwrap();
            manager.toggle_backend().unwrap();
        }
        assert_eq!(manager.active_backend(), BackendKind::Serial);
        assert_eq!(manager.population().unwrap(), 5);

        // A glider after 4 generations is itself moved one cell down-right
        let mut reference = SerialBackend::new(32, 32);
        LifePattern::Glider.stamp(&mut reference, 0).unwrap();
        for _ in 0..4 {
            reference.step().unwrap();
        }
        assert_eq!(manager.grid().unwrap(), reference.grid().unwrap());
    }

    #[test]
    fn test_resize_keeps_parallel_backend() {
        let Some(context) = test_context() else {
            return;
        };
        let config = SimulationConfig::new().with_size(16, 16);
        let mut manager = SimulationManager::with_context(config, Some(Arc::clone(&context))).unwrap();
        assert_eq!(manager.active_backend(), BackendKind::Parallel);

        manager.resize(40, 24).unwrap();
        assert_eq!(manager.active_backend(), BackendKind::Parallel);
        assert_eq!(manager.publication().unwrap().cell_count(), 40 * 24);
        // The old backend is gone: this test, the manager and the new backend
        assert_eq!(Arc::strong_count(&context), 3);
    }
}
