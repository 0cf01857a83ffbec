//! Runtime hot-swap between the serial and parallel backends
//!
//! Both backends stay resident for the whole session. A switch reads the
//! active grid back to the host, marks the target active and transplants the
//! grid into it, so the cells observed right after a switch are exactly the
//! ones observed right before it.

use super::cpu::SerialBackend;
use super::gpu::ParallelBackend;
use super::grid::GridShape;
use super::publication::PublicationHandle;
use super::traits::{BackendKind, SimulationBackend};
use crate::error::BackendError;

pub struct BackendSwitcher {
    serial: SerialBackend,
    parallel: Option<ParallelBackend>,
    active: BackendKind,
}

/// Forward a call to whichever backend is active
macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self.active {
            BackendKind::Serial => {
                let $backend = &mut $self.serial;
                $call
            }
            BackendKind::Parallel => match $self.parallel.as_mut() {
                Some($backend) => $call,
                None => Err(BackendError::Unavailable(BackendKind::Parallel)),
            },
        }
    };
}

impl BackendSwitcher {
    /// Pair two backends over the same grid shape
    pub fn new(
        serial: SerialBackend,
        parallel: Option<ParallelBackend>,
        active: BackendKind,
    ) -> Result<Self, BackendError> {
        if let Some(parallel) = &parallel {
            let (a, b) = (serial.shape(), parallel.shape());
            if a != b {
                return Err(BackendError::SizeMismatch {
                    expected: a.cell_count(),
                    actual: b.cell_count(),
                });
            }
        } else if active == BackendKind::Parallel {
            return Err(BackendError::Unavailable(BackendKind::Parallel));
        }

        Ok(Self {
            serial,
            parallel,
            active,
        })
    }

    /// Switcher that can only ever run the serial backend
    pub fn serial_only(rows: u32, cols: u32) -> Self {
        Self {
            serial: SerialBackend::new(rows, cols),
            parallel: None,
            active: BackendKind::Serial,
        }
    }

    pub fn active(&self) -> BackendKind {
        self.active
    }

    pub fn is_available(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Serial => true,
            BackendKind::Parallel => self.parallel.is_some(),
        }
    }

    pub fn parallel(&self) -> Option<&ParallelBackend> {
        self.parallel.as_ref()
    }

    /// Renderer handle of the parallel backend, if there is one
    pub fn publication(&self) -> Option<PublicationHandle> {
        self.parallel.as_ref().map(ParallelBackend::publication)
    }

    fn backend_mut(&mut self, kind: BackendKind) -> Result<&mut dyn SimulationBackend, BackendError> {
        match kind {
            BackendKind::Serial => Ok(&mut self.serial),
            BackendKind::Parallel => self
                .parallel
                .as_mut()
                .map(|parallel| parallel as &mut dyn SimulationBackend)
                .ok_or(BackendError::Unavailable(BackendKind::Parallel)),
        }
    }

    /// Make `target` the active backend, carrying the grid over
    ///
    /// On failure the previously active backend stays active with its grid
    /// untouched.
    pub fn switch_to(&mut self, target: BackendKind) -> Result<(), BackendError> {
        if target == self.active {
            return Ok(());
        }
        if !self.is_available(target) {
            return Err(BackendError::Unavailable(target));
        }

        let source = self.active;
        let snapshot = {
            let backend = self.backend_mut(source)?;
            backend.copy_grid_to_host()?;
            backend.grid()?.to_vec()
        };

        self.active = target;
        if let Err(err) = self.backend_mut(target).and_then(|b| b.set_grid(&snapshot)) {
            log::warn!("Switch to {} backend failed, staying on {}: {}", target, source, err);
            self.active = source;
            return Err(err);
        }

        log::info!("Switched simulation backend: {} -> {}", source, target);
        Ok(())
    }

    /// Switch to the other backend
    pub fn toggle(&mut self) -> Result<BackendKind, BackendError> {
        self.switch_to(self.active.toggled())?;
        Ok(self.active)
    }
}

impl SimulationBackend for BackendSwitcher {
    fn kind(&self) -> BackendKind {
        self.active
    }

    fn shape(&self) -> GridShape {
        self.serial.shape()
    }

    fn initialize(&mut self) -> Result<(), BackendError> {
        dispatch!(self, backend => backend.initialize())
    }

    fn initialize_random(&mut self, seed: u64) -> Result<(), BackendError> {
        dispatch!(self, backend => backend.initialize_random(seed))
    }

    fn set_cell(&mut self, i: u32, j: u32, state: u8) -> Result<(), BackendError> {
        dispatch!(self, backend => backend.set_cell(i, j, state))
    }

    fn step(&mut self) -> Result<(), BackendError> {
        dispatch!(self, backend => backend.step())
    }

    fn grid(&mut self) -> Result<&[u8], BackendError> {
        dispatch!(self, backend => backend.grid())
    }

    fn set_grid(&mut self, cells: &[u8]) -> Result<(), BackendError> {
        dispatch!(self, backend => backend.set_grid(cells))
    }

    fn copy_grid_to_host(&mut self) -> Result<(), BackendError> {
        dispatch!(self, backend => backend.copy_grid_to_host())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::context::tests::test_context;

    fn full_switcher(rows: u32, cols: u32, active: BackendKind) -> Option<BackendSwitcher> {
        let context = test_context()?;
        let parallel = ParallelBackend::with_own_publication(context, rows, cols).unwrap();
        Some(BackendSwitcher::new(SerialBackend::new(rows, cols), Some(parallel), active).unwrap())
    }

    #[test]
    fn test_serial_only_refuses_parallel() {
        let mut switcher = BackendSwitcher::serial_only(4, 4);
        switcher.initialize_random(9).unwrap();
        let before = switcher.grid().unwrap().to_vec();

        assert!(matches!(
            switcher.switch_to(BackendKind::Parallel),
            Err(BackendError::Unavailable(BackendKind::Parallel))
        ));
        assert_eq!(switcher.active(), BackendKind::Serial);
        assert_eq!(switcher.grid().unwrap(), before.as_slice());
        assert!(switcher.publication().is_none());
    }

    #[test]
    fn test_parallel_active_requires_parallel_backend() {
        assert!(matches!(
            BackendSwitcher::new(SerialBackend::new(3, 3), None, BackendKind::Parallel),
            Err(BackendError::Unavailable(BackendKind::Parallel))
        ));
    }

    #[test]
    fn test_switch_to_active_is_noop() {
        let mut switcher = BackendSwitcher::serial_only(3, 3);
        switcher.set_cell(1, 1, 1).unwrap();
        switcher.switch_to(BackendKind::Serial).unwrap();
        assert_eq!(switcher.grid().unwrap()[4], 1);
    }

    #[test]
    fn test_switch_preserves_grid() {
        let Some(mut switcher) = full_switcher(24, 40, BackendKind::Serial) else {
            return;
        };
        switcher.initialize_random(77).unwrap();
        switcher.step().unwrap();
        let captured = switcher.grid().unwrap().to_vec();

        switcher.switch_to(BackendKind::Parallel).unwrap();
        assert_eq!(switcher.kind(), BackendKind::Parallel);
        assert_eq!(switcher.grid().unwrap(), captured.as_slice());

        // And back, after the parallel side has stepped
        switcher.step().unwrap();
        let captured = switcher.grid().unwrap().to_vec();
        assert_eq!(switcher.toggle().unwrap(), BackendKind::Serial);
        assert_eq!(switcher.grid().unwrap(), captured.as_slice());
    }

    #[test]
    fn test_alternating_backends_match_serial_reference() {
        let Some(mut switcher) = full_switcher(30, 30, BackendKind::Parallel) else {
            return;
        };
        let mut reference = SerialBackend::new(30, 30);
        switcher.initialize_random(3).unwrap();
        reference.initialize_random(3).unwrap();

        for round in 0..6 {
            for _ in 0..3 {
                switcher.step().unwrap();
                reference.step().unwrap();
            }
            switcher.toggle().unwrap();
            assert_eq!(
                switcher.grid().unwrap(),
                reference.grid().unwrap(),
                "mismatch after round {}",
                round
            );
        }
    }

    #[test]
    fn test_publication_tracks_switched_in_state() {
        let Some(mut switcher) = full_switcher(8, 8, BackendKind::Serial) else {
            return;
        };
        let handle = switcher.publication().unwrap();
        for (i, j) in [(3, 2), (3, 3), (3, 4)] {
            switcher.set_cell(i, j, 1).unwrap();
        }
        let expected = switcher.grid().unwrap().to_vec();
        switcher.switch_to(BackendKind::Parallel).unwrap();

        let context = std::sync::Arc::clone(switcher.parallel().unwrap().context());
        assert_eq!(handle.snapshot(&context).unwrap(), expected);

        switcher.step().unwrap();
        let stepped = switcher.grid().unwrap().to_vec();
        assert_eq!(handle.snapshot(&context).unwrap(), stepped);
    }
}
