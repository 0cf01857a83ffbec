//! Headless Game of Life run
//!
//! Loads a Gosper glider gun, runs it frame by frame on the parallel backend
//! (or serial when no GPU is found), switches backend halfway through and
//! logs the population every generation.
//!
//! Run with: RUST_LOG=debug cargo run --example headless

use std::time::Duration;
use toroid::prelude::*;

const FRAMES: u32 = 120;
const FRAME_TIME: Duration = Duration::from_millis(16);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SimulationConfig::new()
        .with_size(64, 96)
        .with_step_rate(StepRate::PerSecond(30))
        .with_auto_run(true);
    let mut manager = SimulationManager::new(config)?;
    manager.load_pattern(LifePattern::GosperGun)?;

    log::info!(
        "Running {} frames on a {}x{} grid ({} backend)",
        FRAMES,
        manager.shape().rows,
        manager.shape().cols,
        manager.active_backend()
    );

    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            match manager.toggle_backend() {
                Ok(kind) => log::info!("Now running on the {} backend", kind),
                Err(err) => log::warn!("Staying on {}: {}", manager.active_backend(), err),
            }
        }

        let stepped = manager.frame(FRAME_TIME)?;
        if stepped {
            log::info!(
                "generation {:>4}  population {:>5}  [{}]",
                manager.generation(),
                manager.population()?,
                manager.active_backend()
            );
        }
    }

    if let Some(handle) = manager.publication() {
        log::info!("{} generations published to the render buffer", handle.generation());
    }

    let shape = manager.shape();
    let state = GridState::from_cells(shape, manager.grid()?)
        .ok_or_else(|| anyhow::anyhow!("grid size does not match {}x{}", shape.rows, shape.cols))?;
    log::info!("Final population: {}", state.population());
    log::debug!("Final grid:\n{}", state);

    Ok(())
}
