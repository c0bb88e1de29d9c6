//! Tick Runner - background thread that ticks the world at the configured rate

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::world::{SimulationWorld, TickResult};

/// Drives `SimulationWorld::tick` from a background thread
pub struct TickRunner {
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl TickRunner {
    pub fn new() -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start ticking at the world's configured tick rate
    pub fn start<F>(&mut self, world: Arc<Mutex<SimulationWorld>>, callback: F)
    where
        F: Fn(TickResult) + Send + 'static,
    {
        let ticks_per_second = match world.lock() {
            Ok(w) => w.config.ticks_per_second.max(1),
            Err(_) => {
                error!("simulation world lock poisoned, tick runner not started");
                return;
            }
        };
        self.start_with_interval(world, 1000 / ticks_per_second as u64, callback);
    }

    /// Start ticking every `interval_ms` milliseconds
    ///
    /// # Arguments
    /// * `world` - Shared simulation world
    /// * `interval_ms` - Milliseconds between ticks (50 for 20 ticks per second)
    /// * `callback` - Called with each tick's result
    pub fn start_with_interval<F>(
        &mut self,
        world: Arc<Mutex<SimulationWorld>>,
        interval_ms: u64,
        callback: F,
    ) where
        F: Fn(TickResult) + Send + 'static,
    {
        if self.is_running.load(Ordering::Relaxed) {
            warn!("tick runner already running");
            return;
        }

        info!("starting tick runner ({}ms intervals)", interval_ms);
        self.is_running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.is_running);

        let handle = thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                let tick_result = match world.lock() {
                    Ok(mut w) => w.tick(),
                    Err(_) => {
                        error!("simulation world lock poisoned, stopping tick runner");
                        running.store(false, Ordering::Relaxed);
                        break;
                    }
                };

                callback(tick_result);

                thread::sleep(Duration::from_millis(interval_ms));
            }
            info!("tick runner thread stopped");
        });

        self.thread_handle = Some(handle);
    }

    pub fn stop(&mut self) {
        if !self.is_running.load(Ordering::Relaxed) {
            return;
        }

        info!("stopping tick runner...");
        self.is_running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }
}

impl Default for TickRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
