use crate::camera::{
    AnimationError, AnimationState, Camera, CameraTarget, MapAnimationController, Step,
};
use crate::place::PrimaryDestination;
use crate::settings::AnimationConfig;
use crate::WaymarkError;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs [`MapAnimationController`] on tokio timers, one task per run.
///
/// A superseded run's task wakes once more, sees a stale generation and exits
/// without touching the camera.
pub struct AnimationDriver<C: Camera + 'static> {
    controller: Arc<Mutex<MapAnimationController<C>>>,
    runtime: Handle,
    runs: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Camera + 'static> AnimationDriver<C> {
    pub fn new(camera: C, config: AnimationConfig, runtime: Handle) -> Self {
        Self {
            controller: Arc::new(Mutex::new(MapAnimationController::new(camera, config))),
            runtime,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Binds to the runtime of the calling context.
    pub fn on_current_runtime(camera: C, config: AnimationConfig) -> Result<Self, WaymarkError> {
        let runtime = Handle::try_current().map_err(|_| WaymarkError::NoRuntime)?;
        Ok(Self::new(camera, config, runtime))
    }

    fn controller(&self) -> MutexGuard<'_, MapAnimationController<C>> {
        self.controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fly_to(&self, destination: PrimaryDestination) -> Result<u64, AnimationError> {
        let generation = self.controller().fly_to(destination)?;
        let tick = self.controller().config().tick_interval();
        let controller = Arc::clone(&self.controller);

        let handle = self.runtime.spawn(async move {
            let mut delay = tick;
            loop {
                tokio::time::sleep(delay).await;
                let step = controller
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .step(generation);
                match step {
                    Step::Continue(next) => delay = next,
                    Step::Finished => break,
                    Step::Stale => {
                        debug!("Camera task exiting — generation={}", generation);
                        break;
                    }
                }
            }
        });

        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.retain(|run| !run.is_finished());
        runs.push(handle);
        Ok(generation)
    }

    pub fn state(&self) -> AnimationState {
        self.controller().state()
    }

    pub fn planned_target(&self) -> Option<CameraTarget> {
        self.controller().planned_target().cloned()
    }

    pub fn with_camera<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(self.controller().camera())
    }

    /// Waits for every spawned run to end, stale ones included.
    pub async fn finished(&self) {
        let runs: Vec<JoinHandle<()>> = self
            .runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for run in runs {
            // Aborted runs report a JoinError; nothing to recover
            let _ = run.await;
        }
    }

    /// Cancels the current run and aborts every pending timer.
    pub fn dispose(&self) {
        self.controller().cancel();
        for run in self
            .runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            run.abort();
        }
    }
}

impl<C: Camera + 'static> Drop for AnimationDriver<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
