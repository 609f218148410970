//! Named worker-thread spawning.
//!
//! Every background loop in the core (one per line monitor, one per motion
//! coordinator) is started through [`spawn_named`] so that threads carry a
//! recognisable name in `ps -T` / `top -H` and spawn failures surface as a
//! typed error rather than a panic inside `start()`.

use std::thread::JoinHandle;

use crate::error::HardwareError;

/// Default worker stack.  Listener callbacks run on these threads and do
/// small bus transactions only.
pub const DEFAULT_STACK_KB: usize = 256;

/// Spawn a named thread with an explicit stack size.
///
/// The closure's return value comes back through `join()`; the line
/// monitor uses this to hand its line back for release.
pub fn spawn_named<F, T>(name: &str, stack_kb: usize, f: F) -> Result<JoinHandle<T>, HardwareError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    log::debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|e| {
            log::error!("Spawning '{}' failed: {}", name, e);
            HardwareError::ThreadSpawn
        })
}
