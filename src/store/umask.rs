//! Scoped file-creation mask

/// Replaces the process umask for as long as the guard lives.
///
/// The previous mask is restored on drop, so early returns and unwinding
/// both leave the process as they found it. The umask is process-wide:
/// concurrent guards on different threads interleave.
#[derive(Debug)]
pub struct UmaskGuard {
    previous: libc::mode_t,
}

impl UmaskGuard {
    pub fn set(mask: u32) -> Self {
        // SAFETY: umask(2) cannot fail and touches no memory we own.
        let previous = unsafe { libc::umask(mask as libc::mode_t) };
        tracing::debug!("Umask set to {:o} (was {:o})", mask, previous);
        Self { previous }
    }

    pub fn previous(&self) -> u32 {
        self.previous as u32
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        // SAFETY: see `set`.
        unsafe {
            libc::umask(self.previous);
        }
    }
}

/// Serializes tests that change the process umask.
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
