/*!
 * Unlock Notification Registration Guard
 *
 * Ties an armed engine callback to the token it will fire. The guard holds
 * its own token reference and is consumed by `wait`; dropping it early
 * cancels the notification so the engine never fires into a cycle that has
 * already been abandoned.
 */

use super::traits::Guard;
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::errors::{ErrorCode, NotifyError, NotifyResult};
use crate::core::sync::WaitToken;
use crate::engine::{dispatch_unlock, NotifyEngine};
use libsqlite3_sys as ffi;
use std::ffi::c_void;
use std::sync::Arc;
use std::time::Duration;

/// An armed unlock notification
///
/// While pending, the engine owns one reference to the token. That
/// reference comes back either through the dispatcher or, after a cancel
/// that beat the dispatcher, through this guard.
pub struct Registration<'e, E: NotifyEngine + ?Sized> {
    engine: &'e E,
    token: Arc<WaitToken>,
    metadata: GuardMetadata,
    pending: bool,
}

impl<'e, E: NotifyEngine + ?Sized> Registration<'e, E> {
    /// Reset `token` and arm the engine to fire it when the lock clears
    ///
    /// Fails without arming anything if the engine rejects the registration.
    pub fn arm(engine: &'e E, token: &Arc<WaitToken>) -> NotifyResult<Self> {
        token.reset();

        let payload = WaitToken::into_payload(Arc::clone(token));
        // SAFETY: payload is a strong reference and stays valid until the
        // dispatcher or `disarm` converts it back.
        let rc = unsafe { engine.register(dispatch_unlock, payload) };

        if rc != ffi::SQLITE_OK {
            // SAFETY: nothing was armed, the engine never kept the payload.
            drop(unsafe { WaitToken::from_payload(payload) });
            return Err(NotifyError::from_registration(ErrorCode::new(rc)));
        }

        Ok(Self {
            engine,
            token: Arc::clone(token),
            metadata: GuardMetadata::new("unlock_notify"),
            pending: true,
        })
    }

    /// The lock was already clear when the notification was armed
    #[inline]
    pub fn is_unlocked(&self) -> bool {
        self.token.is_fired()
    }

    /// Block until the engine fires the token
    ///
    /// With a timeout, an unfired registration is cancelled and
    /// `NotifyError::Timeout` is returned. Returns the time spent since arming.
    pub fn wait(mut self, timeout: Option<Duration>) -> NotifyResult<Duration> {
        if self.token.wait_for(timeout).is_fired() {
            self.pending = false;
            return Ok(self.metadata.elapsed());
        }

        self.disarm();

        // The fire can land between the deadline and the cancel
        if self.token.is_fired() {
            Ok(self.metadata.elapsed())
        } else {
            Err(NotifyError::Timeout {
                waited: self.metadata.elapsed(),
            })
        }
    }

    /// Cancel a pending registration. Returns false if nothing was pending.
    fn disarm(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;

        self.engine.cancel();

        if !self.token.is_fired() {
            // SAFETY: the cancel removed the registration before dispatch, so
            // the reference handed out by `arm` was never converted back.
            drop(unsafe { WaitToken::from_payload(Arc::as_ptr(&self.token) as *mut c_void) });
        }
        true
    }
}

impl<E: NotifyEngine + ?Sized> Guard for Registration<'_, E> {
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.pending && !self.token.is_fired()
    }

    fn release(&mut self) -> GuardResult<()> {
        if self.disarm() {
            Ok(())
        } else {
            Err(GuardError::AlreadyReleased)
        }
    }
}

impl<E: NotifyEngine + ?Sized> Drop for Registration<'_, E> {
    fn drop(&mut self) {
        self.disarm();
    }
}
