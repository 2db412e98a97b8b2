/*!
 * Wake Dispatcher
 *
 * The callback handed to the engine. It runs on whatever thread released
 * the lock and only touches the tokens it is given.
 */

use crate::core::sync::WaitToken;
use std::ffi::c_void;
use std::os::raw::c_int;

/// Callback signature expected by the engine's unlock-notify facility
pub type UnlockCallback = unsafe extern "C" fn(args: *mut *mut c_void, count: c_int);

/// Fire every token in a batch of unlock payloads
///
/// Each payload is a token reference produced by `WaitToken::into_payload`;
/// the reference is released once the token has been fired. The waiting
/// thread keeps its own reference, so the token itself stays alive.
///
/// # Safety
///
/// `args` must point to `count` payloads produced by `WaitToken::into_payload`,
/// none of which has been dispatched or reclaimed before.
pub unsafe extern "C" fn dispatch_unlock(args: *mut *mut c_void, count: c_int) {
    if args.is_null() || count <= 0 {
        return;
    }

    let payloads = std::slice::from_raw_parts(args, count as usize);
    for &payload in payloads {
        if payload.is_null() {
            continue;
        }
        let token = WaitToken::from_payload(payload);
        token.fire();
    }
}
