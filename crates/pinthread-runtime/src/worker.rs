//! The worker loop
//!
//! One OS thread per dispatcher. It records its own identity, then pulls
//! invocations off the mailbox and runs each to completion before looking
//! at the next, until the mailbox is closed. Exclusive execution is a
//! property of this loop; bodies take no lock to get it.

use crate::dispatcher::Shared;
use crate::mailbox::{IdlePolicy, Invocation};
use crate::tls;
use pinthread_core::completion::Completer;
use pinthread_core::id::OsThreadId;
use pinthread_core::{kdebug, kerror};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Shuts the dispatcher down if the worker leaves its loop for any reason,
/// so no caller can be left waiting on a mailbox nobody reads.
struct ExitGuard<'a> {
    shared: &'a Shared,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.shared.shutdown();
        // Drop the TLS value here, on the thread it was created for.
        // SAFETY: still on the worker; the loop has stopped running bodies.
        drop(unsafe { self.shared.tls.replace(None) });
        tls::leave_worker();
        kdebug!("dispatcher {} worker exited", self.shared.serial);
    }
}

/// Worker thread entry point
pub(crate) fn run(shared: Arc<Shared>, idle: IdlePolicy, ready: Completer<OsThreadId>) {
    let id = tls::current_os_tid();
    shared.mailbox.bind_consumer();
    tls::enter_worker(shared.serial);
    let _guard = ExitGuard { shared: &shared };

    if !shared.state.mark_running() {
        // Terminated before startup finished; dropping `ready` reports it.
        return;
    }
    shared.publish_id(id);
    ready.send(id);
    kdebug!("dispatcher {} worker running on os thread {}", shared.serial, id);

    while let Some(inv) = shared.mailbox.recv(idle) {
        if shared.state.is_terminated() {
            break;
        }
        execute(shared.serial, inv);
    }
}

/// Run one invocation, containing any panic to this invocation
fn execute(serial: u64, inv: Invocation) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| inv.run())) {
        kerror!(
            "dispatcher {}: non-blocking call panicked: {}",
            serial,
            panic_message(payload.as_ref())
        );
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
