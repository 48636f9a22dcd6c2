// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client interface to SoC-level control operations.
//!
//! These are the operations that reach outside the app core: releasing the
//! aux core from reset and rebooting the whole SoC. They are grouped in one
//! trait because a single power/reset controller block owns both on this
//! part, and because every one of them is fire-and-forget: nothing here
//! returns status, by design. The board support code provides the
//! implementation; portable code only ever sees `&dyn SocControl`.

#![no_std]

use abi::ResetVector;

/// `Sync` because the one implementation is shared between thread context
/// and interrupt handlers (the soft-reset path calls
/// [`request_reset`](Self::request_reset) from an ISR).
pub trait SocControl: Sync {
    /// Reads the aux core's reset vector from the image slot.
    ///
    /// Each call performs a fresh volatile read of the vector word. The
    /// startup path calls this exactly once per boot and hands the value
    /// straight to [`start_aux_core`](Self::start_aux_core).
    fn aux_reset_vector(&self) -> ResetVector;

    /// Releases the aux core from reset, starting it at `vector`.
    ///
    /// One-shot: the hardware latches the start request and there is no
    /// status to read back, so this neither fails nor retries. If the aux
    /// core never comes up, that is discovered later, by whoever first waits
    /// on the inter-core link.
    fn start_aux_core(&self, vector: ResetVector);

    /// Requests a full SoC reboot, both cores.
    ///
    /// The reset happens asynchronously, so this returns; callers should not
    /// expect to run for long afterwards. There is deliberately no warm or
    /// partial variant here: the soft-reset path always means the whole
    /// board.
    fn request_reset(&self);
}
