// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Aux-core handoff.
//!
//! The aux core waits in reset with its image already sitting in shared
//! flash; its reset vector is the first word of that image. The handoff is
//! one read and one write: read the vector, pass it to the start primitive
//! exactly as read. No retry, no acknowledgement, no transformation of the
//! value -- if the slot holds garbage, the aux core starts into garbage, and
//! the first visible symptom is an inter-core link that never comes up. The
//! trace entry below, recorded before the start, is what lets a post-mortem
//! distinguish "never released" from "released and wedged".

use crate::Trace;
use drv_soc_api::SocControl;
use ringbuf::ringbuf_entry_root;

pub(crate) fn launch(soc: &dyn SocControl) {
    // The one and only read of the vector for this boot.
    let vector = soc.aux_reset_vector();
    ringbuf_entry_root!(Trace::AuxCoreReleased(vector));
    soc.start_aux_core(vector);
}
