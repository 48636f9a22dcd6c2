// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service task spawning.
//!
//! The service tasks are a fixed set, fixed here: the entry points arrive
//! from the board (they belong to the USB stack), everything else about them
//! -- names, stack sizes, priorities, flags -- is this module's table. They
//! are spawned detached, on purpose: no handle comes back, nobody ever
//! joins them, and exit is not part of their contract. They are peers of the
//! main task for the life of the board, not children of the startup path.

use crate::Trace;
use abi::{Priority, TaskDesc, TaskFlags};
use ringbuf::ringbuf_entry_root;

/// Stack size for each service task. They are small (protocol shuffling, no
/// deep call chains), and there are three of them, so this is deliberately
/// tight.
pub const SERVICE_TASK_STACK_SIZE: usize = 384;

/// Priority shared by the service tasks, one step less important than the
/// main task.
pub const SERVICE_TASK_PRIORITY: Priority = Priority(8);

/// The scheduler surface needed here: make a task runnable.
///
/// `spawn` returns nothing, deliberately: the caller gets no handle, so the
/// spawned task cannot be joined, watched, or stopped from here. The
/// descriptor is borrowed only for the call; implementations copy what they
/// keep.
pub trait Executive {
    fn spawn(&self, desc: &TaskDesc);
}

/// Entry points for the fixed service task set. The struct shape is what
/// fixes the count: a board provides exactly these three, or it does not
/// build.
pub struct ServiceTasks {
    /// Performs one-time CDC-ACM line setup when the host opens the port.
    pub cdcacm_setup: abi::TaskEntry,
    /// Watches for the magic-baudrate reboot request from the host.
    pub baudrate_reset: abi::TaskEntry,
    /// Shuttles bytes between the USB endpoint and the serial link.
    pub usb_serial: abi::TaskEntry,
}

impl ServiceTasks {
    fn descriptors(&self) -> [TaskDesc; 3] {
        let desc = |name, entry| TaskDesc {
            name,
            entry,
            stack_size: SERVICE_TASK_STACK_SIZE,
            priority: SERVICE_TASK_PRIORITY,
            // A dead service task leaves the board half-functional with no
            // way back; let the scheduler treat that as fatal.
            flags: TaskFlags::ESSENTIAL,
        };
        [
            desc("cdcacm_setup", self.cdcacm_setup),
            desc("baudrate_reset", self.baudrate_reset),
            desc("usb_serial", self.usb_serial),
        ]
    }
}

pub(crate) fn start_service_tasks(
    exec: &dyn Executive,
    tasks: &ServiceTasks,
) {
    for desc in &tasks.descriptors() {
        // The table above is the only source of descriptors; this guards
        // future edits to it, before the scheduler sees the damage.
        assert!(!desc.flags.intersects(TaskFlags::RESERVED));
        ringbuf_entry_root!(Trace::TaskSpawned(desc.name));
        exec.spawn(desc);
    }
}
