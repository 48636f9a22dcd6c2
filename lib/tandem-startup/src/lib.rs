// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Startup orchestration for the Tandem app core.
//!
//! The board's main task calls [`boot`] once, early, and this crate does the
//! rest, in a fixed order:
//!
//! 1. register the factory-data descriptor source with the USB subsystem,
//! 2. arm the soft-reset watch (or leave it unbound if the board has no
//!    button controller),
//! 3. release the aux core,
//! 4. spawn the service tasks.
//!
//! Nothing in the sequence blocks and nothing waits for the aux core: the
//! handoff precedes the service tasks in program order, and that is the only
//! ordering anyone gets. Each step leaves a ring buffer entry, so a board
//! that wedges during bring-up shows how far it got.
//!
//! The identity source and the reset watch live for the whole process --
//! external subsystems keep references to them -- so they are owned by
//! claim-once cells here. A second call to [`boot`] trips the claim assert;
//! that is a bug in the board code, not a condition to handle.

#![cfg_attr(not(test), no_std)]

mod auxcore;
mod tasks;

pub use tasks::{
    Executive, ServiceTasks, SERVICE_TASK_PRIORITY, SERVICE_TASK_STACK_SIZE,
};

use abi::{FactoryData, Priority, ResetVector};
use drv_gpio_api::GpioBindings;
use drv_reset_watch::ResetWatch;
use drv_soc_api::SocControl;
use drv_usb_ident::{FactoryIdent, UsbSetup};
use ringbuf::*;
use spin::Once;

/// Stack size for the board's main task, the one that runs [`boot`].
pub const MAIN_TASK_STACK_SIZE: usize = 2048;

/// Priority for the board's main task. One step more important than the
/// service tasks, so startup finishes before they get scheduled.
pub const MAIN_TASK_PRIORITY: Priority = Priority(7);

/// Everything [`boot`] needs from the board: the factory data view and the
/// four subsystem handles. All `'static` because this is the wiring of the
/// process, not a transaction.
pub struct Board {
    pub factory: &'static FactoryData,
    pub usb: &'static dyn UsbSetup,
    pub gpio: &'static dyn GpioBindings,
    pub soc: &'static dyn SocControl,
    pub exec: &'static dyn Executive,
    pub tasks: ServiceTasks,
}

#[derive(Copy, Clone, PartialEq)]
enum Trace {
    None,
    DescriptorSourceRegistered,
    AuxCoreReleased(ResetVector),
    TaskSpawned(&'static str),
}

ringbuf!(Trace, 16, Trace::None);

static FACTORY_IDENT: Once<FactoryIdent> = Once::new();
static RESET_WATCH: Once<ResetWatch> = Once::new();

/// Claims a process-lifetime cell. Single claimant by contract; a second
/// claim means `boot` ran twice and we want that loud, not ignored.
fn claim<T>(cell: &'static Once<T>, init: impl FnOnce() -> T) -> &'static T {
    assert!(cell.get().is_none());
    cell.call_once(init)
}

/// Brings the system up. Called exactly once, from the board's main task.
///
/// # Panics
///
/// Panics if called a second time; see the crate docs.
pub fn boot(board: &Board) {
    let ident = claim(&FACTORY_IDENT, || FactoryIdent::new(board.factory));
    let watch = claim(&RESET_WATCH, || ResetWatch::new(board.soc));
    run(board, ident, watch);
}

/// The sequence itself, with the singletons injected so tests can run it
/// more than once per process.
fn run(
    board: &Board,
    ident: &'static FactoryIdent,
    watch: &'static ResetWatch,
) {
    // USB first: the stack invokes the source lazily, so registering is
    // cheap, and we become enumerable as early as possible.
    board.usb.register_descriptor_source(ident);
    ringbuf_entry!(Trace::DescriptorSourceRegistered);

    // A board without the button controller simply runs without a
    // soft-reset button; the watch records the particulars.
    let _ = watch.arm(board.gpio);

    auxcore::launch(board.soc);

    tasks::start_service_tasks(board.exec, &board.tasks);
}
