// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Soft-reset button watch.
//!
//! The board routes its reset button to a pin on the always-on GPIO
//! controller. Once the watch is armed, a press -- falling edge, debounced
//! by the controller -- reboots the whole SoC, unconditionally. There is no
//! way back by design: arming is permanent, firing is terminal, and nothing
//! consults any other state before requesting the reboot.
//!
//! Arming can fail in exactly one way: the named controller may be absent on
//! this board variant. That degrades to "no soft-reset button": the watch
//! stays [`WatchState::Unbound`] forever and the rest of startup proceeds.
//! The failure is traced and reported as an [`ArmError`] so callers that
//! care can see it, but the startup path deliberately does not.

#![cfg_attr(not(test), no_std)]

use core::sync::atomic::{AtomicU8, Ordering};
use drv_gpio_api::{
    Debounce, GpioBindings, PinConfig, PinEventHandler, Polarity, Trigger,
};
use drv_soc_api::SocControl;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use ringbuf::*;

/// Name of the GPIO controller the reset button is wired to. The button has
/// to work while the rest of the chip sleeps, hence the always-on block.
pub const RESET_BUTTON_CONTROLLER: &str = "GPIO_AON";

/// Pin index of the reset button on that controller.
pub const RESET_BUTTON_PIN: u8 = 0;

/// Where the watch is in its one-way life cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum WatchState {
    /// Controller not resolved (yet, or ever). A watch whose `arm` failed
    /// stays here for the life of the system.
    Unbound = 0,
    /// Pin configured and handler attached, interrupt delivery still off.
    Bound = 1,
    /// Interrupt delivery on; the next press reboots.
    Armed = 2,
    /// A press was seen and the reboot has been requested. Terminal.
    ResetRequested = 3,
}

#[derive(Copy, Clone, PartialEq)]
enum Trace {
    None,
    ControllerMissing,
    Bound,
    Armed,
    ResetRequested { pin: u8 },
}

ringbuf!(Trace, 8, Trace::None);

/// Why arming failed. The startup path ignores this (`let _ =`); it exists
/// so the degraded case is explicit for everyone else.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArmError {
    ControllerNotFound,
}

/// The watch itself. One of these exists for the life of the process -- the
/// GPIO controller keeps a reference to it as the pin's interrupt handler --
/// so it is owned by a claim-once cell in the startup crate and handed
/// around as `&'static`.
pub struct ResetWatch {
    soc: &'static dyn SocControl,
    state: AtomicU8,
}

impl ResetWatch {
    /// Makes an unbound watch that will use `soc` to reboot when it fires.
    pub const fn new(soc: &'static dyn SocControl) -> Self {
        Self {
            soc,
            state: AtomicU8::new(WatchState::Unbound as u8),
        }
    }

    /// Current life-cycle state. Mostly for tests and debugger-adjacent
    /// introspection; nothing in the firmware branches on it.
    pub fn state(&self) -> WatchState {
        WatchState::from_u8(self.state.load(Ordering::Relaxed))
            .unwrap_or(WatchState::Unbound)
    }

    /// Resolves the button's controller and arms the interrupt.
    ///
    /// On success the watch is `Armed` and `self` is attached as the pin's
    /// handler, which is why `self` must already have its process-lifetime
    /// address. If the controller cannot be resolved the watch stays
    /// `Unbound` and can never fire; there is no retry.
    pub fn arm(
        &'static self,
        gpio: &dyn GpioBindings,
    ) -> Result<(), ArmError> {
        let Some(controller) = gpio.controller(RESET_BUTTON_CONTROLLER)
        else {
            ringbuf_entry!(Trace::ControllerMissing);
            return Err(ArmError::ControllerNotFound);
        };

        controller.configure(
            RESET_BUTTON_PIN,
            PinConfig::input(
                Trigger::Edge,
                Polarity::ActiveLow,
                Debounce::Enabled,
            ),
        );
        controller.attach_handler(RESET_BUTTON_PIN, self);
        self.state.store(WatchState::Bound as u8, Ordering::Relaxed);
        ringbuf_entry!(Trace::Bound);

        controller.enable_interrupt(RESET_BUTTON_PIN);
        self.state.store(WatchState::Armed as u8, Ordering::Relaxed);
        ringbuf_entry!(Trace::Armed);
        Ok(())
    }
}

impl PinEventHandler for ResetWatch {
    /// Runs in interrupt context. Latches the terminal state, then asks for
    /// the reboot; the reset happens asynchronously, so the latch has to go
    /// first to be visible if we never run again.
    fn handle_pin_event(&self, pin: u8) {
        self.state
            .store(WatchState::ResetRequested as u8, Ordering::Relaxed);
        ringbuf_entry!(Trace::ResetRequested { pin });
        self.soc.request_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::ResetVector;
    use drv_gpio_api::{Direction, GpioController};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSoc {
        resets: AtomicUsize,
    }

    impl SocControl for CountingSoc {
        fn aux_reset_vector(&self) -> ResetVector {
            ResetVector(0)
        }
        fn start_aux_core(&self, _vector: ResetVector) {}
        fn request_reset(&self) {
            self.resets.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[derive(Default)]
    struct FakeController {
        ops: Mutex<Vec<&'static str>>,
        config: Mutex<Option<(u8, PinConfig)>>,
        handler: Mutex<Option<(u8, &'static dyn PinEventHandler)>>,
    }

    impl GpioController for FakeController {
        fn configure(&self, pin: u8, config: PinConfig) {
            self.ops.lock().unwrap().push("configure");
            *self.config.lock().unwrap() = Some((pin, config));
        }
        fn attach_handler(
            &self,
            pin: u8,
            handler: &'static dyn PinEventHandler,
        ) {
            self.ops.lock().unwrap().push("attach");
            *self.handler.lock().unwrap() = Some((pin, handler));
        }
        fn enable_interrupt(&self, _pin: u8) {
            self.ops.lock().unwrap().push("enable");
        }
    }

    struct FakeBindings {
        aon: FakeController,
    }

    impl GpioBindings for FakeBindings {
        fn controller(&self, name: &str) -> Option<&dyn GpioController> {
            if name == RESET_BUTTON_CONTROLLER {
                Some(&self.aon)
            } else {
                None
            }
        }
    }

    /// A board with no always-on GPIO block at all.
    struct NoBindings;

    impl GpioBindings for NoBindings {
        fn controller(&self, _name: &str) -> Option<&dyn GpioController> {
            None
        }
    }

    fn fixture() -> (&'static CountingSoc, &'static ResetWatch) {
        let soc: &'static CountingSoc =
            Box::leak(Box::new(CountingSoc::default()));
        let watch: &'static ResetWatch =
            Box::leak(Box::new(ResetWatch::new(soc)));
        (soc, watch)
    }

    #[test]
    fn arm_configures_then_attaches_then_enables() {
        let (_soc, watch) = fixture();
        let bindings = FakeBindings {
            aon: FakeController::default(),
        };

        watch.arm(&bindings).unwrap();
        assert_eq!(watch.state(), WatchState::Armed);

        assert_eq!(
            *bindings.aon.ops.lock().unwrap(),
            ["configure", "attach", "enable"]
        );
        let (pin, config) = bindings.aon.config.lock().unwrap().unwrap();
        assert_eq!(pin, RESET_BUTTON_PIN);
        assert_eq!(config.direction, Direction::Input);
        assert_eq!(config.trigger, Trigger::Edge);
        assert_eq!(config.polarity, Polarity::ActiveLow);
        assert_eq!(config.debounce, Debounce::Enabled);
    }

    #[test]
    fn press_requests_exactly_one_reset() {
        let (soc, watch) = fixture();
        let bindings = FakeBindings {
            aon: FakeController::default(),
        };
        watch.arm(&bindings).unwrap();

        let (pin, handler) = bindings.aon.handler.lock().unwrap().unwrap();
        assert_eq!(pin, RESET_BUTTON_PIN);

        handler.handle_pin_event(pin);
        assert_eq!(soc.resets.load(Ordering::Relaxed), 1);
        assert_eq!(watch.state(), WatchState::ResetRequested);
    }

    #[test]
    fn missing_controller_means_unbound_forever() {
        let (soc, watch) = fixture();

        assert_eq!(
            watch.arm(&NoBindings),
            Err(ArmError::ControllerNotFound)
        );
        assert_eq!(watch.state(), WatchState::Unbound);
        // Nothing was attached anywhere, so no press can ever reach us.
        assert_eq!(soc.resets.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn resolution_uses_the_declared_name() {
        let (_soc, watch) = fixture();
        let bindings = FakeBindings {
            aon: FakeController::default(),
        };
        // Sanity-check the stub itself: a different name resolves nothing.
        assert!(bindings.controller("GPIO_9").is_none());
        watch.arm(&bindings).unwrap();
        assert!(bindings.aon.handler.lock().unwrap().is_some());
    }
}
