// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client interface to the board's GPIO controllers.
//!
//! The Tandem SoC spreads its pins across several GPIO controllers, and which
//! controller owns a given function -- or whether it is present at all --
//! depends on the board wiring. Consumers therefore resolve a controller by
//! the name the board gives it ([`GpioBindings::controller`]) and must cope
//! with the lookup failing, rather than assuming a controller into existence.
//!
//! This crate is types and traits only; the controller implementations live
//! with the board support code.

#![no_std]

/// Direction of a pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Direction {
    Input = 0,
    Output = 1,
}

/// What makes an interrupt-enabled input fire.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Trigger {
    /// Fire on a transition to the active level.
    Edge = 0,
    /// Fire for as long as the pin sits at the active level.
    Level = 1,
}

/// Which signal level counts as active. For edge triggers this selects the
/// edge: `ActiveLow` means the falling edge fires.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Polarity {
    ActiveHigh = 0,
    ActiveLow = 1,
}

/// Whether the controller's glitch filter conditions the pin before interrupt
/// detection. Mechanical switches want this on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Debounce {
    Disabled = 0,
    Enabled = 1,
}

/// Complete configuration for one pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinConfig {
    pub direction: Direction,
    pub trigger: Trigger,
    pub polarity: Polarity,
    pub debounce: Debounce,
}

impl PinConfig {
    /// Configuration for an interrupt input; the pin direction is implied.
    pub const fn input(
        trigger: Trigger,
        polarity: Polarity,
        debounce: Debounce,
    ) -> Self {
        Self {
            direction: Direction::Input,
            trigger,
            polarity,
            debounce,
        }
    }
}

/// A routine run when a configured pin interrupt fires.
///
/// Handlers execute in interrupt context and must not block or take locks
/// that a preempted thread might hold. `Sync` is required because the
/// handler is installed from thread context and invoked from interrupts.
pub trait PinEventHandler: Sync {
    fn handle_pin_event(&self, pin: u8);
}

/// One GPIO controller.
///
/// Methods take `&self`; a controller implementation is expected to
/// serialize access to its own registers.
pub trait GpioController {
    /// Applies `config` to `pin`. For interrupt-capable configurations this
    /// sets up detection but leaves delivery disabled until
    /// [`enable_interrupt`](Self::enable_interrupt).
    fn configure(&self, pin: u8, config: PinConfig);

    /// Attaches `handler` to `pin`'s interrupt.
    ///
    /// At most one handler per pin, attached once during startup; there is
    /// no detach. Re-attachment is a programming error and implementations
    /// are entitled to panic on it.
    fn attach_handler(&self, pin: u8, handler: &'static dyn PinEventHandler);

    /// Starts delivering `pin`'s interrupt to its attached handler.
    fn enable_interrupt(&self, pin: u8);
}

/// Access to the board's GPIO controllers, by name.
pub trait GpioBindings {
    /// Resolves `name` to a controller. `None` means the board has no such
    /// controller; callers decide whether that degrades or dooms them.
    fn controller(&self, name: &str) -> Option<&dyn GpioController>;
}
