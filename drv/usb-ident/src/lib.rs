// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! USB device identity, provisioned from factory data.
//!
//! Before the USB stack can enumerate it needs the vendor/product/serial
//! strings and the VID/PID pair. On a provisioned board those come from the
//! factory record in OTP; but the record is written by manufacturing tooling,
//! or partially, or not at all, so nothing in it can be trusted. Enumeration
//! has to succeed anyway: every field degrades independently to a built-in
//! default, and no error can leave this crate.
//!
//! [`DeviceIdentity::from_factory`] is the entire policy. [`FactoryIdent`]
//! wraps it in the callback shape the USB stack invokes when it rebuilds its
//! descriptors, which can happen well after startup -- another reason the
//! factory view must be `&'static`.

#![cfg_attr(not(test), no_std)]

use abi::{FactoryData, DESCRIPTOR_STRING_LEN};
use ringbuf::*;

/// Vendor string used when the factory field is absent or malformed.
pub const DEFAULT_VENDOR: DescriptorString =
    DescriptorString::from_str("Tandem");

/// Product string used when the factory field is absent or malformed.
pub const DEFAULT_PRODUCT: DescriptorString =
    DescriptorString::from_str("Tandem Dev Kit");

/// Serial string used when the factory field is absent or malformed. Boards
/// that enumerate with this serial are visibly unprovisioned, which is the
/// point.
pub const DEFAULT_SERIAL: DescriptorString =
    DescriptorString::from_str("00.01");

/// VID/PID pair used when the factory record does not carry a usable one.
/// The pair is substituted as a unit; we never mix a factory VID with a
/// default PID or vice versa.
pub const DEFAULT_VID: u16 = 0x1209;
pub const DEFAULT_PID: u16 = 0x4d01;

#[derive(Copy, Clone, PartialEq)]
enum Trace {
    None,
    /// One identity was built; records which fields came out of OTP rather
    /// than the defaults.
    Identity {
        vendor_from_otp: bool,
        product_from_otp: bool,
        serial_from_otp: bool,
        id_from_otp: bool,
    },
}

ringbuf!(Trace, 8, Trace::None);

/// A descriptor string: up to [`DESCRIPTOR_STRING_LEN`]` - 1` content bytes,
/// NUL-terminated inside a fixed array.
///
/// The backing array is what gets handed to the USB stack, which reads it as
/// a C string; the explicit length is authoritative on our side, since
/// factory content may legally contain interior NUL bytes. The terminator
/// invariant holds for every constructor: content is copied into a zeroed
/// array and is always strictly shorter than it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DescriptorString {
    buf: [u8; DESCRIPTOR_STRING_LEN],
    len: usize,
}

impl DescriptorString {
    /// Builds a descriptor string from a literal, in const context, for the
    /// defaults above. Panics at compile time if `s` is too long to leave
    /// room for the terminator.
    pub const fn from_str(s: &str) -> Self {
        let bytes = s.as_bytes();
        assert!(bytes.len() < DESCRIPTOR_STRING_LEN);

        // copy_from_slice isn't const; loop instead.
        let mut buf = [0; DESCRIPTOR_STRING_LEN];
        let mut i = 0;
        while i < bytes.len() {
            buf[i] = bytes[i];
            i += 1;
        }
        Self {
            buf,
            len: bytes.len(),
        }
    }

    /// Copies validated factory content. Callers guarantee the bound; the
    /// only caller is [`DeviceIdentity::from_factory`] working from the
    /// `abi` accessors, which cap fields at `DESCRIPTOR_STRING_LEN - 1`.
    fn from_bytes(content: &[u8]) -> Self {
        debug_assert!(content.len() < DESCRIPTOR_STRING_LEN);
        let mut buf = [0; DESCRIPTOR_STRING_LEN];
        buf[..content.len()].copy_from_slice(content);
        Self {
            buf,
            len: content.len(),
        }
    }

    /// The content bytes, terminator excluded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The full backing array, NUL terminator (at index [`len`]) included.
    /// This is the form the USB stack consumes.
    ///
    /// [`len`]: DescriptorString::len
    pub const fn as_array(&self) -> &[u8; DESCRIPTOR_STRING_LEN] {
        &self.buf
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Everything the USB stack needs to enumerate as us.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_string: DescriptorString,
    pub product_string: DescriptorString,
    pub serial_string: DescriptorString,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    /// Derives the device identity from a factory record.
    ///
    /// Total and pure: any shape of record produces a usable identity, with
    /// per-field fallback to the defaults. Calling it twice on the same
    /// record gives the same answer, which matters because the USB stack may
    /// rebuild descriptors at any time.
    pub fn from_factory(data: &FactoryData) -> Self {
        let (vendor_id, product_id) =
            data.vid_pid().unwrap_or((DEFAULT_VID, DEFAULT_PID));
        Self {
            vendor_string: provision(data.vendor_name(), &DEFAULT_VENDOR),
            product_string: provision(data.board_name(), &DEFAULT_PRODUCT),
            serial_string: provision(data.product_sn(), &DEFAULT_SERIAL),
            vendor_id,
            product_id,
        }
    }
}

/// Factory content if the field was provisioned, the fallback otherwise.
fn provision(
    field: Option<&[u8]>,
    fallback: &DescriptorString,
) -> DescriptorString {
    match field {
        Some(content) => DescriptorString::from_bytes(content),
        None => *fallback,
    }
}

/// Source of the device identity, registered with the USB stack at startup
/// and invoked by it whenever descriptors are (re)built.
pub trait DescriptorSource: Sync {
    fn device_identity(&self) -> DeviceIdentity;
}

/// The slice of the USB subsystem the startup path drives: bring up the
/// CDC-ACM function with `source` installed as its identity callback.
pub trait UsbSetup {
    fn register_descriptor_source(
        &self,
        source: &'static dyn DescriptorSource,
    );
}

/// [`DescriptorSource`] over the board's factory data.
pub struct FactoryIdent {
    factory: &'static FactoryData,
}

impl FactoryIdent {
    pub fn new(factory: &'static FactoryData) -> Self {
        Self { factory }
    }
}

impl DescriptorSource for FactoryIdent {
    fn device_identity(&self) -> DeviceIdentity {
        ringbuf_entry!(Trace::Identity {
            vendor_from_otp: self.factory.vendor_name().is_some(),
            product_from_otp: self.factory.board_name().is_some(),
            serial_from_otp: self.factory.product_sn().is_some(),
            id_from_otp: self.factory.vid_pid().is_some(),
        });
        DeviceIdentity::from_factory(self.factory)
    }
}
