// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board ABI definitions, shared between the Tandem app-core firmware and the
//! tooling that provisions boards at manufacturing time.
//!
//! This crate pins down the two fixed memory regions the firmware reads during
//! startup -- the OTP factory data area and the aux-core image slot -- plus the
//! descriptor types used to start the fixed set of service tasks. Everything
//! here is layout: policy lives in the crates that consume these types.

#![cfg_attr(not(test), no_std)]

use static_assertions::const_assert;
use zerocopy::byteorder::little_endian as le;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Size of each string field in [`FactoryData`], and therefore the upper bound
/// (terminator included) on every USB descriptor string derived from one.
///
/// A stored length is only meaningful if it is strictly below this bound; the
/// spare byte is what guarantees room for a NUL terminator in the derived
/// descriptor.
pub const DESCRIPTOR_STRING_LEN: usize = 64;

/// Base address of the factory data record in the OTP data area.
///
/// The region is programmed once at manufacturing and is read-only to
/// firmware. Erased OTP reads back all-ones; words that were skipped during
/// programming may read all-zeros. Consumers must treat every field as
/// untrusted.
pub const FACTORY_DATA_ADDR: usize = 0xffff_e000;

/// One past the end of the OTP data area.
const OTP_DATA_END: usize = 0xffff_f000;

/// Base of the aux-core image slot in shared flash. The first word of the
/// image is the aux core's reset vector.
pub const AUX_IMAGE_BASE: usize = 0x4003_4000;

/// Address of the 32-bit aux-core reset vector.
pub const AUX_RESET_VECTOR_ADDR: usize = AUX_IMAGE_BASE;

/// Factory provisioning record, exactly as it appears in OTP.
///
/// Each string field is a fixed 64-byte array paired with a length byte; none
/// of it is validated at programming time, so lengths may be zero, out of
/// range, or simply unrelated to the bytes next to them. The [`vendor_name`],
/// [`board_name`], [`product_sn`] and [`vid_pid`] accessors encode the rules
/// for deciding whether a field was actually provisioned; raw field access is
/// public for the benefit of offline tooling.
///
/// The struct has alignment 1 (`Unaligned`), so the typed view at
/// [`FACTORY_DATA_ADDR`] needs no runtime alignment check.
///
/// [`vendor_name`]: FactoryData::vendor_name
/// [`board_name`]: FactoryData::board_name
/// [`product_sn`]: FactoryData::product_sn
/// [`vid_pid`]: FactoryData::vid_pid
#[derive(
    Clone, Copy, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct FactoryData {
    /// Manufacturer name, `vendor_name_len` bytes of it.
    pub vendor_name: [u8; DESCRIPTOR_STRING_LEN],
    pub vendor_name_len: u8,
    /// Marketing name of the board.
    pub board_name: [u8; DESCRIPTOR_STRING_LEN],
    pub board_name_len: u8,
    /// Serial number, unique per unit.
    pub product_sn: [u8; DESCRIPTOR_STRING_LEN],
    pub product_sn_len: u8,
    /// USB vendor ID, little-endian.
    pub product_vid: le::U16,
    /// USB product ID, little-endian.
    pub product_pid: le::U16,
}

const_assert!(
    FACTORY_DATA_ADDR + core::mem::size_of::<FactoryData>() <= OTP_DATA_END
);

impl FactoryData {
    /// Returns the vendor name bytes, if the field was provisioned.
    pub fn vendor_name(&self) -> Option<&[u8]> {
        provisioned_str(&self.vendor_name, self.vendor_name_len)
    }

    /// Returns the board name bytes, if the field was provisioned.
    pub fn board_name(&self) -> Option<&[u8]> {
        provisioned_str(&self.board_name, self.board_name_len)
    }

    /// Returns the serial number bytes, if the field was provisioned.
    pub fn product_sn(&self) -> Option<&[u8]> {
        provisioned_str(&self.product_sn, self.product_sn_len)
    }

    /// Returns `(vid, pid)` if *both* words were provisioned.
    ///
    /// 0xffff (erased) and 0x0000 (unwritten) are OTP sentinels, not IDs; a
    /// record where either word is a sentinel gets `None`, and the caller
    /// substitutes its default pair. The two words are accepted or rejected
    /// together so a board can never enumerate with a mix of real and default
    /// identity.
    pub fn vid_pid(&self) -> Option<(u16, u16)> {
        let vid = self.product_vid.get();
        let pid = self.product_pid.get();
        if word_provisioned(vid) && word_provisioned(pid) {
            Some((vid, pid))
        } else {
            None
        }
    }
}

/// A string field counts as provisioned when its stored length is nonzero and
/// strictly below the field size. Anything else -- including the 0xff fill of
/// erased OTP -- means "use the default".
fn provisioned_str(
    raw: &[u8; DESCRIPTOR_STRING_LEN],
    len: u8,
) -> Option<&[u8]> {
    let len = usize::from(len);
    if len == 0 || len >= DESCRIPTOR_STRING_LEN {
        return None;
    }
    Some(&raw[..len])
}

/// An OTP word is provisioned if it is neither the erased nor the unwritten
/// pattern.
const fn word_provisioned(word: u16) -> bool {
    word != 0x0000 && word != 0xffff
}

/// Produces the typed view of the factory data record.
///
/// # Safety
///
/// The caller must be executing on the app core with the OTP data area mapped
/// and readable, which is the case from reset on this SoC. Host-side code must
/// never call this; it gets its `FactoryData` from real bytes instead.
pub unsafe fn factory_data() -> &'static FactoryData {
    &*(FACTORY_DATA_ADDR as *const FactoryData)
}

/// The aux core's entry point, exactly as read from the image slot. The
/// launch path passes this value through untouched; there is deliberately no
/// arithmetic on it anywhere in the firmware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResetVector(pub u32);

/// Reads the aux-core reset vector from the image slot.
///
/// This is a single volatile read; callers are expected to read it exactly
/// once per boot and hand the value straight to the launch primitive.
///
/// # Safety
///
/// The caller must be executing on the app core with shared flash mapped and
/// readable.
pub unsafe fn read_aux_reset_vector() -> ResetVector {
    ResetVector(core::ptr::read_volatile(
        AUX_RESET_VECTOR_ADDR as *const u32,
    ))
}

/// Task priority.
///
/// Numerically lower values are more important. This type deliberately does
/// not implement `Ord`, to keep us from confusing ourselves on whether `>`
/// means numerically greater / less important, or more important /
/// numerically smaller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[repr(transparent)]
pub struct Priority(pub u8);

impl Priority {
    /// Checks if `self` is strictly more important than `other`.
    ///
    /// This is easier to read than comparing the numeric values of the
    /// priorities, since lower numbers are more important.
    pub fn is_more_important_than(self, other: Self) -> bool {
        self.0 < other.0
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct TaskFlags: u32 {
        /// The system should treat failure of this task as fatal.
        const ESSENTIAL = 1 << 0;
        const RESERVED = !1;
    }
}

/// Entry point of a task. Tasks run forever; there is no exit protocol.
pub type TaskEntry = fn() -> !;

/// Description of one task, consumed by the spawn primitive.
///
/// Descriptors are built from static tables; nothing here is read back after
/// the task starts.
#[derive(Copy, Clone, Debug)]
pub struct TaskDesc {
    /// Human-readable task name, for trace output and debuggers.
    pub name: &'static str,
    /// First instruction the task will execute.
    pub entry: TaskEntry,
    /// Size of the task's private stack, in bytes.
    pub stack_size: usize,
    /// Scheduling priority.
    pub priority: Priority,
    /// Spawn options, passed through to the scheduler.
    pub flags: TaskFlags,
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::FromZeros;

    fn erased() -> FactoryData {
        let image = [0xffu8; core::mem::size_of::<FactoryData>()];
        FactoryData::read_from_bytes(&image[..]).unwrap()
    }

    #[test]
    fn field_offsets_match_programming_layout() {
        let mut image = [0u8; core::mem::size_of::<FactoryData>()];
        image[0] = b'A'; // vendor_name[0]
        image[64] = 1; // vendor_name_len
        image[65] = b'B'; // board_name[0]
        image[129] = 1; // board_name_len
        image[130] = b'C'; // product_sn[0]
        image[194] = 1; // product_sn_len
        image[195] = 0x87; // vid lo
        image[196] = 0x80; // vid hi
        image[197] = 0xb6; // pid lo
        image[198] = 0x0a; // pid hi

        let data = FactoryData::ref_from_bytes(&image[..]).unwrap();
        assert_eq!(data.vendor_name(), Some(&b"A"[..]));
        assert_eq!(data.board_name(), Some(&b"B"[..]));
        assert_eq!(data.product_sn(), Some(&b"C"[..]));
        assert_eq!(data.vid_pid(), Some((0x8087, 0x0ab6)));
    }

    #[test]
    fn record_size_is_fixed() {
        assert_eq!(core::mem::size_of::<FactoryData>(), 199);
    }

    #[test]
    fn erased_record_has_no_provisioned_fields() {
        let data = erased();
        assert_eq!(data.vendor_name(), None);
        assert_eq!(data.board_name(), None);
        assert_eq!(data.product_sn(), None);
        assert_eq!(data.vid_pid(), None);
    }

    #[test]
    fn zeroed_record_has_no_provisioned_fields() {
        let data = FactoryData::new_zeroed();
        assert_eq!(data.vendor_name(), None);
        assert_eq!(data.board_name(), None);
        assert_eq!(data.product_sn(), None);
        assert_eq!(data.vid_pid(), None);
    }

    #[test]
    fn string_length_bounds() {
        let mut data = FactoryData::new_zeroed();
        data.vendor_name[..5].copy_from_slice(b"Acme!");

        data.vendor_name_len = 5;
        assert_eq!(data.vendor_name(), Some(&b"Acme!"[..]));

        // Longest length that still leaves terminator room downstream.
        data.vendor_name_len = 63;
        assert_eq!(data.vendor_name().map(<[u8]>::len), Some(63));

        // Length equal to the field size claims more payload than a
        // terminated descriptor can hold.
        data.vendor_name_len = 64;
        assert_eq!(data.vendor_name(), None);

        data.vendor_name_len = 0;
        assert_eq!(data.vendor_name(), None);
    }

    #[test]
    fn vid_pid_rejected_if_either_word_is_a_sentinel() {
        let mut data = FactoryData::new_zeroed();

        data.product_vid.set(0x1234);
        data.product_pid.set(0x0000);
        assert_eq!(data.vid_pid(), None);

        data.product_vid.set(0x0000);
        data.product_pid.set(0x1234);
        assert_eq!(data.vid_pid(), None);

        data.product_vid.set(0xffff);
        data.product_pid.set(0xffff);
        assert_eq!(data.vid_pid(), None);

        data.product_vid.set(0x1234);
        data.product_pid.set(0x5678);
        assert_eq!(data.vid_pid(), Some((0x1234, 0x5678)));
    }

    #[test]
    fn priority_ordering_reads_correctly() {
        assert!(Priority(7).is_more_important_than(Priority(8)));
        assert!(!Priority(8).is_more_important_than(Priority(8)));
        assert!(!Priority(9).is_more_important_than(Priority(8)));
    }

    #[test]
    fn essential_flag_is_not_reserved() {
        assert!(!TaskFlags::ESSENTIAL.intersects(TaskFlags::RESERVED));
        assert!(TaskFlags::from_bits_retain(0x2)
            .intersects(TaskFlags::RESERVED));
    }
}
