// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property sweep over arbitrary factory records: whatever the record
//! claims, the derived identity must be bounded, terminated, and equal to
//! either the factory content or the default -- never a mix within a field.

use abi::{FactoryData, DESCRIPTOR_STRING_LEN};
use drv_usb_ident::{
    DeviceIdentity, DEFAULT_PID, DEFAULT_SERIAL, DEFAULT_VID,
};
use proptest::prelude::*;
use zerocopy::{FromBytes, FromZeros};

/// A stored length is usable iff `0 < len < DESCRIPTOR_STRING_LEN`.
fn usable(len: u8) -> bool {
    len > 0 && usize::from(len) < DESCRIPTOR_STRING_LEN
}

proptest! {
    #[test]
    fn serial_string_is_factory_content_or_default(
        content in any::<[u8; DESCRIPTOR_STRING_LEN]>(),
        len in any::<u8>(),
    ) {
        let mut data = FactoryData::new_zeroed();
        data.product_sn = content;
        data.product_sn_len = len;

        let id = DeviceIdentity::from_factory(&data);
        let s = id.serial_string;

        // Bounded, with the terminator inside the array right after the
        // content.
        prop_assert!(s.len() < DESCRIPTOR_STRING_LEN);
        prop_assert_eq!(s.as_array()[s.len()], 0);

        if usable(len) {
            prop_assert_eq!(s.as_bytes(), &content[..usize::from(len)]);
        } else {
            prop_assert_eq!(s, DEFAULT_SERIAL);
        }
    }

    #[test]
    fn id_pair_passes_through_or_defaults_as_a_unit(
        vid in any::<u16>(),
        pid in any::<u16>(),
    ) {
        let mut data = FactoryData::new_zeroed();
        data.product_vid.set(vid);
        data.product_pid.set(pid);

        let id = DeviceIdentity::from_factory(&data);

        let sentinel = |w: u16| w == 0x0000 || w == 0xffff;
        if sentinel(vid) || sentinel(pid) {
            prop_assert_eq!(
                (id.vendor_id, id.product_id),
                (DEFAULT_VID, DEFAULT_PID)
            );
        } else {
            prop_assert_eq!((id.vendor_id, id.product_id), (vid, pid));
        }
    }

    #[test]
    fn identity_never_panics_and_is_idempotent(
        image in any::<[u8; core::mem::size_of::<FactoryData>()]>(),
    ) {
        let data = FactoryData::read_from_bytes(&image[..]).unwrap();
        let first = DeviceIdentity::from_factory(&data);
        let second = DeviceIdentity::from_factory(&data);
        prop_assert_eq!(first, second);
    }
}
