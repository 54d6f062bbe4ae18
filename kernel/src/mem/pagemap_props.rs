// src/mem/pagemap_props.rs
//
// pagemap codec の性質テスト（テスト専用、ロジックは持たない）
//
// 確認する性質:
// - 任意の u64 で encode(decode(v)) == v
// - present と swapped は同時に立たない
// - pfn は status / pshift のビットに影響されない
// - bit63 を含む値でも符号拡張が起きない
// - bytes → entries の一括デコードが 1 件ずつの decode と一致する

#![cfg(test)]

use proptest::prelude::*;

use super::addr::VirtAddr;
use super::pagemap::{
    decode, encode, entries, entry_offset, pm_pshift, pm_status, PagemapEntry, PagemapStatus,
    PM_ENTRY_BYTES, PM_PFRAME_MASK,
};

fn arb_status() -> impl Strategy<Value = PagemapStatus> {
    (0u8..8).prop_map(PagemapStatus::from_bits)
}

proptest! {
    #[test]
    fn round_trip_any_value(v in any::<u64>()) {
        prop_assert_eq!(encode(decode(v)), v);
        prop_assert_eq!(decode(v).raw(), v);
    }

    #[test]
    fn present_and_swapped_are_exclusive(v in any::<u64>()) {
        let e = decode(v);
        prop_assert!(!(e.is_present() && e.is_swapped()));
        prop_assert_eq!(e.pshift().is_none(), e.is_swapped());
    }

    #[test]
    fn frame_is_independent_of_high_bits(
        status in 0u64..8,
        pshift in 0u64..64,
        pfn in 0u64..=PM_PFRAME_MASK,
    ) {
        let raw = pm_status(status) | pm_pshift(pshift) | pfn;
        let e = decode(raw);
        prop_assert_eq!(e.frame_number(), pfn);
        prop_assert_eq!(e.status().bits() as u64, status);
        if !e.is_swapped() {
            prop_assert_eq!(e.pshift(), Some(pshift as u8));
        }
    }

    #[test]
    fn sign_bit_set_stays_unsigned(low in any::<u64>()) {
        let v = low | (1u64 << 63);
        let e = decode(v);
        prop_assert!(e.frame_number() <= PM_PFRAME_MASK);
        prop_assert_eq!(e.frame_number(), v & PM_PFRAME_MASK);
        prop_assert_eq!(e.pshift().map(u64::from), Some((v >> 55) & 0x3f));
        prop_assert!(!e.is_swapped());
    }

    #[test]
    fn new_then_decode_matches(status in arb_status(), pshift in any::<u8>(), pfn in any::<u64>()) {
        let built = PagemapEntry::new(status, pshift, pfn);
        prop_assert_eq!(decode(built.raw()), built);
        prop_assert_eq!(decode(encode(built)), built);
    }

    #[test]
    fn bulk_decode_matches_single(values in proptest::collection::vec(any::<u64>(), 0..32)) {
        let mut bytes = [0u8; 32 * PM_ENTRY_BYTES];
        for (i, v) in values.iter().enumerate() {
            bytes[i * PM_ENTRY_BYTES..(i + 1) * PM_ENTRY_BYTES].copy_from_slice(&v.to_ne_bytes());
        }
        let used = &bytes[..values.len() * PM_ENTRY_BYTES];

        let mut n = 0;
        for (got, want) in entries(used).zip(values.iter()) {
            prop_assert_eq!(got, Ok(decode(*want)));
            n += 1;
        }
        prop_assert_eq!(n, values.len());
    }

    #[test]
    fn entry_offset_is_page_aligned_multiple(virt in any::<u64>()) {
        let off = entry_offset(VirtAddr(virt));
        prop_assert_eq!(off % PM_ENTRY_BYTES as u64, 0);
        prop_assert_eq!(off, (virt >> 12) * 8);
    }
}
