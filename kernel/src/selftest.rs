// src/selftest.rs
//
// 起動時セルフテスト（feature = "self_test"）。
//
// 役割:
// - 実機 / QEMU 上で、bootloader から受け取った実際の offset を使って
//   codec と bridge の性質を検算し、結果を [OK] / [ERROR] 行で出す。
//
// 設計方針:
// - チェック本体は DirectMap を引数に取る純粋関数にしておき、ホストの単体テストでも回す
// - 失敗しても止めない（全部回してから件数を出す）

use crate::arch::direct_map::DirectMap;
use crate::bridge;
use crate::logging;
use crate::mem::addr::PAGE_SIZE;
use crate::mem::pagemap::{decode, encode, pm_pshift, PM_PRESENT, PM_SWAP};
use crate::resolve;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelfTestReport {
    pub passed: u32,
    pub failed: u32,
}

impl SelfTestReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, name: &str, ok: bool) {
        if ok {
            self.passed += 1;
            logging::ok(name);
        } else {
            self.failed += 1;
            logging::error(name);
        }
    }
}

type Check = fn(&DirectMap) -> bool;

const CHECKS: &[(&str, Check)] = &[
    ("selftest pagemap_present_bits", check_present_bits),
    ("selftest pagemap_swap_bits", check_swap_bits),
    ("selftest pagemap_sign_bit", check_sign_bit),
    ("selftest pagemap_round_trip", check_round_trip),
    ("selftest bridge_frame_zero", check_frame_zero),
    ("selftest bridge_page_stride", check_page_stride),
    ("selftest resolve_present", check_resolve_present),
];

fn check_present_bits(_: &DirectMap) -> bool {
    let e = decode(PM_PRESENT);
    e.is_present() && !e.is_swapped() && e.frame_number() == 0
}

fn check_swap_bits(_: &DirectMap) -> bool {
    let e = decode(PM_SWAP);
    e.is_swapped() && !e.is_present()
}

fn check_sign_bit(_: &DirectMap) -> bool {
    let e = decode(0x8000_0000_0000_0000);
    e.frame_number() == 0 && e.pshift() == Some(0)
}

fn check_round_trip(_: &DirectMap) -> bool {
    const SAMPLES: [u64; 6] = [
        0,
        u64::MAX,
        0x8000_0000_0000_0000,
        0x4000_0000_0000_1234,
        0x9f80_0000_0012_3456,
        0x2a5a_5a5a_5a5a_5a5a,
    ];
    SAMPLES.iter().all(|&v| encode(decode(v)) == v)
}

fn check_frame_zero(map: &DirectMap) -> bool {
    map.pfn_to_virt(0).0 == map.offset()
}

fn check_page_stride(map: &DirectMap) -> bool {
    [0u64, 1, 0x100, 0x1_0000].iter().all(|&pfn| {
        let a = map.pfn_to_virt(pfn).0;
        let b = map.pfn_to_virt(pfn + 1).0;
        b > a && b - a == PAGE_SIZE
    })
}

fn check_resolve_present(map: &DirectMap) -> bool {
    let raw = PM_PRESENT | pm_pshift(12) | 0x20;
    match resolve::resolve_kernel_address(raw, map) {
        Ok(v) => v == map.pfn_to_virt(0x20),
        Err(_) => false,
    }
}

/// `map` に対して全チェックを回す。
pub fn run_with(map: &DirectMap) -> SelfTestReport {
    let mut report = SelfTestReport::default();
    for (name, check) in CHECKS {
        report.record(name, check(map));
    }
    report
}

/// 登録済み bridge に対して回す。未登録なら何もしない。
pub fn run() -> Option<SelfTestReport> {
    let Some(map) = bridge::direct_map() else {
        logging::error("selftest: page bridge is not loaded");
        return None;
    };

    // export 経由の値が登録値と一致するか（呼び出し側が実際に見る値）
    let mut report = run_with(&map);
    report.record(
        "selftest export_page_offset",
        bridge::export::get_page_offset() as u64 == map.offset(),
    );
    report.record(
        "selftest export_pfn_to_virt",
        bridge::export::get_pfn_to_virt(1) as u64 == map.offset().wrapping_add(PAGE_SIZE),
    );

    logging::info_u64("selftest passed", report.passed as u64);
    logging::info_u64("selftest failed", report.failed as u64);
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_pass_for_typical_offsets() {
        for offset in [0u64, 0xffff_8000_0000_0000, 0xffff_8880_0000_0000, 0x0000_1000_0000_0000] {
            let report = run_with(&DirectMap::new(offset));
            assert!(report.all_passed(), "offset {:#x}: {:?}", offset, report);
            assert_eq!(report.passed as usize, CHECKS.len());
        }
    }
}
