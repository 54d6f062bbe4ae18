// src/arch/direct_map.rs
//
// 役割:
// - 物理メモリ全域を線形に写す direct map（physmap）の計算を 1 か所に集約する。
//
// やること:
// - pfn / 物理アドレス → direct map 上の仮想アドレス（Linux の pfn_to_kaddr / __va 相当）
// - 解決済みフレーム列のページ内容を、連続バッファへ集める
//
// やらないこと:
// - offset の登録・ライフサイクル（bridge 側の責務）
// - pfn が RAM かどうか、direct map に載っているかの検査。
//   範囲外の pfn を渡した結果は未定義で、呼び出し側の契約とする。
//
// 設計方針:
// - ここは「アドレス計算だけ」に限定し、副作用を持たせない
// - 加算は wrapping（C の unsigned 演算と同じ）。検査しないことを明示する。

use crate::mem::addr::{PhysAddr, PhysFrame, VirtAddr, PAGE_SHIFT, PAGE_SIZE};

/// direct map の配置。offset は「物理アドレス 0 が見える仮想アドレス」。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectMap {
    offset: u64,
}

impl DirectMap {
    pub const fn new(offset: u64) -> Self {
        DirectMap { offset }
    }

    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// 物理アドレス → direct map 上の仮想アドレス
    #[inline(always)]
    pub const fn phys_to_virt(&self, phys: PhysAddr) -> VirtAddr {
        VirtAddr(phys.0.wrapping_add(self.offset))
    }

    /// フレーム先頭バイトの仮想アドレス
    #[inline(always)]
    pub const fn frame_to_virt(&self, frame: PhysFrame) -> VirtAddr {
        self.phys_to_virt(frame.start_address())
    }

    /// pfn を直接受け取る版
    #[inline(always)]
    pub const fn pfn_to_virt(&self, pfn: u64) -> VirtAddr {
        VirtAddr(self.offset.wrapping_add(pfn << PAGE_SHIFT))
    }

    /// `frames` の各ページを順に `out` へコピーし、書いたバイト数を返す。
    ///
    /// `out` に 1 ページ丸ごと入らなくなった時点で止める（部分ページは書かない）。
    ///
    /// # Safety
    /// - 各 pfn は RAM 上の実在フレームで、この DirectMap の offset で
    ///   読み出し可能にマップされていること。
    /// - コピー中に他者がそのフレームを書き換えないこと。
    /// - `out` と各フレームの direct map 領域が重ならないこと。
    pub unsafe fn gather_frames(&self, frames: &[u64], out: &mut [u8]) -> usize {
        let page = PAGE_SIZE as usize;
        let mut written = 0usize;

        for &pfn in frames {
            if out.len() - written < page {
                break;
            }
            let src: *const u8 = self.pfn_to_virt(pfn).as_mut_ptr::<u8>();
            core::ptr::copy_nonoverlapping(src, out[written..written + page].as_mut_ptr(), page);
            written += page;
        }

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LINUX_X86_64_PAGE_OFFSET: u64 = 0xffff_8880_0000_0000;

    #[test]
    fn frame_zero_is_offset() {
        let map = DirectMap::new(LINUX_X86_64_PAGE_OFFSET);
        assert_eq!(map.pfn_to_virt(0), VirtAddr(LINUX_X86_64_PAGE_OFFSET));
        assert_eq!(map.frame_to_virt(PhysFrame::from_index(0)).0, map.offset());
    }

    #[test]
    fn phys_and_pfn_paths_agree() {
        let map = DirectMap::new(LINUX_X86_64_PAGE_OFFSET);
        let frame = PhysFrame::from_index(0x1_2345);
        assert_eq!(map.frame_to_virt(frame), map.pfn_to_virt(0x1_2345));
        assert_eq!(
            map.phys_to_virt(PhysAddr(0x1_2345_678)),
            VirtAddr(LINUX_X86_64_PAGE_OFFSET + 0x1_2345_678)
        );
    }

    #[test]
    fn identity_map_when_offset_is_zero() {
        let map = DirectMap::new(0);
        assert_eq!(map.pfn_to_virt(0x200), VirtAddr(0x20_0000));
    }

    // ホスト上のバッファを「物理メモリ」に見立てる:
    // offset = バッファ先頭 なら pfn n はバッファの n ページ目になる
    #[repr(C, align(4096))]
    struct FakeRam([u8; 4 * 4096]);

    #[test]
    fn gather_copies_pages_in_list_order() {
        let mut ram = FakeRam([0u8; 4 * 4096]);
        for (i, chunk) in ram.0.chunks_mut(4096).enumerate() {
            chunk.fill(0x10 + i as u8);
        }
        let map = DirectMap::new(ram.0.as_ptr() as u64);

        let mut out = [0u8; 3 * 4096];
        let n = unsafe { map.gather_frames(&[2, 0, 3], &mut out) };
        assert_eq!(n, 3 * 4096);
        assert!(out[..4096].iter().all(|&b| b == 0x12));
        assert!(out[4096..8192].iter().all(|&b| b == 0x10));
        assert!(out[8192..].iter().all(|&b| b == 0x13));
    }

    #[test]
    fn gather_stops_before_partial_page() {
        let ram = FakeRam([0xaa; 4 * 4096]);
        let map = DirectMap::new(ram.0.as_ptr() as u64);

        let mut out = [0u8; 4096 + 100];
        let n = unsafe { map.gather_frames(&[0, 1, 2], &mut out) };
        assert_eq!(n, 4096);
        assert!(out[4096..].iter().all(|&b| b == 0));

        let mut empty: [u8; 0] = [];
        assert_eq!(unsafe { map.gather_frames(&[0], &mut empty) }, 0);
    }

    proptest! {
        #[test]
        fn consecutive_frames_are_one_page_apart(
            offset in 0u64..=0xfffe_0000_0000_0000,
            pfn in 0u64..(1u64 << 36),
        ) {
            let map = DirectMap::new(offset & !(PAGE_SIZE - 1));
            let a = map.pfn_to_virt(pfn).0;
            let b = map.pfn_to_virt(pfn + 1).0;
            prop_assert!(b > a);
            prop_assert_eq!(b - a, PAGE_SIZE);
        }
    }
}
