// src/mem/addr.rs
//
// 役割:
// - 物理アドレス / 仮想アドレス / 物理フレームの基本型を定義する。
// - pagemap が返すフレーム番号と、direct map 上の仮想アドレスを取り違えないよう
//   「数値に型を付ける」ことが目的。
// やること:
// - u64 の生値を PhysAddr / VirtAddr / PhysFrame に包み、相互変換を提供する。
// やらないこと:
// - direct map offset の適用（それは arch::direct_map 側で行う）。

use core::fmt;

/// 物理アドレス（バイト単位）
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysAddr(pub u64);

/// 仮想アドレス（バイト単位）
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtAddr(pub u64);

/// ページサイズの log2（4KiB 固定）
pub const PAGE_SHIFT: u32 = 12;

/// ページサイズ（4KiB）
pub const PAGE_SIZE: u64 = 1u64 << PAGE_SHIFT;

/// 物理フレーム（4KiB ごとの番号 = pfn）
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysFrame {
    pub number: u64,
}

impl PhysAddr {
    /// 下位ビットを切り捨てて、ページ境界に揃える。
    pub const fn align_down(self) -> PhysAddr {
        PhysAddr(self.0 & !(PAGE_SIZE - 1))
    }

    /// このアドレスが含まれる物理フレームを返す。
    pub const fn frame(self) -> PhysFrame {
        PhysFrame {
            number: self.0 >> PAGE_SHIFT,
        }
    }
}

impl VirtAddr {
    pub const fn align_down(self) -> VirtAddr {
        VirtAddr(self.0 & !(PAGE_SIZE - 1))
    }

    /// 仮想ページ番号（pagemap ファイル内のエントリ index と同じ）
    pub const fn page_index(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// ページ内オフセット
    pub const fn page_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }

    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as usize as *mut T
    }
}

impl PhysFrame {
    /// pfn から直接フレームを作る。
    pub const fn from_index(number: u64) -> Self {
        PhysFrame { number }
    }

    /// フレーム先頭の物理アドレスを返す。
    ///
    /// pfn は pagemap 由来で最大 55bit。左シフトで溢れた上位ビットは捨てる
    /// （C の unsigned シフトと同じ挙動）。
    pub const fn start_address(self) -> PhysAddr {
        PhysAddr(self.number << PAGE_SHIFT)
    }
}

// --- Debug 実装（ログで見やすくするため） ---

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}

impl fmt::Debug for PhysFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // フレーム番号とその先頭物理アドレスを両方出す
        write!(f, "PhysFrame(pfn={:#x}, {:#x})", self.number, self.start_address().0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_and_address_agree() {
        let pa = PhysAddr(0x1234_5678);
        assert_eq!(pa.frame(), PhysFrame::from_index(0x12345));
        assert_eq!(pa.align_down(), PhysAddr(0x1234_5000));
        assert_eq!(pa.frame().start_address(), pa.align_down());
    }

    #[test]
    fn virt_page_split() {
        let va = VirtAddr(0x7fff_dead_beef);
        assert_eq!(va.page_index(), 0x7fff_dead_b);
        assert_eq!(va.page_offset(), 0xeef);
        assert_eq!((va.page_index() << PAGE_SHIFT) | va.page_offset(), va.0);
    }

    #[test]
    fn wide_pfn_does_not_overflow() {
        // 55bit 全部立てた pfn でも panic せずに上位が落ちるだけ
        let frame = PhysFrame::from_index((1u64 << 55) - 1);
        assert_eq!(frame.start_address().0, ((1u64 << 55) - 1) << 12);
    }
}
