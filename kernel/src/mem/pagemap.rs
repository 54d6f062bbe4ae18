// src/mem/pagemap.rs
//
// 役割:
// - /proc/<pid>/pagemap の 64bit エントリを、構造化された PagemapEntry に
//   デコード / エンコードする。
//
// やること:
// - status(3bit) / pshift(6bit) / pfn(55bit) の切り出しと再構成
// - pagemap ファイル内のエントリ位置計算、バイト列からの一括デコード
//
// やらないこと:
// - ファイル I/O（呼び出し側が 8 バイト読んで渡す）
// - swap エントリの type/offset 分解（frame_number をそのまま不透明値として返す）
//
// 設計方針:
// - マスク・シフトはすべて u64 で行う。STATUS マスクは bit63 を含むので、
//   符号付きリテラルで組むと符号拡張で壊れる。
// - present / swapped は独立フラグではなく status の列挙値。
//   PagemapStatus enum で持ち、両方 true の状態を型で作れないようにする。

use core::fmt;

use static_assertions::const_assert_eq;

use super::addr::{PhysAddr, VirtAddr, PAGE_SHIFT};

/// 1 エントリのバイト数
pub const PM_ENTRY_BYTES: usize = core::mem::size_of::<u64>();

pub const PM_STATUS_BITS: u32 = 3;
pub const PM_STATUS_OFFSET: u32 = 64 - PM_STATUS_BITS;
pub const PM_STATUS_MASK: u64 = ((1u64 << PM_STATUS_BITS) - 1) << PM_STATUS_OFFSET;

pub const PM_PSHIFT_BITS: u32 = 6;
pub const PM_PSHIFT_OFFSET: u32 = PM_STATUS_OFFSET - PM_PSHIFT_BITS;
pub const PM_PSHIFT_MASK: u64 = ((1u64 << PM_PSHIFT_BITS) - 1) << PM_PSHIFT_OFFSET;

pub const PM_PFRAME_MASK: u64 = (1u64 << PM_PSHIFT_OFFSET) - 1;

/// status 値 → エントリ上のビット列
pub const fn pm_status(nr: u64) -> u64 {
    (nr << PM_STATUS_OFFSET) & PM_STATUS_MASK
}

/// pshift 値 → エントリ上のビット列
pub const fn pm_pshift(x: u64) -> u64 {
    (x << PM_PSHIFT_OFFSET) & PM_PSHIFT_MASK
}

/// エントリから pfn 部分だけを取り出す
pub const fn pm_pframe(x: u64) -> u64 {
    x & PM_PFRAME_MASK
}

pub const PM_STATUS_PRESENT: u8 = 4;
pub const PM_STATUS_SWAP: u8 = 2;

pub const PM_PRESENT: u64 = pm_status(PM_STATUS_PRESENT as u64);
pub const PM_SWAP: u64 = pm_status(PM_STATUS_SWAP as u64);

// レイアウトは外部契約なので、値そのものを固定しておく
const_assert_eq!(PM_STATUS_OFFSET, 61);
const_assert_eq!(PM_PSHIFT_OFFSET, 55);
const_assert_eq!(PM_STATUS_MASK, 0xE000_0000_0000_0000);
const_assert_eq!(PM_PSHIFT_MASK, 0x1F80_0000_0000_0000);
const_assert_eq!(PM_PFRAME_MASK, 0x007F_FFFF_FFFF_FFFF);
const_assert_eq!(PM_PRESENT, 0x8000_0000_0000_0000);
const_assert_eq!(PM_SWAP, 0x4000_0000_0000_0000);
const_assert_eq!(PM_STATUS_MASK | PM_PSHIFT_MASK | PM_PFRAME_MASK, u64::MAX);
const_assert_eq!(PM_STATUS_MASK & PM_PSHIFT_MASK, 0);
const_assert_eq!(PM_PSHIFT_MASK & PM_PFRAME_MASK, 0);

bitflags::bitflags! {
    /// エントリ上の各フィールドの位置。
    ///
    /// - STATUS / PSHIFT / PFRAME: フィールド全体のマスク
    /// - PRESENT / SWAP: STATUS フィールド内の代表値
    ///   （独立フラグではないので contains() で判定しないこと）
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PagemapBits: u64 {
        const STATUS = PM_STATUS_MASK;
        const PSHIFT = PM_PSHIFT_MASK;
        const PFRAME = PM_PFRAME_MASK;
        const PRESENT = PM_PRESENT;
        const SWAP = PM_SWAP;
    }
}

impl PagemapBits {
    /// 指定フィールドを取り出して LSB 側に寄せる。
    #[inline(always)]
    fn field(self, field: PagemapBits) -> u64 {
        let mask = field.bits();
        (self.bits() & mask) >> mask.trailing_zeros()
    }
}

/// status フィールド（3bit 列挙値）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagemapStatus {
    /// 4: 物理メモリ上に存在する
    Present,
    /// 2: swap 上にある
    Swapped,
    /// それ以外（未使用 / 予約）。元の 3bit 値を保持する。
    Reserved(ReservedStatus),
}

/// present(4) / swap(2) 以外の status 値。
///
/// from_bits() 経由でしか作れないので、中身が 2 や 4 になることはない
/// （Reserved(4) と Present が別の値として比較される状態を作らせない）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservedStatus(u8);

impl ReservedStatus {
    /// 元の 3bit 値
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl PagemapStatus {
    /// 3bit 値から作る。上位ビットは捨てる。
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            PM_STATUS_PRESENT => PagemapStatus::Present,
            PM_STATUS_SWAP => PagemapStatus::Swapped,
            other => PagemapStatus::Reserved(ReservedStatus(other)),
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            PagemapStatus::Present => PM_STATUS_PRESENT,
            PagemapStatus::Swapped => PM_STATUS_SWAP,
            PagemapStatus::Reserved(v) => v.0,
        }
    }
}

/// 1 仮想ページ分の pagemap エントリ（デコード済み、不変）
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PagemapEntry {
    raw: u64,
    status: PagemapStatus,
    pshift: u8,
    frame_number: u64,
}

impl PagemapEntry {
    /// フィールドから組み立てる。各値は幅に合わせて切り詰める。
    pub const fn new(status: PagemapStatus, pshift: u8, frame_number: u64) -> Self {
        let pshift = (pshift as u64 & ((1u64 << PM_PSHIFT_BITS) - 1)) as u8;
        let frame_number = pm_pframe(frame_number);
        let raw = pm_status(status.bits() as u64) | pm_pshift(pshift as u64) | frame_number;
        PagemapEntry {
            raw,
            status,
            pshift,
            frame_number,
        }
    }

    /// 読み出した生の 64bit 値
    pub const fn raw(&self) -> u64 {
        self.raw
    }

    pub const fn status(&self) -> PagemapStatus {
        self.status
    }

    pub const fn is_present(&self) -> bool {
        matches!(self.status, PagemapStatus::Present)
    }

    pub const fn is_swapped(&self) -> bool {
        matches!(self.status, PagemapStatus::Swapped)
    }

    /// ページサイズの order。swap エントリでは意味を持たないので None。
    pub const fn pshift(&self) -> Option<u8> {
        if self.is_swapped() {
            None
        } else {
            Some(self.pshift)
        }
    }

    /// 55bit の frame フィールド。
    ///
    /// present なら pfn、swapped なら swap type/offset の合成値（未分解）。
    pub const fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// `virt` のバイトに対応する物理アドレス。present でなければ None。
    pub const fn phys_addr(&self, virt: VirtAddr) -> Option<PhysAddr> {
        if !self.is_present() {
            return None;
        }
        Some(PhysAddr((self.frame_number << PAGE_SHIFT) | virt.page_offset()))
    }
}

impl fmt::Debug for PagemapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagemapEntry")
            .field("raw", &format_args!("{:#018x}", self.raw))
            .field("status", &self.status)
            .field("pshift", &self.pshift())
            .field("frame_number", &format_args!("{:#x}", self.frame_number))
            .finish()
    }
}

/// 生の 64bit 値をデコードする。全入力で成功する。
pub fn decode(raw: u64) -> PagemapEntry {
    let bits = PagemapBits::from_bits_retain(raw);
    let status = PagemapStatus::from_bits(bits.field(PagemapBits::STATUS) as u8);
    let entry = PagemapEntry {
        raw,
        status,
        // swap 時は pshift() 側で隠す。ビット自体は encode のために保持する。
        pshift: bits.field(PagemapBits::PSHIFT) as u8,
        frame_number: bits.field(PagemapBits::PFRAME),
    };
    crate::trace::trace_decode(&entry);
    entry
}

/// decode の逆変換。フィールドから 64bit 値を組み直す。
pub fn encode(entry: PagemapEntry) -> u64 {
    pm_status(entry.status.bits() as u64)
        | pm_pshift(entry.pshift as u64)
        | pm_pframe(entry.frame_number)
}

/// `virt` を記述するエントリの、pagemap ファイル内バイトオフセット
pub const fn entry_offset(virt: VirtAddr) -> u64 {
    virt.page_index() * PM_ENTRY_BYTES as u64
}

/// `[virt, virt + len)` をカバーするエントリの (先頭オフセット, 個数)。
///
/// len == 0 なら 0 個。範囲の末尾がアドレス空間を超える場合は末尾で打ち切る。
pub const fn entry_span(virt: VirtAddr, len: u64) -> (u64, usize) {
    let offset = entry_offset(virt);
    if len == 0 {
        return (offset, 0);
    }
    let last = VirtAddr(virt.0.saturating_add(len - 1));
    let count = last.page_index() - virt.page_index() + 1;
    (offset, count as usize)
}

/// バイト列デコード時のエラー
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagemapError {
    /// 末尾に 8 バイト未満の断片が残った
    TruncatedEntry { len: usize },
}

impl fmt::Display for PagemapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagemapError::TruncatedEntry { len } => {
                write!(f, "truncated pagemap entry: {} of {} bytes", len, PM_ENTRY_BYTES)
            }
        }
    }
}

/// pagemap から読んだバイト列を、エントリ単位でデコードするイテレータ。
///
/// エントリは native endian（カーネルがそのまま書き出した u64）。
pub struct Entries<'a> {
    bytes: &'a [u8],
    done: bool,
}

/// `bytes` を先頭から 8 バイトずつデコードする。
pub fn entries(bytes: &[u8]) -> Entries<'_> {
    Entries { bytes, done: false }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<PagemapEntry, PagemapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.bytes.is_empty() {
            return None;
        }

        if self.bytes.len() < PM_ENTRY_BYTES {
            self.done = true;
            return Some(Err(PagemapError::TruncatedEntry {
                len: self.bytes.len(),
            }));
        }

        let (head, rest) = self.bytes.split_at(PM_ENTRY_BYTES);
        self.bytes = rest;

        let mut buf = [0u8; PM_ENTRY_BYTES];
        buf.copy_from_slice(head);
        Some(Ok(decode(u64::from_ne_bytes(buf))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let n = self.bytes.len().div_ceil(PM_ENTRY_BYTES);
        (n, Some(n))
    }
}
