// src/resolve.rs
//
// 役割:
// - 「pagemap の生エントリ → pfn → direct map 上のカーネル仮想アドレス」を 1 本の流れにする。
//
// やること:
// - present でないページ（swap / 予約 status）を Err で弾く
// - pagemap から読んだバイト列を、ページごとの PhysFrame 列に変換する
//
// やらないこと:
// - pfn が direct map に載っているかの検査（bridge と同じく呼び出し側の契約）

use core::fmt;

use crate::arch::direct_map::DirectMap;
use crate::mem::addr::{PhysFrame, VirtAddr};
use crate::mem::pagemap::{self, Entries, PagemapEntry, PagemapError, PagemapStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// ページが物理メモリ上にない（未割り当て / 予約 status）
    NotPresent { status: u8 },
    /// swap 上にある。descriptor は swap type/offset の合成値（未分解）
    Swapped { descriptor: u64 },
    /// pagemap バイト列の末尾が欠けていた
    Malformed(PagemapError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotPresent { status } => {
                write!(f, "page not present (status {})", status)
            }
            ResolveError::Swapped { descriptor } => {
                write!(f, "page is swapped out (descriptor {:#x})", descriptor)
            }
            ResolveError::Malformed(e) => write!(f, "malformed pagemap data: {}", e),
        }
    }
}

impl From<PagemapError> for ResolveError {
    fn from(e: PagemapError) -> Self {
        ResolveError::Malformed(e)
    }
}

/// present なエントリから物理フレームを取り出す。
pub fn resolve_frame(entry: &PagemapEntry) -> Result<PhysFrame, ResolveError> {
    match entry.status() {
        PagemapStatus::Present => Ok(PhysFrame::from_index(entry.frame_number())),
        PagemapStatus::Swapped => Err(ResolveError::Swapped {
            descriptor: entry.frame_number(),
        }),
        PagemapStatus::Reserved(status) => Err(ResolveError::NotPresent {
            status: status.get(),
        }),
    }
}

/// 生エントリ 1 つを、そのページ先頭のカーネル仮想アドレスまで解決する。
pub fn resolve_kernel_address(raw: u64, map: &DirectMap) -> Result<VirtAddr, ResolveError> {
    let frame = resolve_frame(&pagemap::decode(raw))?;
    Ok(map.frame_to_virt(frame))
}

/// `virt` のバイトそのものに対応するカーネル仮想アドレス（ページ内オフセット込み）。
pub fn resolve_byte_address(
    raw: u64,
    virt: VirtAddr,
    map: &DirectMap,
) -> Result<VirtAddr, ResolveError> {
    let page = resolve_kernel_address(raw, map)?;
    Ok(VirtAddr(page.0.wrapping_add(virt.page_offset())))
}

/// pagemap バイト列 → ページごとの物理フレーム
pub struct Frames<'a> {
    inner: Entries<'a>,
}

/// 連続した仮想ページ範囲の pagemap を読んだバッファから、pfn を順に取り出す。
///
/// 途中に present でないページがあればその位置で Err を返す（以降も続けて読める）。
pub fn resolve_frames(bytes: &[u8]) -> Frames<'_> {
    Frames {
        inner: pagemap::entries(bytes),
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<PhysFrame, ResolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(e) => e,
            Err(e) => return Some(Err(e.into())),
        };
        Some(resolve_frame(&entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::addr::PAGE_SIZE;
    use crate::mem::pagemap::{pm_pshift, pm_status, PM_ENTRY_BYTES, PM_PRESENT, PM_SWAP};

    const OFFSET: u64 = 0xffff_8880_0000_0000;

    #[test]
    fn present_entry_resolves_through_direct_map() {
        let map = DirectMap::new(OFFSET);
        let raw = PM_PRESENT | pm_pshift(12) | 0x1_2345;
        assert_eq!(
            resolve_kernel_address(raw, &map),
            Ok(VirtAddr(OFFSET + 0x1_2345 * PAGE_SIZE))
        );
        assert_eq!(
            resolve_byte_address(raw, VirtAddr(0x5555_0000_0123), &map),
            Ok(VirtAddr(OFFSET + 0x1_2345 * PAGE_SIZE + 0x123))
        );
    }

    #[test]
    fn swapped_entry_is_rejected_with_descriptor() {
        let map = DirectMap::new(OFFSET);
        assert_eq!(
            resolve_kernel_address(PM_SWAP | 0xabcd, &map),
            Err(ResolveError::Swapped { descriptor: 0xabcd })
        );
    }

    #[test]
    fn absent_entry_is_rejected() {
        let map = DirectMap::new(OFFSET);
        assert_eq!(
            resolve_kernel_address(0, &map),
            Err(ResolveError::NotPresent { status: 0 })
        );
        assert_eq!(
            resolve_kernel_address(pm_status(6) | 1, &map),
            Err(ResolveError::NotPresent { status: 6 })
        );
    }

    #[test]
    fn frames_from_pagemap_buffer() {
        let raws = [PM_PRESENT | 10, PM_PRESENT | 11, PM_SWAP | 3, PM_PRESENT | 13];
        let mut buf = [0u8; 4 * PM_ENTRY_BYTES + 3];
        for (i, r) in raws.iter().enumerate() {
            buf[i * PM_ENTRY_BYTES..(i + 1) * PM_ENTRY_BYTES].copy_from_slice(&r.to_ne_bytes());
        }

        let got: Vec<_> = resolve_frames(&buf).collect();
        assert_eq!(
            got,
            vec![
                Ok(PhysFrame::from_index(10)),
                Ok(PhysFrame::from_index(11)),
                Err(ResolveError::Swapped { descriptor: 3 }),
                Ok(PhysFrame::from_index(13)),
                Err(ResolveError::Malformed(PagemapError::TruncatedEntry { len: 3 })),
            ]
        );
    }

    #[test]
    fn collect_stops_at_first_error() {
        let raws = [PM_PRESENT | 1, 0, PM_PRESENT | 2];
        let mut buf = [0u8; 3 * PM_ENTRY_BYTES];
        for (i, r) in raws.iter().enumerate() {
            buf[i * PM_ENTRY_BYTES..(i + 1) * PM_ENTRY_BYTES].copy_from_slice(&r.to_ne_bytes());
        }
        let all: Result<Vec<PhysFrame>, ResolveError> = resolve_frames(&buf).collect();
        assert_eq!(all, Err(ResolveError::NotPresent { status: 0 }));
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            ResolveError::Swapped { descriptor: 0x10 }.to_string(),
            "page is swapped out (descriptor 0x10)"
        );
        assert_eq!(
            ResolveError::Malformed(PagemapError::TruncatedEntry { len: 5 }).to_string(),
            "malformed pagemap data: truncated pagemap entry: 5 of 8 bytes"
        );
    }
}
