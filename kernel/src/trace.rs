// src/trace.rs
//
// 低コスト trace（観測性）を 1 箇所に集約する。
// - pagemap エントリのデコード結果
// - bridge での pfn → 仮想アドレス変換
//
// 設計方針:
// - logging 側に新 API を要求しない（info / info_hex のみで完結）
// - heap 確保なし（固定文字列 + u64）
// - feature off の時は関数だけ残して中身を消す（呼び出し側に cfg を書かせない）
//
// feature:
// - bridge_trace: decode / translate ごとに 1 行ずつ出す

use crate::mem::pagemap::PagemapEntry;

/// decode 1 回分
#[inline(always)]
pub fn trace_decode(entry: &PagemapEntry) {
    #[cfg(feature = "bridge_trace")]
    {
        use crate::mem::pagemap::PagemapStatus;

        match entry.status() {
            PagemapStatus::Present => crate::logging::info("pagemap_trace status=present"),
            PagemapStatus::Swapped => crate::logging::info("pagemap_trace status=swapped"),
            PagemapStatus::Reserved(_) => crate::logging::info("pagemap_trace status=reserved"),
        }
        crate::logging::info_hex("raw", entry.raw());
        crate::logging::info_hex("frame", entry.frame_number());
    }
    #[cfg(not(feature = "bridge_trace"))]
    {
        let _ = entry;
    }
}

/// bridge の変換 1 回分
#[inline(always)]
pub fn trace_translate(pfn: u64, virt: u64) {
    #[cfg(feature = "bridge_trace")]
    {
        crate::logging::info("bridge_trace pfn_to_virt");
        crate::logging::info_hex("pfn", pfn);
        crate::logging::info_hex("virt", virt);
    }
    #[cfg(not(feature = "bridge_trace"))]
    {
        let _ = pfn;
        let _ = virt;
    }
}
