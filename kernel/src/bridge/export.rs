// src/bridge/export.rs
//
// 外部モジュールから名前で解決される C ABI シンボル。
// - get_page_offset():         direct map の先頭（PAGE_OFFSET）
// - get_pfn_to_virt(pfn):      pfn_to_kaddr(pfn) 相当
//
// シグネチャは BRIDGE_ABI_VERSION と一緒に固定。名前・引数型・戻り値型の
// どれを変えても、独立にビルドされた呼び出し側が壊れる。
// 中身は bridge 本体に委譲するだけで、ここにロジックは置かない。

use core::ffi::{c_ulong, c_ulonglong, c_void};

/// `unsigned long get_page_offset(void)`
#[no_mangle]
pub extern "C" fn get_page_offset() -> c_ulong {
    super::get_direct_map_offset() as c_ulong
}

/// `void *get_pfn_to_virt(unsigned long long pfn)`
///
/// pfn は RAM 上の direct map 済みフレームであること（検査しない）。
#[no_mangle]
pub extern "C" fn get_pfn_to_virt(pfn: c_ulonglong) -> *mut c_void {
    super::frame_to_kernel_address(pfn as u64)
}
