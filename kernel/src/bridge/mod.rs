// src/bridge/mod.rs
//
// 役割:
// - 別モジュール（より厳しい型付けの呼び出し側）に向けて、
//   「direct map offset の取得」と「pfn → カーネル仮想アドレス変換」の
//   2 つの入口だけを公開する。
//
// やること:
// - ロード時に offset を 1 回だけ登録し、アンロード時に解除する。
// - 登録済み offset を使った変換（ロックなし・再入可能）。
//
// やらないこと:
// - pfn の妥当性検査。RAM 外 / direct map 外の pfn を渡すのは呼び出し側の契約違反で、
//   ここでは検出しない（結果は未定義）。
// - 変換結果のキャッシュ。毎回計算する。
//
// 状態機械:
//   Unregistered --load()--> Registered --drop(BridgeRegistration)--> Unregistered
//
// 未登録のまま呼ばれた場合は offset = 0（identity map）として計算する。
// 本来はシンボル未解決でリンク時に弾かれる経路なので、実行時エラーにはしない。

pub mod export;

use core::ffi::c_void;
use core::fmt;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::arch::direct_map::DirectMap;
use crate::logging;
use crate::trace;

/// export シンボルのシグネチャ版数。変えたら外部モジュール側も作り直しが必要。
pub const BRIDGE_ABI_VERSION: u32 = 1;

const STATE_UNREGISTERED: u8 = 0;
const STATE_LOADING: u8 = 1;
const STATE_REGISTERED: u8 = 2;

static BRIDGE_STATE: AtomicU8 = AtomicU8::new(STATE_UNREGISTERED);

// 0 なら identity map 扱い
static DIRECT_MAP_OFFSET: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    Unregistered,
    Registered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeError {
    /// すでに別の BridgeRegistration が生きている
    AlreadyLoaded,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::AlreadyLoaded => write!(f, "page bridge is already loaded"),
        }
    }
}

/// ロード済みであることを表すガード。drop でアンロードされる。
#[must_use = "dropping the registration unloads the bridge immediately"]
pub struct BridgeRegistration {
    map: DirectMap,
}

impl BridgeRegistration {
    pub fn direct_map(&self) -> DirectMap {
        self.map
    }
}

impl Drop for BridgeRegistration {
    fn drop(&mut self) {
        DIRECT_MAP_OFFSET.store(0, Ordering::Release);
        BRIDGE_STATE.store(STATE_UNREGISTERED, Ordering::Release);
        logging::info("page bridge: unloaded");
    }
}

/// bridge を登録する（カーネル起動時に 1 回だけ呼ぶ）。
///
/// `offset` は物理アドレス 0 が見える仮想アドレス。
/// bootloader の `physical_memory_offset` をそのまま渡す想定。
pub fn load(offset: u64) -> Result<BridgeRegistration, BridgeError> {
    BRIDGE_STATE
        .compare_exchange(
            STATE_UNREGISTERED,
            STATE_LOADING,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .map_err(|_| BridgeError::AlreadyLoaded)?;

    DIRECT_MAP_OFFSET.store(offset, Ordering::Release);
    BRIDGE_STATE.store(STATE_REGISTERED, Ordering::Release);

    logging::info("page bridge: loaded");
    logging::info_hex("page_offset", offset);
    logging::info_u64("abi_version", BRIDGE_ABI_VERSION as u64);

    Ok(BridgeRegistration {
        map: DirectMap::new(offset),
    })
}

pub fn state() -> BridgeState {
    match BRIDGE_STATE.load(Ordering::Acquire) {
        STATE_REGISTERED => BridgeState::Registered,
        _ => BridgeState::Unregistered,
    }
}

/// 登録済みの direct map。未登録なら None。
pub fn direct_map() -> Option<DirectMap> {
    if BRIDGE_STATE.load(Ordering::Acquire) != STATE_REGISTERED {
        return None;
    }
    Some(DirectMap::new(DIRECT_MAP_OFFSET.load(Ordering::Relaxed)))
}

#[inline(always)]
fn current_map() -> DirectMap {
    DirectMap::new(DIRECT_MAP_OFFSET.load(Ordering::Acquire))
}

/// direct map offset（Linux の PAGE_OFFSET 相当）
pub fn get_direct_map_offset() -> usize {
    current_map().offset() as usize
}

/// pfn → そのフレーム先頭バイトのカーネル仮想アドレス
///
/// 呼び出し側の契約:
/// - `frame_number` は RAM 上に実在し、direct map に載っているフレームであること。
/// - ここでは範囲検査をしない。違反時に返るポインタは参照してはならない。
pub fn frame_to_kernel_address(frame_number: u64) -> *mut c_void {
    let virt = current_map().pfn_to_virt(frame_number);
    trace::trace_translate(frame_number, virt.0);
    virt.as_mut_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::addr::PAGE_SIZE;

    // グローバル状態を触るテストはこの 1 本にまとめる（並列実行で競合させない）
    #[test]
    fn lifecycle_and_exports() {
        assert_eq!(state(), BridgeState::Unregistered);
        assert_eq!(direct_map(), None);
        assert_eq!(get_direct_map_offset(), 0);

        let offset = 0xffff_8880_0000_0000u64;
        let reg = load(offset).unwrap();
        assert_eq!(state(), BridgeState::Registered);
        assert_eq!(reg.direct_map(), DirectMap::new(offset));
        assert_eq!(direct_map(), Some(DirectMap::new(offset)));

        // 二重ロードは拒否し、既存の登録はそのまま
        assert_eq!(load(0x1000).err(), Some(BridgeError::AlreadyLoaded));
        assert_eq!(get_direct_map_offset() as u64, offset);

        // frame 0 は direct map の先頭
        assert_eq!(frame_to_kernel_address(0) as u64, offset);
        for pfn in [0u64, 1, 0x1234, 0xf_ffff] {
            let a = frame_to_kernel_address(pfn) as u64;
            let b = frame_to_kernel_address(pfn + 1) as u64;
            assert_eq!(b - a, PAGE_SIZE);
        }

        // C 側に見えるシンボルも同じ値を返す
        assert_eq!(export::get_page_offset() as u64, offset);
        assert_eq!(export::get_pfn_to_virt(0x42) as u64, offset + 0x42 * PAGE_SIZE);

        // 登録中はロックなしで並行に引ける（各スレッドが別の pfn を変換）
        std::thread::scope(|scope| {
            for t in 0..4u64 {
                scope.spawn(move || {
                    for i in 0..1_000u64 {
                        let pfn = t * 0x10_0000 + i;
                        assert_eq!(frame_to_kernel_address(pfn) as u64, offset + pfn * PAGE_SIZE);
                        assert_eq!(get_direct_map_offset() as u64, offset);
                    }
                });
            }
        });

        drop(reg);
        assert_eq!(state(), BridgeState::Unregistered);
        assert_eq!(direct_map(), None);
        assert_eq!(get_direct_map_offset(), 0);

        // アンロード後は再ロードできる
        let again = load(0x8000_0000).unwrap();
        assert_eq!(export::get_page_offset(), 0x8000_0000);
        drop(again);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            BridgeError::AlreadyLoaded.to_string(),
            "page bridge is already loaded"
        );
    }
}
