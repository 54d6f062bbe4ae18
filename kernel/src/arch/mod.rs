// src/arch/mod.rs
//
// アーキ依存部。unsafe をできるだけここに閉じ込める方針。
// - cpu: hlt ループなど CPU 固有処理
// - direct_map: 物理メモリ全体を線形に写した領域（bootloader の map_physical_memory）

pub mod cpu;
pub mod direct_map;

/// CPU を停止させるループ
pub fn halt_loop() -> ! {
    cpu::halt_loop()
}
