// src/arch/cpu.rs
// CPU 命令ラッパ。unsafe は最小限。

use x86_64::instructions::{hlt, interrupts};

/// 割り込みを止めてから hlt し続ける（起動処理の終端 / panic 後）
pub fn halt_loop() -> ! {
    interrupts::disable();
    loop {
        hlt();
    }
}
