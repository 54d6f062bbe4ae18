// src/panic.rs
//
// no_std 用 panic ハンドラ。
// - 挙動は「緊急出力（ロック無し） → CPU 停止」に固定する。
// - logging / VGA は使わない（Mutex を握ったまま panic した場合に詰まる）
// - 二重 panic は即停止
// - message の文字列化は行わない。位置は行と列だけ出す。

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

use x86_64::instructions::interrupts;
use x86_64::instructions::port::Port;

use pagemap_bridge::arch;

static PANIC_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

const DEBUGCON: u16 = 0xE9;
const COM1_DATA: u16 = 0x3F8;
const COM1_LSR: u16 = 0x3FD;
const LSR_THR_EMPTY: u8 = 0x20;

fn emergency_write_byte(b: u8) {
    unsafe {
        Port::<u8>::new(DEBUGCON).write(b);

        let mut lsr = Port::<u8>::new(COM1_LSR);
        let mut data = Port::<u8>::new(COM1_DATA);
        for _ in 0..10_000 {
            if (lsr.read() & LSR_THR_EMPTY) != 0 {
                break;
            }
        }
        data.write(b);
    }
}

fn emergency_write_str(s: &str) {
    s.bytes().for_each(emergency_write_byte);
}

fn emergency_write_dec(mut v: u64) {
    let mut buf = [0u8; 20];
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    buf[i..].iter().copied().for_each(emergency_write_byte);
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    interrupts::disable();

    if PANIC_IN_PROGRESS.swap(true, Ordering::AcqRel) {
        emergency_write_str("[PANIC] re-entered => halt\n");
        arch::halt_loop();
    }

    emergency_write_str("[PANIC] pagemap-bridge panic\n");

    match info.location() {
        Some(loc) => {
            emergency_write_str("[PANIC] at ");
            emergency_write_str(loc.file());
            emergency_write_str(":");
            emergency_write_dec(loc.line() as u64);
            emergency_write_str(":");
            emergency_write_dec(loc.column() as u64);
            emergency_write_str("\n");
        }
        None => emergency_write_str("[PANIC] location unknown\n"),
    }

    arch::halt_loop()
}
