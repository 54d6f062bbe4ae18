// src/logging/serial.rs
//
// COM1 (0x3F8) への最小限のシリアル出力。QEMU の -serial stdio で読む前提。
// - init(): 115200bps, 8N1, FIFO 有効
// - write_str() / write_line(): ポーリング送信（割り込みは使わない）

use core::sync::atomic::{AtomicBool, Ordering};
use x86_64::instructions::port::Port;

const COM1: u16 = 0x3F8;

// レジスタオフセット（DLAB=0 / 1 で意味が変わるものは両方書く）
const REG_DATA: u16 = 0; // DLAB=1: divisor low
const REG_INT_EN: u16 = 1; // DLAB=1: divisor high
const REG_FIFO_CTRL: u16 = 2;
const REG_LINE_CTRL: u16 = 3;
const REG_MODEM_CTRL: u16 = 4;
const REG_LINE_STATUS: u16 = 5;

const LSR_THR_EMPTY: u8 = 0x20;

static SERIAL_INITIALIZED: AtomicBool = AtomicBool::new(false);

fn port(reg: u16) -> Port<u8> {
    Port::new(COM1 + reg)
}

pub fn init() {
    if SERIAL_INITIALIZED.swap(true, Ordering::AcqRel) {
        return;
    }

    unsafe {
        port(REG_INT_EN).write(0x00);

        // divisor = 1 → 115200bps
        port(REG_LINE_CTRL).write(0x80);
        port(REG_DATA).write(0x01);
        port(REG_INT_EN).write(0x00);

        // 8N1, DLAB=0
        port(REG_LINE_CTRL).write(0x03);
        port(REG_FIFO_CTRL).write(0xC7);
        port(REG_MODEM_CTRL).write(0x0B);
    }
}

fn write_byte(byte: u8) {
    unsafe {
        let mut line_status = port(REG_LINE_STATUS);
        while (line_status.read() & LSR_THR_EMPTY) == 0 {}
        port(REG_DATA).write(byte);
    }
}

pub fn write_str(s: &str) {
    for b in s.bytes() {
        write_byte(b);
    }
}

pub fn write_line(s: &str) {
    write_str(s);
    write_str("\r\n");
}
