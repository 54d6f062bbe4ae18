// src/logging/mod.rs
//
// 出力先は serial(COM1) と VGA テキストの 2 つ。VGA 側はレベルごとに行の色を変える。
// - init() 前は何も出さない（ポート I/O も VGA バッファも触らない）。
//   ライブラリ側のコードが log を呼んでも、ホスト上のテストで落ちないようにするため。
// - 値は 10 進 / 16 進の固定フォーマットで出す（heap なし）。

mod serial;
mod vga;

use vga::Tone;

use core::sync::atomic::{AtomicBool, Ordering};

static LOGGING_READY: AtomicBool = AtomicBool::new(false);
const VGA_ENABLED: bool = cfg!(feature = "vga_log");

pub fn init() {
    if is_vga_enabled() {
        vga::init();
    }
    serial::init();
    LOGGING_READY.store(true, Ordering::Release);
}

pub fn is_ready() -> bool {
    LOGGING_READY.load(Ordering::Acquire)
}

pub fn is_vga_enabled() -> bool {
    VGA_ENABLED
}

fn write_str(s: &str) {
    if is_vga_enabled() {
        vga::write_str(s);
    }
    serial::write_str(s);
}

fn write_line(s: &str) {
    if is_vga_enabled() {
        vga::write_line(s);
    }
    serial::write_line(s);
}

fn prefixed(tone: Tone, prefix: &str, msg: &str) {
    if !is_ready() {
        return;
    }
    if is_vga_enabled() {
        vga::begin_line(tone);
    }
    write_str(prefix);
    write_line(msg);
}

pub fn info(msg: &str) {
    prefixed(Tone::Info, "[INFO] ", msg);
}

pub fn error(msg: &str) {
    prefixed(Tone::Error, "[ERROR] ", msg);
}

/// セルフテスト合格行
pub fn ok(msg: &str) {
    prefixed(Tone::Ok, "[OK] ", msg);
}

pub fn info_u64(label: &str, value: u64) {
    let mut buf = [0u8; 21];
    info_kv(label, u64_to_decimal(value, &mut buf));
}

pub fn info_hex(label: &str, value: u64) {
    let mut buf = [0u8; 18];
    info_kv(label, u64_to_hex(value, &mut buf));
}

fn info_kv(key: &str, value: &str) {
    if !is_ready() {
        return;
    }

    write_str("[INFO] ");
    if !key.is_empty() {
        write_str(key);
        write_str(" = ");
    }
    write_line(value);
}

fn u64_to_decimal(mut value: u64, buf: &mut [u8; 21]) -> &str {
    if value == 0 {
        let last = buf.len() - 1;
        buf[last] = b'0';
        return ascii_str(&buf[last..]);
    }

    let mut i = buf.len();
    while value > 0 {
        let digit = (value % 10) as u8;
        i -= 1;
        buf[i] = b'0' + digit;
        value /= 10;
    }

    ascii_str(&buf[i..])
}

/// 0x 付き、16 桁ゼロ埋め
fn u64_to_hex(value: u64, buf: &mut [u8; 18]) -> &str {
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..16 {
        let n = ((value >> ((15 - i) * 4)) & 0xF) as u8;
        buf[2 + i] = if n < 10 { b'0' + n } else { b'a' + (n - 10) };
    }
    ascii_str(&buf[..])
}

fn ascii_str(bytes: &[u8]) -> &str {
    // 上の 2 関数は ASCII の数字と英字しか書かない
    core::str::from_utf8(bytes).unwrap_or("?")
}
