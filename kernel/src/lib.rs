// src/lib.rs
//
// pagemap-bridge
//
// 役割:
// - /proc/<pid>/pagemap エントリのビット配置（codec）
// - pfn → direct map 上のカーネル仮想アドレス（bridge）と、その C ABI export
// - 上の 2 つをつなぐ resolve と、起動時セルフテスト
//
// no_std が基本。単体テスト時だけ std を使う（ホストで cargo test を回すため）。

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod bridge;
pub mod logging;
pub mod mem;
pub mod resolve;
pub mod trace;

#[cfg(feature = "self_test")]
pub mod selftest;
