// src/main.rs
//
// pagemap-bridge: ブートエントリ
//
// 役割:
// - bootloader から direct map の offset を受け取り、page bridge を登録する
// - feature = "self_test" のときは登録直後にセルフテストを回す
//
// やらないこと:
// - 変換ロジックそのもの（lib 側: bridge / mem::pagemap / resolve）

#![no_std]
#![no_main]

mod panic;

use bootloader::{entry_point, BootInfo};

use pagemap_bridge::{arch, bridge, logging};

entry_point!(kernel_main);

fn kernel_main(boot_info: &'static BootInfo) -> ! {
    logging::init();
    logging::info("pagemap-bridge: boot");
    logging::info_u64("memory_map regions", boot_info.memory_map.iter().count() as u64);

    // 登録は停止まで保持する（drop すると unload 扱いになる）
    let _registration = match bridge::load(boot_info.physical_memory_offset) {
        Ok(reg) => reg,
        Err(bridge::BridgeError::AlreadyLoaded) => {
            logging::error("page bridge: load failed (already loaded)");
            arch::halt_loop();
        }
    };

    run_self_test();

    logging::info("pagemap-bridge: ready, halting");
    arch::halt_loop()
}

#[cfg(feature = "self_test")]
fn run_self_test() {
    match pagemap_bridge::selftest::run() {
        Some(report) if report.all_passed() => logging::info("selftest: all passed"),
        Some(_) => logging::error("selftest: failures detected"),
        None => {}
    }
}

#[cfg(not(feature = "self_test"))]
fn run_self_test() {}
