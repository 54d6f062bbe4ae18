// src/mem/mod.rs
//
// 役割:
// - アドレス型（addr.rs）と pagemap エントリの codec（pagemap.rs）をまとめる中継点。

pub mod addr;
pub mod pagemap;

mod pagemap_props;
