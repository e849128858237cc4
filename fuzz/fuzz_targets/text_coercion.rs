#![no_main]

use std::fs;
use std::path::Path;

use kindcast::{assign, parse_duration, parse_time, Config, Handle, Type};
use libfuzzer_sys::fuzz_target;

fn destinations() -> [Type; 8] {
    [
        Type::BOOL,
        Type::I8,
        Type::U64,
        Type::F32,
        Type::C64,
        Type::Duration,
        Type::Time,
        Type::slice(Type::U8),
    ]
}

fuzz_target!(|data: &[u8]| {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let Ok(input) = std::str::from_utf8(data) else {
            return;
        };
        let cfg = Config::new();
        let _ = parse_time(input, &cfg);
        let _ = parse_duration(input);
        let src = Handle::of(input);
        for ty in destinations() {
            let _ = assign(&Handle::slot(ty.zero()), &src, &cfg);
        }
    }));

    if result.is_err() {
        record_panic("text_coercion", data);
    }
});

fn record_panic(target: &str, data: &[u8]) {
    let hash = fnv1a64(data);
    let dir = Path::new("fuzz").join("artifacts").join(target);
    if let Err(err) = fs::create_dir_all(&dir) {
        eprintln!("fuzz panic capture failed: target={target} err={err}");
        return;
    }
    let path = dir.join(format!("panic_{hash:016x}.bin"));
    if let Err(err) = fs::write(&path, data) {
        eprintln!(
            "fuzz panic capture failed: target={target} path={} err={err}",
            path.display()
        );
        return;
    }
    eprintln!(
        "fuzz panic captured: target={target} path={} len={} seed_hex={}",
        path.display(),
        data.len(),
        hex_preview(data, 64)
    );
}

fn fnv1a64(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

fn hex_preview(data: &[u8], max_len: usize) -> String {
    data.iter()
        .take(max_len)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
