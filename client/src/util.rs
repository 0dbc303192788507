fn random_u32() -> u32 {
    (js_sys::Math::random() * (u32::MAX as f64 + 1.0)) as u32
}

/// Per-page-load origin for stroke ids.
pub fn random_origin() -> u64 {
    (u64::from(random_u32()) << 32) | u64::from(random_u32())
}

pub fn default_user_name() -> String {
    let n = (js_sys::Math::random() * 1000.0) as u32;
    format!("user-{n:03}")
}

/// `?debug=1` turns on debug logs from the reconciler and the replica log.
pub fn log_level_from_search(search: &str) -> log::Level {
    let debug = search
        .trim_start_matches('?')
        .split('&')
        .any(|pair| matches!(pair, "debug=1" | "debug=true"));
    if debug {
        log::Level::Debug
    } else {
        log::Level::Info
    }
}
