use std::env;
use std::fmt::Write;
use std::path::PathBuf;

/// Build-time settings: (name, default, minimum).
///
/// Each one can be overridden with an `ESTC_BLE_<NAME>` environment variable.
static CONFIGS: &[(&str, usize, usize)] = &[
    // Period of the uptime clock.
    ("TICK_PERIOD_MS", 1000, 1),
    // Number of tick subscribers the default clock accepts. Both delivery
    // consumers subscribe at boot.
    ("MAX_SUBSCRIBERS", 2, 2),
    // Depth of the default push queue between tick handlers and the BLE task.
    ("PUSH_QUEUE_SIZE", 4, 1),
];

fn main() {
    let mut data = String::new();

    for (name, default, min) in CONFIGS {
        let var = format!("ESTC_BLE_{}", name);
        println!("cargo:rerun-if-env-changed={}", var);

        let value = match env::var(&var) {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(value) => value,
                Err(_) => panic!("{} must be an unsigned integer, got {:?}", var, raw),
            },
            Err(_) => *default,
        };
        if value < *min {
            panic!("{} must be at least {}, got {}", var, min, value);
        }

        writeln!(data, "pub const {}: usize = {};", name, value).unwrap();
    }

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    std::fs::write(out_dir.join("config.rs"), data).unwrap();
}
