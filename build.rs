use std::{env, fs, path::PathBuf};

fn main() {
    // 1) Pico 1 (thumbv6m): copy memory.x to OUT_DIR so the linker finds it
    let target = env::var("TARGET").unwrap_or_default();
    if target.starts_with("thumbv6m") {
        let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
        let memory_x = fs::read_to_string("memory.x").expect("Failed to read memory.x");
        fs::write(out_dir.join("memory.x"), memory_x).expect("Failed to write memory.x");
        println!("cargo:rustc-link-search={}", out_dir.display());
        println!("cargo:rerun-if-changed=memory.x");
    }

    // 2) Load optional env files
    let _ = dotenvy::from_filename(".env");
    load_home_env(".pico.env");

    // 3) Fallbacks so the crate compiles without .env
    //    WORD_CLOCK_TRACE=1 logs every RTC reply and refreshes the face on every poll.
    //    WORD_CLOCK_SQW=0 ticks from an internal timer instead of the RTC's square wave.
    let trace = env_or_default("WORD_CLOCK_TRACE", "0");
    let sqw = env_or_default("WORD_CLOCK_SQW", "1");

    for (key, value) in [("WORD_CLOCK_TRACE", &trace), ("WORD_CLOCK_SQW", &sqw)] {
        if value != "0" && value != "1" {
            println!("cargo:warning={key} should be 0 or 1, got {value:?}");
        }
    }

    // 4) Expose as compile-time constants
    println!("cargo:rustc-env=WORD_CLOCK_TRACE={trace}");
    println!("cargo:rustc-env=WORD_CLOCK_SQW={sqw}");

    println!("cargo:rerun-if-env-changed=WORD_CLOCK_TRACE");
    println!("cargo:rerun-if-env-changed=WORD_CLOCK_SQW");
    println!("cargo:rerun-if-changed=.env");
}

fn load_home_env(file: &str) {
    let home = match env::var_os("USERPROFILE").or_else(|| env::var_os("HOME")) {
        Some(path) => PathBuf::from(path),
        None => return,
    };
    let _ = dotenvy::from_path(home.join(file));
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
