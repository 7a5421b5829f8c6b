// Generates `sonic.h` with `cbindgen` when it is on PATH; otherwise copies
// the checked-in `include/sonic.h` to $OUT_DIR.

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/sonic.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let checked_in = crate_dir.join("include").join("sonic.h");
    let generated = out_dir.join("sonic.h");

    let have_cbindgen = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if have_cbindgen {
        let ok = Command::new("cbindgen")
            .args(["--crate", "sonic-ffi", "--lang", "C", "--output"])
            .arg(&generated)
            .current_dir(&crate_dir)
            .status()
            .is_ok_and(|s| s.success());
        if ok {
            return;
        }
        println!("cargo:warning=sonic-ffi: cbindgen failed; using include/sonic.h");
    }

    fs::copy(&checked_in, &generated).expect("include/sonic.h is missing");
}
