use std::env;

fn main() {
    // Allow pointing at a non-standard install prefix
    if let Ok(dir) = env::var("DJVULIBRE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_else(|_| "unknown".to_string());

    match target_os.as_str() {
        "windows" => println!("cargo:rustc-link-lib=dylib=libdjvulibre"),
        _ => println!("cargo:rustc-link-lib=dylib=djvulibre"),
    }

    println!("cargo:rerun-if-env-changed=DJVULIBRE_LIB_DIR");
}
