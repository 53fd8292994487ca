//! Build script: links libfuka_exporter and its runtime dependencies when
//! the `native` feature is enabled.

fn main() {
    println!("cargo:rerun-if-env-changed=FUKA_EXPORTER_DIR");

    if std::env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    if let Some(dir) = std::env::var_os("FUKA_EXPORTER_DIR") {
        println!(
            "cargo:rustc-link-search=native={}",
            std::path::Path::new(&dir).display()
        );
    }
    for lib in ["fuka_exporter", "fftw3", "gsl", "gslcblas", "stdc++"] {
        println!("cargo:rustc-link-lib={lib}");
    }
}
