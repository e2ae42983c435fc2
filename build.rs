fn main() {
    println!("cargo:rerun-if-changed=cfg.toml");

    // ESP-IDF link arguments and environment; host builds skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
