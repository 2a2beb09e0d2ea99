fn main() {
    // Only device builds need the ESP-IDF environment exported to rustc;
    // host builds (tests, simulation) skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
