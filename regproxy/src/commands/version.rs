/// Get the version string for regproxy and libregproxy
pub fn get_version_string() -> String {
    format!(
        "regproxy {}\nlibregproxy {}",
        env!("CARGO_PKG_VERSION"),
        libregproxy::version()
    )
}

/// Print version information to stdout
pub fn print_version() {
    println!("{}", get_version_string());
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
