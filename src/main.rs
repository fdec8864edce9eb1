fn main() {
    if let Err(err) = voccurate::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
