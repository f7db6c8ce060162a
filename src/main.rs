fn main() {
    // Logging may not be up yet when settings fail to load, so report directly
    if let Err(e) = soundscape_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
