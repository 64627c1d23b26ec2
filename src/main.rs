use std::process;

fn main() {
    if let Err(e) = os64_make::cli::run() {
        os64_make::ui::fatal(&e.to_string());
        process::exit(1);
    }
}
