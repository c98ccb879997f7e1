fn main() {
    if let Err(err) = thinkmap_renderer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
