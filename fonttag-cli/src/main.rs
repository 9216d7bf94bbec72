//! Binary entrypoint for fonttag (made by FontLab https://www.fontlab.com/)

fn main() {
    if let Err(err) = fonttag_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
