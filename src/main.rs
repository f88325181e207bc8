mod app;
mod config;
mod error;
mod fetch;
mod gz;
mod paths;
mod process;
mod scan;
mod transfer;

fn main() {
    std::process::exit(app::run());
}
