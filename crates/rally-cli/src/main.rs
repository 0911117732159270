mod command;
mod config;
mod interrupt;
mod logging;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
