//! vk-repro: run a SPIR-V compute kernel once on every Vulkan accelerator.

use std::process;

use clap::Parser;

use vk_repro::cli::{self, Args};
use vk_repro::error::EXIT_USAGE;
use vk_repro::harness::run_all;
use vk_repro::pipeline::Kernel;
use vk_repro::readback::write_report;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprint!("{}", e.render());
            process::exit(EXIT_USAGE);
        }
    };

    cli::init_logging();

    let result = Kernel::load(&args.kernel, &args.entry_point).and_then(|kernel| {
        run_all(&kernel, |report| {
            write_report(&mut std::io::stdout().lock(), &report.output)
        })
    });

    if let Err(e) = result {
        eprintln!("vk-repro: {}", e);
        process::exit(e.exit_code());
    }
}
