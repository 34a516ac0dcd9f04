use std::num::NonZeroUsize;
use std::thread;

use clap::Parser;

/// Command line options of the `avrouter` binary.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "avrouter", version, about = "HTTP router service", long_about = None)]
pub struct Options {
    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0")]
    pub address: String,

    /// HTTP listen port
    #[arg(long = "httpport", default_value_t = 9999)]
    pub http_port: u16,

    /// Number of reactor threads, defaults to the available parallelism.
    ///
    /// Every reactor owns exactly one thread, so this is also the reactor pool size
    /// and `--pool` is accepted as an alias.
    #[arg(
        long = "thread",
        visible_alias = "pool",
        default_value_t = default_threads(),
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub threads: u16,
}

fn default_threads() -> u16 {
    let threads = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    u16::try_from(threads).unwrap_or(u16::MAX)
}
