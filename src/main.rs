//! chatrelay, a small chat relay speaking a subset of IRC.

#![forbid(unsafe_code)]
#![warn(clippy::all, rust_2018_idioms)]

use crate::config::Config;
use crate::state::State;
use std::{env, process};
use tokio::runtime as rt;

mod channel;
mod client;
mod config;
mod lines;
mod net;
mod state;
mod util;

pub fn main() {
    if cfg!(debug_assertions) {
        env::set_var("RUST_BACKTRACE", "1");
    }

    let log_settings = env_logger::Env::new()
        .filter_or("CHATRELAY_LOG", "chatrelay=debug")
        .write_style("CHATRELAY_LOG_STYLE");
    env_logger::Builder::from_env(log_settings)
        .format(|buf, r| {
            use std::io::Write;
            writeln!(buf, "[{:<5} {}] {}", r.level(), r.target(), r.args())
        })
        .init();

    let cfg = parse_args();
    let runtime = rt::Builder::new_current_thread()
        .enable_io()
        .build()
        .unwrap_or_else(|err| {
            log::error!("Failed to start the runtime: {}", err);
            process::exit(1);
        });

    runtime.block_on(run(cfg));
}

async fn run(cfg: Config) {
    let shared = State::new(cfg.state);
    for addr in cfg.bindings {
        tokio::spawn(net::listen(addr, shared.clone()));
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutting down"),
        Err(err) => {
            log::error!("Cannot listen for signals: {}", err);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} CONFIG_FILE", program);
    eprintln!("       {} PORT PASSWORD", program);
}

fn parse_args() -> Config {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("chatrelay", String::as_str);

    match args.get(1..).unwrap_or_default() {
        [flag] if flag == "-h" || flag == "--help" => {
            eprintln!("chatrelay {}", env!("CARGO_PKG_VERSION"));
            print_usage(program);
            process::exit(0);
        }
        [flag] if flag == "-v" || flag == "--version" => {
            eprintln!("chatrelay {}", env!("CARGO_PKG_VERSION"));
            process::exit(0);
        }
        [config_path] => Config::from_file(config_path).unwrap_or_else(|err| {
            log::error!("Failed to read {:?}: {}", config_path, err);
            process::exit(1);
        }),
        [port, password] => {
            let port = port.parse().unwrap_or_else(|_| {
                log::error!("{:?} is not a valid port", port);
                process::exit(1);
            });
            Config::with_port(port, password.clone())
        }
        _ => {
            print_usage(program);
            process::exit(1);
        }
    }
}
