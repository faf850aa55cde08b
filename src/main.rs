//! # filebatch 命令行入口
//!
//! ## 子命令
//! - `copy` - 镜像复制匹配的文件
//! - `list` - 列出匹配的文件，可做集合运算

use clap::Parser;
use filebatch::cli::Cli;
use filebatch::{commands, utils};

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = utils::logging::init_logging(cli.log_level.as_deref(), cli.log_file.as_deref()) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }

    if let Err(e) = commands::run(cli.command, cli.quiet) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
