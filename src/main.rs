use clap::Parser;

use bmp_steg::{
    cli::{Cli, Commands},
    handler::{handle_extract, handle_hide, handle_info},
};

/// 程序的主入口点
///
/// 负责解析命令行参数，并根据指定的子命令（`hide`、`extract` 或
/// `info`）将执行分派到相应的处理函数
fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 根据子命令调用相应的处理函数
    match cli.command {
        Commands::Hide(args) => handle_hide(args),
        Commands::Extract(args) => handle_extract(args),
        Commands::Info(args) => handle_info(args),
    }
}
