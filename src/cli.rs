//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use clap::Parser;
use std::path::PathBuf;

/// 一款在未压缩 BMP 图像的结构空隙中隐藏或提取加密密码的命令行工具。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款在未压缩 BMP 图像的结构空隙 (扫描线填充、头部空隙、尾部空隙) 中隐藏或提取加密密码的命令行工具。图像在视觉上保持不变。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：hide (隐藏)、extract (提取) 和 info (查看结构)。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 在 BMP 图像中隐藏一条加密的密码。
    Hide(HideArgs),

    /// 从经过隐写的 BMP 图像中提取密码。
    Extract(ExtractArgs),

    /// 查看 BMP 图像的头部信息与各隐写区域的容量。
    Info(InfoArgs),
}

/// 'hide' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct HideArgs {
    /// 用于隐写的 BMP 图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的密码明文。
    #[arg(short, long)]
    pub password: String,

    /// 256 位加密密钥，64 个十六进制字符。
    #[arg(short, long)]
    pub key: String,

    /// 保存结果图像的输出路径，缺省时原地覆盖输入文件。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,
}

/// 'extract' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// 已隐藏密码的 BMP 图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 256 位加密密钥，64 个十六进制字符。
    #[arg(short, long)]
    pub key: String,
}

/// 'info' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// 要查看的 BMP 图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,
}
