//! # 命令处理逻辑模块
//!
//! 包含处理 `hide`、`extract` 和 `info` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用核心隐写算法以及向用户报告结果。

use crate::bitmap::BmpContainer;
use crate::cli::{ExtractArgs, HideArgs, InfoArgs};
use crate::key::Key256;
use crate::message::COMPATIBLE_VERSIONS;
use crate::steganography::{self, HideStatus};
use anyhow::{Context, Result};
use colored::Colorize;

/// 处理 'Hide' 命令的执行逻辑。
///
/// 负责解析密钥、加载 BMP 容器、调用隐写核心函数隐藏密码，
/// 最后将结果保存到目标路径 (缺省为原地覆盖)。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 密钥不是 64 个十六进制字符。
/// * 无法读取或解析输入的 BMP 文件。
/// * 图像的全部区域都无法容纳该密码。
/// * 目标文件被其他进程锁定且等待超时，或无法写入。
pub fn handle_hide(args: HideArgs) -> Result<()> {
    let key: Key256 = args.key.parse().context("Invalid encryption key")?;

    let mut container = BmpContainer::open(&args.image).with_context(|| {
        format!(
            "Unable to load BMP file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let status = steganography::hide(&mut container, &args.password, &key)
        .context("Failed to build the hidden message")?;

    anyhow::ensure!(
        status != HideStatus::Failed,
        "Not enough capacity in the image to hide the password. \nTry an image with more rows or a larger trailing gap."
    );

    let dest = args.dest.unwrap_or_else(|| args.image.clone());
    container.save(&dest).with_context(|| {
        format!(
            "Unable to write to target image file: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;

    let zones = match status {
        HideStatus::PixelPadding => "pixel row padding",
        HideStatus::Gap1 => "pixel row padding and gap 1",
        HideStatus::Gap2 => "pixel row padding, gap 1 and gap 2",
        HideStatus::Failed => unreachable!("failed status is rejected above"),
    };

    println!(
        "The password has been successfully hidden and saved: {}",
        dest.to_string_lossy().green().bold()
    );
    println!("Zones used: {}", zones.cyan());

    Ok(())
}

/// 处理 'Extract' 命令的执行逻辑。
///
/// 负责解析密钥、加载 BMP 容器并提取隐藏的密码，将明文打印到
/// 标准输出。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 密钥不是 64 个十六进制字符。
/// * 无法读取或解析输入的 BMP 文件。
/// * 图像中没有有效的隐藏消息。消息缺失、已损坏与密钥不符
///   这三种情况刻意不作区分。
pub fn handle_extract(args: ExtractArgs) -> Result<()> {
    let key: Key256 = args.key.parse().context("Invalid encryption key")?;

    let container = BmpContainer::open(&args.image).with_context(|| {
        format!(
            "Unable to load BMP file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let password = steganography::extract(&container, &key, &COMPATIBLE_VERSIONS);

    match password {
        Some(password) => {
            println!("{}", password);
            Ok(())
        }
        None => anyhow::bail!(
            "No hidden password was found in: {}",
            args.image.to_string_lossy().red().bold()
        ),
    }
}

/// 处理 'Info' 命令的执行逻辑。
///
/// 打印 BMP 文件的头部字段与各隐写区域的几何信息，便于判断
/// 一张图像能容纳多长的密码。
///
/// # Errors
///
/// 无法读取或解析输入的 BMP 文件时返回错误。
pub fn handle_info(args: InfoArgs) -> Result<()> {
    let container = BmpContainer::open(&args.image).with_context(|| {
        format!(
            "Unable to load BMP file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let file_header = container.file_header();
    let info_header = container.info_header();
    let pixels = container.pixel_array();

    println!("{}", "File Header:".bold());
    println!("  size: {}", file_header.size);
    println!("  pixel data offset: {}", file_header.pixel_offset);

    println!("{}", "Info Header:".bold());
    println!("  header size: {}", info_header.header_size);
    println!("  width: {}", info_header.width);
    println!("  height: {}", info_header.height);
    println!("  bit count: {}", info_header.bit_count);
    println!("  compression: {}", info_header.compression);
    println!("  image size: {}", info_header.image_size);

    println!("{}", "Zones:".bold());
    println!(
        "  row padding: {} bytes per row, {} bytes total",
        pixels.padding_size,
        container.padding_capacity()
    );
    println!(
        "  gap 1: {} bytes",
        container.gap1().map_or(0, |gap| gap.len)
    );
    println!(
        "  gap 2: {} bytes (growable)",
        container.gap2().map_or(0, |gap| gap.len)
    );

    Ok(())
}
