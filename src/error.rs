//! # 错误类型模块
//!
//! 定义库核心使用的错误类型。解析错误 (非法的 BMP 结构、非法的密钥)
//! 属于致命错误，容器无法构造；容量不足等可恢复情况由状态码表达，
//! 不在此处出现。

use std::fmt;
use std::io;

/// 库核心所有可能失败的操作返回的错误类型。
#[derive(Debug)]
pub enum StegError {
    /// 文件前两个字节不是 "BM"。
    NotABitmap,
    /// 文件比 54 字节的固定头部区域还短，无法读取头部。
    TruncatedHeader,
    /// 像素数据偏移小于 54，落在头部区域内。
    PixelOffsetTooSmall(u32),
    /// 像素数据偏移超出文件末尾。
    PixelOffsetOutOfBounds(u32),
    /// 密钥字符串长度不是 64 个字符。
    InvalidKeyLength(usize),
    /// 密钥字符串包含非十六进制字符。
    InvalidKeyDigit,
    /// 密码超过 254 字节，无法放入 1 字节的长度字段。
    PasswordTooLong(usize),
    /// 密码包含 NUL 字节，与终止符冲突。
    PasswordContainsNul,
    /// 目标文件被其他进程独占锁定，等待超时。
    SaveTimeout,
    /// 底层文件读写错误。
    Io(io::Error),
}

impl fmt::Display for StegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StegError::NotABitmap => {
                write!(f, "Invalid BMP file, header does not match")
            }
            StegError::TruncatedHeader => {
                write!(f, "Invalid BMP file, too small to contain the 54-byte header region")
            }
            StegError::PixelOffsetTooSmall(offset) => {
                write!(f, "Invalid BMP file, pixel data offset {} is too small", offset)
            }
            StegError::PixelOffsetOutOfBounds(offset) => {
                write!(f, "Invalid BMP file, pixel data offset {} is out of bounds", offset)
            }
            StegError::InvalidKeyLength(len) => {
                write!(f, "Key must be 64 hexadecimal characters, got {}", len)
            }
            StegError::InvalidKeyDigit => {
                write!(f, "Key contains non-hexadecimal characters")
            }
            StegError::PasswordTooLong(len) => {
                write!(f, "Password is {} bytes, the maximum is 254", len)
            }
            StegError::PasswordContainsNul => {
                write!(f, "Password must not contain NUL bytes")
            }
            StegError::SaveTimeout => {
                write!(f, "File is open by another process, timeout reached")
            }
            StegError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StegError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StegError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StegError {
    fn from(err: io::Error) -> Self {
        StegError::Io(err)
    }
}
