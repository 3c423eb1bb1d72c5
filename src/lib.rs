//! # bmp_steg 库
//!
//! 本库包含 BMP 结构空隙隐写工具的核心逻辑。
//!
//! 注意：所用的密钥流生成器只是混淆手段，不提供对抗有动机
//! 攻击者的机密性保证，详见 [`cipher`] 模块文档。

// 声明库包含的所有模块。

pub mod bitmap;
pub mod cipher;
pub mod cli;
pub mod constants;
pub mod error;
pub mod handler;
pub mod key;
pub mod message;
pub mod steganography;
