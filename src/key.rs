//! # 密钥模块
//!
//! 定义 256 位加密密钥类型及其从十六进制字符串的解析逻辑。
//! 密钥一经解析即不可变。

use crate::error::StegError;
use std::str::FromStr;

/// 一个 256 位 (32 字节) 的加密密钥。
///
/// 从 64 个十六进制字符的字符串解析而来，长度不符或包含
/// 非十六进制字符都会在解析阶段被拒绝。
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Key256([u8; 32]);

impl Key256 {
    /// 返回密钥的原始字节。
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 将密钥拆分为 4 个 64 位状态字 (小端序)，供密钥流生成器使用。
    pub fn state_words(&self) -> [u64; 4] {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&self.0[i * 8..i * 8 + 8]);
            *word = u64::from_le_bytes(bytes);
        }
        words
    }
}

impl From<[u8; 32]> for Key256 {
    fn from(bytes: [u8; 32]) -> Self {
        Key256(bytes)
    }
}

impl FromStr for Key256 {
    type Err = StegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(StegError::InvalidKeyLength(s.len()));
        }

        let decoded = hex::decode(s).map_err(|_| StegError::InvalidKeyDigit)?;

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Key256(bytes))
    }
}

// 避免密钥内容意外进入日志或错误信息。
impl std::fmt::Debug for Key256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key256(..)")
    }
}
