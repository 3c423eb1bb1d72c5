//! # 消息块模块
//!
//! 定义嵌入消息的线格式，并提供构造、校验与解密逻辑。
//!
//! 消息字节流始终符合以下格式：
//!
//! ```text
//! |        -- 消息块头部 --           |    -- 数据 --    |
//! | 魔数    | 格式版本 | 消息长度     | 加密后的消息      |
//! | 2 字节  | 3 字节   | 1 字节       | n 字节           |
//! ```
//!
//! 隐藏时：构造完整字节流，由隐写算法非连续地写入图像。
//! 提取时：按写入顺序逐字节读回，凑满 6 字节头部后立即校验，
//! 再按长度字段读取剩余部分并解密。

use crate::cipher;
use crate::constants::{
    CURRENT_VERSION, MAX_PASSWORD_LEN, MESSAGE_HEADER_SIZE, MESSAGE_LENGTH_INDEX, MESSAGE_MAGIC,
};
use crate::error::StegError;
use crate::key::Key256;

/// 一个不可变的有序版本集合，头部校验时用于判断兼容性。
///
/// 进程级常量 [`COMPATIBLE_VERSIONS`] 是目前唯一的实例；未来引入
/// 向后兼容的格式修订时，向 `versions` 追加历史版本即可。
pub struct VersionSet {
    versions: &'static [(u8, u8, u8)],
}

impl VersionSet {
    /// 判断给定的版本三元组是否属于兼容集合。
    pub fn contains(&self, version: (u8, u8, u8)) -> bool {
        // versions 保持升序，维持二分查找的前提。
        self.versions.binary_search(&version).is_ok()
    }
}

/// 当前进程接受的全部消息格式版本。
pub const COMPATIBLE_VERSIONS: VersionSet = VersionSet {
    versions: &[CURRENT_VERSION],
};

/// 一条加密消息的连续字节表示。
///
/// 用于隐藏时构造待写入的字节流。提取方向不构造实例，
/// 直接通过关联函数对累积的字节缓冲区操作。
pub struct MessageBlock {
    bytes: Vec<u8>,
}

impl MessageBlock {
    /// 以当前格式版本构造一条完整的消息字节流。
    ///
    /// 明文末尾追加一个 NUL 终止符后整体加密，长度字段记录
    /// 含终止符的负载长度。
    ///
    /// # Errors
    ///
    /// * 明文超过 254 字节，无法放入 1 字节的长度字段。
    /// * 明文包含 NUL 字节，会与终止符校验冲突。
    pub fn build(plaintext: &str, key: &Key256) -> Result<Self, StegError> {
        if plaintext.len() > MAX_PASSWORD_LEN {
            return Err(StegError::PasswordTooLong(plaintext.len()));
        }
        if plaintext.bytes().any(|byte| byte == 0) {
            return Err(StegError::PasswordContainsNul);
        }

        let payload_len = plaintext.len() + 1;
        let (major, minor, patch) = CURRENT_VERSION;

        let mut bytes = Vec::with_capacity(MESSAGE_HEADER_SIZE + payload_len);
        bytes.extend_from_slice(&MESSAGE_MAGIC);
        bytes.push(major);
        bytes.push(minor);
        bytes.push(patch);
        bytes.push(payload_len as u8);
        bytes.extend_from_slice(plaintext.as_bytes());
        bytes.push(0);

        cipher::crypt(&mut bytes[MESSAGE_HEADER_SIZE..], key);
        Ok(MessageBlock { bytes })
    }

    /// 返回完整的消息字节流。
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 取出完整的消息字节流。
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// 校验已凑满的 6 字节头部：魔数匹配且版本属于兼容集合。
    pub fn validate_header(bytes: &[u8], versions: &VersionSet) -> bool {
        if bytes.len() < MESSAGE_HEADER_SIZE {
            return false;
        }

        if bytes[0..2] != MESSAGE_MAGIC {
            return false;
        }

        versions.contains((bytes[2], bytes[3], bytes[4]))
    }

    /// 给定已读取的字节，返回还需读取多少字节才能补全头部或整条消息。
    ///
    /// 头部未凑齐时返回补齐头部所需的字节数；头部完整后按长度字段
    /// 返回补全消息所需的字节数，消息已完整时返回 0。
    pub fn bytes_remaining(bytes: &[u8]) -> usize {
        if bytes.len() < MESSAGE_HEADER_SIZE {
            return MESSAGE_HEADER_SIZE - bytes.len();
        }

        let declared = bytes[MESSAGE_LENGTH_INDEX] as usize;
        (MESSAGE_HEADER_SIZE + declared).saturating_sub(bytes.len())
    }

    /// 解密一条完整的消息字节流，返回其中的明文。
    ///
    /// 解密后的负载必须满足：最后一个字节是 NUL 终止符，且之前
    /// 没有任何 NUL 字节。任一条件不满足都说明消息已损坏、密钥
    /// 不符或根本不存在隐藏消息，一律返回 `None`，不作区分。
    pub fn decrypt(bytes: &[u8], key: &Key256) -> Option<String> {
        let declared = *bytes.get(MESSAGE_LENGTH_INDEX)? as usize;
        if declared == 0 || bytes.len() < MESSAGE_HEADER_SIZE + declared {
            return None;
        }

        let mut payload =
            bytes[MESSAGE_HEADER_SIZE..MESSAGE_HEADER_SIZE + declared].to_vec();
        cipher::crypt(&mut payload, key);

        let (terminator, plaintext) = payload.split_last()?;
        if *terminator != 0 || plaintext.iter().any(|byte| *byte == 0) {
            return None;
        }

        String::from_utf8(plaintext.to_vec()).ok()
    }
}
