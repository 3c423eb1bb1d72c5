//! # 密钥流加密模块
//!
//! 基于 Blum Blum Shub 风格的平方取模生成器产生确定性的伪随机字节流，
//! 与数据逐字节异或。加密与解密是同一个操作。
//!
//! 注意：模数很小且不是大 Blum 整数，状态空间有限，这只是混淆而非
//! 能抵抗有动机攻击者的加密。保持与既有隐藏消息逐字节兼容，
//! 不要改动其中任何常量或运算。

use crate::key::Key256;

/// 平方取模运算使用的固定模数。
const MODULUS: u64 = 0xE208_9EA5;

/// 用密钥派生的密钥流对 `data` 原地加密或解密。
///
/// 密钥被拆成 4 个 64 位状态字，轮换使用：每输出一个字节，
/// 将当前状态字平方 (允许回绕) 后对模数取余，取低 8 位作为
/// 密钥流字节，余数写回状态字，再轮换到下一个状态字。
///
/// 对同一密钥执行两次即还原原数据。
pub fn crypt(data: &mut [u8], key: &Key256) {
    let mut state = key.state_words();
    let mut index = 0;

    for byte in data.iter_mut() {
        let value = state[index].wrapping_mul(state[index]) % MODULUS;
        *byte ^= value as u8;

        state[index] = value;
        index = (index + 1) % 4;
    }
}
