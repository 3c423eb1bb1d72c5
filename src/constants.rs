use std::time::Duration;

/// 嵌入消息头的魔数，即 ASCII 的 "SP"。
/// 注意与 BMP 文件自身的 "BM" 标识区分。
pub const MESSAGE_MAGIC: [u8; 2] = *b"SP";

/// 嵌入消息头的总大小 (字节)：
/// 魔数 2 字节 + 版本号 3 字节 + 消息长度 1 字节。
pub const MESSAGE_HEADER_SIZE: usize = 6;

/// 消息长度字段在消息头中的下标。
pub const MESSAGE_LENGTH_INDEX: usize = 5;

/// 当前的消息格式版本号 (major, minor, patch)。
/// 写入消息头，提取时用于兼容性校验。
pub const CURRENT_VERSION: (u8, u8, u8) = (0, 1, 0);

/// 明文密码的最大字节数。
/// 长度字段只有 1 字节，且需要为 NUL 终止符留出一个位置。
pub const MAX_PASSWORD_LEN: usize = 254;

/// BMP 文件头 (14 字节) 与信息头 (40 字节) 的总大小。
/// Gap1 从这个偏移开始，到像素数据偏移为止。
pub const BMP_HEADER_SIZE: usize = 54;

/// BMP 文件的类型标识，文件前两个字节必须与之相等。
pub const BMP_MAGIC: [u8; 2] = *b"BM";

/// 保存文件时等待其他进程释放独占锁的总超时时间。
pub const SAVE_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// 保存文件时轮询锁状态的间隔。
pub const SAVE_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);
