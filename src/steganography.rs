//! # 隐写算法模块
//!
//! 在 BMP 容器的三个区域中写入与读回消息字节流，区域优先级固定：
//! 像素行填充最先，其次 Gap1，最后 Gap2。只有 Gap2 允许通过扩容
//! 缓冲区来获得额外容量。
//!
//! 提取方向是一个增量解码状态机：字节从非连续的区域中逐个汇入
//! 累积缓冲区，头部一旦凑满立即校验，校验失败则整个提取过程
//! 立刻终止，不再查看后续区域。

use crate::bitmap::{BmpContainer, Gap};
use crate::constants::MESSAGE_HEADER_SIZE;
use crate::error::StegError;
use crate::key::Key256;
use crate::message::{MessageBlock, VersionSet};

/// 隐藏操作的结果状态，对应消息最终落入的最深区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideStatus {
    /// 用尽全部三个区域仍无法容纳整条消息。
    Failed = 0,
    /// 消息完全放入了像素行填充。
    PixelPadding = 1,
    /// 放置用到了 Gap1。
    Gap1 = 2,
    /// 放置用到了 Gap2。
    Gap2 = 3,
}

/// 将密码以加密消息的形式隐藏进容器。
///
/// 消息字节流一次性构造完成，随后按区域优先级写入。写入 Gap2 前
/// 若其当前容量不足，先扩容缓冲区使其恰好容纳剩余字节。
///
/// 返回的状态在写入完成后根据消息长度与各区域容量判定，而不是
/// 在写入过程中记录区域使用情况。容量不足导致的失败以
/// [`HideStatus::Failed`] 表达，已写入前序区域的字节保持原样。
///
/// # Errors
///
/// 密码无法装入消息格式 (超长或包含 NUL) 时返回错误，此时
/// 容器未被改动。
pub fn hide(
    container: &mut BmpContainer,
    password: &str,
    key: &Key256,
) -> Result<HideStatus, StegError> {
    let message = MessageBlock::build(password, key)?.into_bytes();
    let total = message.len();

    let padding_capacity = container.padding_capacity();
    let gap1_capacity = container.gap1().map_or(0, |gap| gap.len);

    let mut written = write_to_padding(container, &message);

    if written < total {
        if let Some(gap1) = container.gap1() {
            written += write_to_gap(container, gap1, &message[written..]);
        }
    }

    if written < total {
        // 扩容后旧的 Gap2 视图已失效，使用重新派生的视图写入。
        if let Some(gap2) = container.ensure_gap2_capacity(total - written) {
            written += write_to_gap(container, gap2, &message[written..]);
        }
    }

    if written < total {
        return Ok(HideStatus::Failed);
    }

    if total > padding_capacity + gap1_capacity {
        Ok(HideStatus::Gap2)
    } else if total > padding_capacity {
        Ok(HideStatus::Gap1)
    } else {
        Ok(HideStatus::PixelPadding)
    }
}

/// 从容器中提取隐藏的密码。
///
/// 按与隐藏相同的区域顺序读取。头部校验失败、任一区域读完后
/// 消息仍不完整、或解密校验失败，都返回 `None`，对调用方而言
/// 与"从未隐藏过消息"不可区分。
pub fn extract(
    container: &BmpContainer,
    key: &Key256,
    versions: &VersionSet,
) -> Option<String> {
    let mut accumulator = Accumulator::new(versions);

    read_from_padding(container, &mut accumulator);

    if !accumulator.finished() {
        if let Some(gap1) = container.gap1() {
            read_from_gap(container, gap1, &mut accumulator);
        }
    }

    if !accumulator.finished() {
        if let Some(gap2) = container.gap2() {
            read_from_gap(container, gap2, &mut accumulator);
        }
    }

    match accumulator.state {
        ReadState::Complete => MessageBlock::decrypt(&accumulator.bytes, key),
        _ => None,
    }
}

/// 提取状态机的状态。`Invalid` 是吸收态，一旦进入便不再接收字节，
/// 最终结果必为空。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    ReadingHeader,
    ReadingPayload,
    Complete,
    Invalid,
}

/// 跨区域累积消息字节的缓冲区，驱动提取状态机。
struct Accumulator<'a> {
    bytes: Vec<u8>,
    state: ReadState,
    versions: &'a VersionSet,
}

impl<'a> Accumulator<'a> {
    fn new(versions: &'a VersionSet) -> Self {
        Accumulator {
            bytes: Vec::with_capacity(MESSAGE_HEADER_SIZE),
            state: ReadState::ReadingHeader,
            versions,
        }
    }

    /// 送入一个字节并推进状态机。
    fn push(&mut self, byte: u8) {
        match self.state {
            ReadState::Complete | ReadState::Invalid => return,
            ReadState::ReadingHeader | ReadState::ReadingPayload => {}
        }

        self.bytes.push(byte);

        if self.bytes.len() == MESSAGE_HEADER_SIZE {
            // 头部首次凑满，立即校验真伪。
            if !MessageBlock::validate_header(&self.bytes, self.versions) {
                self.state = ReadState::Invalid;
                return;
            }
            self.state = ReadState::ReadingPayload;
        }

        if self.bytes.len() >= MESSAGE_HEADER_SIZE
            && MessageBlock::bytes_remaining(&self.bytes) == 0
        {
            self.state = ReadState::Complete;
        }
    }

    /// 是否已无继续读取的必要 (消息完整或头部非法)。
    fn finished(&self) -> bool {
        matches!(self.state, ReadState::Complete | ReadState::Invalid)
    }
}

fn write_to_padding(container: &mut BmpContainer, message: &[u8]) -> usize {
    let pixels = container.pixel_array();
    if pixels.padding_size == 0 {
        return 0;
    }

    let data = container.as_mut_bytes();
    let mut written = 0;

    for row in 0..pixels.num_rows {
        if written == message.len() {
            break;
        }

        let row_start = pixels.offset + row * pixels.row_size;
        let pad_start = row_start + pixels.row_size - pixels.padding_size;
        let pad_end = (row_start + pixels.row_size).min(data.len());
        if pad_start >= data.len() {
            break;
        }

        for slot in pad_start..pad_end {
            if written == message.len() {
                break;
            }
            data[slot] = message[written];
            written += 1;
        }
    }

    written
}

fn write_to_gap(container: &mut BmpContainer, gap: Gap, message: &[u8]) -> usize {
    let data = container.as_mut_bytes();
    let end = (gap.offset + gap.len).min(data.len());
    let count = message.len().min(end.saturating_sub(gap.offset));
    data[gap.offset..gap.offset + count].copy_from_slice(&message[..count]);
    count
}

fn read_from_padding(container: &BmpContainer, accumulator: &mut Accumulator<'_>) {
    let pixels = container.pixel_array();
    if pixels.padding_size == 0 {
        return;
    }

    let data = container.as_bytes();

    for row in 0..pixels.num_rows {
        if accumulator.finished() {
            return;
        }

        let row_start = pixels.offset + row * pixels.row_size;
        let pad_start = row_start + pixels.row_size - pixels.padding_size;
        let pad_end = (row_start + pixels.row_size).min(data.len());
        if pad_start >= data.len() {
            return;
        }

        for slot in pad_start..pad_end {
            if accumulator.finished() {
                return;
            }
            accumulator.push(data[slot]);
        }
    }
}

fn read_from_gap(container: &BmpContainer, gap: Gap, accumulator: &mut Accumulator<'_>) {
    let data = container.as_bytes();
    let end = (gap.offset + gap.len).min(data.len());

    for slot in gap.offset..end {
        if accumulator.finished() {
            return;
        }
        accumulator.push(data[slot]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BMP_HEADER_SIZE;
    use crate::message::COMPATIBLE_VERSIONS;

    fn build_bmp(width: u32, height: u32, gap1_len: usize, gap2_len: usize) -> Vec<u8> {
        let row_size = ((width as usize * 24 + 31) / 32) * 4;
        let image_size = row_size * height as usize;
        let pixel_offset = BMP_HEADER_SIZE + gap1_len;
        let file_size = pixel_offset + image_size + gap2_len;

        let mut data = vec![0u8; file_size];
        data[0..2].copy_from_slice(b"BM");
        data[2..6].copy_from_slice(&(file_size as u32).to_le_bytes());
        data[10..14].copy_from_slice(&(pixel_offset as u32).to_le_bytes());
        data[14..18].copy_from_slice(&40u32.to_le_bytes());
        data[18..22].copy_from_slice(&width.to_le_bytes());
        data[22..26].copy_from_slice(&height.to_le_bytes());
        data[26..28].copy_from_slice(&1u16.to_le_bytes());
        data[28..30].copy_from_slice(&24u16.to_le_bytes());
        data[34..38].copy_from_slice(&(image_size as u32).to_le_bytes());
        data
    }

    fn container(width: u32, height: u32, gap1: usize, gap2: usize) -> BmpContainer {
        BmpContainer::from_bytes(build_bmp(width, height, gap1, gap2)).unwrap()
    }

    fn test_key(fill: u8) -> Key256 {
        Key256::from([fill; 32])
    }

    #[test]
    fn test_message_spans_padding_rows() {
        // 宽 2 高 8：每行 2 字节填充，共 16 字节，9 字节消息跨 5 行。
        let mut bmp = container(2, 8, 0, 0);
        let key = test_key(0x21);

        let status = hide(&mut bmp, "hi", &key).unwrap();
        assert_eq!(status, HideStatus::PixelPadding);
        assert_eq!(extract(&bmp, &key, &COMPATIBLE_VERSIONS), Some("hi".into()));
    }

    #[test]
    fn test_message_spans_zone_boundary() {
        // 填充 4 字节 + Gap1 3 字节 + Gap2 若干：头部本身跨越两个区域。
        let mut bmp = container(2, 2, 3, 10);
        let key = test_key(0x09);

        let status = hide(&mut bmp, "boundary", &key).unwrap();
        assert_eq!(status, HideStatus::Gap2);
        assert_eq!(
            extract(&bmp, &key, &COMPATIBLE_VERSIONS),
            Some("boundary".into())
        );
    }

    #[test]
    fn test_invalid_header_short_circuits() {
        // 头部魔数被破坏时必须立即放弃，即使 Gap2 中残留完整消息。
        let mut bmp = container(2, 4, 0, 0);
        let key = test_key(0x33);
        hide(&mut bmp, "pw", &key).unwrap();

        let pixels = bmp.pixel_array();
        let first_slot = pixels.offset + pixels.row_size - pixels.padding_size;
        bmp.as_mut_bytes()[first_slot] = b'X';

        assert_eq!(extract(&bmp, &key, &COMPATIBLE_VERSIONS), None);
    }

    #[test]
    fn test_extract_from_blank_container() {
        let bmp = container(2, 4, 8, 8);
        assert_eq!(extract(&bmp, &test_key(1), &COMPATIBLE_VERSIONS), None);
    }

    #[test]
    fn test_hide_fails_without_gap2() {
        // 声明的像素数据大小越过缓冲区末尾，Gap2 不可用且无法扩容。
        let mut data = build_bmp(2, 1, 0, 0);
        data[34..38].copy_from_slice(&10_000u32.to_le_bytes());
        let mut bmp = BmpContainer::from_bytes(data).unwrap();

        let status = hide(&mut bmp, "does not fit", &test_key(5)).unwrap();
        assert_eq!(status, HideStatus::Failed);
    }

    #[test]
    fn test_growth_preserves_bytes_beyond_declared_eof() {
        // Gap2 只有 2 字节，且声明的文件末尾之后还挂着 100 个额外字节。
        let mut data = build_bmp(2, 2, 0, 2);
        let declared = data.len();
        data.extend(std::iter::repeat(0xee).take(100));
        let mut bmp = BmpContainer::from_bytes(data).unwrap();
        let key = test_key(0x12);

        let status = hide(&mut bmp, "hi", &key).unwrap();
        assert_eq!(status, HideStatus::Gap2);

        // 扩容落在额外字节的范围内，缓冲区不允许收缩。
        assert_eq!(bmp.as_bytes().len(), declared + 100);
        // Gap2 吸收缺口的 3 个字节，其余额外字节原样保留。
        assert_eq!(&bmp.as_bytes()[declared + 3..], &[0xee; 97][..]);
        assert_eq!(extract(&bmp, &key, &COMPATIBLE_VERSIONS), Some("hi".into()));
    }

    #[test]
    fn test_status_codes_follow_capacity() {
        let key = test_key(0x44);

        // 9 字节消息，填充容量 16：状态 1。
        let mut padded = container(2, 8, 64, 64);
        assert_eq!(hide(&mut padded, "hi", &key).unwrap(), HideStatus::PixelPadding);

        // 填充容量 2，Gap1 足够：状态 2。
        let mut gap1_bound = container(2, 1, 64, 64);
        assert_eq!(hide(&mut gap1_bound, "hi", &key).unwrap(), HideStatus::Gap1);

        // 填充 2 + Gap1 4 不够 9 字节：状态 3。
        let mut gap2_bound = container(2, 1, 4, 64);
        assert_eq!(hide(&mut gap2_bound, "hi", &key).unwrap(), HideStatus::Gap2);
    }
}
