//! # BMP 容器模块
//!
//! 解析未压缩 BMP 文件的结构头部，并以偏移加长度的形式暴露可供
//! 隐写使用的三个区域视图：像素行填充、Gap1 (头部与像素数据之间的
//! 结构空隙) 与 Gap2 (像素数据之后、声明的文件末尾之前的空隙)。
//!
//! 字节缓冲区由容器独占持有。隐藏过程可能触发 Gap2 扩容
//! (缓冲区重新分配)，扩容后此前取得的任何区域视图都已失效，
//! 必须重新派生。

use crate::constants::{
    BMP_HEADER_SIZE, BMP_MAGIC, SAVE_LOCK_POLL_INTERVAL, SAVE_LOCK_TIMEOUT,
};
use crate::error::StegError;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Instant;

/// BMP 文件头 (缓冲区偏移 0..14) 的只读视图。
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// 声明的文件总大小 (字节)。
    pub size: u32,
    /// 像素数据相对文件起始的偏移。
    pub pixel_offset: u32,
}

/// BMP 信息头 (缓冲区偏移 14..54) 的只读视图。
/// 只用于计算几何信息，除可读性外不做校验。
#[derive(Debug, Clone, Copy)]
pub struct InfoHeader {
    /// 信息头自身的大小 (字节)。
    pub header_size: u32,
    /// 图像宽度 (像素)。
    pub width: i32,
    /// 图像高度 (像素)，符号编码行序，行数取绝对值。
    pub height: i32,
    /// 颜色平面数。
    pub planes: u16,
    /// 每像素位数。
    pub bit_count: u16,
    /// 压缩方式。
    pub compression: u32,
    /// 声明的像素数据大小 (字节)。
    pub image_size: u32,
}

/// 像素阵列的派生视图：不持有数据，只描述几何信息。
#[derive(Debug, Clone, Copy)]
pub struct PixelArray {
    /// 像素阵列相对缓冲区起始的偏移。
    pub offset: usize,
    /// 每条扫描线的总字节数 (对齐到 4 字节的倍数)。
    pub row_size: usize,
    /// 每条扫描线末尾的填充字节数。为 0 时该区域没有隐写容量。
    pub padding_size: usize,
    /// 扫描线条数。
    pub num_rows: usize,
}

/// 一段结构空隙：像素数据之前的 Gap1 或之后的 Gap2。
#[derive(Debug, Clone, Copy)]
pub struct Gap {
    /// 空隙相对缓冲区起始的偏移。
    pub offset: usize,
    /// 空隙的字节数。
    pub len: usize,
}

/// 一个加载到内存中的 BMP 文件。
///
/// 构造时完整读入并解析头部，解析失败即无法构造。随后被单次
/// 隐藏操作原地修改 (可能扩容)，再保存回磁盘或丢弃。
pub struct BmpContainer {
    data: Vec<u8>,
    file_header: FileHeader,
    info_header: InfoHeader,
}

impl BmpContainer {
    /// 读取一个 BMP 文件并解析其头部。
    ///
    /// # Errors
    ///
    /// 文件无法读取，或头部不满足构造不变量 (魔数不是 "BM"、
    /// 文件不足 54 字节、像素偏移小于 54 或超出文件末尾)。
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StegError> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    /// 从内存中的完整文件内容构造容器。
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, StegError> {
        let (file_header, info_header) = parse_headers(&data)?;
        Ok(BmpContainer {
            data,
            file_header,
            info_header,
        })
    }

    /// 返回文件头视图。
    pub fn file_header(&self) -> FileHeader {
        self.file_header
    }

    /// 返回信息头视图。
    pub fn info_header(&self) -> InfoHeader {
        self.info_header
    }

    /// 返回缓冲区当前的完整内容。
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 返回缓冲区的可变引用，供隐写算法向区域内写入。
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// 按信息头计算像素阵列的几何视图。
    pub fn pixel_array(&self) -> PixelArray {
        let info = self.info_header;
        let width = info.width.unsigned_abs() as usize;
        let bit_count = info.bit_count as usize;

        // 扫描线对齐到 4 字节的倍数，这是 BMP 格式的硬性要求。
        let row_size = (width * bit_count + 31) / 32 * 4;
        let padding_size = row_size - width * bit_count / 8;

        PixelArray {
            offset: self.file_header.pixel_offset as usize,
            row_size,
            padding_size,
            num_rows: info.height.unsigned_abs() as usize,
        }
    }

    /// 像素行填充区域在缓冲区内实际可用的总字节数。
    pub fn padding_capacity(&self) -> usize {
        let pixels = self.pixel_array();
        if pixels.padding_size == 0 {
            return 0;
        }

        let mut capacity = 0;
        for row in 0..pixels.num_rows {
            let row_start = pixels.offset + row * pixels.row_size;
            let pad_start = row_start + pixels.row_size - pixels.padding_size;
            let pad_end = row_start + pixels.row_size;
            if pad_start >= self.data.len() {
                break;
            }
            capacity += pad_end.min(self.data.len()) - pad_start;
        }
        capacity
    }

    /// 返回 Gap1 视图：固定 54 字节头部区域之后、像素数据之前的空隙。
    /// 紧凑排布的文件没有 Gap1，返回 `None`。
    pub fn gap1(&self) -> Option<Gap> {
        let len = self.file_header.pixel_offset as usize - BMP_HEADER_SIZE;
        if len == 0 {
            return None;
        }
        Some(Gap {
            offset: BMP_HEADER_SIZE,
            len,
        })
    }

    /// 返回 Gap2 视图：声明的像素数据末尾到声明的文件末尾之间的空隙。
    ///
    /// 起始偏移超出缓冲区时返回 `None` (头部声明与实际内容矛盾，
    /// 该区域不可用)。长度可能为 0。
    pub fn gap2(&self) -> Option<Gap> {
        let start =
            self.file_header.pixel_offset as usize + self.info_header.image_size as usize;
        if start > self.data.len() {
            return None;
        }

        let end = (self.file_header.size as usize).min(self.data.len());
        Some(Gap {
            offset: start,
            len: end.saturating_sub(start),
        })
    }

    /// 确保 Gap2 至少能容纳 `needed` 个字节，必要时扩容缓冲区。
    ///
    /// 扩容后 Gap2 的大小恰好等于 `needed`，文件头中声明的文件
    /// 大小同步改写为新的末尾位置，保证保存后的文件自洽、
    /// 扩容区域在提取时可达。返回重新派生的 Gap2 视图。
    ///
    /// 缓冲区只增不减：文件在声明的末尾之后还携带额外字节时，
    /// 这些字节不属于任何区域，改写声明大小即可让 Gap2 覆盖
    /// 所需范围，无须截断缓冲区。
    pub fn ensure_gap2_capacity(&mut self, needed: usize) -> Option<Gap> {
        let gap = self.gap2()?;
        if gap.len < needed {
            let new_end = gap.offset + needed;
            if new_end > self.data.len() {
                self.data.resize(new_end, 0);
            }
            self.set_declared_size(new_end as u32);
        }
        self.gap2()
    }

    /// 将缓冲区写回磁盘。
    ///
    /// 目标文件被其他进程独占锁定时 (仅 Windows 可探测到共享冲突)，
    /// 以 100 毫秒为间隔轮询等待，最多 10 秒；超时返回
    /// [`StegError::SaveTimeout`]，而不是无限期阻塞。其余打开或
    /// 写入失败不参与等待，立即作为 I/O 错误返回。
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StegError> {
        let path = path.as_ref();

        let start_time = Instant::now();
        while is_locked_by_another_process(path) {
            if start_time.elapsed() >= SAVE_LOCK_TIMEOUT {
                return Err(StegError::SaveTimeout);
            }
            thread::sleep(SAVE_LOCK_POLL_INTERVAL);
        }

        fs::write(path, &self.data)?;
        Ok(())
    }

    fn set_declared_size(&mut self, size: u32) {
        self.data[2..6].copy_from_slice(&size.to_le_bytes());
        self.file_header.size = size;
    }
}

fn parse_headers(data: &[u8]) -> Result<(FileHeader, InfoHeader), StegError> {
    if data.len() < BMP_HEADER_SIZE {
        return Err(StegError::TruncatedHeader);
    }

    if data[0..2] != BMP_MAGIC {
        return Err(StegError::NotABitmap);
    }

    let file_header = FileHeader {
        size: read_u32(data, 2),
        pixel_offset: read_u32(data, 10),
    };

    if (file_header.pixel_offset as usize) < BMP_HEADER_SIZE {
        return Err(StegError::PixelOffsetTooSmall(file_header.pixel_offset));
    }
    if file_header.pixel_offset as usize > data.len() {
        return Err(StegError::PixelOffsetOutOfBounds(file_header.pixel_offset));
    }

    let info_header = InfoHeader {
        header_size: read_u32(data, 14),
        width: read_u32(data, 18) as i32,
        height: read_u32(data, 22) as i32,
        planes: read_u16(data, 26),
        bit_count: read_u16(data, 28),
        compression: read_u32(data, 30),
        image_size: read_u32(data, 34),
    };

    Ok((file_header, info_header))
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// 探测目标文件是否被其他进程独占锁定。
///
/// 只有真正的共享冲突才算锁定并值得等待；权限不足等永久性错误
/// 不在此判定，留给后续的写入立即浮出，避免把它们误当作
/// 短暂的文件锁空等到超时。
#[cfg(windows)]
fn is_locked_by_another_process(path: &Path) -> bool {
    match fs::OpenOptions::new().write(true).open(path) {
        Ok(_) => false,
        // ERROR_SHARING_VIOLATION
        Err(err) => err.raw_os_error() == Some(32),
    }
}

/// 非 Windows 平台没有强制性文件锁，独占锁定无从探测，
/// 直接交给写入操作报告真实错误。
#[cfg(not(windows))]
fn is_locked_by_another_process(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 手工构造一个自底向上的 24 位 BMP，便于精确控制各区域大小。
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

    #[test]
    fn test_parse_valid_file() {
        let container = BmpContainer::from_bytes(build_bmp(2, 2, 0, 0)).unwrap();
        assert_eq!(container.file_header().pixel_offset, 54);
        assert_eq!(container.info_header().width, 2);
        assert_eq!(container.info_header().bit_count, 24);
    }

    #[test]
    fn test_reject_bad_magic() {
        let mut data = build_bmp(2, 2, 0, 0);
        data[0] = b'X';
        assert!(matches!(
            BmpContainer::from_bytes(data),
            Err(StegError::NotABitmap)
        ));
    }

    #[test]
    fn test_reject_truncated_file() {
        assert!(matches!(
            BmpContainer::from_bytes(vec![b'B', b'M', 0, 0]),
            Err(StegError::TruncatedHeader)
        ));
    }

    #[test]
    fn test_reject_pixel_offset_too_small() {
        let mut data = build_bmp(2, 2, 0, 0);
        data[10..14].copy_from_slice(&10u32.to_le_bytes());
        assert!(matches!(
            BmpContainer::from_bytes(data),
            Err(StegError::PixelOffsetTooSmall(10))
        ));
    }

    #[test]
    fn test_reject_pixel_offset_out_of_bounds() {
        let mut data = build_bmp(2, 2, 0, 0);
        data[10..14].copy_from_slice(&100_000u32.to_le_bytes());
        assert!(matches!(
            BmpContainer::from_bytes(data),
            Err(StegError::PixelOffsetOutOfBounds(100_000))
        ));
    }

    #[test]
    fn test_pixel_geometry_24bpp() {
        // 宽 2、24 位：每行 6 字节有效数据，对齐到 8，填充 2。
        let container = BmpContainer::from_bytes(build_bmp(2, 3, 0, 0)).unwrap();
        let pixels = container.pixel_array();
        assert_eq!(pixels.row_size, 8);
        assert_eq!(pixels.padding_size, 2);
        assert_eq!(pixels.num_rows, 3);
        assert_eq!(container.padding_capacity(), 6);
    }

    #[test]
    fn test_pixel_geometry_no_padding() {
        // 宽 4、24 位：每行恰好 12 字节，没有填充，区域无容量。
        let container = BmpContainer::from_bytes(build_bmp(4, 4, 0, 0)).unwrap();
        assert_eq!(container.pixel_array().padding_size, 0);
        assert_eq!(container.padding_capacity(), 0);
    }

    #[test]
    fn test_gap_presence() {
        let tight = BmpContainer::from_bytes(build_bmp(2, 2, 0, 0)).unwrap();
        assert!(tight.gap1().is_none());
        assert_eq!(tight.gap2().unwrap().len, 0);

        let roomy = BmpContainer::from_bytes(build_bmp(2, 2, 10, 7)).unwrap();
        let gap1 = roomy.gap1().unwrap();
        assert_eq!(gap1.offset, 54);
        assert_eq!(gap1.len, 10);
        let gap2 = roomy.gap2().unwrap();
        assert_eq!(gap2.offset, 54 + 10 + 16);
        assert_eq!(gap2.len, 7);
    }

    #[test]
    fn test_negative_height_uses_magnitude() {
        let mut data = build_bmp(2, 2, 0, 0);
        data[22..26].copy_from_slice(&(-2i32).to_le_bytes());
        let container = BmpContainer::from_bytes(data).unwrap();
        assert_eq!(container.pixel_array().num_rows, 2);
    }

    #[test]
    fn test_gap2_growth_updates_declared_size() {
        let mut container = BmpContainer::from_bytes(build_bmp(2, 2, 0, 0)).unwrap();
        let original_len = container.as_bytes().len();

        let gap2 = container.ensure_gap2_capacity(9).unwrap();
        assert_eq!(gap2.len, 9);
        assert_eq!(container.as_bytes().len(), original_len + 9);
        assert_eq!(container.file_header().size as usize, original_len + 9);

        // 缓冲区内声明的文件大小也必须被改写。
        let declared = u32::from_le_bytes(container.as_bytes()[2..6].try_into().unwrap());
        assert_eq!(declared as usize, original_len + 9);
    }

    #[test]
    fn test_gap2_growth_is_idempotent_when_large_enough() {
        let mut container = BmpContainer::from_bytes(build_bmp(2, 2, 0, 20)).unwrap();
        let before = container.as_bytes().len();
        let gap2 = container.ensure_gap2_capacity(9).unwrap();
        assert_eq!(gap2.len, 20);
        assert_eq!(container.as_bytes().len(), before);
    }

    #[test]
    fn test_gap2_growth_never_shrinks_buffer() {
        // 声明的文件末尾之后还挂着 100 个额外字节的文件。
        let mut data = build_bmp(2, 2, 0, 2);
        data.extend(std::iter::repeat(0x5c).take(100));
        let mut container = BmpContainer::from_bytes(data).unwrap();
        let before = container.as_bytes().len();

        let gap2 = container.ensure_gap2_capacity(9).unwrap();
        assert_eq!(gap2.len, 9);
        // 扩容只改写声明大小，额外字节不允许被截断。
        assert_eq!(container.as_bytes().len(), before);
        assert_eq!(container.file_header().size as usize, gap2.offset + 9);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_permission_error_is_not_a_lock_timeout() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readonly.bmp");
        fs::write(&path, b"stub").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        let container = BmpContainer::from_bytes(build_bmp(2, 2, 0, 0)).unwrap();
        let start = Instant::now();
        let result = container.save(&path);

        // 权限不足是永久性错误，必须立即浮出，
        // 不允许被当作短暂的文件锁空等到超时。
        assert!(start.elapsed() < SAVE_LOCK_TIMEOUT);
        assert!(!matches!(result, Err(StegError::SaveTimeout)));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bmp");

        let container = BmpContainer::from_bytes(build_bmp(2, 2, 3, 5)).unwrap();
        container.save(&path).unwrap();

        let reloaded = BmpContainer::open(&path).unwrap();
        assert_eq!(reloaded.as_bytes(), container.as_bytes());
    }
}
