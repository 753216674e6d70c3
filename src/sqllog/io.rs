//! 输入读取：按行或按固定大小分块
//!
//! 两种方式都产出 `Result<String>` 的行序列，交给 [`Statements`] 重组。
//! 分块方式下，块尾不完整的行片段会保留到下一块拼接，绝不会被当作整行；
//! 文件末尾没有换行符的最后一段作为最后一行。
//!
//! 无效的 UTF-8 字节按替换字符处理，不会中断读取。
//!
//! [`Statements`]: crate::sqllog::parser::Statements

use crate::error::{Result, SummaryError};
use crate::sqllog::types::ReadMode;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// 打开文件并按读取方式构造行序列
pub fn open_lines<P: AsRef<Path>>(
    path: P,
    mode: ReadMode,
) -> Result<Box<dyn Iterator<Item = Result<String>>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(SummaryError::Io)?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);
    tracing::debug!(
        "打开输入文件 {}, 大小 {} 字节, 读取方式 {:?}",
        path.display(),
        total,
        mode
    );

    Ok(match mode {
        ReadMode::Lines => Box::new(LineReader::new(BufReader::new(file))),
        ReadMode::Chunked { chunk_bytes } => {
            Box::new(ChunkedLines::new(file, chunk_bytes))
        }
    })
}

/// 把一行字节解码为字符串，去掉行尾的换行符
fn decode_line(mut bytes: &[u8]) -> String {
    if let Some(stripped) = bytes.strip_suffix(b"\n") {
        bytes = stripped;
    }
    if let Some(stripped) = bytes.strip_suffix(b"\r") {
        bytes = stripped;
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            tracing::trace!(len = bytes.len(), error = %e, "发现无效 UTF-8 字节序列");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// 按行读取（`read_until(b'\n')`）
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    failed: bool,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: Vec::new(), failed: false }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(decode_line(&self.buf))),
            Err(e) => {
                self.failed = true;
                Some(Err(SummaryError::Io(e)))
            }
        }
    }
}

/// 按固定字节数分块读取，并在块边界处重新拼接行
///
/// 每块直接追加到 `carry` 的尾部，不为每块单独分配缓冲区；
/// 块大小只是单次读取的上限，实际占用随数据增长。
pub struct ChunkedLines<R> {
    reader: R,
    chunk_bytes: usize,
    /// 尚未遇到换行符的片段，两次读取之间其中不含换行符
    carry: Vec<u8>,
    ready: VecDeque<String>,
    /// 读取出错前已拿到的行先交出去，错误留到之后返回
    deferred: Option<std::io::Error>,
    eof: bool,
    failed: bool,
    chunks_read: u64,
}

impl<R: Read> ChunkedLines<R> {
    pub fn new(reader: R, chunk_bytes: usize) -> Self {
        Self {
            reader,
            chunk_bytes: chunk_bytes.max(1),
            carry: Vec::new(),
            ready: VecDeque::new(),
            deferred: None,
            eof: false,
            failed: false,
            chunks_read: 0,
        }
    }

    /// 读取下一块并切分出完整的行
    fn fill(&mut self) {
        let start = self.carry.len();
        let limit = u64::try_from(self.chunk_bytes).unwrap_or(u64::MAX);
        let read = (&mut self.reader).take(limit).read_to_end(&mut self.carry);
        let n = self.carry.len() - start;
        if let Err(e) = read {
            self.deferred = Some(e);
        }

        if n == 0 {
            if self.deferred.is_some() {
                return;
            }
            self.eof = true;
            if !self.carry.is_empty() {
                let last = std::mem::take(&mut self.carry);
                self.ready.push_back(decode_line(&last));
            }
            return;
        }

        self.chunks_read += 1;
        tracing::trace!(chunk = self.chunks_read, bytes = n, "读取输入块");

        // 旧片段里没有换行符，只需在新读入的部分查找
        let Some(pos) = self.carry[start..].iter().rposition(|&b| b == b'\n') else {
            return;
        };

        let rest = self.carry.split_off(start + pos + 1);
        let complete = std::mem::replace(&mut self.carry, rest);
        for line in complete.split_inclusive(|&b| b == b'\n') {
            self.ready.push_back(decode_line(line));
        }
    }
}

impl<R: Read> Iterator for ChunkedLines<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if let Some(e) = self.deferred.take() {
                self.failed = true;
                return Some(Err(SummaryError::Io(e)));
            }
            if self.eof || self.failed {
                return None;
            }
            self.fill();
        }
    }
}
