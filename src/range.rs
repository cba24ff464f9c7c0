//! Range 头解析与响应字节窗口计算。

/// 一次部分响应要返回的闭区间字节窗口。
/// 任何实例都满足 `start <= end < total`，长度恒为正。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteWindow {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteWindow {
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Range 求值结果：完整响应（200）或部分响应（206）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangePlan {
    Full { total: u64 },
    Partial(ByteWindow),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RangeError {
    /// 头部不符合 `bytes=<start>-<end?>`，响应 400。
    Malformed,
    /// 起点越过文件末尾（或区间为空），响应 416。
    Unsatisfiable { size: u64 },
}

/// 依据可选的 Range 头计算响应窗口。
///
/// 无 Range 头时返回完整响应。有头时要求 `bytes=<start>-<end?>`：
/// 起点必填，终点缺省时只返回一个 `chunk_size` 大小的窗口
/// （客户端通过后续 Range 请求继续拉取），给定的终点收敛到文件末尾。
pub fn plan_range(
    header: Option<&str>,
    file_size: u64,
    chunk_size: u64,
) -> Result<RangePlan, RangeError> {
    let Some(header) = header else {
        return Ok(RangePlan::Full { total: file_size });
    };

    let Some(spec) = header.strip_prefix("bytes=") else {
        return Err(RangeError::Malformed);
    };
    if spec.contains(',') {
        // 多段 Range 不支持。
        return Err(RangeError::Malformed);
    }
    let Some((start_part, end_part)) = spec.split_once('-') else {
        return Err(RangeError::Malformed);
    };

    let start: u64 = start_part.parse().map_err(|_| RangeError::Malformed)?;
    if start >= file_size {
        return Err(RangeError::Unsatisfiable { size: file_size });
    }

    let end = if end_part.is_empty() {
        start.saturating_add(chunk_size - 1).min(file_size - 1)
    } else {
        let requested: u64 = end_part.parse().map_err(|_| RangeError::Malformed)?;
        requested.min(file_size - 1)
    };
    if end < start {
        return Err(RangeError::Unsatisfiable { size: file_size });
    }

    Ok(RangePlan::Partial(ByteWindow {
        start,
        end,
        total: file_size,
    }))
}
