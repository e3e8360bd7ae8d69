use crate::error::{GradeError, Result};
use crate::models::batch::{BatchInput, BatchRow, RESULT_COLUMNS};
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use std::path::Path;
use tokio::fs;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 答案所在的列名
pub const ANSWER_COLUMN: &str = "student_answer";

/// 读入的 CSV 表
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: ByteRecord,
    pub rows: Vec<ByteRecord>,
    /// 输入是否带 BOM，写回时保持一致
    pub has_bom: bool,
}

impl CsvTable {
    /// 按列名查找列索引（忽略首尾空白）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| String::from_utf8_lossy(h).trim() == name)
    }

    /// 拆成批量输入；表头里没有 `student_answer` 列时报缺少字段
    pub fn to_inputs(&self) -> Result<Vec<BatchInput>> {
        let column = self
            .column_index(ANSWER_COLUMN)
            .ok_or_else(|| GradeError::missing(ANSWER_COLUMN))?;

        Ok(self
            .rows
            .iter()
            .map(|row| {
                let answer = row
                    .get(column)
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
                BatchInput::new(row.clone(), answer)
            })
            .collect())
    }
}

/// 解析 CSV 字节；行的字段数可以与表头不一致
pub fn parse_csv(data: &[u8], delimiter: u8) -> Result<CsvTable> {
    let (has_bom, body) = match data.strip_prefix(UTF8_BOM) {
        Some(rest) => (true, rest),
        None => (false, data),
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(body);

    let headers = reader.byte_headers()?.clone();
    let rows = reader.byte_records().collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(CsvTable {
        headers,
        rows,
        has_bom,
    })
}

/// 把结果写回 CSV：原表头 + 三个结果列
///
/// 字段数不一致的行先补齐到同一宽度，结果列始终落在各自的表头下；
/// 比表头长的行会让表头补上空列名。
pub fn write_csv(table: &CsvTable, rows: &[BatchRow], delimiter: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    if table.has_bom {
        out.extend_from_slice(UTF8_BOM);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(out);

    let width = rows
        .iter()
        .map(|row| row.fields.len())
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or_default();

    let mut headers = table.headers.clone();
    while headers.len() < width {
        headers.push_field(b"");
    }
    for column in RESULT_COLUMNS {
        headers.push_field(column.as_bytes());
    }
    writer.write_byte_record(&headers)?;

    for row in rows {
        writer.write_byte_record(&row.to_record(width))?;
    }

    writer
        .into_inner()
        .map_err(|e| GradeError::Io(e.into_error()))
}

/// 从文件加载 CSV
pub async fn load_csv_file(path: &Path, delimiter: u8) -> Result<CsvTable> {
    let data = fs::read(path).await?;
    let table = parse_csv(&data, delimiter)?;
    tracing::info!(
        "✓ 已加载 {}: {} 行",
        path.file_name().unwrap_or_default().to_string_lossy(),
        table.rows.len()
    );
    Ok(table)
}

/// 写出评分后的 CSV 文件
pub async fn save_csv_file(
    path: &Path,
    table: &CsvTable,
    rows: &[BatchRow],
    delimiter: u8,
) -> Result<()> {
    let data = write_csv(table, rows, delimiter)?;
    fs::write(path, data).await?;
    tracing::info!("✓ 结果已写入: {}", path.display());
    Ok(())
}
