use crate::domains::export::types::ExportError;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone)]
pub struct CsvConfig {
    pub delimiter: u8,
    pub quote_char: u8,
    /// Prefix output with a UTF-8 BOM for spreadsheet tools
    pub include_bom: bool,
    /// Rows written between explicit flushes of the sink
    pub flush_interval: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote_char: b'"',
            include_bom: false,
            flush_interval: 100,
        }
    }
}

/// Running totals of a `CsvStreamWriter`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub rows_written: u64,
    pub bytes_written: u64,
    pub duration_ms: u64,
}

/// Ordered CSV sink: a header once, then one row at a time.
///
/// Each record is encoded on its own and handed to the underlying
/// `AsyncWrite` straight away, so a slow reader applies backpressure to
/// whoever is producing rows.
pub struct CsvStreamWriter<W: AsyncWrite + Unpin + Send> {
    inner: W,
    config: CsvConfig,
    header_written: bool,
    rows_since_flush: usize,
    stats: WriterStats,
    start_time: Instant,
}

impl<W: AsyncWrite + Unpin + Send> CsvStreamWriter<W> {
    pub fn new(writer: W, config: CsvConfig) -> Self {
        Self {
            inner: writer,
            config,
            header_written: false,
            rows_since_flush: 0,
            stats: WriterStats::default(),
            start_time: Instant::now(),
        }
    }

    /// Write the header. Later calls are ignored.
    pub async fn write_header<I, S>(&mut self, columns: I) -> Result<(), ExportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        if self.header_written {
            log::warn!("CSV header already written, ignoring second header");
            return Ok(());
        }
        self.header_written = true;

        let encoded = self.encode(columns)?;
        if self.config.include_bom {
            // UTF-8 BOM for Excel compatibility
            self.write_bytes(b"\xEF\xBB\xBF").await?;
        }
        self.write_bytes(&encoded).await?;
        // Get the header to the client before the first (possibly slow) row
        self.inner.flush().await?;
        Ok(())
    }

    pub async fn write_row<I, S>(&mut self, fields: I) -> Result<(), ExportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let encoded = self.encode(fields)?;
        self.write_bytes(&encoded).await?;
        self.stats.rows_written += 1;

        self.rows_since_flush += 1;
        if self.rows_since_flush >= self.config.flush_interval {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), ExportError> {
        self.inner.flush().await?;
        self.rows_since_flush = 0;
        Ok(())
    }

    /// Flush everything and report totals. The sink itself stays open.
    pub async fn close(&mut self) -> Result<WriterStats, ExportError> {
        self.flush().await?;
        Ok(self.stats())
    }

    pub fn stats(&self) -> WriterStats {
        WriterStats {
            duration_ms: self.start_time.elapsed().as_millis() as u64,
            ..self.stats.clone()
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.stats.rows_written
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn encode<I, S>(&self, fields: I) -> Result<Vec<u8>, ExportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.config.delimiter)
            .quote(self.config.quote_char)
            .terminator(csv::Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.write_record(fields)?;
        wtr.into_inner()
            .map_err(|e| ExportError::Serialization(e.to_string()))
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        self.inner.write_all(bytes).await?;
        self.stats.bytes_written += bytes.len() as u64;
        Ok(())
    }
}
