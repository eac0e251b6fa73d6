//! Load stage: batch raw rows through a pipeline into a sink.

use std::io::Write;

use crate::config::PipelineConfig;
use crate::error::{ExoError, ExoResult};
use crate::transform::TransformPipeline;
use crate::value::Record;

/// Destination for normalized batches.
pub trait RecordSink {
    fn write_batch(&mut self, batch: &[Record]) -> ExoResult<()>;
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write_batch(&mut self, batch: &[Record]) -> ExoResult<()> {
        for record in batch {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every batch in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<Record>>,
}

impl MemorySink {
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.batches.iter().flatten()
    }
}

impl RecordSink for MemorySink {
    fn write_batch(&mut self, batch: &[Record]) -> ExoResult<()> {
        self.batches.push(batch.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub batches: usize,
    pub records: usize,
}

/// Splits rows into batches, normalizes each and hands it to a sink.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    batch_size: usize,
    max_records: Option<usize>,
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> ExoResult<Self> {
        if batch_size == 0 {
            return Err(ExoError::InvalidInput("batch_size must be positive".to_string()));
        }
        Ok(Self {
            batch_size,
            max_records: None,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> ExoResult<Self> {
        Ok(Self::new(config.batch_size)?.max_records(config.max_records))
    }

    /// Stop after this many input rows.
    pub fn max_records(mut self, max: Option<usize>) -> Self {
        self.max_records = max;
        self
    }

    pub fn run(
        &self,
        rows: &[Record],
        pipeline: &TransformPipeline,
        sink: &mut dyn RecordSink,
    ) -> ExoResult<LoadSummary> {
        let rows = match self.max_records {
            Some(max) if max < rows.len() => &rows[..max],
            _ => rows,
        };

        let mut summary = LoadSummary::default();
        for chunk in rows.chunks(self.batch_size) {
            let batch = pipeline.transform_batch(chunk);
            sink.write_batch(&batch)?;
            summary.batches += 1;
            summary.records += batch.len();
            tracing::debug!("Loaded batch {} ({} records)", summary.batches, batch.len());
        }

        tracing::info!(
            "Loaded {} records in {} batches",
            summary.records,
            summary.batches
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;
    use pretty_assertions::assert_eq;

    fn rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let mut r = Record::new();
                r.insert("ID".into(), FieldValue::String(i.to_string()));
                r
            })
            .collect()
    }

    #[test]
    fn test_batches() {
        let mut sink = MemorySink::default();
        let summary = BatchLoader::new(2)
            .unwrap()
            .run(&rows(5), &TransformPipeline::new(), &mut sink)
            .unwrap();
        assert_eq!(summary, LoadSummary { batches: 3, records: 5 });
        assert_eq!(sink.batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(sink.records().last().unwrap()["id"], FieldValue::Integer(4));
    }

    #[test]
    fn test_max_records() {
        let mut sink = MemorySink::default();
        let summary = BatchLoader::new(10)
            .unwrap()
            .max_records(Some(3))
            .run(&rows(5), &TransformPipeline::new(), &mut sink)
            .unwrap();
        assert_eq!(summary.records, 3);
    }

    #[test]
    fn test_zero_batch_size() {
        assert!(BatchLoader::new(0).is_err());
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        BatchLoader::new(1)
            .unwrap()
            .run(&rows(2), &TransformPipeline::new(), &mut sink)
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "{\"id\":0}\n{\"id\":1}\n");
    }
}
