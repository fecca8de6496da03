//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("could not open {:?} for reading: {}", path.as_ref(), e))?;
    if is_gz(path.as_ref()) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let decoder = MultiGzDecoder::new(BufReader::new(file));
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Writer to a plain or gzip-compressed file.
///
/// Call `finish` when done so that errors on writing the gzip trailer are reported.
pub enum MaybeGzWriter {
    /// Plain text output.
    Plain(BufWriter<File>),
    /// Gzip-compressed output.
    Gz(GzEncoder<BufWriter<File>>),
}

impl MaybeGzWriter {
    /// Flush all output, writing the gzip trailer if compressed.
    pub fn finish(self) -> Result<(), anyhow::Error> {
        match self {
            MaybeGzWriter::Plain(mut writer) => writer.flush()?,
            MaybeGzWriter::Gz(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for MaybeGzWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            MaybeGzWriter::Plain(writer) => writer.write(buf),
            MaybeGzWriter::Gz(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            MaybeGzWriter::Plain(writer) => writer.flush(),
            MaybeGzWriter::Gz(encoder) => encoder.flush(),
        }
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<MaybeGzWriter, anyhow::Error>
where
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())
        .map_err(|e| anyhow::anyhow!("could not open {:?} for writing: {}", path.as_ref(), e))?;
    if is_gz(path.as_ref()) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        Ok(MaybeGzWriter::Gz(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        Ok(MaybeGzWriter::Plain(BufWriter::new(file)))
    }
}

/// Return whether `path` has a `.gz` extension.
pub fn is_gz(path: &Path) -> bool {
    path.extension().map(|s| s.to_str()) == Some(Some("gz"))
}

/// Return the extension of `path` after stripping an optional `.gz` extension.
///
/// For `expr.tsv.gz` this is `tsv`, for `expr.csv` this is `csv`.
pub fn inner_extension(path: &Path) -> Option<String> {
    let path = if is_gz(path) {
        Path::new(path.file_stem()?)
    } else {
        path
    };
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Read the non-empty, trimmed lines of a (possibly gzip-compressed) file.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>, anyhow::Error> {
    let reader = open_read_maybe_gz(path)?;
    let mut result = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            result.push(line.to_string());
        }
    }
    Ok(result)
}
