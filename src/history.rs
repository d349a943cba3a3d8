//! Command history kept by the session and consulted by the `history` builtin.
//!
//! Files use one entry per line. `flushed` counts the entries already written out
//! by `-w`, `-a` or the startup load, so `-a` only appends what is new.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    flushed: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries not yet written out by `-w`/`-a`.
    pub fn pending(&self) -> &[String] {
        &self.entries[self.flushed.min(self.entries.len())..]
    }

    /// Last `count` entries with their 1-based position in the whole history.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = (usize, &str)> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, e)| (i + 1, e.as_str()))
    }

    /// `history -r`: append every non-empty line of `path`. Returns how many were read.
    pub fn read_from(&mut self, path: &Path) -> io::Result<usize> {
        let reader = BufReader::new(fs::File::open(path)?);
        let mut read = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                read.push(line);
            }
        }
        let count = read.len();
        self.entries.extend(read);
        Ok(count)
    }

    /// Startup load: like [`History::read_from`], but the loaded entries count as flushed.
    pub fn load(&mut self, path: &Path) -> io::Result<usize> {
        let read = self.read_from(path)?;
        self.flushed = self.entries.len();
        Ok(read)
    }

    /// `history -w`: replace the file with the full history.
    pub fn write_to(&mut self, path: &Path) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        write_lines(&mut file, &self.entries)?;
        self.flushed = self.entries.len();
        Ok(())
    }

    /// `history -a`: append the entries added since the last flush.
    pub fn append_to(&mut self, path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        write_lines(&mut file, self.pending())?;
        self.flushed = self.entries.len();
        Ok(())
    }
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}
