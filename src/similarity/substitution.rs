// src/similarity/substitution.rs
use std::fs;
use std::path::Path;
use log::{info, debug};
use crate::error::{Error, Result};

const BLOSUM62: &str = include_str!("blosum62.txt");

/// Symmetric integer scores for every pair of amino-acid letters.
///
/// Lookups are by byte and case-insensitive. Letters absent from the table
/// have no score, which the convergence predicate treats as not tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionMatrix {
    letters: Vec<u8>,
    index: Vec<Option<usize>>,
    scores: Vec<i32>,
}

impl SubstitutionMatrix {
    /// The standard BLOSUM62 table, used when no matrix file is configured.
    pub fn blosum62() -> Result<Self> {
        Self::parse(BLOSUM62)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let matrix = Self::parse(&content).map_err(|e| {
            Error::matrix(format!("{}: {}", path.as_ref().display(), e))
        })?;
        info!(
            "Loaded {}x{} substitution matrix from {}",
            matrix.len(), matrix.len(), path.as_ref().display()
        );
        Ok(matrix)
    }

    /// Parse a square table with a header row of letters.
    ///
    /// Comma and tab separated tables go through the csv reader, so quoted
    /// cells are accepted. Anything else is split on runs of whitespace, as
    /// in the NCBI layout. Data rows may start with their own letter;
    /// unlabelled rows follow header order.
    pub fn parse(content: &str) -> Result<Self> {
        let mut rows = tokenize(content)?.into_iter();

        let mut header = rows
            .next()
            .ok_or_else(|| Error::matrix("empty substitution matrix"))?;
        // A leading index column shows up as an empty or non-letter first cell
        if header.first().map_or(false, |t| t.len() != 1) {
            header.remove(0);
        }
        let letters = header
            .iter()
            .map(|token| single_letter(token))
            .collect::<Result<Vec<u8>>>()?;
        let n = letters.len();
        if n == 0 {
            return Err(Error::matrix("header has no letters"));
        }

        let mut table: Vec<Option<Vec<i32>>> = vec![None; n];
        let mut row_count = 0;
        for (row_idx, tokens) in rows.enumerate() {
            let (label, values) = if tokens.len() == n + 1 {
                (single_letter(&tokens[0])?, &tokens[1..])
            } else if tokens.len() == n {
                match letters.get(row_idx) {
                    Some(&letter) => (letter, &tokens[..]),
                    None => return Err(Error::matrix(format!("more than {} data rows", n))),
                }
            } else {
                return Err(Error::matrix(format!(
                    "row {} has {} cells, expected {}", row_idx + 1, tokens.len(), n
                )));
            };

            let position = letters
                .iter()
                .position(|&l| l == label)
                .ok_or_else(|| Error::matrix(format!("row letter '{}' not in header", label as char)))?;
            if table[position].is_some() {
                return Err(Error::matrix(format!("duplicate row for '{}'", label as char)));
            }

            let parsed = values
                .iter()
                .map(|v| {
                    v.parse::<i32>()
                        .map_err(|_| Error::matrix(format!("non-integer score '{}' in row '{}'", v, label as char)))
                })
                .collect::<Result<Vec<i32>>>()?;
            table[position] = Some(parsed);
            row_count += 1;
        }

        if row_count != n {
            return Err(Error::matrix(format!("expected {} rows, found {}", n, row_count)));
        }
        let table: Vec<Vec<i32>> = table.into_iter().flatten().collect();
        Self::from_rows(&letters, &table)
    }

    /// Build from letters and a row-major score table, checking shape and symmetry.
    pub fn from_rows(letters: &[u8], rows: &[Vec<i32>]) -> Result<Self> {
        let n = letters.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(Error::matrix(format!("matrix must be {}x{}", n, n)));
        }

        let mut index = vec![None; 256];
        for (i, &letter) in letters.iter().enumerate() {
            let upper = letter.to_ascii_uppercase();
            if index[upper as usize].is_some() {
                return Err(Error::matrix(format!("duplicate letter '{}'", letter as char)));
            }
            index[upper as usize] = Some(i);
            index[upper.to_ascii_lowercase() as usize] = Some(i);
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if rows[i][j] != rows[j][i] {
                    return Err(Error::matrix(format!(
                        "matrix is not symmetric at ({}, {}): {} vs {}",
                        letters[i] as char, letters[j] as char, rows[i][j], rows[j][i]
                    )));
                }
            }
        }

        let scores = rows.iter().flatten().copied().collect();
        debug!("Built substitution matrix over {} letters", n);
        Ok(Self {
            letters: letters.iter().map(u8::to_ascii_uppercase).collect(),
            index,
            scores,
        })
    }

    pub fn letters(&self) -> &[u8] {
        &self.letters
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> Option<i32> {
        let i = self.index[a as usize]?;
        let j = self.index[b as usize]?;
        Some(self.scores[i * self.letters.len() + j])
    }

    /// Strictly positive score, i.e. a biochemically tolerated substitution.
    #[inline]
    pub fn is_tolerated(&self, a: u8, b: u8) -> bool {
        self.score(a, b).map_or(false, |s| s > 0)
    }
}

fn single_letter(token: &str) -> Result<u8> {
    let bytes = token.trim_matches('"').as_bytes();
    match bytes {
        [b] if b.is_ascii_graphic() => Ok(*b),
        _ => Err(Error::matrix(format!("'{}' is not a single amino-acid letter", token))),
    }
}

fn is_content(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('#')
}

/// Split the table into rows of cells, skipping blank and `#` lines.
fn tokenize(content: &str) -> Result<Vec<Vec<String>>> {
    let first = match content.lines().find(|l| is_content(l)) {
        Some(line) => line,
        None => return Ok(Vec::new()),
    };
    let delimiter = if first.contains(',') {
        Some(b',')
    } else if first.contains('\t') {
        Some(b'\t')
    } else {
        None
    };

    let delimiter = match delimiter {
        Some(d) => d,
        None => {
            return Ok(content
                .lines()
                .filter(|l| is_content(l))
                .map(|l| l.split_whitespace().map(str::to_string).collect())
                .collect());
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::matrix(format!("unreadable row: {}", e)))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
