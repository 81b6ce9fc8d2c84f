pub use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    fmt,
    str::FromStr,
    time::Instant,
};
pub use thiserror::Error;
pub use itertools::Itertools;
pub use rayon::prelude::*;
pub use indexmap::IndexMap;
pub use clap::{Parser, ValueEnum};
pub use tracing::{debug, error, info, warn};

pub use crate::{Extent, FreeList, PartitionAllocator, Job, PagingEngine,
    address::*,
    history::*,
    program::*,
    job::{PageTableEntry, AccessResult, WriteBack, JobStats},
    partition::PartitionStats,
};

/// The unit for measuring addresses and sizes. The simulators do not
/// care whether a unit is a byte, a word or a kilobyte, as long as both
/// engines are fed consistent numbers.
pub type Units = usize;

/// Identifies a process holding a contiguous partition.
pub type ProcId = u32;
/// Identifies a paged job.
pub type JobId = u32;
pub type PageNo = usize;
pub type FrameId = usize;

/// Placement policy used when more than one free extent
/// can satisfy a request.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug)]
pub enum Strategy {
    /// The first qualifying extent in address order
    FirstFit,
    /// The smallest qualifying extent (lowest address on ties)
    BestFit,
    /// The largest qualifying extent (lowest address on ties)
    WorstFit,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::FirstFit  => "first_fit",
            Strategy::BestFit   => "best_fit",
            Strategy::WorstFit  => "worst_fit",
        };
        f.write_str(name)
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_fit" | "first"   => Ok(Strategy::FirstFit),
            "best_fit" | "best"     => Ok(Strategy::BestFit),
            "worst_fit" | "worst"   => Ok(Strategy::WorstFit),
            other                   => Err(format!("unknown strategy `{other}`")),
        }
    }
}

/// Every failure an engine reports falls into exactly one of these.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Malformed or out-of-range input. The caller may retry with
    /// something sensible.
    InvalidRequest,
    /// The request was fine, but there is no room for it.
    ResourceExhausted,
    /// The engine found its own state corrupted. This is a bug.
    InvariantViolation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("address space size must be positive")]
    ZeroTotalSize,
    #[error("process {id} requested zero units")]
    ZeroSize { id: ProcId },
    #[error("process {id} already holds {extent}")]
    DuplicateId { id: ProcId, extent: Extent },
    #[error("process {id} holds no allocation")]
    UnknownId { id: ProcId },
    #[error("no free extent can hold {size} units (largest free extent: {largest})")]
    NoFit { size: Units, largest: Units },
    #[error("allocator invariant broken: {0}")]
    Invariant(String),
}

impl PartitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PartitionError::NoFit { .. }    => ErrorKind::ResourceExhausted,
            PartitionError::Invariant(_)    => ErrorKind::InvariantViolation,
            _                               => ErrorKind::InvalidRequest,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PagingError {
    #[error("job {0} does not exist")]
    UnknownJob(JobId),
    #[error("page {page} is outside the job's range (0~{last})")]
    PageOutOfRange { page: PageNo, last: PageNo },
    #[error("offset {offset} is outside the page (0~{last})")]
    OffsetOutOfRange { offset: Units, last: Units },
    #[error("logical address {address} does not fit in {bits} bits")]
    AddressOutOfRange { address: Units, bits: u32 },
    #[error("a job needs at least one page")]
    NoPages,
    #[error("{requested} pages requested, but at most {max} are addressable")]
    TooManyPages { requested: usize, max: usize },
    #[error("a job needs at least one frame")]
    NoFrames,
    #[error("frame {0} is listed more than once")]
    DuplicateFrame(FrameId),
    #[error("frame {frame} is outside physical memory (0~{last})")]
    FrameOutOfRange { frame: FrameId, last: FrameId },
    #[error("paging invariant broken: {0}")]
    Invariant(String),
}

impl PagingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PagingError::Invariant(_)   => ErrorKind::InvariantViolation,
            _                           => ErrorKind::InvalidRequest,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{0}` must be at least 1 bit wide")]
    ZeroWidth(&'static str),
    #[error("address layout needs {needed} bits, but only {available} are available")]
    TooWide { needed: u32, available: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
/// Appears while reading a driver script.
pub struct ScriptError {
    pub message:    String,
    pub line:       usize,
}

/// One step of a partition workload, as read from a script
/// or produced by a generator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PartitionOp {
    /// `id == None` means "use the allocator's next id".
    Alloc { id: Option<ProcId>, size: Units, strategy: Strategy },
    Free { id: ProcId },
    Undo,
    Redo,
}

impl PartitionOp {
    /// Same operation, but placed with `strategy`. Non-allocations
    /// are returned untouched.
    pub fn with_strategy(self, strategy: Strategy) -> Self {
        match self {
            PartitionOp::Alloc { id, size, .. } => PartitionOp::Alloc { id, size, strategy },
            other                               => other,
        }
    }
}

impl fmt::Display for PartitionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionOp::Alloc { id: Some(id), size, strategy } => write!(f, "alloc #{id} {size} ({strategy})"),
            PartitionOp::Alloc { id: None, size, strategy }     => write!(f, "alloc {size} ({strategy})"),
            PartitionOp::Free { id }                            => write!(f, "free #{id}"),
            PartitionOp::Undo                                   => f.write_str("undo"),
            PartitionOp::Redo                                   => f.write_str("redo"),
        }
    }
}

//---START EXTERNAL INTERFACES
// The types listed below read driver scripts from disk. Input
// validation proper belongs to whoever writes the scripts; these
// parsers only reject what cannot be turned into an operation.
//
// To write your own reader, simply make sure that it
// satisfies the `ScriptGen` trait.

/// Defines the interface for reading scripts of `T`s.
pub trait ScriptGen<T>: Sized {
    fn new(path: PathBuf) -> Self;
    fn path(&self) -> &Path;
    /// Turns the comma-separated fields of one line into a `T`.
    fn gen_single(&self, fields: &[&str], line: usize) -> Result<T, ScriptError>;

    fn read_script(&self) -> Result<Vec<T>, Box<dyn std::error::Error>> {
        let fd = std::fs::File::open(self.path())?;
        self.read_from(BufReader::new(fd))
    }

    fn read_from<R: BufRead>(&self, reader: R) -> Result<Vec<T>, Box<dyn std::error::Error>> {
        let mut res = vec![];
        for (idx, line) in reader.lines()
            .enumerate()
            // First line is the header!
            .skip(1) {
            let line = line?;
            if line.trim().is_empty() || line.trim_start().starts_with('#') { continue; }
            let fields: Vec<&str> = line.split(',')
                .map(str::trim)
                .collect();
            res.push(self.gen_single(&fields, idx + 1)?);
        }

        Ok(res)
    }
}

fn field<'a>(fields: &[&'a str], idx: usize, name: &str, line: usize) -> Result<&'a str, ScriptError> {
    fields.get(idx)
        .copied()
        .ok_or_else(|| ScriptError {
            message: format!("missing `{name}` column"),
            line,
        })
}

fn number<N: FromStr>(raw: &str, name: &str, line: usize) -> Result<N, ScriptError> {
    raw.parse::<N>()
        .map_err(|_| ScriptError {
            message: format!("`{name}` must be a non-negative integer, got `{raw}`"),
            line,
        })
}

/// Reads `op,id,size,strategy` lines. `id` may be left empty for
/// allocations; `size` and `strategy` are ignored for everything
/// but allocations.
pub struct PartitionCSVParser {
    pub path: PathBuf,
}

impl ScriptGen<PartitionOp> for PartitionCSVParser {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn gen_single(&self, fields: &[&str], line: usize) -> Result<PartitionOp, ScriptError> {
        let op = field(fields, 0, "op", line)?.to_ascii_lowercase();
        match op.as_str() {
            "alloc" | "allocate"    => {
                let raw_id = fields.get(1).copied().unwrap_or("");
                let id = if raw_id.is_empty() { None } else { Some(number(raw_id, "id", line)?) };
                let size = number(field(fields, 2, "size", line)?, "size", line)?;
                let strategy = match fields.get(3).copied() {
                    Some(s) if !s.is_empty()    => s.parse::<Strategy>().map_err(|message| ScriptError { message, line })?,
                    _                           => Strategy::FirstFit,
                };
                Ok(PartitionOp::Alloc { id, size, strategy })
            },
            "free" | "deallocate"   => Ok(PartitionOp::Free {
                id: number(field(fields, 1, "id", line)?, "id", line)?,
            }),
            "undo"                  => Ok(PartitionOp::Undo),
            "redo"                  => Ok(PartitionOp::Redo),
            other                   => Err(ScriptError {
                message: format!("unknown operation `{other}`"),
                line,
            }),
        }
    }
}

/// Reads `op,page,offset` lines into a [Program]. Sequence numbers
/// are assigned in reading order, starting from 1.
pub struct ProgramCSVParser {
    pub path: PathBuf,
}

impl ScriptGen<(Op, PageNo, Units)> for ProgramCSVParser {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn gen_single(&self, fields: &[&str], line: usize) -> Result<(Op, PageNo, Units), ScriptError> {
        let op = field(fields, 0, "op", line)?
            .parse::<Op>()
            .map_err(|message| ScriptError { message, line })?;
        let page = number(field(fields, 1, "page", line)?, "page", line)?;
        let offset = number(field(fields, 2, "offset", line)?, "offset", line)?;

        Ok((op, page, offset))
    }
}
//---END EXTERNAL INTERFACES

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_script_lines() {
        let parser = PartitionCSVParser::new(PathBuf::from("unused.csv"));
        let script = "op,id,size,strategy\nalloc,1,30,first_fit\nalloc,,20,best\n\nfree,1\nundo\nredo\n";
        let ops = parser.read_from(script.as_bytes()).unwrap();
        assert_eq!(ops, vec![
            PartitionOp::Alloc { id: Some(1), size: 30, strategy: Strategy::FirstFit },
            PartitionOp::Alloc { id: None, size: 20, strategy: Strategy::BestFit },
            PartitionOp::Free { id: 1 },
            PartitionOp::Undo,
            PartitionOp::Redo,
        ]);
    }

    #[test]
    fn partition_script_reports_line() {
        let parser = PartitionCSVParser::new(PathBuf::from("unused.csv"));
        let script = "op,id,size,strategy\nalloc,1,30\nalloc,2,big\n";
        let err = parser.read_from(script.as_bytes()).unwrap_err();
        assert!(err.to_string().starts_with("line 3:"), "{err}");
    }

    #[test]
    fn program_script_lines() {
        let parser = ProgramCSVParser::new(PathBuf::from("unused.csv"));
        let script = "op,page,offset\n+,0,72\n存(save),3,26\nload,1,0\n";
        let steps = parser.read_from(script.as_bytes()).unwrap();
        assert_eq!(steps, vec![(Op::Add, 0, 72), (Op::Save, 3, 26), (Op::Load, 1, 0)]);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(PartitionError::NoFit { size: 4, largest: 2 }.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(PartitionError::UnknownId { id: 9 }.kind(), ErrorKind::InvalidRequest);
        assert_eq!(PagingError::NoFrames.kind(), ErrorKind::InvalidRequest);
        assert_eq!(PagingError::Invariant(String::new()).kind(), ErrorKind::InvariantViolation);
    }
}
