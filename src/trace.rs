use crate::address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Memory operation of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Instruction fetch.
    #[serde(rename = "I", alias = "inst", alias = "ifetch")]
    Inst,
    /// Data load.
    #[serde(rename = "R", alias = "read", alias = "load")]
    Read,
    /// Data store.
    #[serde(rename = "W", alias = "write", alias = "store")]
    Write,
}

impl From<Kind> for stats::AccessKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Inst => Self::INST_ACC_R,
            Kind::Read => Self::DATA_ACC_R,
            Kind::Write => Self::DATA_ACC_W,
        }
    }
}

/// A single memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Access {
    pub addr: address,
    pub kind: Kind,
    pub requestor: usize,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}@{:#x}[req={}]",
            self.kind, self.addr, self.requestor
        )
    }
}

impl Access {
    #[must_use]
    pub fn new(addr: address, kind: Kind) -> Self {
        Self {
            addr,
            kind,
            requestor: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.kind == Kind::Write
    }

    #[inline]
    #[must_use]
    pub fn is_inst(&self) -> bool {
        self.kind == Kind::Inst
    }

    #[inline]
    #[must_use]
    pub fn access_kind(&self) -> stats::AccessKind {
        self.kind.into()
    }
}

/// A restartable sequence of memory accesses.
///
/// Every call to [`AddressTrace::accesses`] must yield the same sequence,
/// so that all configurations of a sweep observe an identical workload.
pub trait AddressTrace: std::fmt::Debug + Send + Sync {
    fn accesses(&self) -> Box<dyn Iterator<Item = Access> + '_>;

    /// Number of accesses, if known up front.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open trace {path:?}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unknown trace format {0:?} (expected .csv or .msgpack)")]
    UnknownFormat(PathBuf),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Msgpack(#[from] rmp_serde::decode::Error),
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    address: String,
    kind: Kind,
    #[serde(default)]
    requestor: usize,
}

fn parse_address(addr: &str) -> Result<address, Error> {
    let addr = addr.trim();
    let parsed = match addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")) {
        Some(hex) => address::from_str_radix(hex, 16),
        None => addr.parse(),
    };
    parsed.map_err(|_| Error::InvalidAddress(addr.to_string()))
}

/// A recorded trace held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recorded(pub Vec<Access>);

impl AddressTrace for Recorded {
    fn accesses(&self) -> Box<dyn Iterator<Item = Access> + '_> {
        Box::new(self.0.iter().copied())
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

impl FromIterator<Access> for Recorded {
    fn from_iter<I: IntoIterator<Item = Access>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Access>> for Recorded {
    fn from(accesses: Vec<Access>) -> Self {
        Self(accesses)
    }
}

impl Recorded {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads a CSV trace with an `address,kind,requestor` header.
    ///
    /// Addresses are decimal or `0x`-prefixed hexadecimal.
    /// Kinds are `I`, `R` or `W`. The requestor column is optional.
    pub fn from_csv_reader(reader: impl std::io::Read) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);
        reader
            .deserialize::<CsvRecord>()
            .map(|record| {
                let record = record?;
                Ok(Access {
                    addr: parse_address(&record.address)?,
                    kind: record.kind,
                    requestor: record.requestor,
                })
            })
            .collect()
    }

    /// Reads a MessagePack encoded list of accesses.
    pub fn from_msgpack_reader(reader: impl std::io::Read) -> Result<Self, Error> {
        let accesses: Vec<Access> = rmp_serde::from_read(reader)?;
        Ok(Self(accesses))
    }

    /// Loads a trace file, picking the format from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_ascii_lowercase);
        let open = || {
            std::fs::File::open(path)
                .map(std::io::BufReader::new)
                .map_err(|source| Error::OpenFile {
                    path: path.to_path_buf(),
                    source,
                })
        };
        let trace = match extension.as_deref() {
            Some("csv") => Self::from_csv_reader(open()?)?,
            Some("msgpack" | "mp") => Self::from_msgpack_reader(open()?)?,
            _ => return Err(Error::UnknownFormat(path.to_path_buf())),
        };
        log::info!("loaded {} accesses from {}", trace.len(), path.display());
        Ok(trace)
    }
}

/// Deterministic synthetic workload.
///
/// Interleaves a looping instruction fetch stream with strided data
/// accesses over a working set. Every `stores_every`-th data access
/// is a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthetic {
    pub num_accesses: usize,
    pub code_base: address,
    /// Bytes of code executed in a loop.
    pub code_size: u64,
    /// Bytes per instruction fetch.
    pub fetch_size: u64,
    pub data_base: address,
    /// Bytes of data touched before the stream wraps around.
    pub data_size: u64,
    pub stride: u64,
    /// Instruction fetches issued between two data accesses.
    pub fetches_per_data_access: usize,
    /// Every n-th data access is a store, zero disables stores.
    pub stores_every: usize,
}

impl Default for Synthetic {
    fn default() -> Self {
        Self {
            num_accesses: 200_000,
            code_base: 0x0040_0000,
            code_size: 16 * 1024,
            fetch_size: 4,
            data_base: 0x1000_0000,
            data_size: 512 * 1024,
            stride: 64,
            fetches_per_data_access: 3,
            stores_every: 4,
        }
    }
}

impl AddressTrace for Synthetic {
    fn accesses(&self) -> Box<dyn Iterator<Item = Access> + '_> {
        let period = self.fetches_per_data_access + 1;
        let mut pc = 0;
        let mut data_idx: u64 = 0;
        Box::new((0..self.num_accesses).map(move |i| {
            if i % period < self.fetches_per_data_access {
                let addr = self.code_base + pc;
                pc = (pc + self.fetch_size) % self.code_size.max(1);
                Access::new(addr, Kind::Inst)
            } else {
                let addr = self.data_base + (data_idx * self.stride) % self.data_size.max(1);
                data_idx += 1;
                let kind = if self.stores_every > 0 && data_idx % self.stores_every as u64 == 0 {
                    Kind::Write
                } else {
                    Kind::Read
                };
                Access::new(addr, kind)
            }
        }))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.num_accesses)
    }
}
