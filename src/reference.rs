use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use crate::{avl::AvlTree, Error, IoSnafu, SourceUnavailableSnafu};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ClientCode(String);

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ProductCode(String);

macro_rules! impl_code {
    ($code:ident) => {
        impl $code {
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $code {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $code {
            fn from(code: &str) -> Self {
                Self::new(code)
            }
        }
    };
}

impl_code!(ClientCode);
impl_code!(ProductCode);

/// what the index knows about a code besides its presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceEntry {
    // 1-based line of the master file the code came from, 0 for codes built in memory
    pub line: usize,
}

/// counters collected while loading a master file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub lines_read: usize,
    pub loaded: usize,
    pub duplicated: usize,
    pub invalid: usize,
}

/// read-only set of known codes (clients or products), kept in an AVL tree
#[derive(Debug, Clone)]
pub struct ReferenceIndex<C> {
    codes: AvlTree<C, ReferenceEntry>,
}

pub type ClientIndex = ReferenceIndex<ClientCode>;
pub type ProductIndex = ReferenceIndex<ProductCode>;

impl<C: Ord> Default for ReferenceIndex<C> {
    fn default() -> Self {
        Self {
            codes: AvlTree::new(),
        }
    }
}

impl<C> ReferenceIndex<C>
where
    C: Ord + for<'a> From<&'a str>,
{
    /// load one code per line. blank lines are skipped,
    /// codes containing whitespace are counted as invalid
    /// and repeated codes keep their first line
    pub fn load<R: Read>(reader: R) -> Result<(Self, LoadStats), Error> {
        let mut index = Self::default();
        let mut stats = LoadStats::default();
        for (number, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.context(IoSnafu)?;
            let code = line.trim();
            if code.is_empty() {
                continue;
            }
            stats.lines_read += 1;
            if code.chars().any(char::is_whitespace) {
                log::debug!("line {}: invalid reference code {:?}", number + 1, code);
                stats.invalid += 1;
                continue;
            }
            let code = C::from(code);
            if index.codes.contains_key(&code) {
                stats.duplicated += 1;
            } else {
                index.codes.insert(code, ReferenceEntry { line: number + 1 });
                stats.loaded += 1;
            }
        }
        Ok((index, stats))
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<(Self, LoadStats), Error> {
        let path = path.as_ref();
        let f = File::open(path).context(SourceUnavailableSnafu { path })?;
        let (index, stats) = Self::load(f)?;
        log::info!(
            "loaded {} codes from {:?} ({} duplicated, {} invalid)",
            stats.loaded,
            path,
            stats.duplicated,
            stats.invalid
        );
        Ok((index, stats))
    }
}

impl<C: Ord> ReferenceIndex<C> {
    pub fn get(&self, code: &C) -> Option<&ReferenceEntry> {
        self.codes.get(code)
    }

    pub fn contains(&self, code: &C) -> bool {
        self.codes.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// codes in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.codes.keys()
    }
}

impl<C: Ord> FromIterator<C> for ReferenceIndex<C> {
    fn from_iter<T: IntoIterator<Item = C>>(iter: T) -> Self {
        Self {
            codes: iter
                .into_iter()
                .map(|code| (code, ReferenceEntry { line: 0 }))
                .collect(),
        }
    }
}
