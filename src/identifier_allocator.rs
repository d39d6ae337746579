use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::tag_document::TagDocument;

/// Minimum number of digits in an allocated object id
const ID_WIDTH: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocatorError {
    #[error("no object carries a '#<digits>' id, cannot seed the object id allocator")]
    NoIdentifiersFound,

    #[error("object id space exhausted after #{0}")]
    Exhausted(u64),
}

fn object_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#(\d+)$").expect("object id pattern is valid"))
}

/// Numeric value of a `#<digits>` object id
pub fn parse_object_id(id: &str) -> Option<u64> {
    object_id_pattern().captures(id)?.get(1)?.as_str().parse().ok()
}

pub fn format_object_id(value: u64) -> String {
    format!("#{:0width$}", value, width = ID_WIDTH)
}

/// Issues fresh object ids above every id already present in a document.
/// The counter only moves forward, so ids are never handed out twice.
#[derive(Debug, Clone)]
pub struct ObjectIdAllocator {
    counter: u64,
    issued: usize,
}

impl ObjectIdAllocator {
    pub fn from_document(document: &TagDocument) -> Result<Self, AllocatorError> {
        let highest = document
            .objects()
            .filter_map(|object| object.attribute("id"))
            .filter_map(parse_object_id)
            .max()
            .ok_or(AllocatorError::NoIdentifiersFound)?;

        debug!(highest_id = highest, "seeded object id allocator");
        Ok(Self::starting_after(highest))
    }

    pub fn starting_after(highest: u64) -> Self {
        Self { counter: highest, issued: 0 }
    }

    /// Most recently issued value, or the seed if nothing was issued yet
    pub fn highest(&self) -> u64 {
        self.counter
    }

    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn allocate(&mut self) -> Result<String, AllocatorError> {
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or(AllocatorError::Exhausted(self.counter))?;
        self.issued += 1;
        Ok(format_object_id(self.counter))
    }
}
