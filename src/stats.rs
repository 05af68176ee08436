use serde::Serialize;

use crate::{catalog::Placement, validator::RejectionKind};

/// running counters of a batch, threaded by reference through validation and ingestion.
/// `lines_read == accepted + rejected` and `accepted == inserted + merged` hold after every line
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadStats {
    pub lines_read: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub malformed: usize,
    pub invalid_type: usize,
    pub unknown_client: usize,
    pub unknown_product: usize,
    pub domain: usize,
    pub inserted: usize,
    pub merged: usize,
    // the file name of the last source ingested
    pub last_source: Option<String>,
}

impl ReadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&mut self) {
        self.lines_read += 1;
    }

    pub fn record_rejection(&mut self, kind: RejectionKind) {
        self.rejected += 1;
        match kind {
            RejectionKind::Malformed => self.malformed += 1,
            RejectionKind::InvalidType => self.invalid_type += 1,
            RejectionKind::UnknownClient => self.unknown_client += 1,
            RejectionKind::UnknownProduct => self.unknown_product += 1,
            RejectionKind::Domain => self.domain += 1,
        }
    }

    pub fn record_acceptance(&mut self) {
        self.accepted += 1;
    }

    pub fn record_placement(&mut self, placement: Placement) {
        match placement {
            Placement::Inserted => self.inserted += 1,
            Placement::Merged => self.merged += 1,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.lines_read == self.accepted + self.rejected
            && self.accepted == self.inserted + self.merged
    }
}
