//! Outcome of a provisioning session, record by record.

use std::fmt;

use crate::error::{ProtocolError, RecordError};

// =============================================================================
// Public Interface
// =============================================================================

/// What happened to one record of the secrets file.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Committed to storage and read back with the expected CRC.
    Verified { crc: u32 },
    /// Committed to storage, but the read back did not confirm the CRC. The
    /// record was not rolled back.
    CommittedUnverified { crc: u32, error: ProtocolError },
    /// Not committed. Whatever was staged on the device is left as is.
    Skipped(RecordError),
}

#[derive(Debug)]
pub struct RecordReport {
    pub slot: usize,
    pub name: String,
    pub outcome: RecordOutcome,
}

/// Per record outcomes of a session, in input order.
#[derive(Debug, Default)]
pub struct ProvisioningReport {
    pub records: Vec<RecordReport>,
}
impl ProvisioningReport {
    pub fn verified(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Verified { .. }))
    }

    pub fn unverified(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::CommittedUnverified { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped(_)))
    }

    /// `true` when every record was committed and verified.
    pub fn is_success(&self) -> bool {
        self.verified() == self.records.len()
    }

    /// Process exit code for the session: **`0`** when every record was
    /// verified, **`1`** otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    fn count<F: Fn(&RecordOutcome) -> bool>(&self, f: F) -> usize {
        self.records.iter().filter(|r| f(&r.outcome)).count()
    }
}
impl fmt::Display for ProvisioningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            write!(f, "slot {:>3} {:<15} ", record.slot, record.name)?;
            match &record.outcome {
                RecordOutcome::Verified { crc } => writeln!(f, "verified (crc={:08x})", crc)?,
                RecordOutcome::CommittedUnverified { crc, error } => {
                    writeln!(f, "written, NOT verified (crc={:08x}): {}", crc, error)?
                }
                RecordOutcome::Skipped(error) => writeln!(f, "skipped: {}", error)?,
            }
        }
        write!(
            f,
            "{} verified, {} unverified, {} skipped",
            self.verified(),
            self.unverified(),
            self.skipped()
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    fn record(slot: usize, outcome: RecordOutcome) -> RecordReport {
        RecordReport {
            slot,
            name: format!("dev{}", slot),
            outcome,
        }
    }

    #[test]
    fn empty_report_is_a_success() {
        let report = ProvisioningReport::default();
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn counts_and_exit_code() {
        let report = ProvisioningReport {
            records: vec![
                record(0, RecordOutcome::Verified { crc: 1 }),
                record(
                    1,
                    RecordOutcome::CommittedUnverified {
                        crc: 2,
                        error: ProtocolError::ReadbackMismatch {
                            slot: 1,
                            expected: 2,
                            line: "slot=1 crc=00000003".into(),
                        },
                    },
                ),
                record(
                    2,
                    RecordOutcome::Skipped(
                        DecodeError::WrongLength {
                            field: "mac",
                            actual: 5,
                            expected: 6,
                        }
                        .into(),
                    ),
                ),
            ],
        };
        assert_eq!(report.verified(), 1);
        assert_eq!(report.unverified(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(!report.is_success());
        assert_eq!(report.exit_code(), 1);

        let text = report.to_string();
        assert!(text.contains("verified (crc=00000001)"));
        assert!(text.contains("NOT verified"));
        assert!(text.contains("skipped: decoded mac is wrong length: got 5, want 6"));
        assert!(text.ends_with("1 verified, 1 unverified, 1 skipped"));
    }
}
