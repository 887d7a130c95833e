//! Provisioning session orchestration.
//!
//! One session goes through a fixed pipeline:
//!
//! ```text
//!   enter secrets mode -> list slots
//!        |
//!        v
//!   for each record i:  decode -> select slot i -> N, M, K, B
//!                         -> staging CRC -> commit -> storage CRC
//!        |
//!        v
//!   list slots -> exit secrets mode
//! ```
//!
//! A failure at any step of a record only skips that record, the session goes
//! on with the next one. A failure outside of the records (entering, listing,
//! leaving) is reported and the session goes on as well. Nothing is retried:
//! failed slots are provisioned again by running a new session.
//!
//! **Example**
//! ```no_run
//! use secretcom::{Provisioner, SerialLine, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new()
//!     .path("/dev/ttyUSB0")
//!     .secrets_file("secrets.yaml")
//!     .finalize();
//! let secrets = secretcom::load_secrets("secrets.yaml").unwrap();
//! let port = secretcom::open_port(&settings).unwrap();
//! let report = Provisioner::new(SerialLine::new(port)).run(&secrets);
//! println!("{}", report);
//! std::process::exit(report.exit_code());
//! ```

mod report;

use console::style;
use log::{error, info, warn};

use crate::{
    channel::LineChannel,
    error::RecordError,
    protocol::SecretsMode,
    secrets::{DeviceSecret, SecretRecord},
};

pub use report::{ProvisioningReport, RecordOutcome, RecordReport};

// =============================================================================
// Public Interface
// =============================================================================

/// Drives one provisioning session over an exclusively owned channel.
pub struct Provisioner<C: LineChannel> {
    channel: C,
}
impl<C: LineChannel> Provisioner<C> {
    pub fn new(channel: C) -> Self {
        Provisioner { channel }
    }

    /// Provision `secrets`, the record at position `i` going into slot `i`.
    ///
    /// The channel is consumed and released when this returns, whatever the
    /// outcome of the session.
    pub fn run(self, secrets: &[DeviceSecret]) -> ProvisioningReport {
        println!("Entering secrets mode...");
        let (mut mode, entered) = SecretsMode::enter(self.channel);
        if let Err(e) = entered {
            error!("{}", e);
        }

        println!("Listing current secrets:");
        list(&mut mode);

        println!("Uploading secrets...");
        let mut report = ProvisioningReport::default();
        for (slot, secret) in secrets.iter().enumerate() {
            info!("=> Slot {} ({})", slot, secret.name);
            let outcome = provision(&mut mode, slot, secret);
            report.records.push(RecordReport {
                slot,
                name: secret.name.clone(),
                outcome,
            });
        }

        println!("\nListing new secrets:");
        list(&mut mode);

        println!("Leaving secrets mode...");
        let (channel, exited) = mode.exit();
        if let Err(e) = exited {
            error!("{}", e);
        }
        drop(channel);

        report
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn list<C: LineChannel>(mode: &mut SecretsMode<C>) {
    if let Err(e) = mode.list() {
        error!("Listing failed: {}", e);
    }
}

/// Run the whole pipeline for one record and classify the outcome.
fn provision<C: LineChannel>(
    mode: &mut SecretsMode<C>,
    slot: usize,
    secret: &DeviceSecret,
) -> RecordOutcome {
    let crc = match stage_and_commit(mode, slot, secret) {
        Ok(crc) => crc,
        Err(e) => {
            warn!("Skipping device {}: {}", slot, e);
            return RecordOutcome::Skipped(e);
        }
    };
    println!("Writing to NVS slot {} {}", slot, style("OK").green());

    // The record is committed from here on, the read back only verifies it.
    match mode.check_storage_crc(slot, crc) {
        Ok(()) => {
            println!("Readback {}", style("OK").green());
            RecordOutcome::Verified { crc }
        }
        Err(error) => {
            error!("Readback failed for slot {}: {}", slot, error);
            RecordOutcome::CommittedUnverified { crc, error }
        }
    }
}

/// Everything up to and including the commit. Returns the CRC the committed
/// record must have.
fn stage_and_commit<C: LineChannel>(
    mode: &mut SecretsMode<C>,
    slot: usize,
    secret: &DeviceSecret,
) -> Result<u32, RecordError> {
    let record = SecretRecord::decode(secret)?;

    mode.select_slot(slot)?;
    mode.set_name(&record.name)?;
    mode.set_mac(&record.mac)?;
    mode.set_key(&record.key)?;
    mode.set_blob(&record.blob)?;

    let crc = record.crc32();
    mode.check_staging_crc(crc)?;
    mode.commit(slot)?;
    Ok(crc)
}

// =============================================================================
// Unit Tests
// =============================================================================
