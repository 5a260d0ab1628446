use crate::domain::transfer::TransferRecord;
use crate::error::Result;
use std::io::Write;

/// Writes transfer records as CSV, one row per record in the order given.
pub struct TransferWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransferWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transfers(&mut self, records: Vec<TransferRecord>) -> Result<()> {
        self.writer.write_record([
            "id",
            "timestamp",
            "sender",
            "recipient",
            "amount",
            "reference_hash",
            "ledger_tx_reference",
            "attested",
            "outcome",
            "idempotency_key",
            "attestation_error",
            "settlement_error",
        ])?;
        for r in records {
            self.writer.write_record([
                r.id,
                r.timestamp.to_rfc3339(),
                r.sender,
                r.recipient,
                r.amount.to_string(),
                r.reference_hash,
                r.ledger_tx_reference.unwrap_or_default(),
                r.attested.to_string(),
                r.outcome.to_string(),
                r.idempotency_key.unwrap_or_default(),
                r.attestation_error.unwrap_or_default(),
                r.settlement_error.unwrap_or_default(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transfer::{Amount, Outcome};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_transfers() {
        let record = TransferRecord {
            id: "id1".into(),
            sender: "a@x.com".into(),
            recipient: "b@x.com".into(),
            amount: Amount::new(dec!(10.5)).unwrap(),
            timestamp: Utc::now(),
            reference_hash: "h1".into(),
            ledger_tx_reference: None,
            attested: false,
            attestation_error: None,
            idempotency_key: Some("k1".into()),
            settlement_error: None,
            outcome: Outcome::Completed,
        };

        let mut out = Vec::new();
        TransferWriter::new(&mut out)
            .write_transfers(vec![record])
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("id,timestamp,sender,recipient,amount"));
        assert!(text.contains("a@x.com,b@x.com,10.5,h1,,false,completed,k1,,"));
    }
}
