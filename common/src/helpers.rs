use anyhow::Context;
use tokio::io::AsyncWriteExt;

use crate::PaymentIdentity;

const REFERENCE_DELIMITER: char = '_';

/// Builds the correlation reference sent to the provider as the invoice
/// number: `{errand_id}_{payment_type}_{issuance_timestamp_millis}`.
pub fn format_payment_reference(identity: &PaymentIdentity, issued_at: i64) -> String {
    format!(
        "{}{REFERENCE_DELIMITER}{}{REFERENCE_DELIMITER}{}",
        identity.errand_id, identity.payment_type, issued_at
    )
}

/// Parses a correlation reference back into its identity and issuance
/// timestamp. The first segment is the errand id, the last segment the
/// timestamp, and everything in between the payment type, so a payment type
/// containing the delimiter round-trips.
///
/// An errand id containing the delimiter still parses wrongly; whether the
/// reference format grows escaping is an open product decision, not
/// something this parser guesses at.
pub fn parse_payment_reference(reference: &str) -> anyhow::Result<(PaymentIdentity, i64)> {
    let (head, timestamp) = reference
        .rsplit_once(REFERENCE_DELIMITER)
        .with_context(|| format!("Reference `{reference}` has no timestamp segment"))?;
    let issued_at: i64 = timestamp
        .parse()
        .with_context(|| format!("Reference `{reference}` has a non-numeric timestamp"))?;
    let (errand_id, payment_type) = head
        .split_once(REFERENCE_DELIMITER)
        .with_context(|| format!("Reference `{reference}` has no payment type segment"))?;
    if errand_id.is_empty() || payment_type.is_empty() {
        anyhow::bail!("Reference `{reference}` has an empty identity segment");
    }
    Ok((PaymentIdentity::new(errand_id, payment_type), issued_at))
}

pub async fn save_to_env(key: &str, value: &str, file_path: &str) -> anyhow::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .await
        .context("Failed to open .env file")?;
    let line = format!("{}={}\n", key, value);
    file.write_all(line.as_bytes())
        .await
        .context("Failed to write to .env file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_round_trips() {
        let identity = PaymentIdentity::new("E1", "deposit");
        let reference = format_payment_reference(&identity, 1700000000);
        assert_eq!(reference, "E1_deposit_1700000000");

        let (parsed, issued_at) = parse_payment_reference(&reference).unwrap();
        assert_eq!(parsed, identity);
        assert_eq!(issued_at, 1700000000);
    }

    #[test]
    fn payment_type_may_contain_the_delimiter() {
        let (identity, issued_at) = parse_payment_reference("E1_first_half_1700000000").unwrap();
        assert_eq!(identity.errand_id, "E1");
        assert_eq!(identity.payment_type, "first_half");
        assert_eq!(issued_at, 1700000000);
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert!(parse_payment_reference("").is_err());
        assert!(parse_payment_reference("E1").is_err());
        assert!(parse_payment_reference("E1_1700000000").is_err());
        assert!(parse_payment_reference("E1_deposit_soon").is_err());
        assert!(parse_payment_reference("_deposit_1700000000").is_err());
    }
}
