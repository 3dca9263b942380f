use super::{AnomalyCriterion, AnomalyType, CriteriaCatalog, CustomerDirectory, CustomerRecord, RawTransaction};
use super::gold::AnomalyLevel;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveTime};
use csv::ReaderBuilder;

use crate::types::{CustomerStatus, DebitCredit};

fn parse_raw_transactions(content: &str) -> Result<Vec<RawTransaction>> {
    let mut reader = ReaderBuilder::new().from_reader(content.as_bytes());
    let mut transactions = Vec::new();

    for row in reader.deserialize() {
        transactions.push(row?);
    }

    Ok(transactions)
}

#[test]
fn test_raw_transaction_deserializes_from_bronze_csv_row() -> Result<()> {
    let content = "id,trx_type,account_number,amount,debit_credit,subheader,detail_information,trx_date,trx_time,currency\n\
                   aB3-xYz,Transfer,1000000001,50000.00,D,BNI - MARY SMITH,1000000002,2024-03-01,10:05:00,IDR\n";

    let transactions = parse_raw_transactions(content)?;
    let transaction = transactions.first().ok_or_else(|| anyhow!("no rows parsed"))?;

    assert_eq!(transaction.id, "aB3-xYz");
    assert_eq!(transaction.amount.value(), 50_000);
    assert_eq!(transaction.debit_credit, DebitCredit::Debit);
    assert_eq!(transaction.trx_date, NaiveDate::from_ymd_opt(2024, 3, 1).ok_or_else(|| anyhow!("bad date"))?);
    assert_eq!(transaction.trx_time, NaiveTime::from_hms_opt(10, 5, 0).ok_or_else(|| anyhow!("bad time"))?);
    assert_eq!(transaction.destination_bank(), "BNI");

    Ok(())
}

#[test]
fn test_destination_bank_without_separator_uses_whole_subheader() -> Result<()> {
    let content = "id,trx_type,account_number,amount,debit_credit,subheader,detail_information,trx_date,trx_time,currency\n\
                   t1,Transfer,1,10,C, JAGO ,2,2024-03-01,10:05:00,IDR\n";

    let transactions = parse_raw_transactions(content)?;

    assert_eq!(transactions[0].destination_bank(), "JAGO");

    Ok(())
}

#[test]
fn test_unrecognised_customer_status_is_not_rejected() -> Result<()> {
    let content = "name,account_number,status\nJOHN DAVIS,1000000009,DORMANT\n";
    let mut reader = ReaderBuilder::new().from_reader(content.as_bytes());
    let record: CustomerRecord = reader.deserialize().next().ok_or_else(|| anyhow!("no rows parsed"))??;

    assert_eq!(record.status, CustomerStatus::Unknown);
    assert!(!record.status.is_servable());

    Ok(())
}

#[test]
fn test_customer_directory_resolves_by_account_number() {
    let directory = CustomerDirectory::new(vec![
        CustomerRecord { name: "JAMES SMITH".to_string(), account_number: "1".to_string(), status: CustomerStatus::Opened },
        CustomerRecord { name: "JAMES SMITH".to_string(), account_number: "1".to_string(), status: CustomerStatus::Closed },
        CustomerRecord { name: "MARY JONES".to_string(), account_number: "2".to_string(), status: CustomerStatus::Blocked },
    ]);

    assert_eq!(directory.len(), 2);
    assert_eq!(directory.resolve("1").map(|customer| customer.status), Some(CustomerStatus::Closed));
    assert_eq!(directory.resolve("2").map(|customer| customer.status), Some(CustomerStatus::Blocked));
    assert!(directory.resolve("3").is_none());
}

#[test]
fn test_criteria_catalog_looks_up_descriptions_by_code() {
    let catalog = CriteriaCatalog::new(vec![
        AnomalyCriterion { code: "0".to_string(), description: "Normal".to_string(), level: "Low".to_string() },
        AnomalyCriterion { code: "1".to_string(), description: "Repeated transfer".to_string(), level: "High".to_string() },
    ]);

    assert_eq!(catalog.description("0"), Some("Normal"));
    assert_eq!(catalog.get("1").map(|criterion| criterion.level.as_str()), Some("High"));
    assert!(catalog.description("7").is_none());
}

#[test]
fn test_anomaly_level_follows_anomaly_type() {
    assert_eq!(AnomalyType::Normal.level(), AnomalyLevel::Low);
    assert_eq!(AnomalyType::Abnormal.level(), AnomalyLevel::High);
}
