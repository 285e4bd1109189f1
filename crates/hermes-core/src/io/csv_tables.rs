//! The four merged output CSVs (spec §6): `email-classification.csv`,
//! `order-status.csv`, `order-response.csv`, `inquiry-response.csv`. Each is
//! merged with whatever already exists on disk, replacing rows for email
//! ids processed in the current run and leaving every other row untouched.

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::IoError;

/// Row of `email-classification.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClassificationRow {
    #[serde(rename = "email ID")]
    pub email_id: String,
    pub category: String,
}

/// Row of `order-status.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusRow {
    #[serde(rename = "email ID")]
    pub email_id: String,
    #[serde(rename = "product ID")]
    pub product_id: String,
    pub quantity: u32,
    pub status: String,
}

/// Row shared by `order-response.csv` and `inquiry-response.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRow {
    #[serde(rename = "email ID")]
    pub email_id: String,
    pub response: String,
}

trait HasEmailId {
    fn email_id(&self) -> &str;
}

impl HasEmailId for EmailClassificationRow {
    fn email_id(&self) -> &str {
        &self.email_id
    }
}

impl HasEmailId for OrderStatusRow {
    fn email_id(&self) -> &str {
        &self.email_id
    }
}

impl HasEmailId for ResponseRow {
    fn email_id(&self) -> &str {
        &self.email_id
    }
}

/// Write all four output CSVs under `out_dir`, merging each with any
/// pre-existing file by email id (spec §6: "CSVs are merged with any
/// pre-existing file by email id, replacing rows for ids processed in the
/// current run").
pub fn write_output_csvs(
    out_dir: &Path,
    classification: Vec<EmailClassificationRow>,
    order_status: Vec<OrderStatusRow>,
    order_response: Vec<ResponseRow>,
    inquiry_response: Vec<ResponseRow>,
) -> Result<(), IoError> {
    std::fs::create_dir_all(out_dir).map_err(|source| IoError::Path {
        path: out_dir.display().to_string(),
        source,
    })?;

    merge_csv(&out_dir.join("email-classification.csv"), classification)?;
    merge_csv(&out_dir.join("order-status.csv"), order_status)?;
    merge_csv(&out_dir.join("order-response.csv"), order_response)?;
    merge_csv(&out_dir.join("inquiry-response.csv"), inquiry_response)?;
    Ok(())
}

fn merge_csv<T>(path: &Path, new_rows: Vec<T>) -> Result<(), IoError>
where
    T: HasEmailId + Serialize + DeserializeOwned,
{
    let mut rows: Vec<T> = Vec::new();
    if path.exists() {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            rows.push(record?);
        }
    }

    let incoming_ids: std::collections::HashSet<&str> = new_rows.iter().map(|r| r.email_id()).collect();
    rows.retain(|r| !incoming_ids.contains(r.email_id()));
    rows.extend(new_rows);
    rows.sort_by(|a, b| a.email_id().cmp(b.email_id()));

    let mut writer = csv::Writer::from_path(path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| IoError::Path {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn merge_csv_replaces_rows_for_reprocessed_email_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("email-classification.csv");

        merge_csv(
            &path,
            vec![
                EmailClassificationRow { email_id: "e1".into(), category: "order_request".into() },
                EmailClassificationRow { email_id: "e2".into(), category: "product_inquiry".into() },
            ],
        )
        .unwrap();

        merge_csv(
            &path,
            vec![EmailClassificationRow { email_id: "e1".into(), category: "product_inquiry".into() }],
        )
        .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<EmailClassificationRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        let e1 = rows.iter().find(|r| r.email_id == "e1").unwrap();
        assert_eq!(e1.category, "product_inquiry");
        let e2 = rows.iter().find(|r| r.email_id == "e2").unwrap();
        assert_eq!(e2.category, "product_inquiry");
    }

    #[test]
    fn merge_csv_creates_new_file_when_none_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("order-status.csv");
        merge_csv(
            &path,
            vec![OrderStatusRow {
                email_id: "e1".into(),
                product_id: "LTH0976".into(),
                quantity: 2,
                status: "created".into(),
            }],
        )
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn merge_csv_sorts_rows_by_email_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("order-response.csv");
        merge_csv(
            &path,
            vec![
                ResponseRow { email_id: "e3".into(), response: "c".into() },
                ResponseRow { email_id: "e1".into(), response: "a".into() },
            ],
        )
        .unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<ResponseRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].email_id, "e1");
        assert_eq!(rows[1].email_id, "e3");
    }
}
