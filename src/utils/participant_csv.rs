// Bulk participant import/export in CSV form
use crate::models::ServiceError;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParticipantRow {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    // Source line, filled in while parsing
    #[serde(skip)]
    pub line: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub name: String,
    pub email: String,
    pub role: String,
    pub team: String,
}

/// Parses `name,email[,password]` rows. Rows that fail to parse are
/// reported individually instead of failing the whole upload.
pub fn parse_participants(body: &str) -> Result<(Vec<ParticipantRow>, Vec<RowError>), ServiceError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers().map_err(|e| {
        error!("Failed to read CSV header: {:?}", e);
        ServiceError::bad_request("CSV upload must start with a header row")
    })?;

    for required in ["name", "email"] {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(required)) {
            return Err(ServiceError::bad_request(format!(
                "CSV header is missing the '{}' column",
                required
            )));
        }
    }

    let lowered = StringRecord::from(headers.iter().map(|h| h.to_lowercase()).collect::<Vec<_>>());

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut record = StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let line = record.position().map_or(0, |pos| pos.line());
                match record.deserialize::<ParticipantRow>(Some(&lowered)) {
                    Ok(mut row) => {
                        row.line = line;
                        row.password = row.password.filter(|p| !p.is_empty());
                        rows.push(row);
                    }
                    Err(e) => errors.push(RowError {
                        line,
                        message: e.to_string(),
                    }),
                }
            }
            Err(e) => {
                let line = e.position().map_or(0, |pos| pos.line());
                errors.push(RowError {
                    line,
                    message: e.to_string(),
                });
                // Position is lost after an I/O or UTF-8 failure
                if line == 0 {
                    break;
                }
            }
        }
    }

    Ok((rows, errors))
}

pub fn write_participants(rows: &[ExportRow]) -> Result<String, ServiceError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    for row in rows {
        writer.serialize(row).map_err(|e| {
            error!("Failed to write CSV row: {:?}", e);
            ServiceError::InternalServerError
        })?;
    }

    if rows.is_empty() {
        writer
            .write_record(["name", "email", "role", "team"])
            .map_err(|e| {
                error!("Failed to write CSV header: {:?}", e);
                ServiceError::InternalServerError
            })?;
    }

    let bytes = writer.into_inner().map_err(|e| {
        error!("Failed to flush CSV writer: {:?}", e);
        ServiceError::InternalServerError
    })?;

    String::from_utf8(bytes).map_err(|e| {
        error!("CSV output is not UTF-8: {:?}", e);
        ServiceError::InternalServerError
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_optional_password() {
        let body = "Name,Email,Password\nAda, ada@example.com ,secret\nGrace,grace@example.com,\n";
        let (rows, errors) = parse_participants(body).unwrap();

        assert!(errors.is_empty());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].email, "ada@example.com");
        assert_eq!(rows[0].password.as_deref(), Some("secret"));
        assert_eq!(rows[1].password, None);
    }

    #[test]
    fn rejects_missing_columns() {
        let result = parse_participants("name,phone\nAda,123\n");
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn reports_short_rows() {
        let (rows, errors) = parse_participants("name,email\nAda\nGrace,grace@example.com\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
    }

    #[test]
    fn writes_header_and_rows() {
        let csv = write_participants(&[ExportRow {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: "leader".to_string(),
            team: "Engines".to_string(),
        }])
        .unwrap();

        assert_eq!(csv, "name,email,role,team\nAda,ada@example.com,leader,Engines\n");
    }

    #[test]
    fn empty_export_still_has_header() {
        assert_eq!(write_participants(&[]).unwrap(), "name,email,role,team\n");
    }
}
