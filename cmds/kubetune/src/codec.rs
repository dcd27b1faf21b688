//! Pipe-delimited file format for exported Deployment settings.
//!
//! The file has one header line followed by one line per Deployment. Only the
//! 17-column layout in [`HEADER`] is written or accepted; anything else is
//! rejected while reading the header.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::record::{DeploymentRecord, Row};

/// Field separator.
pub const DELIMITER: char = '|';

/// Written in place of an unset stabilization window.
pub const NOT_AVAILABLE: &str = "N/A";

/// Column names, in file order.
pub const HEADER: [&str; 17] = [
	"No",
	"Deployment Name",
	"Namespace",
	"Replicas",
	"CPU Request",
	"CPU Limit",
	"Memory Request",
	"Memory Limit",
	"MaxUnavailable",
	"MaxSurge",
	"Min Replicas",
	"Max Replicas",
	"CPU Target Utilization",
	"ScaleUp Stabilization",
	"ScaleDown Stabilization",
	"UpdateResourceAndHPA",
	"UpdateHPAOnly",
];

/// Errors raised while writing or reading the file.
#[derive(Debug, Error)]
pub enum CodecError {
	#[error("file is empty, expected a header line")]
	MissingHeader,

	#[error(
		"unsupported file layout: expected {} columns, found {found}; re-export the file",
		HEADER.len()
	)]
	UnsupportedSchema { found: usize },

	#[error("header column {index}: expected `{expected}`, found `{found}`")]
	HeaderMismatch {
		index: usize,
		expected: &'static str,
		found: String,
	},

	#[error("line {line}: expected {} fields, found {found}", HEADER.len())]
	FieldCount { line: usize, found: usize },

	#[error("line {line}: invalid {column} `{value}`")]
	InvalidField {
		line: usize,
		column: &'static str,
		value: String,
	},

	#[error("deployment {deployment}: {column} `{value}` contains a delimiter or line break")]
	UnencodableValue {
		deployment: String,
		column: &'static str,
		value: String,
	},

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Write the header and one line per record.
///
/// `on_row(current, total, name)` is called after each line is written.
pub fn write_records<W: Write>(
	mut writer: W,
	records: &[DeploymentRecord],
	mut on_row: impl FnMut(usize, usize, &str),
) -> Result<(), CodecError> {
	writeln!(writer, "{}", HEADER.join("|"))?;

	let total = records.len();
	for (index, record) in records.iter().enumerate() {
		let row = Row::from_record(index + 1, record);
		let fields = encode(&row);

		for (column, value) in HEADER.iter().zip(&fields) {
			if value.contains([DELIMITER, '\n', '\r']) {
				return Err(CodecError::UnencodableValue {
					deployment: row.name.clone(),
					column: *column,
					value: value.clone(),
				});
			}
		}

		writeln!(writer, "{}", fields.join("|"))?;
		on_row(index + 1, total, &row.name);
	}

	writer.flush()?;
	Ok(())
}

/// Read and validate every data line.
pub fn read_rows<R: BufRead>(reader: R) -> Result<Vec<Row>, CodecError> {
	let mut lines = reader.lines();

	let header = lines.next().ok_or(CodecError::MissingHeader)??;
	validate_header(header.trim_start_matches('\u{feff}'))?;

	let mut rows = Vec::new();
	for (index, line) in lines.enumerate() {
		let line = line?;
		let line = line.trim_end_matches('\r');
		if line.trim().is_empty() {
			continue;
		}
		// Line 1 is the header.
		rows.push(decode(index + 2, line)?);
	}
	Ok(rows)
}

fn validate_header(header: &str) -> Result<(), CodecError> {
	let columns: Vec<&str> = header.trim_end_matches('\r').split(DELIMITER).collect();
	if columns.len() != HEADER.len() {
		return Err(CodecError::UnsupportedSchema {
			found: columns.len(),
		});
	}

	for (index, (found, expected)) in columns.iter().zip(HEADER).enumerate() {
		if found.trim() != expected {
			return Err(CodecError::HeaderMismatch {
				index: index + 1,
				expected,
				found: found.to_string(),
			});
		}
	}
	Ok(())
}

fn encode(row: &Row) -> [String; 17] {
	[
		row.number.to_string(),
		row.name.clone(),
		row.namespace.clone(),
		row.replicas.to_string(),
		row.cpu_request.clone(),
		row.cpu_limit.clone(),
		row.memory_request.clone(),
		row.memory_limit.clone(),
		row.max_unavailable.clone(),
		row.max_surge.clone(),
		row.min_replicas.to_string(),
		row.max_replicas.to_string(),
		row.cpu_target_utilization.to_string(),
		encode_window(row.scale_up_stabilization),
		encode_window(row.scale_down_stabilization),
		row.update_resource_and_hpa.to_string(),
		row.update_hpa_only.to_string(),
	]
}

fn encode_window(window: Option<i32>) -> String {
	window.map_or_else(|| NOT_AVAILABLE.to_string(), |seconds| seconds.to_string())
}

fn decode(line: usize, text: &str) -> Result<Row, CodecError> {
	let fields: Vec<&str> = text.split(DELIMITER).map(str::trim).collect();
	let [
		number,
		name,
		namespace,
		replicas,
		cpu_request,
		cpu_limit,
		memory_request,
		memory_limit,
		max_unavailable,
		max_surge,
		min_replicas,
		max_replicas,
		cpu_target,
		scale_up,
		scale_down,
		update_all,
		update_hpa,
	] = <[&str; 17]>::try_from(fields.as_slice()).map_err(|_| CodecError::FieldCount {
		line,
		found: fields.len(),
	})?;

	let invalid = |column: &'static str, value: &str| CodecError::InvalidField {
		line,
		column,
		value: value.to_string(),
	};
	let count = |column: &'static str, value: &str| {
		value
			.parse::<i32>()
			.ok()
			.filter(|n| *n >= 0)
			.ok_or_else(|| invalid(column, value))
	};
	let window = |column: &'static str, value: &str| {
		if value.is_empty() || value == NOT_AVAILABLE {
			Ok(None)
		} else {
			count(column, value).map(Some)
		}
	};

	if name.is_empty() {
		return Err(invalid(HEADER[1], name));
	}
	if namespace.is_empty() {
		return Err(invalid(HEADER[2], namespace));
	}

	Ok(Row {
		number: number.parse().map_err(|_| invalid(HEADER[0], number))?,
		name: name.to_string(),
		namespace: namespace.to_string(),
		replicas: count(HEADER[3], replicas)?,
		cpu_request: cpu_request.to_string(),
		cpu_limit: cpu_limit.to_string(),
		memory_request: memory_request.to_string(),
		memory_limit: memory_limit.to_string(),
		max_unavailable: max_unavailable.to_string(),
		max_surge: max_surge.to_string(),
		min_replicas: count(HEADER[10], min_replicas)?,
		max_replicas: count(HEADER[11], max_replicas)?,
		cpu_target_utilization: count(HEADER[12], cpu_target)?,
		scale_up_stabilization: window(HEADER[13], scale_up)?,
		scale_down_stabilization: window(HEADER[14], scale_down)?,
		update_resource_and_hpa: update_all.eq_ignore_ascii_case("true"),
		update_hpa_only: update_hpa.eq_ignore_ascii_case("true"),
	})
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;
	use crate::record::{Autoscaling, ResourceTotals, RolloutStrategy};

	const HEADER_LINE: &str = "No|Deployment Name|Namespace|Replicas|CPU Request|CPU Limit|Memory Request|Memory Limit|MaxUnavailable|MaxSurge|Min Replicas|Max Replicas|CPU Target Utilization|ScaleUp Stabilization|ScaleDown Stabilization|UpdateResourceAndHPA|UpdateHPAOnly";

	fn api_record() -> DeploymentRecord {
		DeploymentRecord {
			name: "api".to_string(),
			namespace: "shop".to_string(),
			replicas: 3,
			resources: ResourceTotals {
				cpu_request_millis: 200,
				cpu_limit_millis: 500,
				memory_request_mib: 256,
				memory_limit_mib: 512,
			},
			rollout: RolloutStrategy::default(),
			autoscaling: Some(Autoscaling {
				min_replicas: 2,
				max_replicas: 10,
				cpu_target_utilization: 70,
				scale_up_stabilization: None,
				scale_down_stabilization: None,
			}),
		}
	}

	fn worker_record() -> DeploymentRecord {
		DeploymentRecord {
			name: "worker".to_string(),
			namespace: "shop".to_string(),
			replicas: 1,
			resources: ResourceTotals::default(),
			rollout: RolloutStrategy {
				max_unavailable: Some("1".to_string()),
				max_surge: Some("25%".to_string()),
			},
			autoscaling: None,
		}
	}

	fn written(records: &[DeploymentRecord]) -> String {
		let mut out = Vec::new();
		write_records(&mut out, records, |_, _, _| {}).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn test_write_matches_expected_layout() {
		assert_eq!(
			written(&[api_record(), worker_record()]),
			format!(
				"{HEADER_LINE}\n{}\n{}\n",
				"1|api|shop|3|200m|500m|256Mi|512Mi|||2|10|70|N/A|N/A|false|false",
				"2|worker|shop|1|0m|0m|0Mi|0Mi|1|25%|0|0|0|N/A|N/A|false|false",
			)
		);
	}

	#[test]
	fn test_progress_reports_every_row() {
		let mut seen = Vec::new();
		write_records(Vec::new(), &[api_record(), worker_record()], |current, total, name| {
			seen.push((current, total, name.to_string()));
		})
		.unwrap();
		assert_eq!(
			seen,
			vec![(1, 2, "api".to_string()), (2, 2, "worker".to_string())]
		);
	}

	#[test]
	fn test_round_trip_keeps_every_column() {
		let mut record = api_record();
		record.autoscaling = Some(Autoscaling {
			scale_up_stabilization: Some(0),
			scale_down_stabilization: Some(300),
			..record.autoscaling.unwrap()
		});
		let records = [record, worker_record()];

		let text = written(&records);
		let rows = read_rows(text.as_bytes()).unwrap();

		let expected: Vec<Row> = records
			.iter()
			.enumerate()
			.map(|(i, r)| Row::from_record(i + 1, r))
			.collect();
		assert_eq!(rows, expected);
		assert_eq!(rows[1].scale_up_stabilization, None);
	}

	#[test]
	fn test_read_flags_case_insensitive() {
		let text = format!(
			"{HEADER_LINE}\n{}\n{}\n\n",
			"1|api|shop|3|200m|500m|256Mi|512Mi|||2|10|70|N/A|N/A|TRUE|false",
			"2|web|shop|2|100m|200m|128Mi|256Mi|||1|4|80|60|N/A|no|True",
		);
		let rows = read_rows(text.as_bytes()).unwrap();
		assert_eq!(rows.len(), 2);
		assert!(rows[0].update_resource_and_hpa);
		assert!(!rows[0].update_hpa_only);
		assert!(!rows[1].update_resource_and_hpa);
		assert!(rows[1].update_hpa_only);
		assert_eq!(rows[1].scale_up_stabilization, Some(60));
	}

	#[test]
	fn test_read_accepts_crlf() {
		let text = format!(
			"{HEADER_LINE}\r\n{}\r\n",
			"1|api|shop|3|200m|500m|256Mi|512Mi|||2|10|70|N/A|N/A|false|true"
		);
		let rows = read_rows(text.as_bytes()).unwrap();
		assert!(rows[0].update_hpa_only);
	}

	#[test]
	fn test_legacy_layout_rejected() {
		let text = indoc! {"
			No|Deployment Name|Namespace|Replicas|Min Replicas|Max Replicas|CPU Request|CPU Limit|Memory Request|Memory Limit|CPU Target Utilization
			1|api|shop|3|2|10|200m|500m|256Mi|512Mi|70
		"};
		assert_matches!(
			read_rows(text.as_bytes()),
			Err(CodecError::UnsupportedSchema { found: 11 })
		);
	}

	#[test]
	fn test_renamed_header_column_rejected() {
		let text = HEADER_LINE.replace("MaxSurge", "Max Surge");
		assert_matches!(
			read_rows(text.as_bytes()),
			Err(CodecError::HeaderMismatch { index: 10, found, .. }) if found == "Max Surge"
		);
	}

	#[test]
	fn test_short_row_reports_line() {
		let text = format!("{HEADER_LINE}\n1|api|shop|3\n");
		assert_matches!(
			read_rows(text.as_bytes()),
			Err(CodecError::FieldCount { line: 2, found: 4 })
		);
	}

	#[test]
	fn test_bad_number_reports_column() {
		let text = format!(
			"{HEADER_LINE}\n{}\n",
			"1|api|shop|3|200m|500m|256Mi|512Mi|||two|10|70|N/A|N/A|false|true"
		);
		assert_matches!(
			read_rows(text.as_bytes()),
			Err(CodecError::InvalidField { line: 2, column: "Min Replicas", value }) if value == "two"
		);
	}

	#[test]
	fn test_empty_file() {
		assert_matches!(read_rows("".as_bytes()), Err(CodecError::MissingHeader));
	}

	#[test]
	fn test_delimiter_in_value_rejected() {
		let mut record = worker_record();
		record.rollout.max_surge = Some("1|2".to_string());
		assert_matches!(
			write_records(Vec::new(), &[record], |_, _, _| {}),
			Err(CodecError::UnencodableValue { column: "MaxSurge", .. })
		);
	}
}
