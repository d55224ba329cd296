//! In-memory shape of the tabular data handed to the sync core.
//!
//! A [`Table`] is a list of named [`Worksheet`]s plus the name of the sheet
//! that unbound layers read from. Each worksheet stores one column of text
//! values per label. Columns are always kept at the same length: shorter
//! columns are padded with blanks when the worksheet is built, so every
//! `(label, row)` pair inside [`Worksheet::row_count`] has a value.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the source data was laid out before it was turned into columns.
///
/// The core never interprets the tag; it is kept so hosts can round-trip
/// what the acquisition layer saw.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Labels are the header row, values run down the columns.
    #[default]
    Columns,
    /// Labels are the first column, values run along the rows.
    Rows,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    DuplicateLabel { worksheet: String, label: String },
    DuplicateWorksheet(String),
    UnknownActiveWorksheet(String),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateLabel { worksheet, label } => {
                write!(f, "worksheet `{worksheet}` defines label `{label}` twice")
            }
            Self::DuplicateWorksheet(name) => write!(f, "worksheet `{name}` is defined twice"),
            Self::UnknownActiveWorksheet(name) => {
                write!(f, "active worksheet `{name}` is not part of the table")
            }
        }
    }
}

impl std::error::Error for TableError {}

/// One named sheet of labeled columns.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "WorksheetData"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    name: String,
    labels: Vec<String>,
    rows: BTreeMap<String, Vec<String>>,
    orientation: Orientation,
    #[cfg_attr(feature = "serde", serde(skip))]
    row_count: usize,
}

/// Unchecked wire form of a [`Worksheet`].
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[derive(Debug, Clone)]
pub struct WorksheetData {
    pub name: String,
    pub labels: Vec<String>,
    pub rows: BTreeMap<String, Vec<String>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientation: Orientation,
}

impl TryFrom<WorksheetData> for Worksheet {
    type Error = TableError;

    fn try_from(data: WorksheetData) -> Result<Self, Self::Error> {
        let mut sheet = Worksheet::new(data.name, data.orientation);
        let mut rows = data.rows;
        for label in data.labels {
            let values = rows.remove(&label).unwrap_or_default();
            sheet.push_column(label, values)?;
        }
        Ok(sheet)
    }
}

impl Worksheet {
    pub fn new(name: impl Into<String>, orientation: Orientation) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            rows: BTreeMap::new(),
            orientation,
            row_count: 0,
        }
    }

    /// Build a column-oriented sheet from a header row and data rows.
    ///
    /// Cells past the end of the header are dropped; missing cells are blank.
    pub fn from_records<H, R, C>(
        name: impl Into<String>,
        header: H,
        records: R,
    ) -> Result<Self, TableError>
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let header: Vec<String> = header.into_iter().map(Into::into).collect();
        let mut columns: Vec<Vec<String>> = vec![Vec::new(); header.len()];
        for record in records {
            let mut cells = record.into_iter().map(Into::into);
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or_default());
            }
        }
        let mut sheet = Self::new(name, Orientation::Columns);
        for (label, values) in header.into_iter().zip(columns) {
            sheet.push_column(label, values)?;
        }
        Ok(sheet)
    }

    /// Build a row-oriented sheet where each line starts with its label.
    pub fn from_label_rows<R, C>(name: impl Into<String>, lines: R) -> Result<Self, TableError>
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut sheet = Self::new(name, Orientation::Rows);
        for line in lines {
            let mut cells = line.into_iter().map(Into::into);
            let Some(label) = cells.next() else {
                continue;
            };
            sheet.push_column(label, cells.collect())?;
        }
        Ok(sheet)
    }

    /// Append a labeled column, padding whichever side is shorter with blanks.
    pub fn push_column(
        &mut self,
        label: impl Into<String>,
        mut values: Vec<String>,
    ) -> Result<(), TableError> {
        let label = label.into();
        if self.rows.contains_key(&label) {
            return Err(TableError::DuplicateLabel {
                worksheet: self.name.clone(),
                label,
            });
        }
        if values.len() > self.row_count {
            self.row_count = values.len();
            for column in self.rows.values_mut() {
                column.resize(self.row_count, String::new());
            }
        } else {
            values.resize(self.row_count, String::new());
        }
        self.labels.push(label.clone());
        self.rows.insert(label, values);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labels in sheet order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Number of rows shared by every column.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// All values for an exact label.
    pub fn values(&self, label: &str) -> Option<&[String]> {
        self.rows.get(label).map(Vec::as_slice)
    }

    /// Value at a zero-based row; `None` for unknown labels or rows out of range.
    pub fn value(&self, label: &str, row: usize) -> Option<&str> {
        self.values(label)
            .and_then(|values| values.get(row))
            .map(String::as_str)
    }

    /// Rows up to and including the last non-blank value of `label`.
    ///
    /// Padding and trailing empty cells are not counted, which makes this the
    /// number of records a label actually carries.
    pub fn filled_row_count(&self, label: &str) -> usize {
        self.values(label)
            .map(|values| {
                values
                    .iter()
                    .rposition(|v| !is_blank(v))
                    .map_or(0, |last| last + 1)
            })
            .unwrap_or(0)
    }
}

/// Empty or whitespace-only cell text.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// The full data set for one sync run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub worksheets: Vec<Worksheet>,
    pub active_worksheet: String,
}

impl Table {
    pub fn new(
        worksheets: Vec<Worksheet>,
        active_worksheet: impl Into<String>,
    ) -> Result<Self, TableError> {
        let active_worksheet = active_worksheet.into();
        for (idx, sheet) in worksheets.iter().enumerate() {
            if worksheets[..idx].iter().any(|other| other.name == sheet.name) {
                return Err(TableError::DuplicateWorksheet(sheet.name.clone()));
            }
        }
        if !worksheets.iter().any(|sheet| sheet.name == active_worksheet) {
            return Err(TableError::UnknownActiveWorksheet(active_worksheet));
        }
        Ok(Self {
            worksheets,
            active_worksheet,
        })
    }

    /// Table with one worksheet that is also the active one.
    pub fn single(worksheet: Worksheet) -> Self {
        let active_worksheet = worksheet.name.clone();
        Self {
            worksheets: vec![worksheet],
            active_worksheet,
        }
    }

    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn active(&self) -> Option<&Worksheet> {
        self.worksheet(&self.active_worksheet)
    }

    pub fn worksheet_names(&self) -> impl Iterator<Item = &str> {
        self.worksheets.iter().map(|sheet| sheet.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_columns_are_padded() {
        let mut sheet = Worksheet::new("People", Orientation::Columns);
        sheet
            .push_column("Name", vec!["Ada".into(), "Grace".into()])
            .unwrap();
        sheet
            .push_column("Email", vec!["a@x".into(), "g@x".into(), "l@x".into()])
            .unwrap();
        sheet.push_column("Note", vec![]).unwrap();

        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.value("Name", 2), Some(""));
        assert_eq!(sheet.value("Note", 1), Some(""));
        assert_eq!(sheet.value("Email", 3), None);
        assert_eq!(sheet.labels(), ["Name", "Email", "Note"]);
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut sheet = Worksheet::new("S", Orientation::Columns);
        sheet.push_column("A", vec![]).unwrap();
        assert_eq!(
            sheet.push_column("A", vec![]),
            Err(TableError::DuplicateLabel {
                worksheet: "S".into(),
                label: "A".into()
            })
        );
    }

    #[test]
    fn records_and_label_rows_agree() {
        let by_records =
            Worksheet::from_records("S", ["Title", "Price"], [vec!["A", "1"], vec!["B"]]).unwrap();
        let by_rows =
            Worksheet::from_label_rows("S", [vec!["Title", "A", "B"], vec!["Price", "1"]]).unwrap();

        assert_eq!(by_records.values("Title"), by_rows.values("Title"));
        assert_eq!(by_records.values("Price"), by_rows.values("Price"));
        assert_eq!(by_rows.orientation(), Orientation::Rows);
    }

    #[test]
    fn filled_row_count_ignores_trailing_blanks() {
        let sheet =
            Worksheet::from_label_rows("S", [vec!["Title", "A", "", "C", " ", ""], vec!["Empty"]])
                .unwrap();
        assert_eq!(sheet.row_count(), 5);
        assert_eq!(sheet.filled_row_count("Title"), 3);
        assert_eq!(sheet.filled_row_count("Empty"), 0);
        assert_eq!(sheet.filled_row_count("Missing"), 0);
    }

    #[test]
    fn table_validates_active_sheet() {
        let sheet = Worksheet::new("One", Orientation::Columns);
        assert_eq!(
            Table::new(vec![sheet.clone()], "Two"),
            Err(TableError::UnknownActiveWorksheet("Two".into()))
        );
        assert_eq!(
            Table::new(vec![sheet.clone(), sheet.clone()], "One"),
            Err(TableError::DuplicateWorksheet("One".into()))
        );
        let table = Table::new(vec![sheet], "One").unwrap();
        assert_eq!(table.active().map(Worksheet::name), Some("One"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialized_worksheet_is_padded() {
        let sheet: Worksheet = serde_json::from_str(
            r#"{"name":"S","labels":["A","B"],"rows":{"A":["1","2"],"B":[]}}"#,
        )
        .unwrap();
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.value("B", 1), Some(""));
    }
}
