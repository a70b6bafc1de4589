use serde::{Deserialize, Serialize};

use super::{Cell, Sheet};
use crate::error::EditError;

/// Name given to the single sheet of a table created from scratch.
pub const NEW_TABLE_SHEET: &str = "Sheet 1";

/// Name used when a created table is given a blank name.
pub const NEW_TABLE_NAME: &str = "New Table";

/// A sheet together with its name inside a workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSheet {
    pub name: String,
    #[serde(flatten)]
    pub sheet: Sheet,
}

impl NamedSheet {
    pub fn new(name: impl Into<String>, sheet: Sheet) -> Self {
        Self {
            name: name.into(),
            sheet,
        }
    }
}

/// A named collection of sheets plus an active-sheet pointer.
///
/// Sheet names are unique and keep their insertion order; the active name
/// always resolves to one of them. Workbooks are values: every edit returns
/// a new workbook and leaves the receiver untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WorkbookParts")]
pub struct Workbook {
    /// Source name (typically the uploaded file name).
    pub name: String,
    sheets: Vec<NamedSheet>,
    active_sheet_name: String,
    /// Set once any edit, sort or structural change has been applied.
    pub modified: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkbookParts {
    name: String,
    sheets: Vec<NamedSheet>,
    active_sheet_name: Option<String>,
    #[serde(default)]
    modified: bool,
}

impl TryFrom<WorkbookParts> for Workbook {
    type Error = EditError;

    fn try_from(parts: WorkbookParts) -> Result<Self, Self::Error> {
        let mut workbook = Self::from_sheets(parts.name, parts.sheets)?;
        if let Some(active) = parts.active_sheet_name {
            workbook = workbook.with_active_sheet(&active)?;
        }
        workbook.modified = parts.modified;
        Ok(workbook)
    }
}

impl Workbook {
    /// Build a workbook. The first sheet becomes active.
    pub fn from_sheets(name: impl Into<String>, sheets: Vec<NamedSheet>) -> Result<Self, EditError> {
        let first = sheets.first().ok_or(EditError::NoSheets)?.name.clone();
        for (idx, sheet) in sheets.iter().enumerate() {
            if sheets.iter().take(idx).any(|s| s.name == sheet.name) {
                return Err(EditError::DuplicateSheet(sheet.name.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            sheets,
            active_sheet_name: first,
            modified: false,
        })
    }

    /// A workbook holding just `sheet`, which is active.
    pub fn from_sheet(name: impl Into<String>, sheet: NamedSheet) -> Self {
        Self {
            name: name.into(),
            active_sheet_name: sheet.name.clone(),
            sheets: vec![sheet],
            modified: false,
        }
    }

    /// Create a single-sheet table from explicit headers and rows.
    ///
    /// Ragged rows are padded. A blank name falls back to [`NEW_TABLE_NAME`].
    pub fn new_table(name: &str, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let name = if name.trim().is_empty() {
            NEW_TABLE_NAME.to_string()
        } else {
            name.trim().to_string()
        };
        Self::from_sheet(name, NamedSheet::new(NEW_TABLE_SHEET, Sheet::new(headers, rows)))
    }

    pub fn sheets(&self) -> &[NamedSheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name).map(|s| &s.sheet)
    }

    pub fn active_sheet_name(&self) -> &str {
        &self.active_sheet_name
    }

    pub fn active_sheet(&self) -> Option<&Sheet> {
        self.sheet(&self.active_sheet_name)
    }

    /// Switch the active sheet. Does not mark the workbook modified.
    pub fn with_active_sheet(&self, name: &str) -> Result<Self, EditError> {
        if self.sheet(name).is_none() {
            return Err(EditError::UnknownSheet(name.to_string()));
        }
        let mut next = self.clone();
        next.active_sheet_name = name.to_string();
        Ok(next)
    }

    /// Replace the sheet called `name` and mark the workbook modified.
    pub fn with_sheet(&self, name: &str, sheet: Sheet) -> Result<Self, EditError> {
        let mut next = self.clone();
        let slot = next
            .sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| EditError::UnknownSheet(name.to_string()))?;
        slot.sheet = sheet;
        next.modified = true;
        Ok(next)
    }

    /// Apply `edit` to the active sheet, returning the updated workbook.
    pub fn edit_active<F>(&self, edit: F) -> Result<Self, EditError>
    where
        F: FnOnce(&Sheet) -> Result<Sheet, EditError>,
    {
        let current = self
            .active_sheet()
            .ok_or_else(|| EditError::UnknownSheet(self.active_sheet_name.clone()))?;
        let updated = edit(current)?;
        self.with_sheet(&self.active_sheet_name, updated)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn two_sheets() -> Workbook {
        Workbook::from_sheets(
            "book.xlsx",
            vec![
                NamedSheet::new("First", Sheet::new(vec!["A".into()], vec![])),
                NamedSheet::new("Second", Sheet::new(vec!["B".into()], vec![])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_first_sheet_is_active() {
        let wb = two_sheets();
        assert_eq!(wb.active_sheet_name(), "First");
        assert!(!wb.modified);
        assert_eq!(wb.sheet_names().collect::<Vec<_>>(), vec!["First", "Second"]);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let dup = Workbook::from_sheets(
            "x",
            vec![
                NamedSheet::new("S", Sheet::default()),
                NamedSheet::new("S", Sheet::default()),
            ],
        );
        assert_eq!(dup, Err(EditError::DuplicateSheet("S".into())));
        assert_eq!(Workbook::from_sheets("x", vec![]), Err(EditError::NoSheets));
    }

    #[test]
    fn test_switch_active_does_not_modify() {
        let wb = two_sheets().with_active_sheet("Second").unwrap();
        assert_eq!(wb.active_sheet_name(), "Second");
        assert!(!wb.modified);
        assert!(two_sheets().with_active_sheet("Nope").is_err());
    }

    #[test]
    fn test_edit_active_marks_modified() {
        let wb = two_sheets();
        let edited = wb.edit_active(|s| Ok(s.with_row_added())).unwrap();
        assert!(edited.modified);
        assert_eq!(edited.active_sheet().unwrap().height(), 1);
        assert_eq!(wb.active_sheet().unwrap().height(), 0);
    }

    #[test]
    fn test_new_table() {
        let wb = Workbook::new_table(
            "  ",
            vec!["Column 1".into()],
            vec![vec![Cell::text("a"), Cell::text("b")]],
        );
        assert_eq!(wb.name, NEW_TABLE_NAME);
        assert_eq!(wb.active_sheet_name(), NEW_TABLE_SHEET);
        let sheet = wb.active_sheet().unwrap();
        assert_eq!(sheet.headers(), &["Column 1", ""]);
        assert!(sheet.is_rectangular());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let wb = two_sheets().with_active_sheet("Second").unwrap();
        let json = serde_json::to_string(&wb).unwrap();
        assert!(json.contains(r#""activeSheetName":"Second""#));
        let back: Workbook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wb);

        let bad = r#"{"name":"x","sheets":[{"name":"S","headers":[]}],"activeSheetName":"T"}"#;
        assert!(serde_json::from_str::<Workbook>(bad).is_err());
    }
}
