//! Payroll operations against an in-memory spreadsheet fake.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use deskpilot::error::{ApiError, OpError};
use deskpilot::google::{FormulaWrite, SheetsApi, ValueRender, ValueWrite};
use deskpilot::payroll::{
    apply_leave, change_salary, find_employee_row, LeaveType, FORMULA_COLUMNS,
};

const TAB: &str = "Sheet1";
const SHEET: &str = "sheet-1";

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Literal(String),
    Formula(String),
}

impl Cell {
    fn render(&self, render: ValueRender) -> String {
        match (self, render) {
            (Cell::Literal(v), _) => v.clone(),
            (Cell::Formula(f), ValueRender::Formula) => f.clone(),
            // The fake does not evaluate formulas; computed render of a
            // formula cell returns its source, which no test relies on.
            (Cell::Formula(f), ValueRender::Computed) => f.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum WriteEvent {
    Batch(Vec<(String, String)>),
    Cell(String, String),
    Clear(String),
    Raw(String),
    Append(String),
    Formulas(usize),
}

#[derive(Default)]
struct Grid {
    /// (1-based row, 0-based col) -> cell.
    cells: HashMap<(u32, u32), Cell>,
    log: Vec<WriteEvent>,
}

#[derive(Default)]
struct FakeSheets {
    inner: Mutex<Grid>,
}

fn col_index(letters: &str) -> u32 {
    letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + (b - b'A' + 1) as u32)
        - 1
}

/// Parse `Tab!D5` into (row, col). Panics on anything else; the fake only
/// needs what the engine actually sends.
fn parse_cell(range: &str) -> (u32, u32) {
    let local = range.split_once('!').map(|(_, r)| r).unwrap_or(range);
    let split = local.find(|c: char| c.is_ascii_digit()).expect("cell ref");
    let (letters, digits) = local.split_at(split);
    (digits.parse().expect("row number"), col_index(letters))
}

impl FakeSheets {
    fn set(&self, row: u32, col: u32, cell: Cell) {
        self.inner.lock().unwrap().cells.insert((row, col), cell);
    }

    fn get(&self, row: u32, col: u32) -> Option<Cell> {
        self.inner.lock().unwrap().cells.get(&(row, col)).cloned()
    }

    fn literal(&self, row: u32, col: u32) -> String {
        match self.get(row, col) {
            Some(Cell::Literal(v)) => v,
            other => panic!("expected literal at ({row},{col}), got {other:?}"),
        }
    }

    fn formula(&self, row: u32, col: u32) -> String {
        match self.get(row, col) {
            Some(Cell::Formula(f)) => f,
            other => panic!("expected formula at ({row},{col}), got {other:?}"),
        }
    }

    fn log(&self) -> Vec<WriteEvent> {
        self.inner.lock().unwrap().log.clone()
    }

    fn write_count(&self) -> usize {
        self.log().len()
    }

    /// Seed one payroll row with literals in A..G and the schema formulas in
    /// H..K.
    fn seed_payroll_row(&self, row: u32, id: &str, name: &str, dept: &str, salary: &str) {
        for (col, value) in [
            (0, id),
            (1, name),
            (2, dept),
            (3, salary),
            (4, "30"),
            (5, "0"),
            (6, "0"),
        ] {
            self.set(row, col, Cell::Literal(value.to_string()));
        }
        for (col, template) in FORMULA_COLUMNS {
            self.set(
                row,
                col,
                Cell::Formula(template.replace("{ROW}", &row.to_string())),
            );
        }
    }

    fn store(&self, row: u32, col: u32, value: &str) {
        let cell = if value.starts_with('=') {
            Cell::Formula(value.to_string())
        } else {
            Cell::Literal(value.to_string())
        };
        self.set(row, col, cell);
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn write_values_raw(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), ApiError> {
        let (start_row, start_col) = parse_cell(range);
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                self.set(
                    start_row + r as u32,
                    start_col + c as u32,
                    Cell::Literal(value.clone()),
                );
            }
        }
        self.inner
            .lock()
            .unwrap()
            .log
            .push(WriteEvent::Raw(range.to_string()));
        Ok(())
    }

    async fn append_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), ApiError> {
        let next_row = {
            let inner = self.inner.lock().unwrap();
            inner.cells.keys().map(|(r, _)| *r).max().unwrap_or(0) + 1
        };
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                self.set(next_row + r as u32, c as u32, Cell::Literal(value.clone()));
            }
        }
        self.inner
            .lock()
            .unwrap()
            .log
            .push(WriteEvent::Append(range.to_string()));
        Ok(())
    }

    async fn batch_write(
        &self,
        _spreadsheet_id: &str,
        writes: &[ValueWrite],
    ) -> Result<(), ApiError> {
        for write in writes {
            let (row, col) = parse_cell(&write.range);
            self.store(row, col, &write.value);
        }
        self.inner.lock().unwrap().log.push(WriteEvent::Batch(
            writes
                .iter()
                .map(|w| (w.range.clone(), w.value.clone()))
                .collect(),
        ));
        Ok(())
    }

    async fn write_cell(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        let (row, col) = parse_cell(range);
        self.store(row, col, value);
        self.inner
            .lock()
            .unwrap()
            .log
            .push(WriteEvent::Cell(range.to_string(), value.to_string()));
        Ok(())
    }

    async fn clear_range(&self, _spreadsheet_id: &str, range: &str) -> Result<(), ApiError> {
        let (row, col) = parse_cell(range);
        let mut inner = self.inner.lock().unwrap();
        inner.cells.remove(&(row, col));
        inner.log.push(WriteEvent::Clear(range.to_string()));
        Ok(())
    }

    async fn read_range(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        render: ValueRender,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        let local = range.split_once('!').map(|(_, r)| r).unwrap_or(range);
        let inner = self.inner.lock().unwrap();

        if let Some((start, end)) = local.split_once(':') {
            if !end.chars().any(|c| c.is_ascii_digit()) {
                // Column read, e.g. A:A.
                let col = col_index(start.trim_end_matches(|c: char| c.is_ascii_digit()));
                let max_row = inner
                    .cells
                    .keys()
                    .filter(|(_, c)| *c == col)
                    .map(|(r, _)| *r)
                    .max()
                    .unwrap_or(0);
                let rows = (1..=max_row)
                    .map(|r| {
                        vec![inner
                            .cells
                            .get(&(r, col))
                            .map(|cell| cell.render(render))
                            .unwrap_or_default()]
                    })
                    .collect();
                return Ok(rows);
            }

            // Single-row read, e.g. A5:ZZ5.
            let (row, _) = parse_cell(start);
            let max_col = inner
                .cells
                .keys()
                .filter(|(r, _)| *r == row)
                .map(|(_, c)| *c)
                .max();
            let Some(max_col) = max_col else {
                return Ok(Vec::new());
            };
            let cells = (0..=max_col)
                .map(|c| {
                    inner
                        .cells
                        .get(&(row, c))
                        .map(|cell| cell.render(render))
                        .unwrap_or_default()
                })
                .collect();
            return Ok(vec![cells]);
        }

        let (row, col) = parse_cell(local);
        Ok(inner
            .cells
            .get(&(row, col))
            .map(|cell| vec![vec![cell.render(render)]])
            .unwrap_or_default())
    }

    async fn batch_read_cells(
        &self,
        _spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<String>>, ApiError> {
        let inner = self.inner.lock().unwrap();
        Ok(ranges
            .iter()
            .map(|range| {
                let (row, col) = parse_cell(range);
                inner
                    .cells
                    .get(&(row, col))
                    .map(|cell| cell.render(ValueRender::Computed))
                    .filter(|s| !s.is_empty())
            })
            .collect())
    }

    async fn apply_formulas(
        &self,
        _spreadsheet_id: &str,
        cells: &[FormulaWrite],
    ) -> Result<(), ApiError> {
        for cell in cells {
            self.set(cell.row, cell.col, Cell::Formula(cell.formula.clone()));
        }
        self.inner
            .lock()
            .unwrap()
            .log
            .push(WriteEvent::Formulas(cells.len()));
        Ok(())
    }
}

fn payroll_fixture() -> FakeSheets {
    let fake = FakeSheets::default();
    fake.set(1, 0, Cell::Literal("Employee ID".to_string()));
    fake.seed_payroll_row(2, "E001", "Alice", "Engineering", "50000");
    fake.seed_payroll_row(3, "E002", "Bob", "Sales", "40000");
    fake
}

#[tokio::test]
async fn finds_employee_by_exact_id() {
    let fake = payroll_fixture();
    let row = find_employee_row(&fake, TAB, SHEET, "E002").await.unwrap();
    assert_eq!(row, 3);
}

#[tokio::test]
async fn lookup_trims_and_skips_header() {
    let fake = FakeSheets::default();
    // A header cell that happens to equal the id must not match.
    fake.set(1, 0, Cell::Literal("E001".to_string()));
    fake.seed_payroll_row(4, " E001 ", "Alice", "Engineering", "50000");

    let row = find_employee_row(&fake, TAB, SHEET, "E001").await.unwrap();
    assert_eq!(row, 4);
}

#[tokio::test]
async fn first_matching_row_wins_on_duplicates() {
    let fake = payroll_fixture();
    fake.seed_payroll_row(7, "E001", "Alice again", "Support", "10000");

    let row = find_employee_row(&fake, TAB, SHEET, "E001").await.unwrap();
    assert_eq!(row, 2);
}

#[tokio::test]
async fn missing_employee_is_not_found() {
    let fake = payroll_fixture();
    let err = find_employee_row(&fake, TAB, SHEET, "E999").await.unwrap_err();
    assert!(matches!(err, OpError::NotFound(_)));
}

#[tokio::test]
async fn salary_change_writes_only_column_d() {
    let fake = payroll_fixture();
    let row = change_salary(&fake, TAB, SHEET, "E001", 60000.0).await.unwrap();

    assert_eq!(row, 2);
    assert_eq!(fake.literal(2, 3), "60000");
    // Untouched literals survive.
    assert_eq!(fake.literal(2, 1), "Alice");
    assert_eq!(fake.literal(2, 2), "Engineering");
    // The other employee's row is untouched.
    assert_eq!(fake.literal(3, 3), "40000");
}

#[tokio::test]
async fn formulas_are_byte_identical_after_update() {
    let fake = payroll_fixture();
    let before: Vec<String> = (7..=10).map(|c| fake.formula(2, c)).collect();

    change_salary(&fake, TAB, SHEET, "E001", 60000.0).await.unwrap();

    let after: Vec<String> = (7..=10).map(|c| fake.formula(2, c)).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn update_perturbs_then_restores_then_touches() {
    let fake = payroll_fixture();
    change_salary(&fake, TAB, SHEET, "E001", 60000.0).await.unwrap();

    let log = fake.log();
    assert_eq!(log.len(), 5);

    // 1. The literal write.
    let WriteEvent::Batch(writes) = &log[0] else {
        panic!("expected literal batch, got {:?}", log[0]);
    };
    assert_eq!(writes, &vec![("Sheet1!D2".to_string(), "60000".to_string())]);

    // 2. Perturb: every formula rewritten with a volatile suffix.
    let WriteEvent::Batch(perturb) = &log[1] else {
        panic!("expected perturb batch, got {:?}", log[1]);
    };
    assert_eq!(perturb.len(), 4);
    assert!(perturb.iter().all(|(_, v)| v.ends_with("&RAND()")));

    // 3. Restore: the original formula text.
    let WriteEvent::Batch(restore) = &log[2] else {
        panic!("expected restore batch, got {:?}", log[2]);
    };
    assert_eq!(restore.len(), 4);
    assert!(restore.iter().any(|(r, v)| r == "Sheet1!H2" && v == "=D2/30"));
    assert!(restore.iter().all(|(_, v)| !v.contains("RAND")));

    // 4 and 5. Touch marker written past the schema, then cleared.
    assert_eq!(
        log[3],
        WriteEvent::Cell("Sheet1!L2".to_string(), "Updated".to_string())
    );
    assert_eq!(log[4], WriteEvent::Clear("Sheet1!L2".to_string()));
}

#[tokio::test]
async fn protected_column_is_never_rewritten() {
    let fake = payroll_fixture();
    // Department cell holds a formula; protection must keep the recompute
    // pass away from it.
    fake.set(2, 2, Cell::Formula("=VLOOKUP(A2,Depts!A:B,2)".to_string()));

    change_salary(&fake, TAB, SHEET, "E001", 60000.0).await.unwrap();

    assert_eq!(fake.formula(2, 2), "=VLOOKUP(A2,Depts!A:B,2)");
    for event in fake.log() {
        if let WriteEvent::Batch(writes) = event {
            assert!(writes.iter().all(|(range, _)| !range.contains("C2")));
        }
    }
}

#[tokio::test]
async fn negative_salary_is_rejected() {
    let fake = payroll_fixture();
    let writes_before = fake.write_count();

    let err = change_salary(&fake, TAB, SHEET, "E001", -1.0).await.unwrap_err();
    assert!(matches!(err, OpError::InvalidArgument(_)));
    assert_eq!(fake.write_count(), writes_before);
}

#[tokio::test]
async fn leave_deducts_working_days_and_credits_lop() {
    let fake = payroll_fixture();
    let outcome = apply_leave(&fake, TAB, SHEET, "E001", 5, LeaveType::LossOfPay)
        .await
        .unwrap();

    assert_eq!(outcome.row, 2);
    assert_eq!(outcome.remaining_working_days, 25.0);
    assert_eq!(fake.literal(2, 4), "25"); // Working Days
    assert_eq!(fake.literal(2, 5), "0"); // Paid Leave untouched
    assert_eq!(fake.literal(2, 6), "5"); // Loss of Pay
}

#[tokio::test]
async fn paid_leave_routes_to_paid_column() {
    let fake = payroll_fixture();
    apply_leave(&fake, TAB, SHEET, "E001", 3, LeaveType::Paid)
        .await
        .unwrap();

    assert_eq!(fake.literal(2, 4), "27");
    assert_eq!(fake.literal(2, 5), "3");
    assert_eq!(fake.literal(2, 6), "0");
}

#[tokio::test]
async fn leave_balances_accumulate() {
    let fake = payroll_fixture();
    apply_leave(&fake, TAB, SHEET, "E001", 2, LeaveType::Paid)
        .await
        .unwrap();
    apply_leave(&fake, TAB, SHEET, "E001", 4, LeaveType::Paid)
        .await
        .unwrap();

    assert_eq!(fake.literal(2, 4), "24");
    assert_eq!(fake.literal(2, 5), "6");
}

#[tokio::test]
async fn missing_balance_cells_fall_back_to_defaults() {
    let fake = FakeSheets::default();
    fake.set(1, 0, Cell::Literal("Employee ID".to_string()));
    // Only an id; E/F/G are empty.
    fake.set(2, 0, Cell::Literal("E010".to_string()));

    let outcome = apply_leave(&fake, TAB, SHEET, "E010", 5, LeaveType::LossOfPay)
        .await
        .unwrap();

    assert_eq!(outcome.remaining_working_days, 25.0);
    assert_eq!(fake.literal(2, 4), "25");
    assert_eq!(fake.literal(2, 6), "5");
}

#[tokio::test]
async fn nonpositive_leave_is_rejected_without_writes() {
    let fake = payroll_fixture();
    let writes_before = fake.write_count();

    for days in [0, -3] {
        let err = apply_leave(&fake, TAB, SHEET, "E001", days, LeaveType::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument(_)));
    }
    assert_eq!(fake.write_count(), writes_before);
}

#[tokio::test]
async fn excessive_leave_is_rejected_without_writes() {
    let fake = payroll_fixture();
    let writes_before = fake.write_count();

    let err = apply_leave(&fake, TAB, SHEET, "E001", 31, LeaveType::LossOfPay)
        .await
        .unwrap_err();

    match err {
        OpError::InsufficientBalance {
            requested,
            available,
        } => {
            assert_eq!(requested, 31);
            assert_eq!(available, 30.0);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }
    assert_eq!(fake.write_count(), writes_before);
    assert_eq!(fake.literal(2, 4), "30");
}
