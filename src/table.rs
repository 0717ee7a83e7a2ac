//! Column oriented tables printed as markdown or CSV.
use std::fmt::{Display, Write};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::{
    errors::FogToolsErr,
    isd::{FogCount, Period},
};

/// Output format of a [`TablePrinter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, StrumDisplay, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TableFormat {
    /// A pipe table
    Markdown,
    /// Comma separated values with a header row
    Csv,
}

/// Builds a table one column at a time.
#[derive(Default, Debug)]
pub struct TablePrinter {
    column_names: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl TablePrinter {
    /// An empty table.
    pub fn new() -> Self {
        TablePrinter::default()
    }

    /// Append a column.
    pub fn with_column<T, V>(self, col_name: T, col_vals: &[V]) -> Self
    where
        T: Display,
        V: Display,
    {
        let mut column_names = self.column_names;
        let mut columns = self.columns;

        column_names.push(format!("{}", col_name));
        columns.push(col_vals.iter().map(|v| format!("{}", v)).collect());

        TablePrinter {
            column_names,
            columns,
        }
    }

    fn num_rows(&self) -> usize {
        self.columns.iter().map(|col| col.len()).max().unwrap_or(0)
    }

    // Short columns are padded with empty cells.
    fn cell(&self, col: usize, row: usize) -> &str {
        self.columns[col].get(row).map_or("", String::as_str)
    }

    /// Render the table.
    pub fn render(&self, format: TableFormat) -> Result<String, FogToolsErr> {
        if self.columns.is_empty() {
            return Err(FogToolsErr::LogicError("table without columns"));
        }

        match format {
            TableFormat::Markdown => self.render_markdown(),
            TableFormat::Csv => self.render_csv(),
        }
    }

    fn render_markdown(&self) -> Result<String, FogToolsErr> {
        let width = |s: &str| s.chars().count();
        let col_widths: Vec<usize> = (0..self.columns.len())
            .map(|i| {
                (0..self.num_rows())
                    .map(|row| width(self.cell(i, row)))
                    .chain(std::iter::once(width(&self.column_names[i])))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut builder = String::with_capacity(2000);
        let err = |_: std::fmt::Error| FogToolsErr::LogicError("formatting table");

        for (name, w) in self.column_names.iter().zip(&col_widths) {
            write!(&mut builder, "| {0:<1$} ", name, *w).map_err(err)?;
        }
        writeln!(&mut builder, "|").map_err(err)?;

        for w in &col_widths {
            write!(&mut builder, "|{}:", "-".repeat(w + 1)).map_err(err)?;
        }
        writeln!(&mut builder, "|").map_err(err)?;

        for row in 0..self.num_rows() {
            for (col, w) in col_widths.iter().enumerate() {
                write!(&mut builder, "| {0:>1$} ", self.cell(col, row), *w).map_err(err)?;
            }
            writeln!(&mut builder, "|").map_err(err)?;
        }

        Ok(builder)
    }

    fn render_csv(&self) -> Result<String, FogToolsErr> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        wtr.write_record(&self.column_names)?;
        for row in 0..self.num_rows() {
            wtr.write_record((0..self.columns.len()).map(|col| self.cell(col, row)))?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|err| FogToolsErr::GeneralError(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| FogToolsErr::GeneralError(err.to_string()))
    }
}

/// A table of ranked fog periods.
pub fn fog_count_table(counts: &[FogCount], period: Period) -> TablePrinter {
    let labels: Vec<String> = counts.iter().map(|c| period.label(c.start)).collect();
    let foggy: Vec<usize> = counts.iter().map(|c| c.foggy).collect();
    let reporting: Vec<usize> = counts.iter().map(|c| c.reporting).collect();
    let availability: Vec<String> = counts
        .iter()
        .map(|c| format!("{:.1}", c.availability))
        .collect();

    TablePrinter::new()
        .with_column("period", &labels)
        .with_column("foggy", &foggy)
        .with_column("reporting", &reporting)
        .with_column("availability", &availability)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use chrono::NaiveDate;

    fn table() -> TablePrinter {
        TablePrinter::new()
            .with_column("day", &["2019-01-01", "2019-01-02"])
            .with_column("n", &[12])
    }

    #[test]
    fn test_markdown() {
        let md = table().render(TableFormat::Markdown).unwrap();

        assert_eq!(
            md,
            "| day        | n   |\n\
             |-----------:|----:|\n\
             | 2019-01-01 |  12 |\n\
             | 2019-01-02 |     |\n"
        );
    }

    #[test]
    fn test_csv() {
        let csv = table().render(TableFormat::Csv).unwrap();

        assert_eq!(csv, "day,n\n2019-01-01,12\n2019-01-02,\n");
    }

    #[test]
    fn test_empty() {
        assert!(TablePrinter::new().render(TableFormat::Csv).is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("markdown".parse::<TableFormat>().unwrap(), TableFormat::Markdown);
        assert_eq!("csv".parse::<TableFormat>().unwrap(), TableFormat::Csv);
        assert!("html".parse::<TableFormat>().is_err());
    }

    #[test]
    fn test_fog_count_table() {
        let counts = vec![FogCount {
            start: NaiveDate::from_ymd_opt(2019, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            foggy: 7,
            reporting: 20,
            availability: 80.0,
        }];

        let csv = fog_count_table(&counts, Period::Day)
            .render(TableFormat::Csv)
            .unwrap();

        assert_eq!(csv, "period,foggy,reporting,availability\n2019-01-05,7,20,80.0\n");
    }
}
